//! Response Validation
//!
//! Classifies completed token-endpoint exchanges into parameters or one
//! specific failure kind. Classification happens before parsing, error
//! payload inspection before token-type checks, and the token state is only
//! touched once everything else passed.

use crate::core::HttpResponse;
use crate::error::{AuthError, AuthResult};
use crate::types::{keys, ExchangeParams, TokenState};

const BEARER: &str = "bearer";

/// Classify and parse a response into exchange parameters.
///
/// 401 and 403 have dedicated kinds, an empty body is `NoDataInResponse`,
/// everything else must parse as a flat JSON object. Other error statuses are
/// not rejected here; their payload may still carry a protocol error worth
/// surfacing verbatim.
pub fn response_parameters(response: &HttpResponse) -> AuthResult<ExchangeParams> {
    match response.status {
        401 => return Err(AuthError::UnauthorizedClient),
        403 => return Err(AuthError::Forbidden),
        _ => {}
    }
    if response.body.trim().is_empty() {
        return Err(AuthError::NoDataInResponse);
    }
    ExchangeParams::from_json_body(&response.body)
}

/// Reject parameters carrying an OAuth2 error payload.
///
/// A human-readable `error_description` is preferred over the bare `error`
/// code when both are present.
pub fn assure_no_error_in_response(params: &ExchangeParams) -> AuthResult<()> {
    if let Some(description) = params.non_empty(keys::ERROR_DESCRIPTION) {
        return Err(AuthError::ResponseError(description.to_string()));
    }
    if let Some(error) = params.non_empty(keys::ERROR) {
        return Err(AuthError::FromResponseError(error.to_string()));
    }
    Ok(())
}

/// Only `bearer` tokens (any casing) are supported.
pub fn assure_correct_bearer_type(params: &ExchangeParams) -> AuthResult<()> {
    match params.non_empty(keys::TOKEN_TYPE) {
        Some(token_type) if token_type.eq_ignore_ascii_case(BEARER) => Ok(()),
        Some(token_type) => Err(AuthError::UnsupportedTokenType(token_type.to_string())),
        None => Err(AuthError::NoTokenType),
    }
}

/// Full validation of a token or refresh response.
///
/// On success the token state is updated from the response and the parsed
/// parameters are returned. On any failure the token state is untouched.
pub fn validate_token_response(
    response: &HttpResponse,
    tokens: &mut TokenState,
) -> AuthResult<ExchangeParams> {
    let params = response_parameters(response)?;
    assure_no_error_in_response(&params)?;
    assure_correct_bearer_type(&params)?;
    if response.status >= 400 {
        return Err(AuthError::Generic(format!(
            "Failed with status {}",
            response.status
        )));
    }
    tokens.update_from_response(&params);
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            response_parameters(&response(401, "{}")).unwrap_err(),
            AuthError::UnauthorizedClient
        );
        assert_eq!(
            response_parameters(&response(403, "{}")).unwrap_err(),
            AuthError::Forbidden
        );
        assert_eq!(
            response_parameters(&response(200, "   ")).unwrap_err(),
            AuthError::NoDataInResponse
        );
    }

    #[test]
    fn test_malformed_body_is_generic() {
        let err = response_parameters(&response(200, "<html>oops</html>")).unwrap_err();
        assert_eq!(err.kind(), "generic");
    }

    #[test]
    fn test_error_description_preferred_over_error_code() {
        let params = ExchangeParams::from_json_body(
            r#"{"error":"invalid_grant","error_description":"Refresh token revoked"}"#,
        )
        .unwrap();
        assert_eq!(
            assure_no_error_in_response(&params).unwrap_err(),
            AuthError::ResponseError("Refresh token revoked".into())
        );

        let params = ExchangeParams::from_json_body(r#"{"error":"invalid_grant"}"#).unwrap();
        assert_eq!(
            assure_no_error_in_response(&params).unwrap_err(),
            AuthError::FromResponseError("invalid_grant".into())
        );
    }

    #[test]
    fn test_bearer_type_is_case_insensitive() {
        let ok = ExchangeParams::from_json_body(r#"{"token_type":"Bearer"}"#).unwrap();
        assert!(assure_correct_bearer_type(&ok).is_ok());

        let missing = ExchangeParams::from_json_body(r#"{"access_token":"X"}"#).unwrap();
        assert_eq!(
            assure_correct_bearer_type(&missing).unwrap_err(),
            AuthError::NoTokenType
        );

        let wrong = ExchangeParams::from_json_body(r#"{"token_type":"mac"}"#).unwrap();
        assert_eq!(
            assure_correct_bearer_type(&wrong).unwrap_err(),
            AuthError::UnsupportedTokenType("mac".into())
        );
    }

    #[test]
    fn test_successful_validation_updates_tokens() {
        let mut tokens = TokenState::new(true);
        let params = validate_token_response(
            &response(
                200,
                r#"{"access_token":"X","token_type":"bearer","expires_in":3600,"refresh_token":"R"}"#,
            ),
            &mut tokens,
        )
        .unwrap();

        assert_eq!(params.get("access_token"), Some("X"));
        assert_eq!(tokens.access_token.as_deref(), Some("X"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("R"));
        assert!(tokens.has_unexpired_access_token());
    }

    #[test]
    fn test_failure_leaves_tokens_untouched() {
        let mut tokens = TokenState::new(true);
        tokens.access_token = Some("OLD".into());

        let err = validate_token_response(
            &response(400, r#"{"error":"invalid_grant"}"#),
            &mut tokens,
        )
        .unwrap_err();
        assert_eq!(err, AuthError::FromResponseError("invalid_grant".into()));
        assert_eq!(tokens.access_token.as_deref(), Some("OLD"));

        // A missing token type also keeps the state intact.
        let err = validate_token_response(
            &response(200, r#"{"access_token":"NEW"}"#),
            &mut tokens,
        )
        .unwrap_err();
        assert_eq!(err, AuthError::NoTokenType);
        assert_eq!(tokens.access_token.as_deref(), Some("OLD"));
    }

    #[test]
    fn test_clean_payload_with_error_status_fails() {
        let mut tokens = TokenState::new(true);
        let err = validate_token_response(
            &response(500, r#"{"access_token":"X","token_type":"bearer"}"#),
            &mut tokens,
        )
        .unwrap_err();
        assert_eq!(err, AuthError::Generic("Failed with status 500".into()));
        assert!(tokens.access_token.is_none());
    }
}
