//! Request Builder
//!
//! Turns protocol parameters into fully formed outbound requests:
//! authorization URLs, token/refresh exchange bodies, and the finalization
//! step that places client authentication and custom overrides.

use std::collections::HashMap;
use url::Url;

use crate::core::{HttpMethod, HttpRequest};
use crate::error::{AuthError, AuthResult};
use crate::types::{grants, keys, ClientRegistration, EndpointAuthMethod, ExchangeParams};

const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded; charset=utf-8";
const CONTENT_TYPE_JSON: &str = "application/json";

/// One outbound OAuth2 request before finalization.
#[derive(Clone, Debug)]
pub struct AuthRequest {
    endpoint: Url,
    method: HttpMethod,
    pub params: ExchangeParams,
}

impl AuthRequest {
    pub fn new(endpoint: &Url, method: HttpMethod) -> Self {
        Self {
            endpoint: endpoint.clone(),
            method,
            params: ExchangeParams::new(),
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Copy extra parameters into the request, later values winning.
    pub fn add_params(&mut self, extra: Option<&ExchangeParams>) {
        if let Some(extra) = extra {
            self.params.extend_from(extra);
        }
    }

    /// The validated request URL.
    ///
    /// Endpoints not using `https` are a hard error; GET requests carry the
    /// parameters as a percent-encoded query string.
    pub fn as_url(&self) -> AuthResult<Url> {
        if self.endpoint.scheme() != "https" {
            return Err(AuthError::NotUsingTls);
        }
        if self.endpoint.cannot_be_a_base() {
            return Err(AuthError::InvalidUrlComponents);
        }

        let mut url = self.endpoint.clone();
        if self.method == HttpMethod::Get && !self.params.is_empty() {
            url.set_query(Some(&self.params.to_query_string()));
        }
        Ok(url)
    }

    /// Finalize into a transport request, applying client authentication
    /// placement and the registration's custom headers and parameters.
    pub fn into_http_request(self, registration: &ClientRegistration) -> AuthResult<HttpRequest> {
        let url = self.as_url()?;
        let mut params = self.params;
        let mut headers: HashMap<String, String> = HashMap::new();
        headers.insert("Content-Type".to_string(), CONTENT_TYPE_FORM.to_string());
        headers.insert("Accept".to_string(), CONTENT_TYPE_JSON.to_string());

        if registration.has_client_id() {
            if let Some(secret) = registration.client_secret_value() {
                let in_body = registration.secret_in_body
                    || registration.endpoint_auth_method == EndpointAuthMethod::ClientSecretPost;
                if in_body {
                    params.set(keys::CLIENT_ID, registration.client_id.clone());
                    params.set(keys::CLIENT_SECRET, secret);
                } else {
                    headers.insert(
                        "Authorization".to_string(),
                        basic_credential(&registration.client_id, secret),
                    );
                    params.remove(keys::CLIENT_ID);
                    params.remove(keys::CLIENT_SECRET);
                }
            }
        }

        for (key, value) in &registration.custom_headers {
            headers.insert(key.clone(), value.clone());
        }
        for (key, value) in &registration.custom_parameters {
            params.set(key.clone(), value.clone());
        }

        let body = if self.method == HttpMethod::Post && !params.is_empty() {
            Some(params.to_query_string())
        } else {
            None
        };

        Ok(HttpRequest {
            method: self.method,
            url: url.to_string(),
            headers,
            body,
        })
    }
}

/// HTTP Basic credential from URL-encoded `client_id:client_secret`.
fn basic_credential(client_id: &str, client_secret: &str) -> String {
    let encode = |s: &str| url::form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>();
    let pair = format!("{}:{}", encode(client_id), encode(client_secret));
    let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, pair);
    format!("Basic {encoded}")
}

/// Builds the three live requests of the Authorization Code flow.
pub struct RequestBuilder<'a> {
    registration: &'a ClientRegistration,
    client_id_mandatory: bool,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(registration: &'a ClientRegistration, client_id_mandatory: bool) -> Self {
        Self {
            registration,
            client_id_mandatory,
        }
    }

    /// GET request for the user-facing authorization page.
    pub fn authorization_request(
        &self,
        redirect_uri: &str,
        state: &str,
        scope: Option<&str>,
        extra: Option<&ExchangeParams>,
    ) -> AuthResult<AuthRequest> {
        if redirect_uri.is_empty() {
            return Err(AuthError::NoRedirectUrl);
        }
        if self.client_id_mandatory && !self.registration.has_client_id() {
            return Err(AuthError::NoClientId);
        }

        let mut request =
            AuthRequest::new(&self.registration.authorize_endpoint, HttpMethod::Get);
        request.params.set(keys::REDIRECT_URI, redirect_uri);
        request.params.set(keys::STATE, state);
        request
            .params
            .set(keys::CLIENT_ID, self.registration.client_id.clone());
        request
            .params
            .set(keys::RESPONSE_TYPE, grants::RESPONSE_TYPE_CODE);
        if let Some(scope) = scope.or(self.registration.scope.as_deref()) {
            request.params.set(keys::SCOPE, scope);
        }
        request.add_params(extra);
        Ok(request)
    }

    /// POST exchanging an authorization code for tokens.
    pub fn token_request(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
        extra: Option<&ExchangeParams>,
    ) -> AuthResult<AuthRequest> {
        if !self.registration.has_client_id() {
            return Err(AuthError::NoClientId);
        }
        let redirect_uri = redirect_uri
            .filter(|r| !r.is_empty())
            .ok_or(AuthError::NoRedirectUrl)?;

        let mut request = AuthRequest::new(self.registration.token_endpoint(), HttpMethod::Post);
        request.params.set(keys::CODE, code);
        request
            .params
            .set(keys::GRANT_TYPE, grants::AUTHORIZATION_CODE);
        request.params.set(keys::REDIRECT_URI, redirect_uri);
        request
            .params
            .set(keys::CLIENT_ID, self.registration.client_id.clone());
        request.add_params(extra);
        Ok(request)
    }

    /// POST exchanging a refresh token for a fresh access token.
    pub fn refresh_request(
        &self,
        refresh_token: Option<&str>,
        extra: Option<&ExchangeParams>,
    ) -> AuthResult<AuthRequest> {
        if self.client_id_mandatory && !self.registration.has_client_id() {
            return Err(AuthError::NoClientId);
        }
        let refresh_token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NoRefreshToken)?;

        let mut request = AuthRequest::new(self.registration.token_endpoint(), HttpMethod::Post);
        request.params.set(keys::GRANT_TYPE, grants::REFRESH_TOKEN);
        request.params.set(keys::REFRESH_TOKEN, refresh_token);
        request
            .params
            .set(keys::CLIENT_ID, self.registration.client_id.clone());
        request.add_params(extra);
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn registration() -> ClientRegistration {
        let mut reg =
            ClientRegistration::new(Url::parse("https://auth.example/a").unwrap());
        reg.client_id = "abc".into();
        reg.token_endpoint = Some(Url::parse("https://auth.example/t").unwrap());
        reg.scope = Some("profile".into());
        reg
    }

    #[test]
    fn test_authorization_url_parameters_in_order() {
        let reg = registration();
        let builder = RequestBuilder::new(&reg, true);
        let request = builder
            .authorization_request("https://app.example/cb", "ST4TE", None, None)
            .unwrap();
        let url = request.as_url().unwrap();

        assert_eq!(
            url.as_str(),
            "https://auth.example/a?redirect_uri=https%3A%2F%2Fapp.example%2Fcb\
             &state=ST4TE&client_id=abc&response_type=code&scope=profile"
        );
    }

    #[test]
    fn test_authorization_requires_redirect_and_client_id() {
        let mut reg = registration();
        let builder = RequestBuilder::new(&reg, true);
        assert_eq!(
            builder
                .authorization_request("", "s", None, None)
                .unwrap_err(),
            AuthError::NoRedirectUrl
        );

        reg.client_id.clear();
        let builder = RequestBuilder::new(&reg, true);
        assert_eq!(
            builder
                .authorization_request("https://app.example/cb", "s", None, None)
                .unwrap_err(),
            AuthError::NoClientId
        );

        // A public client without a mandatory id may still authorize.
        let builder = RequestBuilder::new(&reg, false);
        assert!(builder
            .authorization_request("https://app.example/cb", "s", None, None)
            .is_ok());
    }

    #[test]
    fn test_non_tls_endpoint_is_rejected() {
        let mut reg = registration();
        reg.authorize_endpoint = Url::parse("http://auth.example/a").unwrap();
        reg.token_endpoint = None;
        let builder = RequestBuilder::new(&reg, true);

        let auth = builder
            .authorization_request("https://app.example/cb", "s", None, None)
            .unwrap();
        assert_eq!(auth.as_url().unwrap_err(), AuthError::NotUsingTls);

        let token = builder
            .token_request("c0de", Some("https://app.example/cb"), None)
            .unwrap();
        assert_eq!(
            token.into_http_request(&reg).unwrap_err(),
            AuthError::NotUsingTls
        );
    }

    #[test]
    fn test_token_request_contents() {
        let reg = registration();
        let builder = RequestBuilder::new(&reg, true);
        let request = builder
            .token_request("c0de", Some("https://app.example/cb"), None)
            .unwrap();
        let http = request.into_http_request(&reg).unwrap();

        assert_eq!(http.method, HttpMethod::Post);
        assert_eq!(http.url, "https://auth.example/t");
        let body = http.body.unwrap();
        assert!(body.contains("code=c0de"));
        assert!(body.contains("grant_type=authorization_code"));
        assert!(body.contains("redirect_uri=https%3A%2F%2Fapp.example%2Fcb"));
        assert!(body.contains("client_id=abc"));
    }

    #[test]
    fn test_refresh_request_prerequisites() {
        let reg = registration();
        let builder = RequestBuilder::new(&reg, true);
        assert_eq!(
            builder.refresh_request(None, None).unwrap_err(),
            AuthError::NoRefreshToken
        );
        assert_eq!(
            builder.refresh_request(Some(""), None).unwrap_err(),
            AuthError::NoRefreshToken
        );

        let request = builder.refresh_request(Some("R"), None).unwrap();
        assert_eq!(request.params.get("grant_type"), Some("refresh_token"));
        assert_eq!(request.params.get("refresh_token"), Some("R"));
    }

    #[test]
    fn test_basic_auth_strips_body_credentials() {
        let mut reg = registration();
        reg.client_secret = Some(SecretString::new("s3cret".into()));
        reg.derive_auth_method();

        let builder = RequestBuilder::new(&reg, true);
        let request = builder
            .token_request("c0de", Some("https://app.example/cb"), None)
            .unwrap();
        let http = request.into_http_request(&reg).unwrap();

        let auth = http.headers.get("Authorization").unwrap();
        assert!(auth.starts_with("Basic "));
        let body = http.body.unwrap();
        assert!(!body.contains("client_id="));
        assert!(!body.contains("client_secret="));
    }

    #[test]
    fn test_secret_in_body_placement() {
        let mut reg = registration();
        reg.client_secret = Some(SecretString::new("s3cret".into()));
        reg.secret_in_body = true;
        reg.derive_auth_method();

        let builder = RequestBuilder::new(&reg, true);
        let request = builder
            .token_request("c0de", Some("https://app.example/cb"), None)
            .unwrap();
        let http = request.into_http_request(&reg).unwrap();

        assert!(!http.headers.contains_key("Authorization"));
        let body = http.body.unwrap();
        assert!(body.contains("client_id=abc"));
        assert!(body.contains("client_secret=s3cret"));
    }

    #[test]
    fn test_custom_headers_and_parameters_overlay() {
        let mut reg = registration();
        reg.custom_headers
            .insert("X-Custom".into(), "yes".into());
        reg.custom_parameters
            .insert("client_id".into(), "overridden".into());

        let builder = RequestBuilder::new(&reg, true);
        let request = builder
            .token_request("c0de", Some("https://app.example/cb"), None)
            .unwrap();
        let http = request.into_http_request(&reg).unwrap();

        assert_eq!(http.headers.get("X-Custom").map(String::as_str), Some("yes"));
        assert!(http.body.unwrap().contains("client_id=overridden"));
    }

    #[test]
    fn test_extra_params_win() {
        let reg = registration();
        let builder = RequestBuilder::new(&reg, true);
        let extra: ExchangeParams = [("scope", "email"), ("prompt", "consent")]
            .into_iter()
            .collect();
        let request = builder
            .authorization_request("https://app.example/cb", "s", None, Some(&extra))
            .unwrap();

        assert_eq!(request.params.get("scope"), Some("email"));
        assert_eq!(request.params.get("prompt"), Some("consent"));
    }
}
