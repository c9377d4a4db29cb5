//! Dynamic Client Registration
//!
//! Obtains a client id (and possibly secret) from the provider's
//! registration endpoint, then folds the result back into the client
//! registration record.

use serde::Serialize;
use std::collections::HashMap;

use crate::core::{HttpExchanger, HttpMethod, HttpRequest};
use crate::error::{AuthError, AuthResult};
use crate::response::response_parameters;
use crate::telemetry::Logger;
use crate::types::{grants, keys, ClientRegistration, ExchangeParams};

/// JSON document POSTed to the registration endpoint.
#[derive(Serialize)]
struct RegistrationBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    client_name: Option<&'a str>,
    redirect_uris: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    logo_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
    grant_types: Vec<&'static str>,
    response_types: Vec<&'static str>,
    token_endpoint_auth_method: &'static str,
}

/// Registers a client dynamically when none is configured.
pub struct DynamicRegistrar {
    /// Headers added to the registration request, e.g. an initial access
    /// token some providers require.
    pub extra_headers: HashMap<String, String>,
    /// Whether to ask for the `refresh_token` grant alongside the code grant.
    pub allow_refresh_tokens: bool,
}

impl Default for DynamicRegistrar {
    fn default() -> Self {
        Self {
            extra_headers: HashMap::new(),
            allow_refresh_tokens: true,
        }
    }
}

impl DynamicRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the registration exchange and apply the result to `registration`.
    ///
    /// Classified transport failures (401, 403, empty body) keep their own
    /// kind; every other unsuccessful outcome is `DynamicRegistrarError`.
    pub async fn register(
        &self,
        exchanger: &dyn HttpExchanger,
        registration: &mut ClientRegistration,
        logger: &dyn Logger,
    ) -> AuthResult<ExchangeParams> {
        let endpoint = registration
            .registration_endpoint
            .as_ref()
            .ok_or(AuthError::NoRegistrationUrl)?;
        if endpoint.scheme() != "https" {
            return Err(AuthError::NotUsingTls);
        }

        let mut grant_types = vec![grants::AUTHORIZATION_CODE];
        if self.allow_refresh_tokens {
            grant_types.push(grants::REFRESH_TOKEN);
        }
        let body = RegistrationBody {
            client_name: registration.client_name.as_deref(),
            redirect_uris: &registration.redirect_uris,
            logo_uri: registration.logo_uri.as_ref().map(url::Url::as_str),
            scope: registration.scope.as_deref(),
            grant_types,
            response_types: vec![grants::RESPONSE_TYPE_CODE],
            token_endpoint_auth_method: registration.endpoint_auth_method.as_str(),
        };
        let body = serde_json::to_string(&body)
            .map_err(|e| AuthError::Generic(format!("Failed to encode registration: {e}")))?;

        let mut headers: HashMap<String, String> = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        for (key, value) in &self.extra_headers {
            headers.insert(key.clone(), value.clone());
        }

        logger.info("Registering client dynamically");
        let response = exchanger
            .send(HttpRequest {
                method: HttpMethod::Post,
                url: endpoint.to_string(),
                headers,
                body: Some(body),
            })
            .await?;

        let params = response_parameters(&response)?;
        if response.status >= 400 {
            logger.error(&format!(
                "Dynamic registration failed with status {}",
                response.status
            ));
            return Err(AuthError::DynamicRegistrarError);
        }

        registration.update_from_registration_response(&params)?;
        if let Some(expiry) = params.non_empty(keys::CLIENT_SECRET_EXPIRES_AT) {
            logger.debug(&format!("Client secret expires at {expiry}"));
        }

        logger.info("Dynamic registration succeeded");
        Ok(params)
    }
}
