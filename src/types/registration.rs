//! Client Registration
//!
//! Immutable-ish record of everything the engine knows about one OAuth2
//! client: identifiers, endpoints, scope, redirect URIs and the client
//! authentication policy. Mutated only by a successful dynamic registration
//! or an explicit "forget credentials".

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use url::Url;

use crate::error::{AuthError, AuthResult};
use crate::types::{keys, ExchangeParams};

/// Client authentication method at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EndpointAuthMethod {
    /// No client authentication (public client).
    #[default]
    None,
    /// `client_id` and `client_secret` in the request body.
    ClientSecretPost,
    /// HTTP Basic Authorization header.
    ClientSecretBasic,
}

impl EndpointAuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretPost => "client_secret_post",
            Self::ClientSecretBasic => "client_secret_basic",
        }
    }

    /// Parse a wire value, rejecting anything outside the known enum.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "client_secret_post" => Some(Self::ClientSecretPost),
            "client_secret_basic" => Some(Self::ClientSecretBasic),
            _ => None,
        }
    }
}

/// OAuth2 client registration record.
#[derive(Clone)]
pub struct ClientRegistration {
    /// Client identifier; empty until dynamic registration completes.
    pub client_id: String,
    /// Client secret for confidential clients.
    pub client_secret: Option<SecretString>,
    /// Human-readable client name, sent during dynamic registration.
    pub client_name: Option<String>,
    /// Authorization endpoint. Must be https to build any live request.
    pub authorize_endpoint: Url,
    /// Token endpoint; falls back to the authorize endpoint when absent.
    pub token_endpoint: Option<Url>,
    /// Dynamic client registration endpoint.
    pub registration_endpoint: Option<Url>,
    /// Logo shown by the authorization server, sent during registration.
    pub logo_uri: Option<Url>,
    /// Space-delimited scope string, opaque to the engine.
    pub scope: Option<String>,
    /// Registered redirect URIs; the first one is the default.
    pub redirect_uris: Vec<String>,
    /// Client authentication placement policy.
    pub endpoint_auth_method: EndpointAuthMethod,
    /// Force id/secret into the request body regardless of auth method.
    pub secret_in_body: bool,
    /// Headers overlaid onto every outbound request.
    pub custom_headers: HashMap<String, String>,
    /// Parameters overlaid onto every exchange, overwriting protocol ones.
    pub custom_parameters: HashMap<String, String>,
}

impl ClientRegistration {
    /// Create a registration with only the authorization endpoint set.
    ///
    /// The auth method is derived the same way on every construction path:
    /// `secret_in_body` forces `client_secret_post`, a present secret selects
    /// `client_secret_basic`, and a public client gets `none` (see
    /// [`derive_auth_method`](Self::derive_auth_method)).
    pub fn new(authorize_endpoint: Url) -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            client_name: None,
            authorize_endpoint,
            token_endpoint: None,
            registration_endpoint: None,
            logo_uri: None,
            scope: None,
            redirect_uris: Vec::new(),
            endpoint_auth_method: EndpointAuthMethod::None,
            secret_in_body: false,
            custom_headers: HashMap::new(),
            custom_parameters: HashMap::new(),
        }
    }

    /// Recompute the auth method from the secret-placement policy.
    pub fn derive_auth_method(&mut self) {
        self.endpoint_auth_method = if self.secret_in_body {
            EndpointAuthMethod::ClientSecretPost
        } else if self.client_secret.is_some() {
            EndpointAuthMethod::ClientSecretBasic
        } else {
            EndpointAuthMethod::None
        };
    }

    /// The endpoint token and refresh exchanges are sent to.
    pub fn token_endpoint(&self) -> &Url {
        self.token_endpoint.as_ref().unwrap_or(&self.authorize_endpoint)
    }

    /// Default redirect URI (the first registered one).
    pub fn default_redirect_uri(&self) -> Option<&str> {
        self.redirect_uris.first().map(String::as_str)
    }

    pub fn has_client_id(&self) -> bool {
        !self.client_id.is_empty()
    }

    /// Expose the secret for request signing.
    pub fn client_secret_value(&self) -> Option<&str> {
        self.client_secret.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Apply a successful dynamic registration response.
    ///
    /// A response without a client id is useless; the auth method is only
    /// taken over when it parses into the known enum.
    pub fn update_from_registration_response(
        &mut self,
        params: &ExchangeParams,
    ) -> AuthResult<()> {
        let client_id = params
            .non_empty(keys::CLIENT_ID)
            .ok_or(AuthError::DynamicRegistrarError)?;
        self.client_id = client_id.to_string();
        if let Some(secret) = params.non_empty(keys::CLIENT_SECRET) {
            self.client_secret = Some(SecretString::new(secret.to_string()));
        }
        if let Some(method) = params
            .non_empty(keys::TOKEN_ENDPOINT_AUTH_METHOD)
            .and_then(EndpointAuthMethod::parse)
        {
            self.endpoint_auth_method = method;
            self.secret_in_body = method == EndpointAuthMethod::ClientSecretPost;
        }
        Ok(())
    }

    /// Clear the client credentials obtained by configuration or dynamic
    /// registration.
    pub fn forget_credentials(&mut self) {
        self.client_id.clear();
        self.client_secret = None;
    }

    /// Credential items to persist in the secure store, or `None` when there
    /// is nothing worth storing.
    pub fn storable_credential_items(&self) -> Option<HashMap<String, String>> {
        if self.client_id.is_empty() {
            return None;
        }

        let mut items = HashMap::new();
        items.insert(keys::CLIENT_ID.to_string(), self.client_id.clone());
        if let Some(secret) = self.client_secret_value() {
            items.insert(keys::CLIENT_SECRET.to_string(), secret.to_string());
        }
        items.insert(
            keys::TOKEN_ENDPOINT_AUTH_METHOD.to_string(),
            self.endpoint_auth_method.as_str().to_string(),
        );
        Some(items)
    }

    /// Restore credentials from secure-store items, returning log messages
    /// describing what was found.
    pub fn update_from_storable_items(&mut self, items: &HashMap<String, String>) -> Vec<String> {
        let mut messages = Vec::new();

        if let Some(client_id) = items.get(keys::CLIENT_ID).filter(|v| !v.is_empty()) {
            self.client_id = client_id.clone();
            messages.push("Found client id".to_string());
        }
        if let Some(secret) = items.get(keys::CLIENT_SECRET).filter(|v| !v.is_empty()) {
            self.client_secret = Some(SecretString::new(secret.clone()));
            messages.push("Found client secret".to_string());
        }
        if let Some(method) = items
            .get(keys::TOKEN_ENDPOINT_AUTH_METHOD)
            .and_then(|v| EndpointAuthMethod::parse(v))
        {
            self.endpoint_auth_method = method;
            self.secret_in_body = method == EndpointAuthMethod::ClientSecretPost;
            messages.push("Found endpoint auth method".to_string());
        }

        messages
    }
}

impl std::fmt::Debug for ClientRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistration")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("authorize_endpoint", &self.authorize_endpoint.as_str())
            .field("token_endpoint", &self.token_endpoint.as_ref().map(Url::as_str))
            .field(
                "registration_endpoint",
                &self.registration_endpoint.as_ref().map(Url::as_str),
            )
            .field("scope", &self.scope)
            .field("redirect_uris", &self.redirect_uris)
            .field("endpoint_auth_method", &self.endpoint_auth_method)
            .field("secret_in_body", &self.secret_in_body)
            .finish()
    }
}
