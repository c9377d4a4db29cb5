//! Registration Builder
//!
//! Fluent construction of a [`ClientRegistration`] from host configuration.
//! Endpoint strings are parsed eagerly so a typo fails at build time rather
//! than mid-flow.

use secrecy::SecretString;
use url::Url;

use crate::error::{AuthError, AuthResult};
use crate::types::ClientRegistration;

/// Builder for [`ClientRegistration`].
#[derive(Default)]
pub struct RegistrationBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    client_name: Option<String>,
    authorize_endpoint: Option<String>,
    token_endpoint: Option<String>,
    registration_endpoint: Option<String>,
    logo_uri: Option<String>,
    scope: Option<String>,
    redirect_uris: Vec<String>,
    secret_in_body: bool,
    custom_headers: Vec<(String, String)>,
    custom_parameters: Vec<(String, String)>,
}

impl RegistrationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = Some(client_name.into());
        self
    }

    pub fn authorize_endpoint(mut self, url: impl Into<String>) -> Self {
        self.authorize_endpoint = Some(url.into());
        self
    }

    pub fn token_endpoint(mut self, url: impl Into<String>) -> Self {
        self.token_endpoint = Some(url.into());
        self
    }

    pub fn registration_endpoint(mut self, url: impl Into<String>) -> Self {
        self.registration_endpoint = Some(url.into());
        self
    }

    pub fn logo_uri(mut self, url: impl Into<String>) -> Self {
        self.logo_uri = Some(url.into());
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.push(uri.into());
        self
    }

    /// Send `client_id`/`client_secret` in the request body instead of a
    /// Basic Authorization header.
    pub fn secret_in_body(mut self, secret_in_body: bool) -> Self {
        self.secret_in_body = secret_in_body;
        self
    }

    pub fn custom_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    pub fn custom_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_parameters.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> AuthResult<ClientRegistration> {
        let authorize_endpoint = parse_endpoint(
            self.authorize_endpoint
                .as_deref()
                .ok_or(AuthError::InvalidUrlComponents)?,
        )?;

        let mut registration = ClientRegistration::new(authorize_endpoint);
        if let Some(client_id) = self.client_id {
            registration.client_id = client_id;
        }
        registration.client_secret = self.client_secret.map(SecretString::new);
        registration.client_name = self.client_name;
        registration.token_endpoint = self.token_endpoint.as_deref().map(parse_endpoint).transpose()?;
        registration.registration_endpoint = self
            .registration_endpoint
            .as_deref()
            .map(parse_endpoint)
            .transpose()?;
        registration.logo_uri = self.logo_uri.as_deref().map(parse_endpoint).transpose()?;
        registration.scope = self.scope;
        registration.redirect_uris = self.redirect_uris;
        registration.secret_in_body = self.secret_in_body;
        registration.custom_headers = self.custom_headers.into_iter().collect();
        registration.custom_parameters = self.custom_parameters.into_iter().collect();
        registration.derive_auth_method();
        Ok(registration)
    }
}

fn parse_endpoint(value: &str) -> AuthResult<Url> {
    Url::parse(value).map_err(|_| AuthError::InvalidUrlComponents)
}
