//! OAuth2 Engine Data Model

pub mod params;
pub mod registration;
pub mod tokens;

pub use params::ExchangeParams;
pub use registration::{ClientRegistration, EndpointAuthMethod};
pub use tokens::TokenState;

/// Wire parameter names, RFC 6749 response-side spelling used uniformly.
pub mod keys {
    pub const CLIENT_ID: &str = "client_id";
    pub const CLIENT_SECRET: &str = "client_secret";
    pub const CLIENT_SECRET_EXPIRES_AT: &str = "client_secret_expires_at";
    pub const REDIRECT_URI: &str = "redirect_uri";
    pub const SCOPE: &str = "scope";
    pub const STATE: &str = "state";
    pub const CODE: &str = "code";
    pub const GRANT_TYPE: &str = "grant_type";
    pub const RESPONSE_TYPE: &str = "response_type";
    pub const TOKEN_ENDPOINT_AUTH_METHOD: &str = "token_endpoint_auth_method";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const ACCESS_TOKEN_EXPIRY: &str = "access_token_expiry";
    pub const ID_TOKEN: &str = "id_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const EXPIRES_IN: &str = "expires_in";
    pub const TOKEN_TYPE: &str = "token_type";
    pub const ERROR: &str = "error";
    pub const ERROR_DESCRIPTION: &str = "error_description";
}

/// Grant and response type constants for the Authorization Code flow.
pub mod grants {
    pub const AUTHORIZATION_CODE: &str = "authorization_code";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const RESPONSE_TYPE_CODE: &str = "code";
}
