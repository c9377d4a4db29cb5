//! OAuth2 Engine Errors
//!
//! A single closed enumeration of failure kinds. Every terminal failure of an
//! authorization attempt resolves to exactly one of these; the host decides
//! presentation from the kind plus the optional message.

use thiserror::Error;

/// Closed set of engine failure kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Endpoint is not using TLS (https)")]
    NotUsingTls,

    #[error("URL components do not resolve to a usable URL")]
    InvalidUrlComponents,

    #[error("Request was cancelled")]
    RequestCancelled,

    #[error("Unauthorized client (HTTP 401)")]
    UnauthorizedClient,

    #[error("Forbidden (HTTP 403)")]
    Forbidden,

    #[error("No data in response")]
    NoDataInResponse,

    #[error("No access token available")]
    NoAccessToken,

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Response error: {0}")]
    ResponseError(String),

    #[error("Error in response: {0}")]
    FromResponseError(String),

    #[error("Unsupported token type: {0}")]
    UnsupportedTokenType(String),

    #[error("No token type in response")]
    NoTokenType,

    #[error("Missing state parameter in redirect")]
    MissingState,

    #[error("State parameter mismatch")]
    InvalidState,

    #[error("No client id configured")]
    NoClientId,

    #[error("No redirect URL configured")]
    NoRedirectUrl,

    #[error("Invalid redirect URL: {0}")]
    InvalidRedirectUrl(String),

    #[error("An authorization is already in progress")]
    AlreadyAuthorizing,

    #[error("No registration URL configured")]
    NoRegistrationUrl,

    #[error("Dynamic client registration failed")]
    DynamicRegistrarError,

    #[error("{0}")]
    Generic(String),
}

impl AuthError {
    /// Stable kind string for logging and telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotUsingTls => "not_using_tls",
            Self::InvalidUrlComponents => "invalid_url_components",
            Self::RequestCancelled => "request_cancelled",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::Forbidden => "forbidden",
            Self::NoDataInResponse => "no_data_in_response",
            Self::NoAccessToken => "no_access_token",
            Self::NoRefreshToken => "no_refresh_token",
            Self::ResponseError(_) => "response_error",
            Self::FromResponseError(_) => "from_response_error",
            Self::UnsupportedTokenType(_) => "unsupported_token_type",
            Self::NoTokenType => "no_token_type",
            Self::MissingState => "missing_state",
            Self::InvalidState => "invalid_state",
            Self::NoClientId => "no_client_id",
            Self::NoRedirectUrl => "no_redirect_url",
            Self::InvalidRedirectUrl(_) => "invalid_redirect_url",
            Self::AlreadyAuthorizing => "already_authorizing",
            Self::NoRegistrationUrl => "no_registration_url",
            Self::DynamicRegistrarError => "dynamic_registrar_error",
            Self::Generic(_) => "generic",
        }
    }

    /// Whether a failed refresh with this kind falls through to interactive
    /// authorization instead of terminating the attempt.
    pub fn is_refresh_fallthrough(&self) -> bool {
        matches!(
            self,
            Self::NoRefreshToken | Self::NoClientId | Self::UnauthorizedClient
        )
    }

    /// The human-readable detail carried by this error, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::ResponseError(m)
            | Self::FromResponseError(m)
            | Self::UnsupportedTokenType(m)
            | Self::InvalidRedirectUrl(m)
            | Self::Generic(m) => Some(m),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type AuthResult<T> = Result<T, AuthError>;
