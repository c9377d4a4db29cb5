//! # oauth2-engine
//!
//! An embeddable OAuth2 Authorization Code client engine for desktop and
//! long-running applications. The engine owns protocol state and decisions;
//! the host supplies the environment through three seams:
//!
//! - [`HttpExchanger`] performs HTTP exchanges,
//! - [`SecretStore`] persists credentials and tokens,
//! - [`AuthorizationPresenter`] shows the user-facing authorization page.
//!
//! One [`AuthorizationFlow::authorize`] call runs a whole attempt: fast path
//! when a usable access token exists, refresh when a refresh token exists,
//! dynamic client registration when a mandatory client id is missing, and
//! finally interactive authorization. The host feeds the provider's redirect
//! back through [`AuthorizationFlow::handle_redirect`] and may cancel at any
//! point with [`AuthorizationFlow::abort`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use oauth2_engine::{
//!     AuthorizationFlow, FlowOptions, InMemorySecretStore, MockPresenter,
//!     RegistrationBuilder, ReqwestHttpExchanger,
//! };
//!
//! # async fn run() -> oauth2_engine::AuthResult<()> {
//! let registration = RegistrationBuilder::new()
//!     .client_id("my-client")
//!     .authorize_endpoint("https://provider.example/authorize")
//!     .token_endpoint("https://provider.example/token")
//!     .redirect_uri("myapp://oauth/callback")
//!     .scope("profile")
//!     .build()?;
//!
//! let flow = AuthorizationFlow::new(
//!     registration,
//!     Arc::new(ReqwestHttpExchanger::new()?),
//!     Arc::new(InMemorySecretStore::new()),
//!     Arc::new(MockPresenter::new()),
//!     FlowOptions::default(),
//! );
//!
//! flow.restore_from_store().await?;
//! let params = flow.authorize(None).await?;
//! # let _ = params;
//! # Ok(())
//! # }
//! ```

pub mod builders;
pub mod core;
pub mod error;
pub mod flows;
pub mod presenter;
pub mod request;
pub mod response;
pub mod store;
pub mod telemetry;
pub mod types;

pub use builders::RegistrationBuilder;
pub use core::{
    HttpExchanger, HttpMethod, HttpRequest, HttpResponse, MockHttpExchanger, RequestCorrelation,
    ReqwestHttpExchanger,
};
pub use error::{AuthError, AuthResult};
pub use flows::{AuthorizationFlow, DynamicRegistrar, FlowOptions};
pub use presenter::{AuthorizationPresenter, MockPresenter};
pub use request::{AuthRequest, RequestBuilder};
pub use response::{
    assure_correct_bearer_type, assure_no_error_in_response, response_parameters,
    validate_token_response,
};
pub use store::{
    InMemorySecretStore, MockSecretStore, SecretStore, ACCOUNT_CLIENT_CREDENTIALS, ACCOUNT_TOKENS,
};
pub use telemetry::{InMemoryLogger, LogLevel, Logger, NoOpLogger, TracingLogger};
pub use types::{ClientRegistration, EndpointAuthMethod, ExchangeParams, TokenState};
