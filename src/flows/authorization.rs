//! Authorization Code Flow
//!
//! The orchestrator: decides between the fast path (usable access token),
//! the refresh path, dynamic registration, and interactive authorization,
//! then correlates the host-delivered redirect back to the waiting attempt.
//!
//! All mutable state lives behind one mutex that is never held across an
//! await; in-flight exchanges are made cancellable through an abort handle,
//! and the interactive stage parks the attempt on a oneshot channel that the
//! redirect handler (or `abort`) resolves exactly once.

use futures::future::{abortable, AbortHandle, Aborted};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use url::Url;

use crate::core::{HttpExchanger, HttpMethod, HttpRequest, HttpResponse, RequestCorrelation};
use crate::error::{AuthError, AuthResult};
use crate::flows::DynamicRegistrar;
use crate::presenter::AuthorizationPresenter;
use crate::request::RequestBuilder;
use crate::response::{assure_no_error_in_response, validate_token_response};
use crate::store::{SecretStore, ACCOUNT_CLIENT_CREDENTIALS, ACCOUNT_TOKENS};
use crate::telemetry::{Logger, NoOpLogger};
use crate::types::{keys, ClientRegistration, ExchangeParams, TokenState};

const OOB_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Behavioral knobs of the flow.
#[derive(Clone, Debug)]
pub struct FlowOptions {
    /// Refuse to build requests without a client id; when unset a public
    /// client may authorize with an empty id.
    pub client_id_mandatory: bool,
    /// Persist credentials and tokens through the secret store.
    pub use_secret_store: bool,
    /// Present the authorization page embedded instead of in the system
    /// browser.
    pub embedded: bool,
    /// Treat an access token without expiry information as usable.
    pub assume_unexpired_when_no_expiry: bool,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            client_id_mandatory: true,
            use_secret_store: true,
            embedded: false,
            assume_unexpired_when_no_expiry: true,
        }
    }
}

struct FlowInner {
    registration: ClientRegistration,
    tokens: TokenState,
    correlation: RequestCorrelation,
    authorizing: bool,
    pending: Option<oneshot::Sender<AuthResult<ExchangeParams>>>,
    abort_handle: Option<AbortHandle>,
}

/// OAuth2 Authorization Code Grant engine.
pub struct AuthorizationFlow {
    exchanger: Arc<dyn HttpExchanger>,
    store: Arc<dyn SecretStore>,
    presenter: Arc<dyn AuthorizationPresenter>,
    logger: Arc<dyn Logger>,
    registrar: DynamicRegistrar,
    options: FlowOptions,
    inner: Mutex<FlowInner>,
}

impl AuthorizationFlow {
    pub fn new(
        registration: ClientRegistration,
        exchanger: Arc<dyn HttpExchanger>,
        store: Arc<dyn SecretStore>,
        presenter: Arc<dyn AuthorizationPresenter>,
        options: FlowOptions,
    ) -> Self {
        let tokens = TokenState::new(options.assume_unexpired_when_no_expiry);
        Self {
            exchanger,
            store,
            presenter,
            logger: Arc::new(NoOpLogger),
            registrar: DynamicRegistrar::new(),
            options,
            inner: Mutex::new(FlowInner {
                registration,
                tokens,
                correlation: RequestCorrelation::new(),
                authorizing: false,
                pending: None,
                abort_handle: None,
            }),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_registrar(mut self, registrar: DynamicRegistrar) -> Self {
        self.registrar = registrar;
        self
    }

    fn lock(&self) -> MutexGuard<'_, FlowInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current registration.
    pub fn registration(&self) -> ClientRegistration {
        self.lock().registration.clone()
    }

    /// Snapshot of the current token state.
    pub fn tokens(&self) -> TokenState {
        self.lock().tokens.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().tokens.access_token.clone()
    }

    pub fn has_unexpired_access_token(&self) -> bool {
        self.lock().tokens.has_unexpired_access_token()
    }

    pub fn is_authorizing(&self) -> bool {
        self.lock().authorizing
    }

    /// Run one authorization attempt to completion.
    ///
    /// Tries, in order: the fast path (existing usable access token), the
    /// refresh path, dynamic registration when a mandatory client id is
    /// missing, and finally interactive authorization, which resolves when
    /// the host delivers the redirect through [`handle_redirect`] or cancels
    /// through [`abort`].
    ///
    /// Only one attempt may run at a time; a second concurrent call fails
    /// with [`AuthError::AlreadyAuthorizing`].
    ///
    /// [`handle_redirect`]: Self::handle_redirect
    /// [`abort`]: Self::abort
    pub async fn authorize(&self, extra: Option<&ExchangeParams>) -> AuthResult<ExchangeParams> {
        {
            let mut inner = self.lock();
            if inner.authorizing {
                return Err(AuthError::AlreadyAuthorizing);
            }
            inner.authorizing = true;
        }

        let result = self.authorize_inner(extra).await;

        {
            let mut inner = self.lock();
            inner.authorizing = false;
            inner.pending = None;
            inner.abort_handle = None;
        }
        if let Err(err) = &result {
            self.logger.warn(&format!("Authorization failed: {err}"));
        }
        result
    }

    async fn authorize_inner(&self, extra: Option<&ExchangeParams>) -> AuthResult<ExchangeParams> {
        if self.lock().tokens.has_unexpired_access_token() {
            self.logger
                .debug("Found usable access token, skipping authorization");
            return Ok(ExchangeParams::new());
        }

        match self.try_refresh(extra).await {
            Ok(params) => return Ok(params),
            Err(err) if err.is_refresh_fallthrough() => {
                self.logger.debug(&format!(
                    "No refresh possible ({}), continuing",
                    err.kind()
                ));
            }
            Err(err) => return Err(err),
        }

        let needs_client_id = !self.lock().registration.has_client_id();
        if needs_client_id && self.options.client_id_mandatory {
            self.register_client().await?;
        }

        self.authorize_interactively(extra).await
    }

    /// Exchange the stored refresh token for a fresh access token.
    async fn try_refresh(&self, extra: Option<&ExchangeParams>) -> AuthResult<ExchangeParams> {
        let (registration, refresh_token) = {
            let inner = self.lock();
            (
                inner.registration.clone(),
                inner.tokens.refresh_token.clone(),
            )
        };

        let builder = RequestBuilder::new(&registration, self.options.client_id_mandatory);
        let request = builder.refresh_request(refresh_token.as_deref(), extra)?;
        let request = request.into_http_request(&registration)?;

        self.logger.info("Refreshing access token");
        let response = self.perform(request).await?;

        if response.status >= 400 {
            // A rejected refresh token is gone for good.
            self.logger
                .debug("Refresh request was rejected, discarding refresh token");
            self.lock().tokens.refresh_token = None;
            self.persist_tokens().await;
        }

        let params = {
            let mut inner = self.lock();
            validate_token_response(&response, &mut inner.tokens)?
        };
        self.logger.info("Access token refreshed");
        self.persist_tokens().await;
        Ok(params)
    }

    async fn register_client(&self) -> AuthResult<()> {
        let mut registration = self.lock().registration.clone();
        self.registrar
            .register(
                self.exchanger.as_ref(),
                &mut registration,
                self.logger.as_ref(),
            )
            .await?;
        self.lock().registration = registration;
        self.persist_credentials().await;
        Ok(())
    }

    /// Present the authorization page and park the attempt until the host
    /// delivers the redirect.
    async fn authorize_interactively(
        &self,
        extra: Option<&ExchangeParams>,
    ) -> AuthResult<ExchangeParams> {
        let (url, receiver) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let redirect_uri = inner
                .registration
                .default_redirect_uri()
                .map(str::to_string)
                .ok_or(AuthError::NoRedirectUrl)?;
            let state = inner.correlation.state().to_string();

            let builder =
                RequestBuilder::new(&inner.registration, self.options.client_id_mandatory);
            let request = builder.authorization_request(&redirect_uri, &state, None, extra)?;
            let url = request.as_url()?;

            inner.correlation.set_redirect_uri(&redirect_uri);
            let (sender, receiver) = oneshot::channel();
            inner.pending = Some(sender);
            (url, receiver)
        };

        self.logger.info("Presenting authorization page");
        if self.options.embedded {
            self.presenter.present_authorization_page(&url).await?;
        } else {
            self.presenter.open_in_system_browser(&url).await?;
        }

        // A dropped sender counts as cancellation.
        receiver.await.unwrap_or(Err(AuthError::RequestCancelled))
    }

    /// Handle the redirect the host received from the authorization server.
    ///
    /// Every terminal outcome, including a redirect that does not match the
    /// expected redirect URI, resolves the waiting
    /// [`authorize`](Self::authorize) call with the same result.
    pub async fn handle_redirect(&self, redirect: &Url) -> AuthResult<()> {
        let remembered = {
            let inner = self.lock();
            if inner.pending.is_none() {
                return Err(AuthError::Generic("No authorization in progress".into()));
            }
            inner.correlation.redirect_uri().map(str::to_string)
        };

        let result = if redirect_matches(redirect, remembered.as_deref()) {
            self.exchange_code(redirect).await
        } else {
            Err(AuthError::InvalidRedirectUrl(redirect.to_string()))
        };
        if let Some(sender) = self.lock().pending.take() {
            let _ = sender.send(result.clone());
        }
        result.map(|_| ())
    }

    async fn exchange_code(&self, redirect: &Url) -> AuthResult<ExchangeParams> {
        let params = ExchangeParams::from_query(redirect.query().unwrap_or(""));
        assure_no_error_in_response(&params)?;
        let code = params
            .non_empty(keys::CODE)
            .ok_or_else(|| AuthError::ResponseError("No 'code' received in redirect".into()))?
            .to_string();

        {
            let mut inner = self.lock();
            match params.non_empty(keys::STATE) {
                None => return Err(AuthError::MissingState),
                Some(state) if !inner.correlation.matches_state(state) => {
                    return Err(AuthError::InvalidState)
                }
                // A matched nonce is spent; the next attempt gets a fresh one.
                Some(_) => inner.correlation.reset_state(),
            }
        }

        let (registration, redirect_uri) = {
            let inner = self.lock();
            (
                inner.registration.clone(),
                inner.correlation.redirect_uri().map(str::to_string),
            )
        };
        let builder = RequestBuilder::new(&registration, self.options.client_id_mandatory);
        let request = builder.token_request(&code, redirect_uri.as_deref(), None)?;
        let request = request.into_http_request(&registration)?;

        self.logger.info("Exchanging authorization code for tokens");
        let response = self.perform(request).await?;

        let params = {
            let mut inner = self.lock();
            let params = validate_token_response(&response, &mut inner.tokens)?;
            inner.correlation.clear_redirect_uri();
            params
        };
        self.logger.info("Obtained access token");
        self.persist_tokens().await;
        Ok(params)
    }

    /// Build a resource-server request carrying the current access token as
    /// a Bearer credential, plus the registration's custom headers.
    pub fn signed_request(&self, url: &Url, method: HttpMethod) -> AuthResult<HttpRequest> {
        if url.scheme() != "https" {
            return Err(AuthError::NotUsingTls);
        }
        let inner = self.lock();
        if !inner.tokens.has_unexpired_access_token() {
            return Err(AuthError::NoAccessToken);
        }
        let token = inner
            .tokens
            .access_token
            .clone()
            .ok_or(AuthError::NoAccessToken)?;

        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        for (key, value) in &inner.registration.custom_headers {
            headers.insert(key.clone(), value.clone());
        }
        Ok(HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body: None,
        })
    }

    /// Cancel the current attempt: aborts an in-flight exchange, otherwise
    /// resolves a parked interactive attempt with `RequestCancelled`. A
    /// no-op when nothing is in progress.
    pub fn abort(&self) {
        let mut inner = self.lock();
        if let Some(handle) = inner.abort_handle.take() {
            self.logger.debug("Aborting in-flight exchange");
            handle.abort();
        } else if let Some(sender) = inner.pending.take() {
            self.logger.debug("Cancelling pending authorization");
            let _ = sender.send(Err(AuthError::RequestCancelled));
        }
    }

    /// Restore credentials and tokens persisted by an earlier run.
    pub async fn restore_from_store(&self) -> AuthResult<()> {
        if !self.options.use_secret_store {
            return Ok(());
        }
        let credentials = self.store.load(ACCOUNT_CLIENT_CREDENTIALS).await?;
        let tokens = self.store.load(ACCOUNT_TOKENS).await?;

        let messages = {
            let mut inner = self.lock();
            let mut messages = inner.registration.update_from_storable_items(&credentials);
            messages.extend(inner.tokens.update_from_storable_items(&tokens));
            messages
        };
        for message in messages {
            self.logger.debug(&message);
        }
        Ok(())
    }

    /// Drop all tokens, in memory and in the store.
    pub async fn forget_tokens(&self) -> AuthResult<()> {
        self.lock().tokens.forget();
        if self.options.use_secret_store {
            self.store.delete(ACCOUNT_TOKENS).await?;
        }
        Ok(())
    }

    /// Drop the client credentials and all tokens.
    pub async fn forget_client(&self) -> AuthResult<()> {
        self.forget_tokens().await?;
        self.lock().registration.forget_credentials();
        if self.options.use_secret_store {
            self.store.delete(ACCOUNT_CLIENT_CREDENTIALS).await?;
        }
        Ok(())
    }

    /// Send one request through the exchanger with cancellation support.
    async fn perform(&self, request: HttpRequest) -> AuthResult<HttpResponse> {
        let (task, handle) = abortable(self.exchanger.send(request));
        self.lock().abort_handle = Some(handle);
        let outcome = task.await;
        self.lock().abort_handle = None;
        match outcome {
            Ok(result) => result,
            Err(Aborted) => Err(AuthError::RequestCancelled),
        }
    }

    async fn persist_tokens(&self) {
        if !self.options.use_secret_store {
            return;
        }
        let items = self.lock().tokens.storable_token_items();
        let result = match items {
            Some(items) => self.store.save(ACCOUNT_TOKENS, items).await,
            None => self.store.delete(ACCOUNT_TOKENS).await,
        };
        if let Err(err) = result {
            self.logger.warn(&format!("Failed to persist tokens: {err}"));
        }
    }

    async fn persist_credentials(&self) {
        if !self.options.use_secret_store {
            return;
        }
        let items = self.lock().registration.storable_credential_items();
        if let Some(items) = items {
            if let Err(err) = self.store.save(ACCOUNT_CLIENT_CREDENTIALS, items).await {
                self.logger
                    .warn(&format!("Failed to persist credentials: {err}"));
            }
        }
    }
}

/// A redirect is accepted when it extends the remembered redirect URI
/// (case-insensitively), uses the out-of-band URN, or targets localhost.
fn redirect_matches(redirect: &Url, remembered: Option<&str>) -> bool {
    let incoming = redirect.as_str();
    if let Some(remembered) = remembered {
        if !remembered.is_empty()
            && incoming.to_lowercase().starts_with(&remembered.to_lowercase())
        {
            return true;
        }
    }
    incoming.starts_with(OOB_REDIRECT) || redirect.host_str() == Some("localhost")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(value: &str) -> Url {
        Url::parse(value).unwrap()
    }

    #[test]
    fn test_redirect_matching() {
        let remembered = Some("https://app.example/cb");
        assert!(redirect_matches(
            &url("https://app.example/cb?code=x&state=y"),
            remembered
        ));
        assert!(redirect_matches(
            &url("HTTPS://APP.EXAMPLE/CB?code=x"),
            remembered
        ));
        assert!(!redirect_matches(
            &url("https://evil.example/cb?code=x"),
            remembered
        ));

        assert!(redirect_matches(
            &url("urn:ietf:wg:oauth:2.0:oob?code=x"),
            None
        ));
        assert!(redirect_matches(
            &url("http://localhost:8080/cb?code=x"),
            None
        ));
        assert!(!redirect_matches(&url("https://app.example/cb"), None));
    }

    #[test]
    fn test_flow_options_defaults() {
        let options = FlowOptions::default();
        assert!(options.client_id_mandatory);
        assert!(options.use_secret_store);
        assert!(!options.embedded);
        assert!(options.assume_unexpired_when_no_expiry);
    }
}
