//! Request Correlation
//!
//! Anti-CSRF `state` nonce and the redirect URI remembered for the current
//! authorization attempt. The state is generated lazily, stays stable until
//! explicitly reset, and compares case-insensitively.

use rand::Rng;

/// Correlation context scoped to one authorization flow.
#[derive(Debug, Default)]
pub struct RequestCorrelation {
    state: Option<String>,
    pending_redirect_uri: Option<String>,
}

impl RequestCorrelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state nonce, generating one on first use.
    pub fn state(&mut self) -> &str {
        self.state.get_or_insert_with(generate_state)
    }

    /// Case-insensitive comparison against an incoming `state` parameter.
    /// An empty incoming value never matches.
    pub fn matches_state(&mut self, incoming: &str) -> bool {
        !incoming.is_empty() && incoming.eq_ignore_ascii_case(self.state())
    }

    /// Forget the current nonce; the next attempt gets a fresh one.
    pub fn reset_state(&mut self) {
        self.state = None;
    }

    /// Remember the redirect URI the authorization URL was built with.
    pub fn set_redirect_uri(&mut self, uri: impl Into<String>) {
        self.pending_redirect_uri = Some(uri.into());
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        self.pending_redirect_uri.as_deref()
    }

    pub fn clear_redirect_uri(&mut self) {
        self.pending_redirect_uri = None;
    }
}

fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_lazy_and_stable() {
        let mut correlation = RequestCorrelation::new();
        let first = correlation.state().to_string();
        assert!(!first.is_empty());
        assert_eq!(correlation.state(), first);
    }

    #[test]
    fn test_state_matching_is_case_insensitive() {
        let mut correlation = RequestCorrelation::new();
        let state = correlation.state().to_string();
        assert!(correlation.matches_state(&state.to_uppercase()));
        assert!(correlation.matches_state(&state.to_lowercase()));
        assert!(!correlation.matches_state("something-else"));
        assert!(!correlation.matches_state(""));
    }

    #[test]
    fn test_reset_generates_new_state() {
        let mut correlation = RequestCorrelation::new();
        let first = correlation.state().to_string();
        correlation.reset_state();
        assert_ne!(correlation.state(), first);
    }

    #[test]
    fn test_redirect_uri_bookkeeping() {
        let mut correlation = RequestCorrelation::new();
        assert!(correlation.redirect_uri().is_none());
        correlation.set_redirect_uri("https://app.example/cb");
        assert_eq!(correlation.redirect_uri(), Some("https://app.example/cb"));
        correlation.clear_redirect_uri();
        assert!(correlation.redirect_uri().is_none());
    }
}
