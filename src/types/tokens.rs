//! Token State
//!
//! Access/refresh/id token lifecycle tracking. An access token whose expiry
//! lies in the past is treated as absent for authorization decisions but is
//! not eagerly deleted.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::types::{keys, ExchangeParams};

/// Tokens held on behalf of one client registration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenState {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token_expiry: Option<DateTime<Utc>>,
    /// Treat an access token without an expiry as usable.
    pub assume_unexpired_when_no_expiry: bool,
}

impl TokenState {
    pub fn new(assume_unexpired_when_no_expiry: bool) -> Self {
        Self {
            assume_unexpired_when_no_expiry,
            ..Self::default()
        }
    }

    /// Fast-path predicate: an access token exists and either its expiry is
    /// in the future, or it carries no expiry and policy allows assuming it
    /// is still good.
    pub fn has_unexpired_access_token(&self) -> bool {
        if self.access_token.as_deref().map_or(true, str::is_empty) {
            return false;
        }
        match self.access_token_expiry {
            Some(expiry) => expiry > Utc::now(),
            None => self.assume_unexpired_when_no_expiry,
        }
    }

    /// Apply a successful token or refresh response.
    ///
    /// The expiry is reset before applying so a response without `expires_in`
    /// never keeps a stale deadline alive. `expires_in` is accepted both as
    /// seconds-from-now and as an absolute RFC 3339 timestamp; an unparseable
    /// value leaves the expiry unset and the assume-unexpired policy applies.
    pub fn update_from_response(&mut self, params: &ExchangeParams) {
        if let Some(token) = params.non_empty(keys::ACCESS_TOKEN) {
            self.access_token = Some(token.to_string());
        }
        if let Some(token) = params.non_empty(keys::ID_TOKEN) {
            self.id_token = Some(token.to_string());
        }
        self.access_token_expiry = None;
        if let Some(expires_in) = params.non_empty(keys::EXPIRES_IN) {
            self.access_token_expiry = parse_expiry(expires_in);
        }
        if let Some(token) = params.non_empty(keys::REFRESH_TOKEN) {
            self.refresh_token = Some(token.to_string());
        }
    }

    /// Token items to persist in the secure store, or `None` when there is
    /// nothing worth storing. Expiries already in the past are not persisted.
    pub fn storable_token_items(&self) -> Option<HashMap<String, String>> {
        let access_token = self.access_token.as_deref().filter(|t| !t.is_empty())?;

        let mut items = HashMap::new();
        items.insert(keys::ACCESS_TOKEN.to_string(), access_token.to_string());
        if let Some(expiry) = self.access_token_expiry.filter(|e| *e > Utc::now()) {
            items.insert(keys::ACCESS_TOKEN_EXPIRY.to_string(), expiry.to_rfc3339());
        }
        if let Some(refresh) = self.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            items.insert(keys::REFRESH_TOKEN.to_string(), refresh.to_string());
        }
        if let Some(id) = self.id_token.as_deref().filter(|t| !t.is_empty()) {
            items.insert(keys::ID_TOKEN.to_string(), id.to_string());
        }
        Some(items)
    }

    /// Restore tokens from secure-store items, returning log messages
    /// describing what was found and what was discarded.
    pub fn update_from_storable_items(&mut self, items: &HashMap<String, String>) -> Vec<String> {
        let mut messages = Vec::new();

        if let Some(token) = items.get(keys::ACCESS_TOKEN).filter(|t| !t.is_empty()) {
            match items
                .get(keys::ACCESS_TOKEN_EXPIRY)
                .and_then(|e| parse_expiry(e))
            {
                Some(expiry) if expiry > Utc::now() => {
                    messages.push(format!("Found access token, valid until {expiry}"));
                    self.access_token = Some(token.clone());
                    self.access_token_expiry = Some(expiry);
                }
                Some(_) => {
                    messages.push("Found access token but it seems to be expired".to_string());
                }
                None if self.assume_unexpired_when_no_expiry => {
                    messages.push(
                        "Found access token without expiration date, assuming unexpired"
                            .to_string(),
                    );
                    self.access_token = Some(token.clone());
                }
                None => {
                    messages.push(
                        "Found access token without expiration date, discarding".to_string(),
                    );
                }
            }
        }

        if let Some(token) = items.get(keys::REFRESH_TOKEN).filter(|t| !t.is_empty()) {
            messages.push("Found refresh token".to_string());
            self.refresh_token = Some(token.clone());
        }
        if let Some(token) = items.get(keys::ID_TOKEN).filter(|t| !t.is_empty()) {
            messages.push("Found id token".to_string());
            self.id_token = Some(token.clone());
        }

        messages
    }

    /// Drop all tokens.
    pub fn forget(&mut self) {
        self.access_token = None;
        self.access_token_expiry = None;
        self.refresh_token = None;
        self.id_token = None;
    }
}

/// `expires_in` as integer seconds from now, or an absolute RFC 3339 stamp.
fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(seconds) = value.trim().parse::<i64>() {
        return Some(Utc::now() + Duration::seconds(seconds));
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(json: &str) -> ExchangeParams {
        ExchangeParams::from_json_body(json).unwrap()
    }

    #[test]
    fn test_fast_path_predicate() {
        let mut tokens = TokenState::new(true);
        assert!(!tokens.has_unexpired_access_token());

        tokens.access_token = Some("X".into());
        assert!(tokens.has_unexpired_access_token());

        tokens.assume_unexpired_when_no_expiry = false;
        assert!(!tokens.has_unexpired_access_token());

        tokens.access_token_expiry = Some(Utc::now() + Duration::hours(1));
        assert!(tokens.has_unexpired_access_token());

        tokens.access_token_expiry = Some(Utc::now() - Duration::seconds(1));
        assert!(!tokens.has_unexpired_access_token());
    }

    #[test]
    fn test_update_from_response_seconds() {
        let mut tokens = TokenState::new(true);
        tokens.update_from_response(&params(
            r#"{"access_token":"X","token_type":"bearer","expires_in":"3600","refresh_token":"R"}"#,
        ));

        assert_eq!(tokens.access_token.as_deref(), Some("X"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("R"));
        let expiry = tokens.access_token_expiry.unwrap();
        let delta = expiry - Utc::now();
        assert!(delta > Duration::seconds(3590) && delta <= Duration::seconds(3600));
    }

    #[test]
    fn test_update_from_response_absolute_timestamp() {
        let stamp = (Utc::now() + Duration::hours(2)).to_rfc3339();
        let mut tokens = TokenState::new(true);
        tokens.update_from_response(&params(&format!(
            r#"{{"access_token":"X","expires_in":"{stamp}"}}"#
        )));
        assert!(tokens.has_unexpired_access_token());
        assert!(tokens.access_token_expiry.is_some());
    }

    #[test]
    fn test_expiry_reset_when_absent_from_response() {
        let mut tokens = TokenState::new(true);
        tokens.access_token_expiry = Some(Utc::now() + Duration::hours(1));
        tokens.update_from_response(&params(r#"{"access_token":"Y"}"#));
        assert!(tokens.access_token_expiry.is_none());
    }

    #[test]
    fn test_storable_round_trip() {
        let mut tokens = TokenState::new(true);
        tokens.access_token = Some("X".into());
        tokens.access_token_expiry = Some(Utc::now() + Duration::hours(1));
        tokens.refresh_token = Some("R".into());

        let items = tokens.storable_token_items().unwrap();

        let mut restored = TokenState::new(true);
        restored.update_from_storable_items(&items);
        assert_eq!(restored.access_token.as_deref(), Some("X"));
        assert_eq!(restored.refresh_token.as_deref(), Some("R"));
        assert!(restored.has_unexpired_access_token());
    }

    #[test]
    fn test_restore_discards_expired_access_token() {
        let mut items = HashMap::new();
        items.insert(keys::ACCESS_TOKEN.to_string(), "X".to_string());
        items.insert(
            keys::ACCESS_TOKEN_EXPIRY.to_string(),
            (Utc::now() - Duration::hours(1)).to_rfc3339(),
        );

        let mut tokens = TokenState::new(true);
        tokens.update_from_storable_items(&items);
        assert!(tokens.access_token.is_none());
    }

    #[test]
    fn test_restore_honors_assume_unexpired_policy() {
        let mut items = HashMap::new();
        items.insert(keys::ACCESS_TOKEN.to_string(), "X".to_string());

        let mut keeping = TokenState::new(true);
        keeping.update_from_storable_items(&items);
        assert_eq!(keeping.access_token.as_deref(), Some("X"));

        let mut discarding = TokenState::new(false);
        discarding.update_from_storable_items(&items);
        assert!(discarding.access_token.is_none());
    }

    #[test]
    fn test_past_expiry_not_persisted() {
        let mut tokens = TokenState::new(true);
        tokens.access_token = Some("X".into());
        tokens.access_token_expiry = Some(Utc::now() - Duration::seconds(5));

        let items = tokens.storable_token_items().unwrap();
        assert!(!items.contains_key(keys::ACCESS_TOKEN_EXPIRY));
    }

    #[test]
    fn test_forget() {
        let mut tokens = TokenState::new(true);
        tokens.access_token = Some("X".into());
        tokens.refresh_token = Some("R".into());
        tokens.forget();
        assert_eq!(tokens, TokenState::new(true));
    }
}
