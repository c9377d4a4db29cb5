//! Secret Store
//!
//! Persistence seam for client credentials and tokens. Implementations are
//! expected to be backed by an OS keychain or similar; the engine only ever
//! reads and writes flat string maps under fixed account names.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{AuthError, AuthResult};

/// Store account holding the client id/secret obtained by configuration or
/// dynamic registration.
pub const ACCOUNT_CLIENT_CREDENTIALS: &str = "client_credentials";
/// Store account holding the current token set.
pub const ACCOUNT_TOKENS: &str = "current_tokens";

/// Secret persistence interface (for dependency injection).
///
/// A missing account is not an error; `load` returns an empty map.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn load(&self, account: &str) -> AuthResult<HashMap<String, String>>;
    async fn save(&self, account: &str, items: HashMap<String, String>) -> AuthResult<()>;
    async fn delete(&self, account: &str) -> AuthResult<()>;
}

/// Process-local store, useful for hosts that opt out of OS persistence.
#[derive(Default)]
pub struct InMemorySecretStore {
    accounts: std::sync::Mutex<HashMap<String, HashMap<String, String>>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn load(&self, account: &str) -> AuthResult<HashMap<String, String>> {
        Ok(self
            .accounts
            .lock()
            .map_err(|_| AuthError::Generic("Secret store lock poisoned".into()))?
            .get(account)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, account: &str, items: HashMap<String, String>) -> AuthResult<()> {
        self.accounts
            .lock()
            .map_err(|_| AuthError::Generic("Secret store lock poisoned".into()))?
            .insert(account.to_string(), items);
        Ok(())
    }

    async fn delete(&self, account: &str) -> AuthResult<()> {
        self.accounts
            .lock()
            .map_err(|_| AuthError::Generic("Secret store lock poisoned".into()))?
            .remove(account);
        Ok(())
    }
}

/// Mock store for testing; records every call.
#[derive(Default)]
pub struct MockSecretStore {
    inner: InMemorySecretStore,
    load_history: std::sync::Mutex<Vec<String>>,
    save_history: std::sync::Mutex<Vec<(String, HashMap<String, String>)>>,
    delete_history: std::sync::Mutex<Vec<String>>,
    fail_next: std::sync::Mutex<Option<AuthError>>,
}

impl MockSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload an account as if a previous run had saved it.
    pub fn seed(&self, account: &str, items: HashMap<String, String>) {
        self.inner
            .accounts
            .lock()
            .unwrap()
            .insert(account.to_string(), items);
    }

    /// Make the next store operation fail with the given error.
    pub fn fail_next(&self, error: AuthError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    pub fn loads(&self) -> Vec<String> {
        self.load_history.lock().unwrap().clone()
    }

    pub fn saves(&self) -> Vec<(String, HashMap<String, String>)> {
        self.save_history.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.delete_history.lock().unwrap().clone()
    }

    /// The most recently saved item map for an account.
    pub fn last_saved(&self, account: &str) -> Option<HashMap<String, String>> {
        self.save_history
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(a, _)| a == account)
            .map(|(_, items)| items.clone())
    }

    fn take_failure(&self) -> Option<AuthError> {
        self.fail_next.lock().unwrap().take()
    }
}

#[async_trait]
impl SecretStore for MockSecretStore {
    async fn load(&self, account: &str) -> AuthResult<HashMap<String, String>> {
        self.load_history.lock().unwrap().push(account.to_string());
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        self.inner.load(account).await
    }

    async fn save(&self, account: &str, items: HashMap<String, String>) -> AuthResult<()> {
        self.save_history
            .lock()
            .unwrap()
            .push((account.to_string(), items.clone()));
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        self.inner.save(account, items).await
    }

    async fn delete(&self, account: &str) -> AuthResult<()> {
        self.delete_history
            .lock()
            .unwrap()
            .push(account.to_string());
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        self.inner.delete(account).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemorySecretStore::new();
        assert!(store.load(ACCOUNT_TOKENS).await.unwrap().is_empty());

        let items: HashMap<_, _> = [("access_token".to_string(), "X".to_string())]
            .into_iter()
            .collect();
        store.save(ACCOUNT_TOKENS, items.clone()).await.unwrap();
        assert_eq!(store.load(ACCOUNT_TOKENS).await.unwrap(), items);

        store.delete(ACCOUNT_TOKENS).await.unwrap();
        assert!(store.load(ACCOUNT_TOKENS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_records_history() {
        let store = MockSecretStore::new();
        store
            .save(
                ACCOUNT_CLIENT_CREDENTIALS,
                [("client_id".to_string(), "abc".to_string())]
                    .into_iter()
                    .collect(),
            )
            .await
            .unwrap();
        store.load(ACCOUNT_CLIENT_CREDENTIALS).await.unwrap();
        store.delete(ACCOUNT_CLIENT_CREDENTIALS).await.unwrap();

        assert_eq!(store.saves().len(), 1);
        assert_eq!(store.loads(), vec![ACCOUNT_CLIENT_CREDENTIALS.to_string()]);
        assert_eq!(store.deletes(), vec![ACCOUNT_CLIENT_CREDENTIALS.to_string()]);
        assert_eq!(
            store
                .last_saved(ACCOUNT_CLIENT_CREDENTIALS)
                .unwrap()
                .get("client_id")
                .map(String::as_str),
            Some("abc")
        );
    }

    #[tokio::test]
    async fn test_mock_injected_failure() {
        let store = MockSecretStore::new();
        store.fail_next(AuthError::Generic("keychain locked".into()));
        assert!(store.load(ACCOUNT_TOKENS).await.is_err());
        // The failure is single-shot.
        assert!(store.load(ACCOUNT_TOKENS).await.is_ok());
    }
}
