//! Authorization Presenter
//!
//! The seam through which the host shows the user-facing authorization page.
//! The engine never drives UI itself; it hands the URL to the presenter and
//! waits for the host to deliver the redirect back.

use async_trait::async_trait;
use url::Url;

use crate::error::AuthResult;

/// Host-side presentation of the authorization page.
#[async_trait]
pub trait AuthorizationPresenter: Send + Sync {
    /// Show the authorization page, embedded or however the host prefers.
    async fn present_authorization_page(&self, url: &Url) -> AuthResult<()>;

    /// Open the page in the system browser instead of an embedded view.
    async fn open_in_system_browser(&self, url: &Url) -> AuthResult<()> {
        self.present_authorization_page(url).await
    }
}

/// Mock presenter for testing; records presented URLs and lets a test wait
/// until presentation happened.
#[derive(Default)]
pub struct MockPresenter {
    presented: std::sync::Mutex<Vec<Url>>,
    notify: tokio::sync::Notify,
}

impl MockPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented_urls(&self) -> Vec<Url> {
        self.presented.lock().unwrap().clone()
    }

    pub fn last_url(&self) -> Option<Url> {
        self.presented.lock().unwrap().last().cloned()
    }

    /// Wait until at least one URL has been presented and return the latest.
    pub async fn wait_for_url(&self) -> Url {
        loop {
            let notified = self.notify.notified();
            if let Some(url) = self.last_url() {
                return url;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl AuthorizationPresenter for MockPresenter {
    async fn present_authorization_page(&self, url: &Url) -> AuthResult<()> {
        self.presented.lock().unwrap().push(url.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_presenter_records_urls() {
        let presenter = MockPresenter::new();
        let url = Url::parse("https://auth.example/a?state=x").unwrap();
        presenter.present_authorization_page(&url).await.unwrap();

        assert_eq!(presenter.presented_urls(), vec![url.clone()]);
        assert_eq!(presenter.wait_for_url().await, url);
    }

    #[tokio::test]
    async fn test_wait_for_url_unblocks() {
        let presenter = std::sync::Arc::new(MockPresenter::new());
        let waiter = {
            let presenter = presenter.clone();
            tokio::spawn(async move { presenter.wait_for_url().await })
        };

        let url = Url::parse("https://auth.example/a").unwrap();
        presenter.present_authorization_page(&url).await.unwrap();
        assert_eq!(waiter.await.unwrap(), url);
    }
}
