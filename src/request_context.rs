use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::cookie::Jar;
use tracing::warn;

use crate::config::Config;
use crate::errors::Error;
use crate::navigation::Navigator;
use crate::refresh::RefreshCoordinator;
use crate::token::{CredentialStorage, FileStorage, MemoryStorage, TokenStore};

/// Shared state for outbound requests: one token store, one refresh slot and
/// one cookie-carrying transport per running client.
pub struct RequestDispatchContext {
    http_client: Client,
    base_url: String,
    timeout: Duration,
    tokens: Arc<TokenStore>,
    coordinator: RefreshCoordinator,
    navigator: Arc<dyn Navigator>,
}

impl RequestDispatchContext {
    pub fn build(config: &Config, navigator: Arc<dyn Navigator>) -> Result<Self, Error> {
        let storage: Box<dyn CredentialStorage> = match &config.storage_dir {
            Some(dir) => Box::new(FileStorage::new(dir)),
            None => Box::new(MemoryStorage::new()),
        };
        let tokens = Arc::new(TokenStore::new(config.token_key(), storage));
        Self::with_token_store(config, tokens, navigator)
    }

    pub fn with_token_store(
        config: &Config,
        tokens: Arc<TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, Error> {
        let config = config.clone().validated()?;
        let jar = Arc::new(Jar::default());
        if let Some(cookie) = config.session_cookie.as_deref() {
            match reqwest::Url::parse(&config.base_url) {
                Ok(url) => jar.add_cookie_str(cookie, &url),
                Err(err) => warn!(error = %err, "session cookie not seeded"),
            }
        }
        let timeout = config.timeout();
        let http_client = Client::builder()
            .cookie_provider(jar)
            .timeout(timeout)
            .user_agent(config.user_agent())
            .build()?;
        Ok(Self {
            http_client,
            base_url: config.base_url,
            timeout,
            tokens,
            coordinator: RefreshCoordinator::new(),
            navigator,
        })
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn tokens(&self) -> Arc<TokenStore> {
        Arc::clone(&self.tokens)
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }
}
