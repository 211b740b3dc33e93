//! read client configuration from a file, the environment or explicit values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::Error;

pub const DEFAULT_TOKEN_KEY: &str = "subak_access_token";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_USER_AGENT: &str = "subak-session-rust/0.1.0";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Directory holding the persisted token slot. In-memory only when unset.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    #[serde(default)]
    pub token_key: Option<String>,
    /// Raw `Set-Cookie` style value seeded into the cookie jar, e.g. a refresh cookie
    /// obtained out of band.
    #[serde(default)]
    pub session_cookie: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validated()
    }

    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var("SUBAK_API_URL")
            .map_err(|_| Error::Config("Missing SUBAK_API_URL env var".to_string()))?;
        let timeout_secs = match std::env::var("SUBAK_TIMEOUT_SECS") {
            Ok(raw) => Some(raw.parse::<u64>().map_err(|e| {
                Error::Config(format!("Invalid SUBAK_TIMEOUT_SECS '{raw}': {e}"))
            })?),
            Err(_) => None,
        };
        Config {
            base_url,
            timeout_secs,
            storage_dir: std::env::var("SUBAK_STORAGE_DIR").ok().map(PathBuf::from),
            token_key: None,
            session_cookie: std::env::var("SUBAK_SESSION_COOKIE").ok(),
            user_agent: None,
        }
        .validated()
    }

    pub fn from_values(
        base_url: impl Into<String>,
        timeout_secs: Option<u64>,
        storage_dir: Option<PathBuf>,
    ) -> Self {
        Config {
            base_url: base_url.into(),
            timeout_secs,
            storage_dir,
            token_key: None,
            session_cookie: None,
            user_agent: None,
        }
    }

    /// Normalizes the base URL (scheme, trailing slash) and rejects values reqwest cannot parse.
    pub fn validated(mut self) -> Result<Self, Error> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        let base = if trimmed.starts_with("http") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };
        reqwest::Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid base URL '{base}': {e}")))?;
        if self.timeout_secs == Some(0) {
            return Err(Error::Config("timeout_secs must be > 0".into()));
        }
        self.base_url = base;
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn token_key(&self) -> &str {
        self.token_key.as_deref().unwrap_or(DEFAULT_TOKEN_KEY)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_scheme_and_strips_trailing_slash() {
        let cfg = Config::from_values("api.subak.dev/", None, None)
            .validated()
            .unwrap();
        assert_eq!(cfg.base_url, "https://api.subak.dev");
        assert_eq!(cfg.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(cfg.token_key(), "subak_access_token");
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = Config::from_values("http://localhost:8080", Some(0), None)
            .validated()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"base_url": "http://localhost:9000/", "timeout_secs": 3, "token_key": "custom"}"#,
        )
        .unwrap();
        let cfg = Config::from_file(&path).unwrap();
        assert_eq!(cfg.base_url, "http://localhost:9000");
        assert_eq!(cfg.timeout(), Duration::from_secs(3));
        assert_eq!(cfg.token_key(), "custom");
    }
}
