//! The browsing-context seam: where the session sends the user when it ends,
//! and how the visible location is rewritten after bootstrap.

use std::sync::Mutex;

use reqwest::Url;
use tracing::info;

pub const APP_ROOT: &str = "/";

pub trait Navigator: Send + Sync {
    /// Full navigation away from the current view.
    fn redirect(&self, location: &str);

    /// Rewrites the visible location without reloading.
    fn replace_location(&self, url: &Url) {
        let _ = url;
    }
}

/// Default navigator for headless use; navigation only shows up in the logs.
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, location: &str) {
        info!(location, "navigation.redirect");
    }

    fn replace_location(&self, url: &Url) {
        info!(url = %url, "navigation.replace");
    }
}

/// Keeps every navigation in order, for tests and embedding hosts that poll.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
    replaced: Mutex<Vec<Url>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn replaced(&self) -> Vec<Url> {
        self.replaced.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, location: &str) {
        if let Ok(mut redirects) = self.redirects.lock() {
            redirects.push(location.to_string());
        }
    }

    fn replace_location(&self, url: &Url) {
        if let Ok(mut replaced) = self.replaced.lock() {
            replaced.push(url.clone());
        }
    }
}
