use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use jiff::Timestamp;
use tracing::debug;

use crate::client::ApiClient;
use crate::errors::Error;
use crate::token::Subscription;
use crate::types::Profile;

#[derive(Debug, Default)]
struct SessionState {
    profile: Option<Profile>,
    loading: bool,
    loaded_at: Option<Timestamp>,
    /// Bumped every time the credential is cleared; a fetch that started
    /// under an older generation must not repopulate the profile.
    generation: u64,
}

/// Resets `loading` however the fetch ends, including a dropped future.
struct LoadingGuard<'a>(&'a RwLock<SessionState>);

impl<'a> LoadingGuard<'a> {
    fn start(state: &'a RwLock<SessionState>) -> Self {
        write(state).loading = true;
        Self(state)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        write(self.0).loading = false;
    }
}

/// Authentication state as the UI sees it.
///
/// The cached profile is dropped whenever the token store is cleared, whether
/// by [`Session::logout`] or by a failed reissue elsewhere in the client.
pub struct Session {
    client: ApiClient,
    state: Arc<RwLock<SessionState>>,
    _subscription: Subscription,
}

impl Session {
    pub fn new(client: ApiClient) -> Self {
        let state = Arc::new(RwLock::new(SessionState::default()));
        let watched = Arc::clone(&state);
        let subscription = client.tokens().subscribe(move |credential| {
            if credential.is_none() {
                let mut state = write(&watched);
                state.profile = None;
                state.loaded_at = None;
                state.generation += 1;
            }
        });
        Self {
            client,
            state,
            _subscription: subscription,
        }
    }

    /// Loads the profile if a credential is present. A 401 yields `None`;
    /// any other failure is returned and the previous profile is kept. A
    /// profile fetched while the credential was cleared is discarded.
    pub async fn refresh(&self) -> Result<Option<Profile>, Error> {
        if self.client.tokens().get().is_none() {
            debug!("session.refresh skipped; no credential");
            let mut state = write(&self.state);
            state.profile = None;
            state.loaded_at = None;
            return Ok(None);
        }

        let generation = read(&self.state).generation;
        let fetched = {
            let _loading = LoadingGuard::start(&self.state);
            self.client.fetch_me().await
        };
        let profile = fetched?;
        let signed_in = self.client.tokens().get().is_some();
        let mut state = write(&self.state);
        if state.generation != generation || !signed_in {
            debug!("session.refresh discarded; credential cleared during fetch");
            return Ok(None);
        }
        state.profile = profile.clone();
        state.loaded_at = Some(Timestamp::now());
        debug!(authenticated = profile.is_some(), "session.refreshed");
        Ok(profile)
    }

    pub fn profile(&self) -> Option<Profile> {
        read(&self.state).profile.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        read(&self.state).profile.is_some()
    }

    pub fn is_loading(&self) -> bool {
        read(&self.state).loading
    }

    pub fn loaded_at(&self) -> Option<Timestamp> {
        read(&self.state).loaded_at
    }

    pub async fn logout(&self) {
        self.client.logout().await;
        let mut state = write(&self.state);
        state.profile = None;
        state.loaded_at = None;
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

fn read(state: &RwLock<SessionState>) -> RwLockReadGuard<'_, SessionState> {
    state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write(state: &RwLock<SessionState>) -> RwLockWriteGuard<'_, SessionState> {
    state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
