use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, warn};

use super::CredentialStorage;

type Listener = Arc<dyn Fn(Option<&str>) + Send + Sync>;

struct Inner {
    current: Option<String>,
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

/// Single source of truth for the bearer credential.
///
/// Mutations replace the in-memory value and write it through to storage
/// while holding the store lock, so two `set` calls never interleave.
/// Listeners run synchronously after the lock is released.
pub struct TokenStore {
    key: String,
    storage: Box<dyn CredentialStorage>,
    inner: Arc<Mutex<Inner>>,
}

impl TokenStore {
    /// Loads the initial credential from `storage`; a failed read counts as no credential.
    pub fn new(key: impl Into<String>, storage: Box<dyn CredentialStorage>) -> Self {
        let key = key.into();
        let current = match storage.load(&key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key = %key, error = %err, "token.load_failed");
                None
            }
        };
        debug!(key = %key, present = current.is_some(), "token.loaded");
        Self {
            key,
            storage,
            inner: Arc::new(Mutex::new(Inner {
                current,
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    pub fn get(&self) -> Option<String> {
        lock(&self.inner).current.clone()
    }

    pub fn set(&self, credential: Option<String>) {
        let (value, listeners) = {
            let mut inner = lock(&self.inner);
            inner.current = credential;
            if let Err(err) = self.storage.save(&self.key, inner.current.as_deref()) {
                warn!(key = %self.key, error = %err, "token.persist_failed");
            }
            let listeners: Vec<Listener> =
                inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
            (inner.current.clone(), listeners)
        };
        debug!(present = value.is_some(), listeners = listeners.len(), "token.updated");
        for listener in listeners {
            listener(value.as_deref());
        }
    }

    pub fn clear(&self) {
        self.set(None);
    }

    /// Registers `listener` for every `set`/`clear`. Dropping the returned
    /// handle unsubscribes it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }
}

#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    inner: Weak<Mutex<Inner>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
