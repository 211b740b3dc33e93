use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, watch};

use crate::telemetry::refresh::RefreshTelemetry;

/// `None` while the reissue runs; `Some(outcome)` once it settled.
type Settled = Option<Option<String>>;

struct Slot {
    generation: u64,
    telemetry: RefreshTelemetry,
    settled: watch::Receiver<Settled>,
}

/// Collapses concurrent reissue attempts into a single in-flight operation.
///
/// The first caller installs a slot and spawns the reissue as its own task;
/// every caller that arrives while the slot is installed awaits the same
/// result. The task removes the slot before publishing, so the next
/// independent 401 always starts a fresh attempt. Dropping any caller,
/// including the one that started it, never aborts the reissue.
#[derive(Default)]
pub struct RefreshCoordinator {
    in_flight: Arc<Mutex<Option<Slot>>>,
    started: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `reissue` unless one is already in flight, then returns the
    /// shared outcome: the new credential, or `None` if the reissue failed.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn refresh<F, Fut>(&self, reissue: F) -> Option<String>
    where
        F: FnOnce(RefreshTelemetry) -> Fut,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        let mut settled = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.as_ref() {
                Some(slot) => {
                    slot.telemetry.emit_joined();
                    slot.settled.clone()
                }
                None => {
                    let generation = self.started.fetch_add(1, Ordering::SeqCst) + 1;
                    let telemetry = RefreshTelemetry::new("auth.reissue");
                    let (tx, rx) = watch::channel(None);
                    *in_flight = Some(Slot {
                        generation,
                        telemetry: telemetry.clone(),
                        settled: rx.clone(),
                    });

                    let operation = reissue(telemetry);
                    let slot = Arc::clone(&self.in_flight);
                    tokio::spawn(async move {
                        let outcome = operation.await;
                        {
                            let mut in_flight = slot.lock().await;
                            if in_flight
                                .as_ref()
                                .is_some_and(|s| s.generation == generation)
                            {
                                *in_flight = None;
                            }
                        }
                        let _ = tx.send(Some(outcome));
                    });
                    rx
                }
            }
        };

        // a closed channel means the reissue task panicked; treat as failure
        match settled.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().flatten(),
            Err(_) => None,
        }
    }

    /// Number of reissues actually started over the coordinator's lifetime.
    pub fn refreshes_started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    pub async fn is_in_flight(&self) -> bool {
        self.in_flight.lock().await.is_some()
    }
}
