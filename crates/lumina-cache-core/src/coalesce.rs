//! Single-flight coalescing of concurrent identical requests.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use lumina_types::{CacheError, RepoKey};

/// Identity of one in-flight operation.
///
/// A "latest" request and an "exact version" request for the same repository
/// are independent flights: their cache-consultation paths differ, so they
/// must never share an outcome even when they resolve to the same sha.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlightKey {
    pub key: RepoKey,
    pub version: Option<String>,
}

impl FlightKey {
    /// Flight for "give me the latest version".
    pub fn latest(key: RepoKey) -> Self {
        Self { key, version: None }
    }

    /// Flight for "give me exactly this version".
    pub fn exact(key: RepoKey, version: impl Into<String>) -> Self {
        Self {
            key,
            version: Some(version.into()),
        }
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.key, version),
            None => write!(f, "{}", self.key),
        }
    }
}

type SharedFlight<T> = Shared<BoxFuture<'static, Result<T, CacheError>>>;

/// Ensures concurrent logical requests for the same flight share one executed
/// operation and one outcome.
///
/// The first caller for a key registers a flight and its operation is spawned
/// as a detached task - it runs to completion even if every interested caller
/// goes away. All callers, the initiator included, await a shared handle to
/// the outcome. The registration is removed *before* the outcome is
/// delivered, so a request arriving after settlement always starts a fresh
/// attempt instead of reusing a dead result.
pub struct RequestCoalescer<T> {
    inflight: Arc<Mutex<HashMap<FlightKey, SharedFlight<T>>>>,
}

impl<T> Default for RequestCoalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestCoalescer<T> {
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Whether a flight is currently registered for `flight`.
    pub fn has_inflight(&self, flight: &FlightKey) -> bool {
        self.inflight.lock().contains_key(flight)
    }

    /// Number of flights currently registered.
    pub fn inflight_count(&self) -> usize {
        self.inflight.lock().len()
    }
}

impl<T: Clone + Send + Sync + 'static> RequestCoalescer<T> {
    /// Run `op` under single-flight semantics for `flight`.
    ///
    /// If a flight is already registered, joins it and awaits its outcome;
    /// `op` is dropped unexecuted. Otherwise registers the flight and starts
    /// `op`. Success and failure are both cloned to every joined caller.
    pub async fn run<F>(&self, flight: FlightKey, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>> + Send + 'static,
    {
        let shared = {
            // Check-and-insert is one atomic step: two callers can never both
            // conclude "nothing pending" and start redundant upstream work.
            let mut inflight = self.inflight.lock();
            if let Some(existing) = inflight.get(&flight) {
                debug!(%flight, "joining in-flight request");
                existing.clone()
            } else {
                debug!(%flight, "starting new request");
                let (tx, rx) = oneshot::channel::<Result<T, CacheError>>();
                let shared: SharedFlight<T> = rx
                    .map(|recv| {
                        recv.unwrap_or_else(|_| {
                            Err(CacheError::upstream(
                                "in-flight request dropped before completing",
                            ))
                        })
                    })
                    .boxed()
                    .shared();
                inflight.insert(flight.clone(), shared.clone());

                let registry = Arc::clone(&self.inflight);
                tokio::spawn(async move {
                    let outcome = op.await;
                    // Deregister before waking waiters: anything arriving
                    // after settlement must start a fresh flight.
                    registry.lock().remove(&flight);
                    let _ = tx.send(outcome);
                });

                shared
            }
        };

        shared.await
    }
}
