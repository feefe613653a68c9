//! Per-key single-flight execution.
//!
//! Concurrent callers asking for the same key share one spawned computation.
//! The computation runs on its own tokio task, so it finishes even if every
//! caller stops waiting, and its map entry is removed when it ends (including
//! on panic).

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinError;

/// Awaitable handle to an in-flight computation. Cloneable.
pub type Flight<V> = Shared<BoxFuture<'static, Result<V, Arc<JoinError>>>>;

type FlightMap<K, V> = Arc<Mutex<HashMap<K, Flight<V>>>>;

/// Map from key to the shared handle of its running computation.
pub struct SingleFlight<K, V> {
    flights: FlightMap<K, V>,
}

impl<K, V> Clone for SingleFlight<K, V> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
        }
    }
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

fn lock<K, V>(flights: &Mutex<HashMap<K, Flight<V>>>) -> MutexGuard<'_, HashMap<K, Flight<V>>> {
    flights.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the key when the computation ends, however it ends.
struct RemoveOnDrop<K: Eq + Hash, V> {
    flights: FlightMap<K, V>,
    key: Option<K>,
}

impl<K: Eq + Hash, V> Drop for RemoveOnDrop<K, V> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            lock(&self.flights).remove(&key);
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the computation for `key`, starting `work` if none is running.
    ///
    /// Returns the shared handle and whether an existing flight was joined.
    pub fn run<F>(&self, key: K, work: F) -> (Flight<V>, bool)
    where
        F: Future<Output = V> + Send + 'static,
    {
        let mut flights = lock(&self.flights);
        if let Some(existing) = flights.get(&key) {
            return (existing.clone(), true);
        }

        let guard = RemoveOnDrop {
            flights: Arc::clone(&self.flights),
            key: Some(key.clone()),
        };
        // The entry is inserted before the lock is released, so the guard
        // cannot run its removal ahead of the insert.
        let handle = tokio::spawn(async move {
            let _guard = guard;
            work.await
        });

        let flight: Flight<V> = async move { handle.await.map_err(Arc::new) }
            .boxed()
            .shared();
        flights.insert(key, flight.clone());
        (flight, false)
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        lock(&self.flights).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.flights).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.flights).is_empty()
    }
}
