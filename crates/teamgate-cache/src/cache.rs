//! The result cache.
//!
//! Entries map a string key to a single-assignment shared future. The first
//! caller for a key creates the future and every later caller within the
//! TTL clones the same handle, whether the computation has finished or not.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Default lifetime of a cache entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

type Pending<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct Entry<V, E> {
    /// Distinguishes this entry from a later one written under the same key.
    generation: u64,
    expires_at: Instant,
    pending: Pending<V, E>,
}

/// A time-bounded memoization table.
///
/// `V` and `E` are cloned out to every caller, so both are usually cheap
/// handles (`Arc<…>`) or small values.
pub struct ResultCache<V, E> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<V, E>>>,
    generation: AtomicU64,
}

impl<V, E> ResultCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// The lifetime given to every entry.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the value for `key`, computing it at most once per TTL window.
    ///
    /// If `key` has a live entry, that entry (finished or still running) is
    /// awaited and `compute` is dropped without being called. Otherwise
    /// `compute` is called exactly once and its future is stored before it
    /// is first polled, so concurrent callers for the same key share it.
    ///
    /// A computation that fails is delivered to everyone awaiting it and
    /// then removed, so the next caller starts a fresh one.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (generation, pending) = {
            let mut entries = self.lock();
            let now = Instant::now();
            Self::evict_expired(&mut entries, now);

            match entries.get(key) {
                Some(entry) => {
                    debug!(key = %key, "cache hit");
                    (entry.generation, entry.pending.clone())
                }
                None => {
                    debug!(key = %key, ttl = ?self.ttl, "cache miss");
                    let generation = self.next_generation();
                    let pending = compute().boxed().shared();
                    entries.insert(
                        key.to_string(),
                        Entry {
                            generation,
                            expires_at: now + self.ttl,
                            pending: pending.clone(),
                        },
                    );
                    (generation, pending)
                }
            }
        };

        let result = pending.await;
        if result.is_err() {
            self.discard(key, generation);
        }
        result
    }

    /// Overwrite the entry for `key` with a ready value and a fresh TTL.
    pub fn put(&self, key: &str, value: V) {
        let pending = future::ready(Ok(value)).boxed().shared();
        let generation = self.next_generation();
        let mut entries = self.lock();
        entries.insert(
            key.to_string(),
            Entry {
                generation,
                expires_at: Instant::now() + self.ttl,
                pending,
            },
        );
        trace!(key = %key, "cache entry overwritten");
    }

    /// Whether `key` has a live entry (finished or in flight).
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock()
            .get(key)
            .is_some_and(|entry| entry.expires_at > now)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn discard(&self, key: &str, generation: u64) {
        let mut entries = self.lock();
        if entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            entries.remove(key);
            debug!(key = %key, "failed computation discarded");
        }
    }

    fn evict_expired(entries: &mut HashMap<String, Entry<V, E>>, now: Instant) {
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let evicted = before - entries.len();
        if evicted > 0 {
            trace!(evicted, "expired cache entries evicted");
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<V, E>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V, E> Default for ResultCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Build a cache key from an operation name and its arguments.
///
/// `cache_key("packagePermissionsForUser", &["octocat"])` yields
/// `"packagePermissionsForUser:octocat"`.
pub fn cache_key(operation: &str, args: &[&str]) -> String {
    let mut key = String::from(operation);
    for arg in args {
        key.push(':');
        key.push_str(arg);
    }
    key
}
