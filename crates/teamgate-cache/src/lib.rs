//! # teamgate Cache
//!
//! Memoization of upstream fetches with a bounded lifetime.
//!
//! ## Overview
//!
//! Every expensive operation in teamgate (listing repositories, reading
//! manifests, listing teams) is wrapped in a [`ResultCache`]. An entry holds
//! a shared handle to the computation itself, not its resolved value, so
//! callers that arrive while a fetch is still running attach to that fetch
//! instead of starting another one.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use teamgate_cache::ResultCache;
//!
//! async fn example() {
//!     let cache: ResultCache<u32, String> = ResultCache::new(Duration::from_secs(300));
//!
//!     let first = cache.get_or_compute("answer", || async { Ok(42) }).await;
//!     // Served from the cache, the closure is never called.
//!     let second = cache.get_or_compute("answer", || async { Ok(0) }).await;
//!
//!     assert_eq!(first, second);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Absolute expiry**: an entry expires a fixed TTL after it was written;
//!   reads do not extend it.
//! - **At most one computation per key**: concurrent callers share it.
//! - **Failures are not values**: a failed computation is delivered to every
//!   waiter and then dropped, so the next caller recomputes.
//! - **Lazy eviction**: expired entries are swept on access.

pub mod cache;

pub use cache::{cache_key, ResultCache, DEFAULT_TTL};
