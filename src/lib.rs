//! # keyed_objectpool
//!
//! Thread-safe keyed object pool for Rust. Objects that are expensive to
//! build are kept in per-key buckets and handed out again instead of being
//! reallocated.
//!
//! ## Features
//!
//! - One pool, any number of independent keys
//! - Allocators supplied per call, so each call site decides how to build
//! - Removal on check-out: an idle object is never handed to two callers
//! - FIFO (default) or LIFO reuse order
//! - Optional RAII guards that check objects back in on drop
//! - Fallible allocators with typed error propagation
//! - Metrics with Prometheus text export
//! - `tracing` events for check-out, check-in and bucket creation
//!
//! The pool neither validates nor evicts idle objects and never blocks
//! waiting for a check-in: a miss always allocates.
//!
//! ## Quick Start
//!
//! ```rust
//! use keyed_objectpool::KeyedObjectPool;
//!
//! let pool = KeyedObjectPool::new();
//!
//! let conn = pool.check_out("db", || String::from("connection"));
//! // ... use the object ...
//! pool.check_in("db", conn);
//!
//! assert_eq!(pool.idle_count("db"), 1);
//! ```

mod allocator;
mod config;
mod errors;
mod guard;
mod metrics;
mod pool;

pub use allocator::Allocator;
pub use config::{PoolConfiguration, ReuseOrder};
pub use errors::{BoxError, PoolError, PoolResult};
pub use guard::PooledObject;
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::KeyedObjectPool;
