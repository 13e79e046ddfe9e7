//! Core keyed object pool implementation

use crate::allocator::Allocator;
use crate::config::{PoolConfiguration, ReuseOrder};
use crate::errors::{BoxError, PoolError, PoolResult};
use crate::guard::PooledObject;
use crate::metrics::{MetricsExporter, MetricsTracker, PoolMetrics};

use parking_lot::Mutex;
use std::borrow::Borrow;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::Ordering;

/// Thread-safe pool of reusable objects partitioned by key.
///
/// Each key owns a bucket of idle objects. [`check_out`](Self::check_out)
/// removes an idle object from the key's bucket, or builds a new one with the
/// supplied allocator when the bucket is empty. [`check_in`](Self::check_in)
/// hands an object back for later reuse. A single mutex guards every bucket;
/// it is never held while an allocator runs.
///
/// The pool does not track objects that are checked out. Checking in the
/// same object twice, or an object this pool never produced, is accepted.
/// Buckets are never trimmed, so callers that check in more than they check
/// out grow the pool without bound.
///
/// # Examples
///
/// ```
/// use keyed_objectpool::KeyedObjectPool;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum Kind {
///     A,
///     B,
/// }
///
/// let pool = KeyedObjectPool::new();
///
/// let b1 = pool.check_out(Kind::B, || String::from("B"));
/// let addr = b1.as_ptr();
/// pool.check_in(Kind::B, b1);
///
/// let b2 = pool.check_out(Kind::B, || String::from("B"));
/// assert_eq!(b2.as_ptr(), addr);
///
/// let a1 = pool.check_out(Kind::A, || String::from("A"));
/// assert_eq!(a1, "A");
/// ```
pub struct KeyedObjectPool<K, T> {
    buckets: Mutex<HashMap<K, VecDeque<T>>>,
    config: PoolConfiguration,
    metrics: MetricsTracker,
}

impl<K: Eq + Hash, T> KeyedObjectPool<K, T> {
    /// Create an empty pool with the default configuration
    pub fn new() -> Self {
        Self::with_configuration(PoolConfiguration::default())
    }

    /// Create an empty pool with the given configuration
    pub fn with_configuration(config: PoolConfiguration) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
            metrics: MetricsTracker::new(),
        }
    }

    /// Get an object for `key`, reusing an idle one when available.
    ///
    /// The returned object is removed from the bucket. On a miss the
    /// allocator runs outside the lock and its result is handed straight to
    /// the caller; nothing is added to the bucket. A panicking allocator
    /// leaves the pool untouched.
    pub fn check_out<A>(&self, key: K, alloc: A) -> T
    where
        A: Allocator<T>,
    {
        match self.take_idle(key) {
            Ok(obj) => obj,
            Err(key) => {
                let obj = alloc.allocate();
                self.ensure_bucket(key);
                self.record(|m| m.allocated.fetch_add(1, Ordering::Relaxed));
                obj
            }
        }
    }

    /// Get an object for `key` using an allocator that may fail.
    ///
    /// Allocator errors are returned as [`PoolError::AllocationFailed`]; the
    /// pool is left as it was and nothing is retried.
    ///
    /// # Examples
    ///
    /// ```
    /// use keyed_objectpool::{KeyedObjectPool, PoolError};
    ///
    /// let pool: KeyedObjectPool<&str, u32> = KeyedObjectPool::new();
    ///
    /// let err = pool
    ///     .try_check_out("db", || "42x".parse::<u32>())
    ///     .unwrap_err();
    /// assert!(matches!(err, PoolError::AllocationFailed { .. }));
    ///
    /// let ok = pool.try_check_out("db", || "42".parse::<u32>()).unwrap();
    /// assert_eq!(ok, 42);
    /// ```
    pub fn try_check_out<F, E>(&self, key: K, alloc: F) -> PoolResult<T>
    where
        K: Debug,
        F: FnOnce() -> Result<T, E>,
        E: Into<BoxError>,
    {
        let key = match self.take_idle(key) {
            Ok(obj) => return Ok(obj),
            Err(key) => key,
        };

        match alloc() {
            Ok(obj) => {
                self.ensure_bucket(key);
                self.record(|m| m.allocated.fetch_add(1, Ordering::Relaxed));
                Ok(obj)
            }
            Err(e) => {
                self.record(|m| m.allocation_failures.fetch_add(1, Ordering::Relaxed));
                let err = PoolError::allocation_failed(format!("{:?}", key), e);
                tracing::warn!(pool = %self.config.name, error = %err, "allocation failed");
                Err(err)
            }
        }
    }

    /// Like [`check_out`](Self::check_out), but the object goes back to the
    /// pool under the same key when the returned guard is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use keyed_objectpool::KeyedObjectPool;
    ///
    /// let pool = KeyedObjectPool::new();
    /// {
    ///     let mut buf = pool.check_out_guarded("scratch", Vec::<u8>::new);
    ///     buf.extend_from_slice(b"hello");
    /// }
    /// assert_eq!(pool.idle_count("scratch"), 1);
    /// ```
    pub fn check_out_guarded<A>(&self, key: K, alloc: A) -> PooledObject<'_, K, T>
    where
        K: Clone,
        A: Allocator<T>,
    {
        let obj = self.check_out(key.clone(), alloc);
        PooledObject::new(self, key, obj)
    }

    /// Guarded variant of [`try_check_out`](Self::try_check_out)
    pub fn try_check_out_guarded<F, E>(
        &self,
        key: K,
        alloc: F,
    ) -> PoolResult<PooledObject<'_, K, T>>
    where
        K: Clone + Debug,
        F: FnOnce() -> Result<T, E>,
        E: Into<BoxError>,
    {
        let obj = self.try_check_out(key.clone(), alloc)?;
        Ok(PooledObject::new(self, key, obj))
    }

    /// Return an object to the bucket for `key`, creating the bucket if needed
    pub fn check_in(&self, key: K, obj: T) {
        let idle = {
            let mut buckets = self.buckets.lock();
            let bucket = self.bucket_mut(&mut buckets, key);
            bucket.push_back(obj);
            bucket.len()
        };

        self.record(|m| m.total_checked_in.fetch_add(1, Ordering::Relaxed));
        tracing::trace!(pool = %self.config.name, idle, "checked in");
    }

    /// Pre-populate the bucket for `key` with `count` new objects.
    ///
    /// Objects are built before the lock is taken.
    ///
    /// # Examples
    ///
    /// ```
    /// use keyed_objectpool::KeyedObjectPool;
    ///
    /// let pool = KeyedObjectPool::new();
    /// pool.warm_up(1u8, 3, || vec![0u8; 1024]);
    ///
    /// assert_eq!(pool.idle_count(&1u8), 3);
    /// ```
    pub fn warm_up<A>(&self, key: K, count: usize, alloc: A)
    where
        A: Allocator<T>,
    {
        let fresh: Vec<T> = (0..count).map(|_| alloc.allocate()).collect();

        let idle = {
            let mut buckets = self.buckets.lock();
            let bucket = self.bucket_mut(&mut buckets, key);
            bucket.extend(fresh);
            bucket.len()
        };

        tracing::debug!(pool = %self.config.name, count, idle, "warmed up bucket");
    }

    /// Number of idle objects waiting under `key`
    pub fn idle_count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.buckets.lock().get(key).map_or(0, VecDeque::len)
    }

    /// Whether a bucket exists for `key`
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.buckets.lock().contains_key(key)
    }

    /// Number of idle objects across all keys
    pub fn total_idle(&self) -> usize {
        self.buckets.lock().values().map(VecDeque::len).sum()
    }

    /// Number of keys that have a bucket, empty or not
    pub fn key_count(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Get the pool configuration
    pub fn configuration(&self) -> &PoolConfiguration {
        &self.config
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        let (idle, keys) = {
            let buckets = self.buckets.lock();
            (buckets.values().map(VecDeque::len).sum::<usize>(), buckets.len())
        };
        self.metrics.get_metrics(idle, keys)
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format, labelled with the pool name
    pub fn export_metrics_prometheus(&self, tags: Option<&HashMap<String, String>>) -> String {
        let metrics = self.get_metrics();
        MetricsExporter::export_prometheus(&metrics, &self.config.name, tags)
    }

    /// Pop an idle object for `key`, or hand the key back on a miss
    fn take_idle(&self, key: K) -> Result<T, K> {
        let popped = {
            let mut buckets = self.buckets.lock();
            buckets.get_mut(&key).and_then(|bucket| {
                let obj = match self.config.reuse_order {
                    ReuseOrder::Fifo => bucket.pop_front(),
                    ReuseOrder::Lifo => bucket.pop_back(),
                };
                obj.map(|obj| (obj, bucket.len()))
            })
        };

        match popped {
            Some((obj, idle)) => {
                self.record(|m| m.reused.fetch_add(1, Ordering::Relaxed));
                tracing::trace!(pool = %self.config.name, idle, "checked out idle object");
                Ok(obj)
            }
            None => {
                tracing::trace!(pool = %self.config.name, "bucket empty, allocating");
                Err(key)
            }
        }
    }

    // Buckets for unseen keys appear only once an allocation succeeded.
    fn ensure_bucket(&self, key: K) {
        let mut buckets = self.buckets.lock();
        self.bucket_mut(&mut buckets, key);
    }

    fn bucket_mut<'m>(
        &self,
        buckets: &'m mut HashMap<K, VecDeque<T>>,
        key: K,
    ) -> &'m mut VecDeque<T> {
        match buckets.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                tracing::debug!(pool = %self.config.name, "created bucket");
                entry.insert(VecDeque::new())
            }
        }
    }

    fn record(&self, update: impl FnOnce(&MetricsTracker) -> usize) {
        if self.config.track_metrics {
            update(&self.metrics);
        }
    }
}

impl<K: Eq + Hash, T> Default for KeyedObjectPool<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        A,
        B,
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Obj {
        id: usize,
    }

    fn counting_alloc(next: &Cell<usize>) -> impl Fn() -> Obj + '_ {
        move || {
            let id = next.get();
            next.set(id + 1);
            Obj { id }
        }
    }

    #[test]
    fn test_miss_allocates_without_filling_bucket() {
        let pool = KeyedObjectPool::new();
        let next = Cell::new(0);

        let obj = pool.check_out(Kind::A, counting_alloc(&next));

        assert_eq!(obj, Obj { id: 0 });
        assert_eq!(next.get(), 1);
        assert!(pool.contains_key(&Kind::A));
        assert_eq!(pool.idle_count(&Kind::A), 0);
    }

    #[test]
    fn test_checked_in_object_is_reused_without_allocating() {
        let pool = KeyedObjectPool::new();
        let original = Arc::new(Obj { id: 99 });
        pool.check_in(Kind::A, Arc::clone(&original));

        let calls = Cell::new(0);
        let reused = pool.check_out(Kind::A, || {
            calls.set(calls.get() + 1);
            Arc::new(Obj { id: 0 })
        });

        assert!(Arc::ptr_eq(&reused, &original));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_check_out_removes_object_from_bucket() {
        let pool = KeyedObjectPool::new();
        let next = Cell::new(0);

        let b1 = pool.check_out(Kind::B, counting_alloc(&next));
        pool.check_in(Kind::B, b1);

        let first = pool.check_out(Kind::B, counting_alloc(&next));
        let second = pool.check_out(Kind::B, counting_alloc(&next));

        assert_eq!(first, Obj { id: 0 });
        assert_eq!(second, Obj { id: 1 });
        assert_eq!(pool.idle_count(&Kind::B), 0);
    }

    #[test]
    fn test_a_b_scenario() {
        let pool = KeyedObjectPool::new();
        let next = Cell::new(0);

        let a1 = pool.check_out(Kind::A, counting_alloc(&next));
        let a2 = pool.check_out(Kind::A, counting_alloc(&next));
        assert_ne!(a1, a2);

        let a1_id = a1.id;
        pool.check_in(Kind::A, a1);
        let a3 = pool.check_out(Kind::A, counting_alloc(&next));
        assert_eq!(a3.id, a1_id);

        let b1 = pool.check_out(Kind::B, counting_alloc(&next));
        let b1_id = b1.id;
        pool.check_in(Kind::B, b1);
        let b2 = pool.check_out(Kind::B, counting_alloc(&next));
        assert_eq!(b2.id, b1_id);

        pool.check_in(Kind::A, a2);
        pool.check_in(Kind::A, a3);
        pool.check_in(Kind::B, b2);
        assert_eq!(pool.total_idle(), 3);
    }

    #[test]
    fn test_fifo_order() {
        let pool = KeyedObjectPool::new();
        pool.check_in("k", 1);
        pool.check_in("k", 2);

        assert_eq!(pool.check_out("k", || 0), 1);
        assert_eq!(pool.check_out("k", || 0), 2);
        assert_eq!(pool.check_out("k", || 0), 0);
    }

    #[test]
    fn test_lifo_order() {
        let config = PoolConfiguration::new().with_reuse_order(ReuseOrder::Lifo);
        let pool = KeyedObjectPool::with_configuration(config);
        pool.check_in("k", 1);
        pool.check_in("k", 2);

        assert_eq!(pool.check_out("k", || 0), 2);
        assert_eq!(pool.check_out("k", || 0), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let pool = KeyedObjectPool::new();
        pool.check_in(Kind::A, 10);

        assert_eq!(pool.check_out(Kind::B, || 20), 20);
        assert_eq!(pool.idle_count(&Kind::A), 1);
        assert_eq!(pool.key_count(), 2);
    }

    #[test]
    fn test_check_in_without_prior_check_out() {
        let pool: KeyedObjectPool<String, u32> = KeyedObjectPool::new();
        pool.check_in("fresh".to_string(), 5);

        assert!(pool.contains_key("fresh"));
        assert_eq!(pool.idle_count("fresh"), 1);
    }

    #[test]
    fn test_duplicate_check_in_is_accepted() {
        let pool = KeyedObjectPool::new();
        pool.check_in(Kind::A, 7);
        pool.check_in(Kind::A, 7);

        assert_eq!(pool.idle_count(&Kind::A), 2);
    }

    #[test]
    fn test_failed_allocation_leaves_pool_unchanged() {
        let pool: KeyedObjectPool<Kind, u32> = KeyedObjectPool::new();
        pool.check_in(Kind::B, 1);

        let err = pool
            .try_check_out(Kind::A, || Err::<u32, _>("out of handles"))
            .unwrap_err();

        let PoolError::AllocationFailed { key, source } = err;
        assert_eq!(key, "A");
        assert_eq!(source.to_string(), "out of handles");
        assert!(!pool.contains_key(&Kind::A));
        assert_eq!(pool.idle_count(&Kind::B), 1);
        assert_eq!(pool.get_metrics().allocation_failures, 1);
    }

    #[test]
    fn test_panicking_allocator_leaves_pool_usable() {
        let pool: KeyedObjectPool<u32, u32> = KeyedObjectPool::new();
        pool.check_in(1, 5);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pool.check_out(2, || -> u32 { panic!("allocator failed") })
        }));

        assert!(result.is_err());
        assert!(!pool.contains_key(&2));
        assert_eq!(pool.idle_count(&1), 1);
        assert_eq!(pool.check_out(1, || 0), 5);
        assert_eq!(pool.check_out(2, || 7), 7);
        assert_eq!(pool.get_metrics().allocated, 1);
    }

    #[test]
    fn test_try_check_out_prefers_idle_object() {
        let pool = KeyedObjectPool::new();
        pool.check_in(Kind::A, 3u32);

        let obj = pool
            .try_check_out(Kind::A, || Err::<u32, _>("must not be called"))
            .unwrap();

        assert_eq!(obj, 3);
    }

    #[test]
    fn test_warm_up_fills_bucket() {
        let pool = KeyedObjectPool::new();
        let next = Cell::new(0);
        pool.warm_up(Kind::A, 2, counting_alloc(&next));

        assert_eq!(pool.idle_count(&Kind::A), 2);
        assert_eq!(pool.check_out(Kind::A, counting_alloc(&next)), Obj { id: 0 });
        assert_eq!(next.get(), 2);
    }

    #[test]
    fn test_metrics_count_hits_and_misses() {
        let pool = KeyedObjectPool::new();

        let obj = pool.check_out("x", || 1);
        pool.check_in("x", obj);
        let obj = pool.check_out("x", || 2);
        pool.check_in("x", obj);

        let metrics = pool.get_metrics();
        assert_eq!(metrics.total_checked_out, 2);
        assert_eq!(metrics.reused, 1);
        assert_eq!(metrics.allocated, 1);
        assert_eq!(metrics.total_checked_in, 2);
        assert_eq!(metrics.idle_objects, 1);
        assert_eq!(metrics.keys, 1);
        assert_eq!(pool.export_metrics()["reuse_ratio"], "0.50");
    }

    #[test]
    fn test_disabled_metrics_stay_zero() {
        let pool = KeyedObjectPool::with_configuration(PoolConfiguration::new().with_metrics(false));

        let obj = pool.check_out("x", || 1);
        pool.check_in("x", obj);

        let metrics = pool.get_metrics();
        assert_eq!(metrics.total_checked_out, 0);
        assert_eq!(metrics.total_checked_in, 0);
        assert_eq!(metrics.idle_objects, 1);
    }

    #[test]
    fn test_prometheus_export_uses_pool_name() {
        let pool: KeyedObjectPool<&str, u8> =
            KeyedObjectPool::with_configuration(PoolConfiguration::new().with_name("sockets"));

        let output = pool.export_metrics_prometheus(None);

        assert_eq!(pool.configuration().name, "sockets");
        assert!(output.contains("keyed_objectpool_checked_out_total{pool=\"sockets\"} 0"));
    }
}
