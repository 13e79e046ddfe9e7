//! RAII wrapper that checks an object back in when dropped

use crate::pool::KeyedObjectPool;

use std::fmt;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};

/// A checked-out object that returns to its pool, under the key it was
/// checked out with, when dropped.
pub struct PooledObject<'a, K: Eq + Hash, T> {
    pool: &'a KeyedObjectPool<K, T>,
    entry: Option<(K, T)>,
}

impl<'a, K: Eq + Hash, T> PooledObject<'a, K, T> {
    pub(crate) fn new(pool: &'a KeyedObjectPool<K, T>, key: K, value: T) -> Self {
        Self {
            pool,
            entry: Some((key, value)),
        }
    }

    /// Key the object will be checked in under
    pub fn key(&self) -> &K {
        &self.entry.as_ref().expect("Value already taken").0
    }

    /// Take the object out of the guard so it is never returned to the pool
    pub fn into_inner(mut self) -> T {
        self.entry.take().expect("Value already taken").1
    }
}

impl<K: Eq + Hash, T> Deref for PooledObject<'_, K, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.entry.as_ref().expect("Value already taken").1
    }
}

impl<K: Eq + Hash, T> DerefMut for PooledObject<'_, K, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entry.as_mut().expect("Value already taken").1
    }
}

impl<K: Eq + Hash + fmt::Debug, T: fmt::Debug> fmt::Debug for PooledObject<'_, K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entry {
            Some((key, value)) => f
                .debug_struct("PooledObject")
                .field("key", key)
                .field("value", value)
                .finish(),
            None => f.write_str("PooledObject(<taken>)"),
        }
    }
}

impl<K: Eq + Hash, T> Drop for PooledObject<'_, K, T> {
    fn drop(&mut self) {
        if let Some((key, value)) = self.entry.take() {
            self.pool.check_in(key, value);
        }
    }
}
