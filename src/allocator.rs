//! Allocators used to build objects on a pool miss

/// A zero-argument factory producing a fresh `T`.
///
/// Allocators are handed to the pool per call and never stored, so every
/// call site may construct its objects differently. Any `Fn() -> T` is an
/// allocator, including references to closures.
///
/// # Examples
///
/// ```
/// use keyed_objectpool::{Allocator, KeyedObjectPool};
///
/// struct Buffers {
///     size: usize,
/// }
///
/// impl Allocator<Vec<u8>> for Buffers {
///     fn allocate(&self) -> Vec<u8> {
///         vec![0; self.size]
///     }
/// }
///
/// let pool = KeyedObjectPool::new();
/// let small = pool.check_out("small", Buffers { size: 16 });
/// let large = pool.check_out("large", || vec![0u8; 4096]);
///
/// assert_eq!(small.len(), 16);
/// assert_eq!(large.len(), 4096);
/// ```
pub trait Allocator<T> {
    /// Build a new object
    fn allocate(&self) -> T;
}

impl<T, F> Allocator<T> for F
where
    F: Fn() -> T,
{
    fn allocate(&self) -> T {
        self()
    }
}
