//! Reusable scratch buffers for the apply path.
//!
//! A bounded free list behind a mutex. [`ScratchPool::acquire`] hands out an
//! exclusively owned [`ScratchBuffer`]; dropping the buffer releases it back to
//! the pool. Contents are garbage on acquire and are fully overwritten by
//! [`ScratchBuffer::fill_from`].

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex, PoisonError};

use crate::config::{SmartScaleConfig, default_max_feature_size, default_scratch_pool_capacity};

static GLOBAL_POOL: LazyLock<ScratchPool> = LazyLock::new(|| {
    ScratchPool::new(default_scratch_pool_capacity(), default_max_feature_size())
});

/// Process-wide pool used by [`crate::FeatureTransformSet::apply`].
///
/// Always sized from the built-in defaults. Callers that want
/// [`SmartScaleConfig::scratch_pool_capacity`] honoured build their own pool
/// with [`ScratchPool::from`] and call `apply_with`.
pub fn global_pool() -> &'static ScratchPool {
    &GLOBAL_POOL
}

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub acquires: u64,
    /// Acquires that had to allocate because no retained buffer was free.
    pub allocations: u64,
    /// Buffers currently sitting in the free list.
    pub retained: usize,
}

pub struct ScratchPool {
    free: Mutex<Vec<Vec<f64>>>,
    /// Maximum number of buffers kept in the free list.
    capacity: usize,
    /// Initial capacity of freshly allocated buffers.
    buffer_len: usize,
    acquires: AtomicU64,
    allocations: AtomicU64,
}

impl ScratchPool {
    pub fn new(capacity: usize, buffer_len: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            buffer_len,
            acquires: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
        }
    }

    /// Take a buffer that can hold at least `len` values without reallocating.
    pub fn acquire(&self, len: usize) -> ScratchBuffer<'_> {
        self.acquires.fetch_add(1, Ordering::Relaxed);

        // The free list holds no invariants a panicking holder could break.
        let recycled = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let mut buf = match recycled {
            Some(buf) => buf,
            None => {
                self.allocations.fetch_add(1, Ordering::Relaxed);
                Vec::with_capacity(self.buffer_len.max(len))
            }
        };
        buf.reserve(len.saturating_sub(buf.len()));

        ScratchBuffer {
            buf: Some(buf),
            pool: self,
        }
    }

    /// Maximum number of buffers retained between acquires.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self, buf: Vec<f64>) {
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.capacity {
            free.push(buf);
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquires: self.acquires.load(Ordering::Relaxed),
            allocations: self.allocations.load(Ordering::Relaxed),
            retained: self
                .free
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
        }
    }
}

impl From<&SmartScaleConfig> for ScratchPool {
    fn from(config: &SmartScaleConfig) -> Self {
        Self::new(config.scratch_pool_capacity, config.max_feature_size)
    }
}

impl std::fmt::Debug for ScratchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchPool")
            .field("capacity", &self.capacity)
            .field("buffer_len", &self.buffer_len)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A buffer on loan from a [`ScratchPool`]. Returned to the pool on drop.
pub struct ScratchBuffer<'a> {
    buf: Option<Vec<f64>>,
    pool: &'a ScratchPool,
}

impl ScratchBuffer<'_> {
    /// Overwrite the buffer with `src`, resizing it to `src.len()`.
    pub fn fill_from(&mut self, src: &[f64]) {
        let buf = self.vec_mut();
        buf.clear();
        buf.extend_from_slice(src);
    }

    fn vec_mut(&mut self) -> &mut Vec<f64> {
        self.buf.get_or_insert_with(Vec::new)
    }
}

impl Deref for ScratchBuffer<'_> {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        self.buf.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for ScratchBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [f64] {
        self.vec_mut().as_mut_slice()
    }
}

impl Drop for ScratchBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffers_are_recycled() {
        let pool = ScratchPool::new(4, 8);
        {
            let mut buf = pool.acquire(3);
            buf.fill_from(&[1.0, 2.0, 3.0]);
            assert_eq!(&buf[..], &[1.0, 2.0, 3.0]);
        }
        let stats = pool.stats();
        assert_eq!(stats.acquires, 1);
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.retained, 1);

        let mut buf = pool.acquire(2);
        buf.fill_from(&[9.0, 8.0]);
        // Previous contents never leak past the filled length.
        assert_eq!(buf.len(), 2);
        assert_eq!(&buf[..], &[9.0, 8.0]);
        drop(buf);

        let stats = pool.stats();
        assert_eq!(stats.acquires, 2);
        assert_eq!(stats.allocations, 1);
    }

    #[test]
    fn test_free_list_is_bounded() {
        let pool = ScratchPool::new(2, 4);
        let held: Vec<_> = (0..5).map(|_| pool.acquire(4)).collect();
        assert_eq!(pool.stats().allocations, 5);
        drop(held);
        assert_eq!(pool.stats().retained, 2);
    }

    #[test]
    fn test_grows_for_long_inputs() {
        let pool = ScratchPool::new(1, 2);
        let input: Vec<f64> = (0..100u32).map(f64::from).collect();
        let mut buf = pool.acquire(input.len());
        buf.fill_from(&input);
        assert_eq!(&buf[..], input.as_slice());
    }

    #[test]
    fn test_pool_sized_from_config() {
        let config = SmartScaleConfig {
            scratch_pool_capacity: 3,
            ..Default::default()
        };
        let pool = ScratchPool::from(&config);
        assert_eq!(pool.capacity(), 3);

        let held: Vec<_> = (0..6).map(|_| pool.acquire(21)).collect();
        drop(held);
        assert_eq!(pool.stats().retained, 3);

        assert_eq!(global_pool().capacity(), default_scratch_pool_capacity());
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = ScratchPool::new(8, 16);
        std::thread::scope(|s| {
            for t in 0..8 {
                let pool = &pool;
                s.spawn(move || {
                    for i in 0..200 {
                        let value = (t * 1000 + i) as f64;
                        let mut buf = pool.acquire(16);
                        buf.fill_from(&[value; 16]);
                        assert!(buf.iter().all(|v| *v == value));
                    }
                });
            }
        });
        let stats = pool.stats();
        assert_eq!(stats.acquires, 1600);
        assert!(stats.retained <= 8);
    }
}
