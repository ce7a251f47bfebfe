//! Reusable byte buffers for request and response bodies.
//!
//! # Design
//! `BufferPool::acquire` hands out a `PooledBuffer` guard that owns its
//! `Vec<u8>` exclusively. Dropping the guard clears the buffer and returns it
//! to the pool, so a buffer goes back on every exit path. Anything that must
//! outlive the guard has to be copied out first.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
pub struct BufferPool {
    idle: Mutex<Vec<Vec<u8>>>,
    buffer_size: usize,
    max_idle: usize,
}

impl BufferPool {
    /// `buffer_size` is the initial capacity of new buffers; at most
    /// `max_idle` released buffers are retained.
    pub fn new(buffer_size: usize, max_idle: usize) -> Arc<Self> {
        Arc::new(Self {
            idle: Mutex::new(Vec::new()),
            buffer_size,
            max_idle,
        })
    }

    pub fn acquire(self: &Arc<Self>) -> PooledBuffer {
        let reused = self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop();
        let buf = reused.unwrap_or_else(|| Vec::with_capacity(self.buffer_size));
        PooledBuffer {
            buf,
            pool: Arc::clone(self),
        }
    }

    /// Number of buffers waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }
}

/// A buffer on loan from a [`BufferPool`].
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_buffer_is_cleared_and_reused() {
        let pool = BufferPool::new(16, 4);
        let mut first = pool.acquire();
        first.extend_from_slice(b"secret payload");
        let ptr = first.as_ptr();
        drop(first);
        assert_eq!(pool.idle_count(), 1);

        let second = pool.acquire();
        assert!(second.is_empty());
        assert_eq!(second.as_ptr(), ptr);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn concurrent_loans_get_distinct_buffers() {
        let pool = BufferPool::new(16, 4);
        let mut a = pool.acquire();
        let mut b = pool.acquire();
        a.push(1);
        b.push(2);
        assert_eq!(a.as_slice(), &[1]);
        assert_eq!(b.as_slice(), &[2]);
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn idle_buffers_are_capped() {
        let pool = BufferPool::new(8, 1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 1);
    }
}
