// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A recursive-safe write lock.
//!
//! `parking_lot::ReentrantMutex` only hands out a shared reference to its
//! contents, since a thread holding the lock could otherwise reenter and
//! obtain two live `&mut T`. We pair it with a `RefCell` so a single thread
//! may reacquire the lock (directly, or by calling back into a function
//! that acquires it again) and still get a checked mutable borrow.
//!
//! This is the primitive a single process-wide FIB lock is built from: all
//! public API paths, NPU-driven callbacks, and the dependency-engine replay
//! worker take the same `ReentrantLock`, and reentrant acquisition from the
//! same thread (e.g. a route create that walks into attribute validation
//! which also takes the lock) does not deadlock.

use std::cell::{RefCell, RefMut};
use std::fmt;

use parking_lot::ReentrantMutex;

/// A mutex that may be locked multiple times by the same thread without
/// deadlocking, yielding a checked mutable borrow of `T` on every
/// acquisition.
pub struct ReentrantLock<T> {
    inner: ReentrantMutex<RefCell<T>>,
}

// Safety: access to `T` is always mediated by `RefCell`'s runtime borrow
// checks, and `ReentrantMutex` only ever lets one thread's guards exist
// concurrently for writing; distinct threads still contend on the mutex.
unsafe impl<T: Send> Sync for ReentrantLock<T> {}

impl<T> ReentrantLock<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(value)),
        }
    }

    /// Acquire the lock, blocking the calling thread if another thread
    /// currently holds it. Reentrant acquisition by the same thread never
    /// blocks.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds a live `ReentrantGuard`
    /// for this lock at an outer frame and tries to take a second,
    /// overlapping mutable borrow (i.e. two guards alive at once on the
    /// same thread). Acquiring, using, and dropping a guard before
    /// reentering is always safe.
    #[must_use]
    pub fn lock(&self) -> ReentrantGuard<'_, T> {
        let cell = self.inner.lock();
        // SAFETY: `cell` is owned by the returned guard via a pointer
        // that lives exactly as long as the `ReentrantMutexGuard` it was
        // borrowed from, because both are embedded in `ReentrantGuard`.
        let cell_ref: &RefCell<T> = unsafe { &*(std::ptr::from_ref::<RefCell<T>>(&*cell)) };
        ReentrantGuard {
            _mutex_guard: cell,
            borrow: cell_ref.borrow_mut(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReentrantLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReentrantLock").finish_non_exhaustive()
    }
}

/// RAII guard returned by [`ReentrantLock::lock`]. Derefs to `&mut T`.
pub struct ReentrantGuard<'a, T> {
    _mutex_guard: parking_lot::ReentrantMutexGuard<'a, RefCell<T>>,
    borrow: RefMut<'a, T>,
}

impl<T> std::ops::Deref for ReentrantGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.borrow
    }
}

impl<T> std::ops::DerefMut for ReentrantGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.borrow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn basic_lock_unlock() {
        let lock = ReentrantLock::new(0_u32);
        {
            let mut guard = lock.lock();
            *guard += 1;
        }
        assert_eq!(*lock.lock(), 1);
    }

    #[test]
    fn reentrant_acquisition_same_thread() {
        let lock = ReentrantLock::new(vec![1, 2, 3]);
        let outer = lock.lock();
        // Reacquiring from the same thread must not deadlock.
        let inner_len = lock.lock().len();
        assert_eq!(inner_len, outer.len());
    }

    #[test]
    fn contends_across_threads() {
        let lock = Arc::new(ReentrantLock::new(0_u64));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = Arc::clone(&lock);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    *lock.lock() += 1;
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*lock.lock(), 8000);
    }
}
