// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Poison-recovering lock helpers.
//!
//! The session index and the in-memory audit buffer are shared by every
//! request-handling thread in the hosting server. If one of those threads
//! panics while holding a lock, the lock is poisoned; panicking again on the
//! next acquisition would turn a single bad request into a denial of service
//! for the whole security engine. These helpers log the poisoning as a
//! security event and recover the guard.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a read lock, recovering from poisoning if necessary.
#[inline]
pub fn resilient_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "buildgate::locks",
                event = "LOCK_POISONED_READ",
                "CRITICAL: lock poisoned during read acquisition; recovering. \
                 A thread panicked while holding this lock."
            );
            poisoned.into_inner()
        }
    }
}

/// Acquire a write lock, recovering from poisoning if necessary.
#[inline]
pub fn resilient_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "buildgate::locks",
                event = "LOCK_POISONED_WRITE",
                "CRITICAL: lock poisoned during write acquisition; recovering. \
                 A thread panicked while holding this lock."
            );
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_resilient_read_normal() {
        let lock = RwLock::new(42);
        assert_eq!(*resilient_read(&lock), 42);
    }

    #[test]
    fn test_resilient_write_normal() {
        let lock = RwLock::new(42);
        *resilient_write(&lock) = 100;
        assert_eq!(*resilient_read(&lock), 100);
    }

    #[test]
    fn test_recovers_after_poison() {
        let lock = Arc::new(RwLock::new(42));
        let lock_clone = Arc::clone(&lock);

        // Poison the lock by panicking while holding it
        let handle = thread::spawn(move || {
            let _guard = lock_clone.write().unwrap();
            panic!("intentional panic to poison lock");
        });
        let _ = handle.join();

        let mut guard = resilient_write(&lock);
        *guard = 7;
        drop(guard);
        assert_eq!(*resilient_read(&lock), 7);
    }
}
