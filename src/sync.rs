#[cfg(not(loom))]
mod sync_impl {
    pub(crate) use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
}

#[cfg(loom)]
mod sync_impl {
    pub(crate) use loom::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
}

pub(crate) use sync_impl::*;

use std::sync::TryLockError;

/// Acquires the shared lock, ignoring poison.
///
/// Chain cursors are only advanced after the element moves they describe, so a panic inside a
/// critical section cannot leave the chain in a state that breaks its invariants.
#[inline]
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

/// Acquires the exclusive lock, ignoring poison.
#[inline]
pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// Tries to acquire the shared lock without blocking.
///
/// Returns `None` if a writer currently holds the lock.
pub(crate) fn try_read<T>(lock: &RwLock<T>) -> Option<RwLockReadGuard<'_, T>> {
    match lock.try_read() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(err)) => Some(err.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}
