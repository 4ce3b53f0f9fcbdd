//! The host execution lock.
//!
//! Host code runs under a lock the bridge treats as opaque. Calls into the
//! foreign runtime release it for their duration ([`ReleasedLock`]); calls
//! arriving from the foreign runtime into host code hold it for theirs
//! ([`HostLockGuard`]). Both guards restore the previous state on every exit
//! path, including unwinding.

use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

/// Acquire/release protocol of the host interpreter's lock.
pub trait HostLock: Send + Sync {
    /// Block until the calling thread holds the lock.
    fn acquire(&self);

    /// Give up the lock held by the calling thread.
    fn release(&self);
}

/// Holds the host lock for its lifetime.
#[must_use = "the lock is released when the guard is dropped"]
pub struct HostLockGuard<'a> {
    lock: &'a dyn HostLock,
}

impl<'a> HostLockGuard<'a> {
    pub fn acquire(lock: &'a dyn HostLock) -> Self {
        lock.acquire();
        Self { lock }
    }
}

impl Drop for HostLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// Releases the host lock for its lifetime and reacquires it on drop.
#[must_use = "the lock is reacquired when the guard is dropped"]
pub struct ReleasedLock<'a> {
    lock: &'a dyn HostLock,
}

impl<'a> ReleasedLock<'a> {
    pub fn release(lock: &'a dyn HostLock) -> Self {
        lock.release();
        Self { lock }
    }
}

impl Drop for ReleasedLock<'_> {
    fn drop(&mut self) {
        self.lock.acquire();
    }
}

/// For hosts without an execution lock.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHostLock;

impl HostLock for NoHostLock {
    fn acquire(&self) {}

    fn release(&self) {}
}

/// A lock owned by one thread at a time.
///
/// Nested acquisition by the owning thread is counted; the lock becomes
/// available again when the count returns to zero.
#[derive(Debug, Default)]
pub struct SerialHostLock {
    owner: Mutex<Option<(ThreadId, usize)>>,
    available: Condvar,
}

impl SerialHostLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the lock already held by the calling thread, as a host
    /// interpreter's main thread would.
    pub fn held() -> Self {
        let lock = Self::new();
        lock.acquire();
        lock
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        matches!(*self.owner.lock(), Some((owner, _)) if owner == thread::current().id())
    }

    pub fn is_locked(&self) -> bool {
        self.owner.lock().is_some()
    }
}

impl HostLock for SerialHostLock {
    fn acquire(&self) {
        let me = thread::current().id();
        let mut owner = self.owner.lock();
        loop {
            match *owner {
                None => {
                    *owner = Some((me, 1));
                    return;
                }
                Some((thread, ref mut depth)) if thread == me => {
                    *depth += 1;
                    return;
                }
                Some(_) => {}
            }
            self.available.wait(&mut owner);
        }
    }

    fn release(&self) {
        let me = thread::current().id();
        let mut owner = self.owner.lock();
        match *owner {
            Some((thread, ref mut depth)) if thread == me => {
                *depth -= 1;
                if *depth == 0 {
                    *owner = None;
                    self.available.notify_one();
                }
            }
            _ => tracing::warn!("host lock released by a thread that does not hold it"),
        }
    }
}
