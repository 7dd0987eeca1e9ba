//! Buffer and broadcast latch.

use crate::route::RouteDescriptor;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverMode {
    Buffering,
    Broadcasting,
}

/// What happened to an admitted descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Buffered,
    /// The observer is broadcasting; the caller must emit the descriptor.
    Broadcast(RouteDescriptor),
}

struct Inner {
    buffered: Vec<RouteDescriptor>,
    mode: ObserverMode,
}

/// Append-only buffer plus a one-way `Buffering -> Broadcasting` latch.
///
/// Appends and the flip-and-snapshot share one lock: a descriptor is either
/// in the snapshot a flip returns or handed back for immediate broadcast.
pub struct ObserverState {
    inner: Mutex<Inner>,
}

impl Default for ObserverState {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                buffered: Vec::new(),
                mode: ObserverMode::Buffering,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every critical section leaves `Inner` consistent, so a poisoned
        // lock is still safe to use.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn admit(&self, descriptor: RouteDescriptor) -> Admission {
        let mut inner = self.lock();
        match inner.mode {
            ObserverMode::Buffering => {
                inner.buffered.push(descriptor);
                Admission::Buffered
            }
            ObserverMode::Broadcasting => Admission::Broadcast(descriptor),
        }
    }

    /// Enter `Broadcasting` (idempotent) and return the buffer for replay.
    ///
    /// The buffer itself is left intact.
    pub fn begin_broadcasting(&self) -> Vec<RouteDescriptor> {
        let mut inner = self.lock();
        inner.mode = ObserverMode::Broadcasting;
        inner.buffered.clone()
    }

    pub fn mode(&self) -> ObserverMode {
        self.lock().mode
    }

    pub fn buffered(&self) -> Vec<RouteDescriptor> {
        self.lock().buffered.clone()
    }

    pub fn buffered_len(&self) -> usize {
        self.lock().buffered.len()
    }
}
