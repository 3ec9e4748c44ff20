//! Overlapping-call policy: last dispatched wins
//!
//! The UI layer may dispatch a new flow invocation while a prior one is
//! still pending, and nothing guarantees completion order. [`DispatchSlot`]
//! makes the outcome defined: every dispatch takes a monotonically
//! increasing sequence number, and a completion may commit its value only
//! while it is still the most recent dispatch. A slower, earlier call
//! resolving after a newer dispatch is refused, so the newest request's
//! result can never be overwritten by a stale one.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Holds the most recent committed value for one flow surface
pub struct DispatchSlot<T> {
    next_seq: AtomicU64,
    committed: RwLock<Option<(u64, T)>>,
}

impl<T> DispatchSlot<T> {
    pub fn new() -> Self {
        Self {
            next_seq: AtomicU64::new(0),
            committed: RwLock::new(None),
        }
    }

    /// Register a new dispatch and return its sequence number.
    ///
    /// Dispatching invalidates every earlier in-flight call: their commits
    /// will be refused even if they resolve later.
    pub fn dispatch(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Sequence number of the most recent dispatch (0 if none yet).
    pub fn latest_dispatched(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }

    /// Commit the result of dispatch `seq`.
    ///
    /// Returns `true` and stores the value only if `seq` is still the most
    /// recent dispatch; a stale completion returns `false` and leaves the
    /// slot untouched.
    pub fn commit(&self, seq: u64, value: T) -> bool {
        let mut committed = self.committed.write();
        // Checked under the write lock so a stale commit cannot clobber a
        // newer one that raced it.
        if seq != self.next_seq.load(Ordering::SeqCst) {
            return false;
        }
        *committed = Some((seq, value));
        true
    }

    /// Sequence number of the committed value, if any.
    pub fn committed_seq(&self) -> Option<u64> {
        self.committed.read().as_ref().map(|(seq, _)| *seq)
    }
}

impl<T: Clone> DispatchSlot<T> {
    /// The most recently committed value, if any.
    pub fn current(&self) -> Option<T> {
        self.committed.read().as_ref().map(|(_, v)| v.clone())
    }
}

impl<T> Default for DispatchSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for DispatchSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchSlot")
            .field("latest_dispatched", &self.latest_dispatched())
            .field("committed_seq", &self.committed_seq())
            .finish()
    }
}
