//! The global epoch counter.
//!
//! The epoch advances exactly once per actual value change anywhere in the
//! graph: never on reads, never on recompute attempts that produce an
//! equal value. A node that was confirmed valid at the current epoch can
//! skip its producer walk entirely on the next read.

use std::sync::atomic::{AtomicU64, Ordering};

static EPOCH: AtomicU64 = AtomicU64::new(1);

/// The current epoch.
pub fn current() -> u64 {
    EPOCH.load(Ordering::Relaxed)
}

/// Advances the epoch. Called once per actual value change; returns the
/// new epoch.
pub(crate) fn advance() -> u64 {
    EPOCH.fetch_add(1, Ordering::Relaxed) + 1
}
