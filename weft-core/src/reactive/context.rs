//! The tracking context.
//!
//! The tracking context records which computation is currently running so
//! that dependency discovery can be implicit: when a producer is read, the
//! edge is attributed to the innermost active consumer.
//!
//! # Implementation
//!
//! A thread-local stack holds one frame per nested computation. Each frame
//! carries the active consumer and a producer-slot cursor starting at 0;
//! every read advances the cursor, reusing the slot recorded at the same
//! position by the previous run. When the frame is popped, slots beyond
//! the final cursor position are truncated: producers read on an earlier
//! run but not on this one are no longer dependencies.
//!
//! Frames are pushed by [`TrackingScope::enter`] and popped by the guard's
//! `Drop`, so the save/restore discipline is LIFO and holds even when a
//! computation panics.
//!
//! An [`untracked`] frame suspends tracking entirely and doubles as the
//! override that permits reads of guarded producers.

use std::cell::RefCell;
use std::sync::Arc;

use super::edges;
use super::error::GraphError;
use super::node::ReactiveNode;

thread_local! {
    static STACK: RefCell<Vec<Frame>> = RefCell::new(Vec::new());
}

enum Frame {
    /// A consumer computation is running; reads record edges against it.
    Tracking {
        consumer: Arc<ReactiveNode>,
        next_slot: usize,
    },
    /// Tracking is suspended; reads record nothing and guarded reads are
    /// permitted.
    Untracked,
}

/// Guard representing an active consumer computation.
///
/// While the scope is alive, any producer read on this thread records a
/// dependency edge to `consumer`. Dropping the scope restores the previous
/// active consumer and truncates dependency slots the run did not reach.
pub struct TrackingScope {
    consumer: Arc<ReactiveNode>,
}

impl TrackingScope {
    /// Installs `consumer` as the active consumer and resets its producer
    /// cursor. The previous active consumer (possibly none) is restored
    /// when the returned guard drops.
    pub fn enter(consumer: Arc<ReactiveNode>) -> Self {
        STACK.with(|stack| {
            stack.borrow_mut().push(Frame::Tracking {
                consumer: Arc::clone(&consumer),
                next_slot: 0,
            });
        });
        Self { consumer }
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        let frame = STACK.with(|stack| stack.borrow_mut().pop());
        match frame {
            Some(Frame::Tracking {
                consumer,
                next_slot,
            }) => {
                debug_assert!(
                    Arc::ptr_eq(&consumer, &self.consumer),
                    "tracking scopes must unwind in LIFO order"
                );
                // Producers tracked on a previous run but not read on this
                // one are no longer dependencies.
                edges::truncate_producers(&consumer, next_slot);
            }
            _ => debug_assert!(false, "tracking scopes must unwind in LIFO order"),
        }
    }
}

/// Runs `f` with dependency tracking suspended.
///
/// Reads inside the closure record no edges, and guarded producers may be
/// read freely.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _scope = UntrackedScope::enter();
    f()
}

struct UntrackedScope;

impl UntrackedScope {
    fn enter() -> Self {
        STACK.with(|stack| stack.borrow_mut().push(Frame::Untracked));
        Self
    }
}

impl Drop for UntrackedScope {
    fn drop(&mut self) {
        let frame = STACK.with(|stack| stack.borrow_mut().pop());
        debug_assert!(
            matches!(frame, Some(Frame::Untracked)),
            "tracking scopes must unwind in LIFO order"
        );
    }
}

/// Whether a consumer computation is currently being tracked on this
/// thread.
pub fn is_tracking() -> bool {
    STACK.with(|stack| {
        matches!(
            stack.borrow().last(),
            Some(Frame::Tracking { .. })
        )
    })
}

/// Records a read of `producer` against the active consumer.
///
/// With an untracked frame on top, the read is permitted and nothing is
/// recorded. With no frame at all, guarded producers fail with
/// [`GraphError::NoReaderContext`].
pub(crate) fn producer_accessed(producer: &ReactiveNode) -> Result<(), GraphError> {
    enum Action {
        Record { consumer: Arc<ReactiveNode>, slot: usize },
        Skip,
        NoContext,
    }

    let action = STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        match stack.last_mut() {
            Some(Frame::Untracked) => Action::Skip,
            Some(Frame::Tracking {
                consumer,
                next_slot,
            }) => {
                // A computation re-reading its own node records nothing;
                // the revalidation path reports the cycle.
                if std::ptr::eq(Arc::as_ptr(consumer), producer) {
                    Action::Skip
                } else {
                    let slot = *next_slot;
                    *next_slot += 1;
                    Action::Record {
                        consumer: Arc::clone(consumer),
                        slot,
                    }
                }
            }
            None => Action::NoContext,
        }
    });

    match action {
        Action::Skip => Ok(()),
        Action::NoContext => {
            if producer.require_reader() {
                Err(GraphError::NoReaderContext)
            } else {
                Ok(())
            }
        }
        Action::Record { consumer, slot } => {
            edges::record_dependency(&consumer, &producer.arc(), slot);
            consumer.notify_signal_read();
            Ok(())
        }
    }
}
