//! Effects: always-live consumers.
//!
//! An effect runs a side-effecting computation against reactive state. It
//! is live from birth: the instant an upstream value changes, the effect
//! is marked dirty and its notification callback fires, before the
//! triggering write returns.
//!
//! The effect does not re-run inside that notification. Scheduling is the
//! host's job (a UI host typically coalesces notifications into a render
//! tick); the host then calls [`Effect::run`], which re-executes the body
//! only if some dependency's value actually changed. An upstream write
//! that recomputes an intermediate memo to an equal value wakes the
//! effect but does not re-run it.
//!
//! # Example
//!
//! ```rust
//! use weft_core::reactive::{Effect, Signal};
//!
//! let count = Signal::new(0);
//!
//! let effect = {
//!     let count = count.clone();
//!     Effect::new(move || {
//!         let _ = count.get();
//!     })
//! };
//!
//! count.set(5);
//! effect.run().unwrap();
//! assert_eq!(effect.run_count(), 2);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::error::GraphError;
use super::node::{ComputeHooks, Hook, NodeId, NodeKind, NodeOptions, ReactiveNode};

/// A side-effecting computation kept current by push notification.
///
/// Cloning an effect produces a handle to the same graph node; disposing
/// one handle disposes them all.
pub struct Effect {
    node: Arc<ReactiveNode>,
    disposed: Arc<AtomicBool>,
    run_count: Arc<AtomicUsize>,
}

impl Effect {
    /// Create an effect and run it once to establish its initial
    /// dependency set.
    ///
    /// # Panics
    ///
    /// Panics if the initial run fails (the body read a memo whose graph
    /// contains a cycle or whose computation errored).
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(run, None)
    }

    /// Like [`new`](Self::new), with a callback invoked whenever the
    /// effect is marked dirty. The callback fires synchronously inside
    /// the triggering write; hosts use it to schedule a later
    /// [`run`](Self::run).
    pub fn with_notify<F, N>(run: F, notify: N) -> Self
    where
        F: Fn() + Send + Sync + 'static,
        N: Fn() + Send + Sync + 'static,
    {
        Self::build(run, Some(Box::new(notify)))
    }

    fn build<F>(run: F, notify: Option<Hook>) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let run_count = Arc::new(AtomicUsize::new(0));
        let has_run = Arc::new(AtomicBool::new(false));

        let recompute: Box<dyn Fn() -> Result<bool, GraphError> + Send + Sync> = {
            let run_count = Arc::clone(&run_count);
            let has_run = Arc::clone(&has_run);
            Box::new(move || {
                run();
                has_run.store(true, Ordering::SeqCst);
                run_count.fetch_add(1, Ordering::SeqCst);
                // Effects produce no value; nothing downstream can change.
                Ok(false)
            })
        };

        let must_recompute: Box<dyn Fn() -> bool + Send + Sync> = {
            let has_run = Arc::clone(&has_run);
            Box::new(move || !has_run.load(Ordering::SeqCst))
        };

        let node = ReactiveNode::new(
            NodeKind::Effect(ComputeHooks {
                recompute,
                must_recompute,
            }),
            NodeOptions {
                always_live: true,
                on_marked_dirty: notify,
                ..Default::default()
            },
        );

        let effect = Self {
            node,
            disposed: Arc::new(AtomicBool::new(false)),
            run_count,
        };
        effect.run().expect("initial effect run failed");
        effect
    }

    /// The effect's node ID.
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// The graph node backing this effect, for host integrations.
    pub fn node(&self) -> &Arc<ReactiveNode> {
        &self.node
    }

    /// Revalidate the effect, re-running its body only if a dependency's
    /// value actually changed. A no-op after disposal.
    pub fn run(&self) -> Result<(), GraphError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.node.ensure_valid()
    }

    /// Dispose of the effect: disconnect every producer edge and stop it
    /// from ever running again.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.node.disconnect();
        }
    }

    /// Whether the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Whether the effect is currently marked dirty.
    pub fn is_dirty(&self) -> bool {
        self.node.is_dirty()
    }

    /// Number of times the body has run.
    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::SeqCst)
    }

    /// Number of producers recorded during the last run.
    pub fn producer_count(&self) -> usize {
        self.node.producer_count()
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            disposed: Arc::clone(&self.disposed),
            run_count: Arc::clone(&self.run_count),
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.node.id())
            .field("run_count", &self.run_count())
            .field("producers", &self.producer_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
