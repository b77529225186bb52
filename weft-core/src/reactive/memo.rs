//! Memos: cached derived values.
//!
//! A memo runs its computation lazily, caches the result, and re-runs only
//! when a dependency's value actually changed.
//!
//! # How memos work
//!
//! 1. On first access the computation runs inside a tracking scope,
//!    recording every producer it reads.
//!
//! 2. On later accesses the engine first checks the cheap paths (live and
//!    clean, or already validated this epoch), then polls the recorded
//!    producers. Only a real version change triggers recomputation.
//!
//! 3. A recomputation that produces an equal value does not bump the
//!    memo's version, so consumers downstream of the memo are cut off
//!    from the change entirely.
//!
//! A memo whose computation can fail is built with [`Memo::fallible`]; a
//! failed run leaves the memo dirty and surfaces the error to the reader,
//! and the next read retries.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::{BoxError, GraphError};
use super::node::{ComputeHooks, NodeId, NodeKind, NodeOptions, ReactiveNode};

/// A cached derived value that recomputes only when dependencies change.
///
/// Cloning a memo produces a handle to the same cache and graph node.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::{Memo, Signal};
///
/// let count = Signal::new(2);
/// let doubled = {
///     let count = count.clone();
///     Memo::new(move || count.get() * 2)
/// };
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    node: Arc<ReactiveNode>,
    value: Arc<RwLock<Option<T>>>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Create a memo with the given computation. Nothing runs until the
    /// memo is first read.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(move || Ok(compute()))
    }

    /// Create a memo whose computation can fail. A failed run leaves the
    /// memo dirty; the error surfaces through
    /// [`try_get`](Self::try_get) and the next read retries.
    pub fn fallible<F>(compute: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::build(compute)
    }

    fn build<F>(compute: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let value: Arc<RwLock<Option<T>>> = Arc::new(RwLock::new(None));
        // Set after a failed run: the cached value (if any) predates the
        // failure and must not satisfy a staleness poll.
        let failed = Arc::new(AtomicBool::new(false));

        let recompute: Box<dyn Fn() -> Result<bool, GraphError> + Send + Sync> = {
            let value = Arc::clone(&value);
            let failed = Arc::clone(&failed);
            Box::new(move || {
                let next = match compute() {
                    Ok(next) => next,
                    Err(source) => {
                        failed.store(true, Ordering::SeqCst);
                        return Err(GraphError::Recompute(source));
                    }
                };
                failed.store(false, Ordering::SeqCst);

                let mut slot = value.write();
                let changed = match slot.as_ref() {
                    Some(prev) => *prev != next,
                    None => true,
                };
                if changed {
                    *slot = Some(next);
                }
                Ok(changed)
            })
        };

        let must_recompute: Box<dyn Fn() -> bool + Send + Sync> = {
            let value = Arc::clone(&value);
            let failed = Arc::clone(&failed);
            Box::new(move || failed.load(Ordering::SeqCst) || value.read().is_none())
        };

        let node = ReactiveNode::new(
            NodeKind::Derived(ComputeHooks {
                recompute,
                must_recompute,
            }),
            NodeOptions::default(),
        );

        Self { node, value }
    }
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The memo's node ID.
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// The graph node backing this memo, for host integrations.
    pub fn node(&self) -> &Arc<ReactiveNode> {
        &self.node
    }

    /// Get the current value, recomputing first if a dependency changed.
    /// Records a dependency on the active consumer if one is tracked.
    ///
    /// # Panics
    ///
    /// Panics if revalidation fails (a fallible computation errored, or
    /// the graph contains a cycle). Use [`try_get`](Self::try_get) to
    /// handle those cases.
    pub fn get(&self) -> T {
        self.try_get().expect("memo revalidation failed")
    }

    /// Fallible variant of [`get`](Self::get).
    pub fn try_get(&self) -> Result<T, GraphError> {
        let validated = self.node.ensure_valid();
        // Record the edge even when revalidation failed, so the reader is
        // still invalidated when this memo recovers.
        self.node.record_read()?;
        validated?;
        let slot = self.value.read();
        Ok(slot.clone().expect("validated memo holds a value"))
    }

    /// Whether the memo has ever produced a value.
    pub fn has_value(&self) -> bool {
        self.value.read().is_some()
    }

    /// Number of producers recorded during the last run.
    pub fn producer_count(&self) -> usize {
        self.node.producer_count()
    }

    /// Number of live consumers currently subscribed to this memo.
    pub fn live_consumer_count(&self) -> usize {
        self.node.live_consumer_count()
    }

    /// Version of the cached value. Increments only on actual change.
    pub fn version(&self) -> u64 {
        self.node.version()
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.node.id())
            .field("has_value", &self.has_value())
            .field("version", &self.version())
            .field("producers", &self.producer_count())
            .finish()
    }
}
