//! Signals: leaf producers.
//!
//! A signal is a container for a plain value at the root of the graph. It
//! has no producers of its own and never recomputes.
//!
//! # How signals work
//!
//! 1. When a signal is read inside a tracking scope, an edge is recorded
//!    from the signal to the active consumer.
//!
//! 2. When the value is written, the signal's version is bumped, the
//!    global epoch advances, and live consumers are marked dirty before
//!    the write returns. A write of an equal value does none of this.
//!
//! 3. Lazy consumers discover the change on their next read by comparing
//!    the signal's version against the one they observed last.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::GraphError;
use super::node::{NodeId, NodeKind, NodeOptions, ReactiveNode};

/// A reactive leaf value.
///
/// Cloning a signal produces a handle to the same underlying value and
/// graph node.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// assert_eq!(count.get(), 0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    node: Arc<ReactiveNode>,
    value: Arc<RwLock<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self::with_options(value, NodeOptions::default())
    }

    /// Create a signal that rejects reads outside a tracking context
    /// (unless wrapped in [`untracked`](super::untracked)).
    pub fn guarded(value: T) -> Self {
        Self::with_options(
            value,
            NodeOptions {
                require_reader: true,
                ..Default::default()
            },
        )
    }

    fn with_options(value: T, options: NodeOptions) -> Self {
        Self {
            node: ReactiveNode::new(NodeKind::Source, options),
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// The signal's node ID.
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// The graph node backing this signal, for host integrations.
    pub fn node(&self) -> &Arc<ReactiveNode> {
        &self.node
    }

    /// Get the current value, recording a dependency on the active
    /// consumer if one is being tracked.
    ///
    /// # Panics
    ///
    /// Panics if this is a guarded signal read outside a tracking context.
    /// Use [`try_get`](Self::try_get) to handle that case.
    pub fn get(&self) -> T {
        self.try_get()
            .expect("guarded signal read outside a tracking context")
    }

    /// Fallible variant of [`get`](Self::get).
    pub fn try_get(&self) -> Result<T, GraphError> {
        self.node.ensure_valid()?;
        self.node.record_read()?;
        Ok(self.value.read().clone())
    }

    /// Get the current value without recording a dependency.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Set a new value.
    ///
    /// If the value differs from the current one, the signal's version is
    /// bumped, the epoch advances, and live consumers are notified before
    /// this call returns. Writing an equal value is a no-op.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        let changed = {
            let mut guard = self.value.write();
            if *guard == value {
                false
            } else {
                *guard = value;
                true
            }
        };
        if changed {
            self.node.value_changed();
        }
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
        T: PartialEq,
    {
        let new_value = {
            let guard = self.value.read();
            f(&guard)
        };
        self.set(new_value);
    }

    /// Number of live consumers currently subscribed to this signal.
    pub fn live_consumer_count(&self) -> usize {
        self.node.live_consumer_count()
    }

    /// Version of the stored value. Increments only on actual change.
    pub fn version(&self) -> u64 {
        self.node.version()
    }
}

impl<T> Clone for Signal<T>
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

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.node.id())
            .field("value", &self.get_untracked())
            .field("version", &self.version())
            .field("live_consumers", &self.live_consumer_count())
            .finish()
    }
}
