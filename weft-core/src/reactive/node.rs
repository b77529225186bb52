//! The shared node record.
//!
//! Every participant in the reactive graph is a [`ReactiveNode`]: signals,
//! memos, effects, and any custom consumer the host builds on the raw
//! layer. The node carries the bookkeeping the engine needs (version,
//! dirty flag, epoch stamp, edge lists) while the typed value itself lives
//! in the wrapper whose hook closures capture it.
//!
//! # Kind dispatch
//!
//! The differences between a plain value cell, a derived computation, and
//! an effect are expressed as a tagged [`NodeKind`] with the recompute
//! hooks stored in each variant's payload. The engine only ever asks two
//! questions of a kind: "must this node recompute regardless of producer
//! versions?" and "re-execute the computation; did the value change?".
//!
//! # State
//!
//! - `version` increments only when the node's own value actually changes,
//!   never on a revalidation that confirms the cached value.
//! - `dirty == true` means the cached value must not be trusted before the
//!   engine has revalidated the node.
//! - `last_clean_epoch` is the global epoch at which the node was last
//!   confirmed valid.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};

use super::context;
use super::edges::{DepList, SubList};
use super::engine;
use super::error::GraphError;

/// Counter for generating unique node IDs.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a node, used for diagnostics and tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        Self(NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A hook invoked by the engine with no arguments and no result.
pub type Hook = Box<dyn Fn() + Send + Sync>;

/// The recompute hooks carried by computing node kinds.
pub struct ComputeHooks {
    /// Re-executes the node's computation. Runs inside a fresh tracking
    /// scope with the node as the active consumer. Returns whether the
    /// node's value changed, by the node's own equality policy.
    pub recompute: Box<dyn Fn() -> Result<bool, GraphError> + Send + Sync>,

    /// Forces recomputation regardless of producer versions. Used by nodes
    /// whose cached state is unusable: never computed, or left over from a
    /// failed run.
    pub must_recompute: Box<dyn Fn() -> bool + Send + Sync>,
}

/// The kind of node in the dependency graph.
pub enum NodeKind {
    /// A leaf value cell (signal). Roots of the graph: no producers, never
    /// recomputes.
    Source,

    /// A cached derived computation (memo). Reads producers and may itself
    /// be read.
    Derived(ComputeHooks),

    /// A side-effecting consumer (effect). Reads producers but is never
    /// read; kept current by push notification.
    Effect(ComputeHooks),
}

impl NodeKind {
    /// The recompute hooks, for kinds that compute.
    pub(crate) fn compute_hooks(&self) -> Option<&ComputeHooks> {
        match self {
            NodeKind::Source => None,
            NodeKind::Derived(hooks) | NodeKind::Effect(hooks) => Some(hooks),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            NodeKind::Source => "Source",
            NodeKind::Derived(_) => "Derived",
            NodeKind::Effect(_) => "Effect",
        }
    }
}

/// Options supplied at node creation.
#[derive(Default)]
pub struct NodeOptions {
    /// Keep this consumer eagerly valid even when nothing reads it.
    pub always_live: bool,

    /// Reject reads that happen outside a tracking context (and outside an
    /// `untracked` override).
    pub require_reader: bool,

    /// Invoked when the dirty propagator marks this node dirty. This is
    /// the host's scheduling hook.
    pub on_marked_dirty: Option<Hook>,

    /// Invoked when this node, as the active consumer, reads a producer.
    /// An observability extension point, not required for correctness.
    pub on_signal_read: Option<Hook>,
}

/// A node in the reactive dependency graph.
pub struct ReactiveNode {
    id: NodeId,
    kind: NodeKind,
    always_live: bool,
    require_reader: bool,
    /// Back-reference to the owning `Arc`, so `&self` methods can mint
    /// the strong references the edge tables store.
    self_ref: Weak<ReactiveNode>,

    version: AtomicU64,
    dirty: AtomicBool,
    last_clean_epoch: AtomicU64,
    /// Set while the engine is recomputing this node; re-entry means the
    /// graph has a cycle.
    recomputing: AtomicBool,

    /// Upstream edges: producers read during the last run.
    deps: Mutex<DepList>,
    /// Downstream edges: live consumers subscribed to this node.
    subs: Mutex<SubList>,

    on_marked_dirty: Option<Hook>,
    on_signal_read: Option<Hook>,
}

impl ReactiveNode {
    /// Create a node. Source nodes start clean; computing nodes start
    /// dirty so their first read runs the computation.
    pub fn new(kind: NodeKind, options: NodeOptions) -> Arc<Self> {
        let dirty = !matches!(kind, NodeKind::Source);
        Arc::new_cyclic(|self_ref| Self {
            id: NodeId::new(),
            kind,
            always_live: options.always_live,
            require_reader: options.require_reader,
            self_ref: self_ref.clone(),
            version: AtomicU64::new(0),
            dirty: AtomicBool::new(dirty),
            last_clean_epoch: AtomicU64::new(0),
            recomputing: AtomicBool::new(false),
            deps: Mutex::new(DepList::new()),
            subs: Mutex::new(SubList::new()),
            on_marked_dirty: options.on_marked_dirty,
            on_signal_read: options.on_signal_read,
        })
    }

    /// Get the node's unique ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's kind.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Version of the node's value. Increments only on actual change.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }

    /// Whether the node is known to need revalidation before its cached
    /// value can be trusted.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// The epoch at which the node was last confirmed valid.
    pub fn last_clean_epoch(&self) -> u64 {
        self.last_clean_epoch.load(Ordering::Relaxed)
    }

    /// Whether this consumer is always kept live.
    pub fn always_live(&self) -> bool {
        self.always_live
    }

    /// Live means eager propagation applies: either the node is always
    /// live, or some live consumer currently depends on it.
    pub fn is_live(&self) -> bool {
        self.always_live || !self.subs.lock().is_empty()
    }

    /// Number of producers recorded during the last run.
    pub fn producer_count(&self) -> usize {
        self.deps.lock().len()
    }

    /// Number of live consumers currently subscribed.
    pub fn live_consumer_count(&self) -> usize {
        self.subs.lock().len()
    }

    /// Records a read of this node against the active consumer, if any.
    /// Fails with [`GraphError::NoReaderContext`] for guarded nodes read
    /// with no tracking context and no untracked override.
    pub fn record_read(&self) -> Result<(), GraphError> {
        context::producer_accessed(self)
    }

    /// Revalidates this node's cached value, recomputing it if a
    /// dependency actually changed.
    pub fn ensure_valid(&self) -> Result<(), GraphError> {
        engine::ensure_valid(&self.arc())
    }

    /// Records that this producer's value changed: bumps the version,
    /// advances the global epoch, and eagerly notifies live consumers
    /// before returning.
    pub fn value_changed(&self) {
        self.bump_version();
        super::epoch::advance();
        if self.is_live() {
            engine::propagate_dirty(&self.arc());
        }
    }

    /// Removes all of this node's producer edges and detaches it from its
    /// producers' live-consumer lists. Used when the owning computation is
    /// torn down.
    pub fn disconnect(&self) {
        super::edges::truncate_producers(&self.arc(), 0);
    }

    pub(crate) fn arc(&self) -> Arc<ReactiveNode> {
        self.self_ref
            .upgrade()
            .expect("reactive node outlived its Arc")
    }

    pub(crate) fn require_reader(&self) -> bool {
        self.require_reader
    }

    pub(crate) fn deps(&self) -> MutexGuard<'_, DepList> {
        self.deps.lock()
    }

    pub(crate) fn subs(&self) -> MutexGuard<'_, SubList> {
        self.subs.lock()
    }

    pub(crate) fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mark_clean(&self, epoch: u64) {
        self.dirty.store(false, Ordering::SeqCst);
        self.last_clean_epoch.store(epoch, Ordering::Relaxed);
    }

    pub(crate) fn bump_version(&self) {
        self.version.fetch_add(1, Ordering::Relaxed);
    }

    /// Flags the node as mid-recompute. Returns true if it already was,
    /// which means revalidation re-entered it through a cycle.
    pub(crate) fn begin_recompute(&self) -> bool {
        self.recomputing.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn end_recompute(&self) {
        self.recomputing.store(false, Ordering::SeqCst);
    }

    pub(crate) fn must_recompute(&self) -> bool {
        match self.kind.compute_hooks() {
            Some(hooks) => (hooks.must_recompute)(),
            None => false,
        }
    }

    pub(crate) fn notify_marked_dirty(&self) {
        if let Some(hook) = &self.on_marked_dirty {
            hook();
        }
    }

    pub(crate) fn notify_signal_read(&self) {
        if let Some(hook) = &self.on_signal_read {
            hook();
        }
    }
}

impl fmt::Debug for ReactiveNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveNode")
            .field("id", &self.id)
            .field("kind", &self.kind.name())
            .field("version", &self.version())
            .field("dirty", &self.is_dirty())
            .field("producers", &self.producer_count())
            .field("live_consumers", &self.live_consumer_count())
            .finish()
    }
}
