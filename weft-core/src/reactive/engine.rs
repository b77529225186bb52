//! Staleness checking, recomputation, and dirty propagation.
//!
//! # Pull: revalidation
//!
//! [`ensure_valid`] is the single entry point for "give me this node
//! valid". Per call a node is in one of three states:
//!
//! 1. **Clean**: live and not dirty, or already validated at the current
//!    epoch. The cached value is returned untouched; no hooks run.
//! 2. **Maybe stale**: a producer walk confirms every observed version is
//!    unchanged. The node is marked clean without recomputing.
//! 3. **Stale**: some producer's value changed (or the node's own state
//!    forces it). The computation re-runs inside a fresh tracking scope,
//!    re-declaring its producer set as it goes.
//!
//! Producers are checked in the exact order they were recorded during the
//! last run, left-to-right and depth-first. The order has no effect on the
//! staleness verdict but determines which stale producer recomputes first,
//! which is observable through side-effecting computations.
//!
//! # Push: invalidation
//!
//! [`propagate_dirty`] walks a producer's live consumers the instant its
//! value changes, marking each dirty and invoking its `on_marked_dirty`
//! hook, then recursing through the live subgraph. Non-live consumers are
//! never visited; they discover staleness on their next read. Propagation
//! completes before the triggering write returns.
//!
//! The push path performs no cycle detection; callers must not construct
//! cyclic live subgraphs. The pull path does: re-entering a node that is
//! mid-recompute fails with [`GraphError::CycleDetected`].

use std::sync::Arc;

use tracing::trace;

use super::context::TrackingScope;
use super::edges;
use super::epoch;
use super::error::GraphError;
use super::node::ReactiveNode;

/// Revalidates `node`, recomputing it only if a dependency actually
/// changed. On failure the node stays dirty so the next read retries.
pub(crate) fn ensure_valid(node: &Arc<ReactiveNode>) -> Result<(), GraphError> {
    // Live nodes are kept current by push notification: a clear dirty
    // flag is authoritative.
    if node.is_live() && !node.is_dirty() {
        return Ok(());
    }

    // Already confirmed valid during the current epoch.
    if !node.is_dirty() && node.last_clean_epoch() == epoch::current() {
        return Ok(());
    }

    if !node.must_recompute() && !poll_producers_for_change(node)? {
        node.mark_clean(epoch::current());
        return Ok(());
    }

    recompute(node)
}

/// Walks `node`'s producers in recorded order, forcing each up to date,
/// and reports whether any version no longer matches the one observed at
/// last read.
fn poll_producers_for_change(node: &Arc<ReactiveNode>) -> Result<bool, GraphError> {
    let len = node.deps().len();
    for slot in 0..len {
        let (producer, seen_version) = {
            let deps = node.deps();
            match deps.get(slot) {
                Some(edge) => (Arc::clone(&edge.producer), edge.last_read_version),
                None => break,
            }
        };

        // Cheap comparison first; then revalidate the producer, since a
        // lazily recomputed producer only bumps its version once pulled.
        if seen_version != producer.version() {
            return Ok(true);
        }
        ensure_valid(&producer)?;
        if seen_version != producer.version() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Re-executes `node`'s computation inside a fresh tracking scope and
/// publishes the outcome: a changed value bumps the node's version,
/// advances the global epoch, and eagerly invalidates live consumers.
fn recompute(node: &Arc<ReactiveNode>) -> Result<(), GraphError> {
    let Some(hooks) = node.kind().compute_hooks() else {
        // Source nodes have nothing to recompute.
        node.mark_clean(epoch::current());
        return Ok(());
    };

    if node.begin_recompute() {
        return Err(GraphError::CycleDetected);
    }
    let _busy = RecomputeGuard(node);

    trace!(node = %node.id(), "recompute");
    let changed = {
        let _scope = TrackingScope::enter(Arc::clone(node));
        (hooks.recompute)()?
    };

    if changed {
        node.bump_version();
        let now = epoch::advance();
        node.mark_clean(now);
        trace!(node = %node.id(), version = node.version(), "value changed");
        if node.is_live() {
            propagate_dirty(node);
        }
    } else {
        node.mark_clean(epoch::current());
    }
    Ok(())
}

/// Clears the mid-recompute marker, including on unwind.
struct RecomputeGuard<'a>(&'a ReactiveNode);

impl Drop for RecomputeGuard<'_> {
    fn drop(&mut self) {
        self.0.end_recompute();
    }
}

/// Synchronously invalidates the live subgraph below `node`: each live
/// consumer is marked dirty, has its `on_marked_dirty` hook invoked, and
/// is then walked in turn. Consumers are visited in the order their edges
/// were created.
pub(crate) fn propagate_dirty(node: &Arc<ReactiveNode>) {
    trace!(node = %node.id(), "propagate dirty");
    let mut index = 0;
    loop {
        let entry = {
            let subs = node.subs();
            subs.get(index).map(|edge| edge.consumer.clone())
        };
        let Some(weak) = entry else { break };

        let Some(consumer) = weak.upgrade() else {
            // The consumer was dropped without disconnecting; compact the
            // dead entry and revisit this index.
            edges::remove_live_consumer(node, index);
            continue;
        };

        consumer.mark_dirty();
        consumer.notify_marked_dirty();
        propagate_dirty(&consumer);
        index += 1;
    }
}
