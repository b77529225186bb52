//! Bidirectional edge bookkeeping.
//!
//! Each dependency is recorded on both sides: the consumer keeps a
//! producer edge (producer reference, version observed at last read, and
//! the index this consumer occupies in the producer's live-consumer list),
//! and a live producer keeps the mirroring consumer edge with a
//! back-reference into the consumer's producer list. The paired indices
//! make every add and remove O(1) amortized: removal is a swap-remove
//! that patches the single back-reference the swap disturbed.
//!
//! Non-live consumers keep their producer edges (so staleness can be
//! polled on the next read) but are not subscribed on the producer side.
//! Liveness is transitive: when a consumer gains its first live consumer
//! it becomes live itself and retroactively subscribes to its own
//! producers, and it unsubscribes when the last one goes away.
//!
//! The consumer side holds `Weak` references, so a producer never keeps a
//! dropped consumer alive; dead entries are compacted when the dirty
//! propagator next walks them.

use std::sync::{Arc, Weak};

use smallvec::SmallVec;

use super::node::ReactiveNode;

/// Marker for a producer edge with no live-consumer subscription.
pub(crate) const NOT_LIVE: usize = usize::MAX;

/// An upstream edge held by a consumer.
pub(crate) struct ProducerEdge {
    pub(crate) producer: Arc<ReactiveNode>,
    /// The producer's `version` as observed at last read.
    pub(crate) last_read_version: u64,
    /// Index of this consumer in `producer`'s live-consumer list, or
    /// [`NOT_LIVE`] if the consumer was not subscribed when it read.
    pub(crate) live_index: usize,
}

/// A downstream edge held by a producer for one live consumer.
pub(crate) struct ConsumerEdge {
    pub(crate) consumer: Weak<ReactiveNode>,
    /// Index of the producer in `consumer`'s producer list.
    pub(crate) back_index: usize,
}

pub(crate) type DepList = SmallVec<[ProducerEdge; 2]>;
pub(crate) type SubList = SmallVec<[ConsumerEdge; 2]>;

/// Records that `consumer` read `producer` at producer-slot `slot`.
///
/// If the slot already holds this producer the edge is reused and only the
/// observed version refreshed. Otherwise the slot is overwritten (dropping
/// the old live subscription if there was one) or appended, and a live
/// consumer is subscribed on the producer side.
pub(crate) fn record_dependency(
    consumer: &Arc<ReactiveNode>,
    producer: &Arc<ReactiveNode>,
    slot: usize,
) {
    debug_assert!(
        !Arc::ptr_eq(consumer, producer),
        "a node cannot depend on itself"
    );

    {
        let mut deps = consumer.deps();
        if let Some(edge) = deps.get_mut(slot) {
            if Arc::ptr_eq(&edge.producer, producer) {
                edge.last_read_version = producer.version();
                return;
            }
        }
    }

    let live = consumer.is_live();

    // Replacing a different producer at this slot: drop its live
    // subscription before overwriting the edge.
    let replaced = {
        let deps = consumer.deps();
        deps.get(slot)
            .map(|edge| (Arc::clone(&edge.producer), edge.live_index))
    };
    if let Some((old_producer, old_live_index)) = replaced {
        if old_live_index != NOT_LIVE {
            remove_live_consumer(&old_producer, old_live_index);
        }
    }

    let live_index = if live {
        add_live_consumer(producer, Arc::downgrade(consumer), slot)
    } else {
        NOT_LIVE
    };

    let edge = ProducerEdge {
        producer: Arc::clone(producer),
        last_read_version: producer.version(),
        live_index,
    };
    let mut deps = consumer.deps();
    if slot < deps.len() {
        deps[slot] = edge;
    } else {
        debug_assert_eq!(slot, deps.len(), "producer slots must be contiguous");
        deps.push(edge);
    }
}

/// Appends `consumer` to `producer`'s live-consumer list and returns the
/// index it was stored at. `back_index` is the slot the producer occupies
/// in the consumer's producer list.
///
/// Going from zero to one live consumers makes a non-always-live producer
/// live itself, so it retroactively subscribes to its own producers.
pub(crate) fn add_live_consumer(
    producer: &Arc<ReactiveNode>,
    consumer: Weak<ReactiveNode>,
    back_index: usize,
) -> usize {
    if !producer.is_live() {
        let dep_count = producer.deps().len();
        for slot in 0..dep_count {
            let upstream = {
                let deps = producer.deps();
                Arc::clone(&deps[slot].producer)
            };
            let live_index = add_live_consumer(&upstream, Arc::downgrade(producer), slot);
            producer.deps()[slot].live_index = live_index;
        }
    }

    let mut subs = producer.subs();
    subs.push(ConsumerEdge {
        consumer,
        back_index,
    });
    subs.len() - 1
}

/// Removes the live-consumer entry at `index` by swap-remove, patching the
/// back-reference of whichever entry the swap moved into `index`.
///
/// Going from one to zero live consumers makes a non-always-live producer
/// non-live, so it first drops its own upstream subscriptions.
pub(crate) fn remove_live_consumer(producer: &Arc<ReactiveNode>, index: usize) {
    let dropping_last = {
        let subs = producer.subs();
        debug_assert!(index < subs.len(), "live-consumer index out of range");
        subs.len() == 1
    };

    if dropping_last && !producer.always_live() {
        let dep_count = producer.deps().len();
        for slot in 0..dep_count {
            // Re-read per slot: removals upstream may have patched our
            // live indices in the meantime.
            let (upstream, live_index) = {
                let deps = producer.deps();
                let edge = &deps[slot];
                (Arc::clone(&edge.producer), edge.live_index)
            };
            if live_index != NOT_LIVE {
                remove_live_consumer(&upstream, live_index);
                producer.deps()[slot].live_index = NOT_LIVE;
            }
        }
    }

    let moved = {
        let mut subs = producer.subs();
        subs.swap_remove(index);
        subs.get(index)
            .map(|edge| (edge.consumer.clone(), edge.back_index))
    };

    if let Some((weak, back_index)) = moved {
        if let Some(consumer) = weak.upgrade() {
            let mut deps = consumer.deps();
            if let Some(edge) = deps.get_mut(back_index) {
                edge.live_index = index;
            }
        }
    }
}

/// Drops producer edges at and beyond `new_len`, unsubscribing any live
/// ones. Called when a run read fewer producers than the previous one, and
/// with `new_len == 0` on disconnect.
pub(crate) fn truncate_producers(consumer: &Arc<ReactiveNode>, new_len: usize) {
    let len = consumer.deps().len();
    for slot in new_len..len {
        let (producer, live_index) = {
            let deps = consumer.deps();
            let edge = &deps[slot];
            (Arc::clone(&edge.producer), edge.live_index)
        };
        if live_index != NOT_LIVE {
            remove_live_consumer(&producer, live_index);
        }
    }
    consumer.deps().truncate(new_len);
}
