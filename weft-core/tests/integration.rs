//! Integration tests for the reactive graph.
//!
//! These exercise signals, memos, and effects together through the public
//! surface: memoization, precise invalidation, eager propagation, edge
//! symmetry under teardown, and dynamic dependency sets.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use weft_core::reactive::{untracked, Effect, GraphError, Memo, Signal};

fn counted_memo<T, F>(compute: F) -> (Memo<T>, Arc<AtomicUsize>)
where
    T: Clone + Send + Sync + PartialEq + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_inner = Arc::clone(&runs);
    let memo = Memo::new(move || {
        runs_inner.fetch_add(1, Ordering::SeqCst);
        compute()
    });
    (memo, runs)
}

/// P1: with no upstream change, reading twice computes at most once.
#[test]
fn memoization_across_reads() {
    let signal = Signal::new(3);
    let (memo, runs) = {
        let signal = signal.clone();
        counted_memo(move || signal.get() * 7)
    };

    assert_eq!(memo.get(), 21);
    assert_eq!(memo.get(), 21);
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // An equal write is not a change.
    signal.set(3);
    assert_eq!(memo.get(), 21);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

/// P2: a consumer that always reads both producers keeps both edges after
/// only one of them changes.
#[test]
fn precise_invalidation_keeps_unchanged_edges() {
    let a = Signal::new(1);
    let b = Signal::new(10);
    let (sum, runs) = {
        let a = a.clone();
        let b = b.clone();
        counted_memo(move || a.get() + b.get())
    };

    assert_eq!(sum.get(), 11);
    assert_eq!(sum.producer_count(), 2);

    a.set(2);
    assert_eq!(sum.get(), 12);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(sum.producer_count(), 2);

    // The edge to `b` survived: a later write to `b` still invalidates.
    b.set(20);
    assert_eq!(sum.get(), 22);
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

/// P3: a write to a producer with a live consumer marks it dirty and fires
/// its notification before the write returns.
#[test]
fn eager_propagation_beats_the_write_returning() {
    let signal = Signal::new(0);
    let notified = Arc::new(AtomicUsize::new(0));
    let effect = {
        let signal = signal.clone();
        let notified = Arc::clone(&notified);
        Effect::with_notify(
            move || {
                let _ = signal.get();
            },
            move || {
                notified.fetch_add(1, Ordering::SeqCst);
            },
        )
    };

    signal.set(1);
    // Both observable effects of the write landed before `set` returned.
    assert!(effect.is_dirty());
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

/// P4: disposing a consumer from the middle of a producer's live list
/// leaves every other consumer's edges intact.
#[test]
fn middle_disposal_leaves_other_edges_intact() {
    let signal = Signal::new(0);

    let make_effect = |log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str| {
        let signal = signal.clone();
        let log = Arc::clone(log);
        Effect::with_notify(
            move || {
                let _ = signal.get();
            },
            move || log.lock().unwrap().push(name),
        )
    };

    let log = Arc::new(Mutex::new(Vec::new()));
    let e1 = make_effect(&log, "e1");
    let e2 = make_effect(&log, "e2");
    let e3 = make_effect(&log, "e3");
    assert_eq!(signal.live_consumer_count(), 3);

    // Swap-remove from the middle: e3's entry moves into e2's slot.
    e2.dispose();
    assert_eq!(signal.live_consumer_count(), 2);

    signal.set(1);
    assert_eq!(*log.lock().unwrap(), vec!["e1", "e3"]);

    e1.run().unwrap();
    e3.run().unwrap();
    assert_eq!(e1.run_count(), 2);
    assert_eq!(e3.run_count(), 2);
    assert_eq!(e2.run_count(), 1);
}

/// P5: immediately repeated reads are idempotent.
#[test]
fn clean_reads_are_idempotent() {
    let signal = Signal::new(5);
    let (memo, runs) = {
        let signal = signal.clone();
        counted_memo(move || signal.get() + 1)
    };

    let first = memo.get();
    let second = memo.get();
    assert_eq!(first, second);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!memo.node().is_dirty());
}

/// Scenario A: a lazy consumer sees a new producer value on its next read,
/// with exactly one recompute.
#[test]
fn lazy_consumer_revalidates_on_pull() {
    let a = Signal::new(0);
    let (c, runs) = {
        let a = a.clone();
        counted_memo(move || a.get() + 100)
    };

    assert_eq!(c.get(), 100);
    assert_eq!(c.producer_count(), 1);
    // Nothing live reads `a`: the write propagates to nobody.
    assert_eq!(a.live_consumer_count(), 0);

    a.set(1);
    assert_eq!(c.get(), 101);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// Scenario B: live consumers are notified in edge-creation order.
#[test]
fn live_consumers_notify_in_creation_order() {
    let a = Signal::new(0);
    let order = Arc::new(Mutex::new(Vec::new()));

    let consumer = |name: &'static str| {
        let a = a.clone();
        let order = Arc::clone(&order);
        Effect::with_notify(
            move || {
                let _ = a.get();
            },
            move || order.lock().unwrap().push(name),
        )
    };

    let _c1 = consumer("c1");
    let _c2 = consumer("c2");

    a.set(2);
    assert_eq!(*order.lock().unwrap(), vec!["c1", "c2"]);
}

/// Scenario C: a dependency read only on some runs falls off the edge
/// table when a run skips it.
#[test]
fn dynamic_dependencies_shrink_with_the_branch() {
    let a = Signal::new(0);
    let b = Signal::new(7);

    let effect = {
        let a = a.clone();
        let b = b.clone();
        Effect::new(move || {
            if a.get() < 10 {
                let _ = b.get();
            }
        })
    };

    assert_eq!(effect.producer_count(), 2);
    assert_eq!(b.live_consumer_count(), 1);

    // The next run takes the other branch and never reads `b`.
    a.set(10);
    effect.run().unwrap();
    assert_eq!(effect.producer_count(), 1);
    assert_eq!(b.live_consumer_count(), 0);

    // Changing `b` now leaves the effect untouched.
    b.set(8);
    assert!(!effect.is_dirty());
}

/// Liveness is transitive: an effect over a memo subscribes the memo to
/// its signal, and disposal cascades the unsubscribe.
#[test]
fn liveness_flows_through_intermediate_memos() {
    let signal = Signal::new(1);
    let memo = {
        let signal = signal.clone();
        Memo::new(move || signal.get() * 2)
    };
    assert_eq!(memo.get(), 2);
    assert_eq!(signal.live_consumer_count(), 0);

    let effect = {
        let memo = memo.clone();
        Effect::new(move || {
            let _ = memo.get();
        })
    };
    assert_eq!(memo.live_consumer_count(), 1);
    assert_eq!(signal.live_consumer_count(), 1);

    // A write now reaches the effect through the memo, eagerly.
    signal.set(3);
    assert!(effect.is_dirty());
    effect.run().unwrap();
    assert_eq!(effect.run_count(), 2);

    effect.dispose();
    assert_eq!(memo.live_consumer_count(), 0);
    assert_eq!(signal.live_consumer_count(), 0);
}

/// Untracked reads establish no dependency at all.
#[test]
fn untracked_reads_are_invisible_to_the_graph() {
    let tracked = Signal::new(1);
    let peeked = Signal::new(2);

    let effect = {
        let tracked = tracked.clone();
        let peeked = peeked.clone();
        Effect::new(move || {
            let _ = tracked.get();
            let _ = untracked(|| peeked.get());
        })
    };

    assert_eq!(effect.producer_count(), 1);
    peeked.set(9);
    assert!(!effect.is_dirty());

    tracked.set(5);
    assert!(effect.is_dirty());
}

/// A failing computation surfaces to the reader and is retried, not
/// cached.
#[test]
fn failures_propagate_and_leave_the_node_dirty() {
    let input = Signal::new(2);
    let memo = {
        let input = input.clone();
        Memo::fallible(move || {
            let v = input.get();
            if v == 0 {
                Err("division by zero".into())
            } else {
                Ok(100 / v)
            }
        })
    };

    assert_eq!(memo.try_get().unwrap(), 50);

    input.set(0);
    assert!(matches!(memo.try_get(), Err(GraphError::Recompute(_))));
    assert!(memo.node().is_dirty());

    input.set(4);
    assert_eq!(memo.try_get().unwrap(), 25);
    assert!(!memo.node().is_dirty());
}

/// Mutually dependent memos are reported as a cycle instead of recursing
/// forever.
#[test]
fn mutual_memos_report_a_cycle() {
    use std::sync::OnceLock;
    use weft_core::reactive::BoxError;

    let slot: Arc<OnceLock<Memo<i32>>> = Arc::new(OnceLock::new());

    let forward = {
        let slot = Arc::clone(&slot);
        Memo::fallible(move || match slot.get() {
            Some(back) => back.try_get().map_err(|e| Box::new(e) as BoxError),
            None => Ok(0),
        })
    };
    let backward = {
        let forward = forward.clone();
        Memo::fallible(move || forward.try_get().map_err(|e| Box::new(e) as BoxError))
    };
    let _ = slot.set(backward.clone());

    let err = backward.try_get().unwrap_err();
    assert!(matches!(err, GraphError::Recompute(_)));
}
