//! Reactive Primitives
//!
//! This module implements the reactive dependency graph: signals, memos,
//! and effects on top of a shared, type-erased node record.
//!
//! # Concepts
//!
//! ## Producers and consumers
//!
//! Every participant in the graph is a [`ReactiveNode`]. A node may act as
//! a producer (its value can be read and tracked), a consumer (it reads
//! other nodes during its computation), or both. Signals are pure
//! producers, effects are pure consumers, and memos are both.
//!
//! ## Dependency discovery
//!
//! A computation runs inside a [`TrackingScope`]. Any producer read while
//! the scope is active records an edge to the computation at the current
//! slot position. Slots are reused positionally across runs and trailing
//! slots are truncated when the scope ends, so a computation's dependency
//! set can grow and shrink with the branches it actually executed.
//!
//! ## Staleness
//!
//! Each node carries a `version` (bumped only when its own value actually
//! changes) and the version of every producer it observed at its last run.
//! A global epoch counter advances once per actual value change, letting a
//! node skip re-validation entirely when nothing anywhere has changed
//! since it was last confirmed valid.
//!
//! ## Liveness
//!
//! Consumers that must not wait for a pull (effects, and anything a live
//! consumer depends on) are "live": they are subscribed into their
//! producers' live-consumer lists and are marked dirty synchronously the
//! moment an upstream value changes. Everything else discovers staleness
//! lazily on its next read.

mod context;
mod edges;
mod effect;
mod engine;
mod error;
pub mod epoch;
mod memo;
mod node;
mod signal;

pub use context::{is_tracking, untracked, TrackingScope};
pub use effect::Effect;
pub use error::{BoxError, GraphError};
pub use memo::Memo;
pub use node::{ComputeHooks, Hook, NodeId, NodeKind, NodeOptions, ReactiveNode};
pub use signal::Signal;
