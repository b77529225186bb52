//! Weft Core
//!
//! This crate provides the reactive core of the Weft UI runtime: a
//! fine-grained dependency-tracking graph for incremental computation.
//!
//! It implements:
//!
//! - Reactive primitives (signals, memos, effects)
//! - Automatic dependency discovery at read time
//! - Pull-based revalidation with version/epoch staleness checks
//! - Push-based invalidation of live consumers
//!
//! The host application (component tree, renderer, scheduler) sits outside
//! this crate and talks to it only through reads, writes, and the hooks
//! supplied at node creation. The core itself performs no I/O.
//!
//! # Architecture
//!
//! Everything lives in the `reactive` module:
//!
//! - `node`: the shared node record and kind dispatch
//! - `edges`: bidirectional edge bookkeeping
//! - `context`: the thread-local tracking context
//! - `epoch`: the global change counter
//! - `engine`: staleness checking, recomputation, and dirty propagation
//! - `signal` / `memo` / `effect`: the typed primitives built on top
//!
//! # Example
//!
//! ```rust
//! use weft_core::reactive::{Signal, Memo, Effect};
//!
//! let count = Signal::new(1);
//!
//! let doubled = {
//!     let count = count.clone();
//!     Memo::new(move || count.get() * 2)
//! };
//!
//! let effect = {
//!     let doubled = doubled.clone();
//!     Effect::new(move || {
//!         let _ = doubled.get();
//!     })
//! };
//!
//! count.set(5);
//! effect.run().unwrap();
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod reactive;
