//! Error types for the reactive graph.
//!
//! Every failure surfaces synchronously to the immediate caller. The
//! engine never swallows an error, never retries on its own, and keeps no
//! partial-success state beyond leaving the failing node dirty so that the
//! next read attempts the computation again.

use thiserror::Error;

/// Boxed error produced by a host-supplied computation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A guarded producer was read with no active tracking context and no
    /// untracked override in scope.
    #[error("reactive value was read outside of a tracking context")]
    NoReaderContext,

    /// Revalidation re-entered a node that is already mid-recompute.
    /// The dependency graph must stay acyclic.
    #[error("dependency cycle detected during revalidation")]
    CycleDetected,

    /// A host computation failed. The owning node stays dirty and the
    /// underlying error is handed back unchanged.
    #[error("recomputation of a reactive value failed")]
    Recompute(#[source] BoxError),
}
