//! Discovery seam for output implementations.
//!
//! Discovery is an external collaborator (a plugin registry, a static list,
//! a backend probe); this crate only consumes it. Candidates come back in
//! one of two ownership modes, each with its own handle shape, so callers
//! never juggle a raw handle plus a remembered convention.

use std::sync::Arc;

use crate::output::AudioOutput;

/// Managed handle: shared lifetime, released when the last clone drops.
pub type SharedOutput = Arc<dyn AudioOutput>;

/// Unmanaged handle: exclusive ownership, released by dropping.
pub type OwnedOutput = Box<dyn AudioOutput>;

/// Enumerates candidate output implementations.
///
/// Each query is a fresh enumeration; implementations must not hand out the
/// same unmanaged instance twice.
pub trait OutputDiscovery: Send + Sync {
    /// All candidates as shared handles.
    fn query_shared(&self) -> Vec<SharedOutput>;

    /// All candidates as exclusively owned handles.
    fn query_owned(&self) -> Vec<OwnedOutput>;
}
