//! Concrete [`EmbeddingProvider`](crate::domain::ports::EmbeddingProvider)
//! implementations shipped with this crate.
//!
//! The real production embedding backend is an external collaborator
//! (see the crate-level documentation); these two implementations make
//! the indexing and search pipeline runnable and testable end to end
//! without one.

/// A deterministic, hash-derived provider with no external dependencies.
pub mod deterministic;
/// A local embedding provider backed by the `fastembed` crate.
#[cfg(feature = "fastembed-provider")]
pub mod fastembed_provider;

pub use deterministic::DeterministicHashProvider;
#[cfg(feature = "fastembed-provider")]
pub use fastembed_provider::FastEmbedProvider;
