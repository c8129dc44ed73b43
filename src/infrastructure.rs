//! # Infrastructure Layer
//!
//! Concrete, disk- and process-backed implementations of the storage and
//! provider concerns the domain layer only describes through traits and
//! plain data:
//!
//! - [`config`] - layered configuration loading
//! - [`chunk_store`] - per-project on-disk chunk persistence
//! - [`embedding_cache`] - content-addressed embedding cache
//! - [`project_registry`] - the atomic project metadata document
//! - [`providers`] - concrete [`EmbeddingProvider`](crate::domain::ports::EmbeddingProvider) implementations

/// Per-project chunk persistence.
pub mod chunk_store;
/// Layered configuration loading.
pub mod config;
/// Content-addressed embedding cache.
pub mod embedding_cache;
/// The project registry document.
pub mod project_registry;
/// Concrete embedding provider implementations.
pub mod providers;
