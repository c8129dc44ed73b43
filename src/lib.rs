//! Code search core: chunking, embedding, content-addressed caching, an
//! in-memory vector index, and the background indexing pipeline behind a
//! semantic code search service.
//!
//! The RPC transport, CLI flag surface beyond the bundled binary, and the
//! production embedding backend are external collaborators; this crate
//! implements the chunking/embedding/indexing/search core and a thin
//! request dispatcher other layers compose against.

/// Composes the core components into the operations an external caller
/// invokes.
pub mod application;
/// Core domain types, errors, and the chunking and embedding-port
/// contracts.
pub mod domain;
/// Background indexing pipeline: the indexer and its priority queue.
pub mod indexing;
/// Disk-backed stores: configuration, embedding cache, chunk store, and
/// project registry.
pub mod infrastructure;
/// Structured logging setup.
pub mod telemetry;
/// Concurrent in-memory vector storage and similarity search.
pub mod vector_index;

pub use application::RequestDispatcher;
pub use domain::error::{Error, Result};
