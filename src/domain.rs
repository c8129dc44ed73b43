//! # Domain Layer
//!
//! Core types and business logic for semantic code search, independent of
//! any storage backend or transport:
//!
//! - [`chunking`] - line-windowed chunking and sub-project detection
//! - [`error`] - the error model shared by every layer
//! - [`ports`] - trait contracts for external collaborators (embedding
//!   providers)
//! - [`types`] - value types: embeddings, chunk records, jobs, results
//!
//! ```rust
//! use code_search_core::domain::types::{ChunkType, Language};
//!
//! assert_eq!(Language::from_extension("py"), Language::Python);
//! ```

/// Line-windowed chunking and sub-project detection.
pub mod chunking;
/// The error model shared by every layer.
pub mod error;
/// Trait contracts for external collaborators.
pub mod ports;
/// Value types: embeddings, chunk records, jobs, results.
pub mod types;

pub use error::{Error, Result};
