//! Line-windowed code chunking.
//!
//! Splits source files into fixed-size, overlapping line windows rather
//! than parsing a syntax tree: the window boundaries are the same for
//! every language, and only the chunk-type inference table in
//! [`windows::infer_chunk_type`] varies by [`Language`](crate::domain::types::Language).
//! This keeps chunk boundaries stable across a file edit that only
//! touches a few lines, which a tree-sitter re-parse would not guarantee.
//!
//! [`subproject`] additionally detects nested packages (currently Swift
//! packages) within a project root so each is indexed under its own
//! project id.

/// Sub-project boundary detection.
pub mod subproject;
/// Fixed-size overlapping line windows and chunk-type inference.
pub mod windows;

pub use windows::{Chunker, ChunkerConfig};
