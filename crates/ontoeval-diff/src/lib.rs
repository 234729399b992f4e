//! # ontoeval-diff
//!
//! Diff comparison engine for ontoeval.
//!
//! This crate compares a predicted diff (produced by an agent) against a
//! target diff (authored by a curator) for the same task.
//!
//! ## Overview
//!
//! Each diff is reduced to the set of lines it adds or removes:
//! - Context lines, hunk headers and file headers are dropped
//! - Line positions are ignored
//! - Repeated changes within one diff count once
//!
//! The two sets are then partitioned into changes in common and changes
//! unique to each side, and scored with a Jaccard ratio.
//!
//! ## Key Types
//!
//! - [`Change`] - A single added or removed line
//! - [`ParsedDiff`] - The ordered changes extracted from one diff
//! - [`DiffComparison`] - The result of comparing two diffs
//! - [`ComparisonCache`] - Injected cache for comparison results
//!
//! ## Usage
//!
//! ```rust
//! use ontoeval_diff::compare;
//!
//! let comparison = compare("+a\n+b\n", "+a\n+c\n");
//!
//! assert!(!comparison.identical);
//! assert_eq!(comparison.changes_in_common.len(), 1);
//! println!("Similarity: {:.2}", comparison.similarity);
//! ```
//!
//! ## Metadiff Format
//!
//! The merged view tags each change with one leading character:
//! `' '` for common changes, `'<'` for target-only changes and `'>'` for
//! predicted-only changes, followed by the `+`/`-` marker and the text.

mod cache;
mod change;
mod compare;
mod error;
mod parser;
mod render;

pub use cache::{
    CacheError, CacheKey, CacheStatus, CachedComparator, ComparisonCache, MemoryCache,
};
pub use change::{Change, Direction};
pub use compare::{compare, DiffComparison};
pub use error::DiffError;
pub use parser::{normalize_text, parse, DiffInput, ParsedDiff};
pub use render::{render_html, Classification, MetadiffLine};
