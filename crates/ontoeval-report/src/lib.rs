//! Benchmark records and their reports.
//!
//! A [`BenchmarkRecord`] owns one target diff (from the merged pull request)
//! and one predicted diff (from the agent). Judge results are attached to it
//! and the record is persisted as JSON or rendered as Markdown. Result files
//! from several experiment runs are merged with [`CombinedResults`].

mod combine;
mod markdown;
mod record;

pub use combine::{
    experiment_id_for, CombineOptions, CombinedResults, ExperimentRun, DEFAULT_COMBINE_COLUMNS,
};
pub use markdown::{render_change, render_markdown, write_markdown};
pub use record::{BenchmarkFile, BenchmarkRecord, LinkedIssue, ReportError};
