use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::parser::{normalize_text, DiffInput, ParsedDiff};
use crate::render::{build_metadiff, render_html, MetadiffLine};
use crate::{Change, DiffError};

/// Result of comparing a target diff (diff1) with a predicted diff (diff2)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffComparison {
    /// Both diffs normalize to exactly the same text
    pub identical: bool,
    /// Jaccard similarity of the two change sets, between 0 and 1
    pub similarity: f64,
    /// Changes present in both diffs, in diff1 order
    pub changes_in_common: Vec<Change>,
    /// Changes present only in diff1 (the target)
    pub changes_in_diff1: Vec<Change>,
    /// Changes present only in diff2 (the prediction)
    pub changes_in_diff2: Vec<Change>,
    pub metadiff: Vec<String>,
    pub metadiff_color_html: String,
}

impl DiffComparison {
    /// Parse the metadiff strings back into classified lines
    pub fn metadiff_lines(&self) -> Result<Vec<MetadiffLine>, DiffError> {
        self.metadiff.iter().map(|l| MetadiffLine::parse(l)).collect()
    }

    /// Number of distinct changes across both diffs
    pub fn union_size(&self) -> usize {
        self.changes_in_common.len() + self.changes_in_diff1.len() + self.changes_in_diff2.len()
    }

    /// One-line description for logs and terminal output
    pub fn summary(&self) -> String {
        let verdict = if self.identical {
            "identical".to_string()
        } else {
            format!("similarity {:.0}%", self.similarity * 100.0)
        };
        format!(
            "{} ({} in common, {} unique to target, {} unique to prediction)",
            verdict,
            self.changes_in_common.len(),
            self.changes_in_diff1.len(),
            self.changes_in_diff2.len()
        )
    }
}

/// Compare two diffs given as text or as lists of lines.
///
/// Repeated changes within one diff count once. When neither diff contains
/// any change the similarity is 1.0.
pub fn compare(diff1: impl Into<DiffInput>, diff2: impl Into<DiffInput>) -> DiffComparison {
    let diff1 = diff1.into();
    let diff2 = diff2.into();

    let parsed1 = ParsedDiff::from_text(&diff1.text());
    let parsed2 = ParsedDiff::from_text(&diff2.text());

    let identical = normalize_text(&diff1) == normalize_text(&diff2);

    let set1 = parsed1.as_set();
    let set2 = parsed2.as_set();
    let unique1 = parsed1.unique();
    let unique2 = parsed2.unique();

    let changes_in_common: Vec<Change> = unique1
        .iter()
        .copied()
        .filter(|c| set2.contains(*c))
        .cloned()
        .collect();
    let changes_in_diff1: Vec<Change> = unique1
        .iter()
        .copied()
        .filter(|c| !set2.contains(*c))
        .cloned()
        .collect();
    let changes_in_diff2: Vec<Change> = unique2
        .iter()
        .copied()
        .filter(|c| !set1.contains(*c))
        .cloned()
        .collect();

    let similarity = jaccard(
        changes_in_common.len(),
        changes_in_diff1.len(),
        changes_in_diff2.len(),
    );

    let lines = build_metadiff(&changes_in_common, &changes_in_diff1, &changes_in_diff2);
    let metadiff = lines.iter().map(MetadiffLine::render).collect();
    let metadiff_color_html = render_html(&lines);

    debug!(
        identical,
        similarity,
        common = changes_in_common.len(),
        unique_to_target = changes_in_diff1.len(),
        unique_to_prediction = changes_in_diff2.len(),
        "Compared diffs"
    );

    DiffComparison {
        identical,
        similarity,
        changes_in_common,
        changes_in_diff1,
        changes_in_diff2,
        metadiff,
        metadiff_color_html,
    }
}

fn jaccard(common: usize, only1: usize, only2: usize) -> f64 {
    let union = common + only1 + only2;
    if union == 0 {
        return 1.0;
    }
    common as f64 / union as f64
}
