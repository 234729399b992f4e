use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ontoeval_diff::{Change, DiffComparison, DiffInput};
use ontoeval_judge::{JudgeComparison, METADIFF_JUDGE};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid benchmark JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize benchmark record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// An issue linked to the pull request, used as the task description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkedIssue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// One benchmark case: a merged pull request and the agent's attempt at it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub pr_number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub body: Option<String>,
    /// Ground truth diff from the curators
    #[serde(default, deserialize_with = "deserialize_diff")]
    pub diff: Option<DiffInput>,
    /// Diff produced by the agent
    #[serde(default, deserialize_with = "deserialize_diff")]
    pub predicted_diff: Option<DiffInput>,
    #[serde(default)]
    pub linked_issues: Vec<LinkedIssue>,
    #[serde(default)]
    pub experiment_id: Option<String>,

    #[serde(default)]
    pub diff_size_chars: Option<usize>,
    #[serde(default)]
    pub diff_size_lines: Option<usize>,
    /// Labels of every linked issue, in issue order
    #[serde(default)]
    pub issue_labels: Vec<String>,

    #[serde(default)]
    pub predicted_diff_identical: Option<bool>,
    #[serde(default)]
    pub predicted_diff_similarity: Option<f64>,
    #[serde(default)]
    pub predicted_diff_metadiff: Option<Vec<String>>,
    #[serde(default)]
    pub predicted_diff_changes_in_common: Option<Vec<Change>>,
    #[serde(default)]
    pub changes_unique_to_target: Option<Vec<Change>>,
    #[serde(default)]
    pub changes_unique_to_prediction: Option<Vec<Change>>,

    /// Judge results keyed by judge name
    #[serde(default)]
    pub comparisons: BTreeMap<String, JudgeComparison>,
}

fn deserialize_diff<'de, D>(deserializer: D) -> Result<Option<DiffInput>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    DiffInput::from_json(&value)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

impl BenchmarkRecord {
    pub fn label(&self) -> String {
        format!("PR #{}", self.pr_number)
    }

    /// The target diff, empty when absent
    pub fn target_diff(&self) -> DiffInput {
        self.diff.clone().unwrap_or_default()
    }

    pub fn has_predicted_diff(&self) -> bool {
        self.predicted_diff.as_ref().is_some_and(|d| !d.is_empty())
    }

    pub fn populate_derived_fields(&mut self) {
        let text = self.diff.as_ref().map(|d| d.text().into_owned());
        self.diff_size_chars = Some(text.as_ref().map_or(0, |t| t.chars().count()));
        self.diff_size_lines = Some(text.as_ref().map_or(0, |t| t.lines().count()));
        self.issue_labels = self
            .linked_issues
            .iter()
            .flat_map(|issue| issue.labels.iter().cloned())
            .collect();
    }

    /// Copy the engine result into the flat report fields
    pub fn apply_comparison(&mut self, comparison: &DiffComparison) {
        self.predicted_diff_identical = Some(comparison.identical);
        self.predicted_diff_similarity = Some(comparison.similarity);
        self.predicted_diff_metadiff = Some(comparison.metadiff.clone());
        self.predicted_diff_changes_in_common = Some(comparison.changes_in_common.clone());
        self.changes_unique_to_target = Some(comparison.changes_in_diff1.clone());
        self.changes_unique_to_prediction = Some(comparison.changes_in_diff2.clone());
    }

    /// Attach a judge result under the judge's name.
    ///
    /// A metadiff result also fills the flat comparison fields.
    pub fn insert_comparison(&mut self, comparison: JudgeComparison) {
        if let JudgeComparison::MetadiffJudge(ref c) = comparison {
            self.apply_comparison(c);
        }
        debug!(
            pr = self.pr_number,
            judge = comparison.judge_name(),
            "Attached judge result"
        );
        self.comparisons
            .insert(comparison.judge_name().to_string(), comparison);
    }

    pub fn metadiff_comparison(&self) -> Option<&DiffComparison> {
        self.comparisons
            .get(METADIFF_JUDGE)
            .and_then(JudgeComparison::as_metadiff)
    }

    /// Task text handed to judges: the linked issues' titles and bodies
    pub fn issue_text(&self) -> Option<String> {
        if self.linked_issues.is_empty() {
            return None;
        }

        let sections: Vec<String> = self
            .linked_issues
            .iter()
            .map(|issue| {
                format!(
                    "## Issue {}: {}\n\n{}",
                    issue.number,
                    issue.title,
                    issue.body.as_deref().unwrap_or("")
                )
            })
            .collect();
        Some(sections.join("\n\n"))
    }

    /// The persisted form: all fields plus `<judge>_<field>` keys for every
    /// judge result
    pub fn to_flat_json(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;

        if let Some(obj) = value.as_object_mut() {
            for (name, comparison) in &self.comparisons {
                for (field, field_value) in comparison.fields() {
                    obj.insert(format!("{}_{}", name, field), field_value);
                }
            }
        }

        Ok(value)
    }
}

/// Reading and writing JSON files of benchmark records
pub struct BenchmarkFile;

impl BenchmarkFile {
    pub fn load(path: &Path) -> Result<Vec<BenchmarkRecord>, ReportError> {
        let content = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ReportError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write records as they deserialize
    pub fn save(path: &Path, records: &[BenchmarkRecord]) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(records)?;
        write_file(path, &json)
    }

    /// Write records in their flattened form
    pub fn save_flat(path: &Path, records: &[BenchmarkRecord]) -> Result<(), ReportError> {
        let values = records
            .iter()
            .map(BenchmarkRecord::to_flat_json)
            .collect::<Result<Vec<_>, _>>()?;
        let json = serde_json::to_string_pretty(&values)?;
        write_file(path, &json)
    }
}

pub(crate) fn write_file(path: &Path, content: &str) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, content).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
