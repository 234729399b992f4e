use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Evaluation of one proposed change (one side of the comparison)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedChangeEvaluation {
    /// How well the change addresses the issue, including correctness
    /// and adherence to ontology design principles
    pub overall_score: f64,
    pub evaluation: String,
    #[serde(default)]
    pub incorrect_changes: Vec<String>,
    #[serde(default)]
    pub missing_changes: Vec<String>,
}

/// Verdict of a language-model judge comparing a left (target) and a right
/// (predicted) diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmJudgeComparison {
    /// Similarity between the two diffs (0.0 - 1.0)
    pub similarity: f64,
    /// Difficulty of the issue: 0 is a one-line change, 1 a multi-file
    /// change with design decisions
    pub difficulty: f64,
    /// How clearly the issue describes the task (0.0 - 1.0)
    pub issue_clarity: f64,
    pub logical_consistency: f64,
    /// The judge's confidence in its own evaluation (0.0 - 1.0)
    pub confidence: f64,
    #[serde(default)]
    pub suggestions_for_users: String,
    pub left_evaluation: ProposedChangeEvaluation,
    pub right_evaluation: ProposedChangeEvaluation,
    /// `left_evaluation.overall_score - right_evaluation.overall_score`,
    /// recomputed after parsing
    #[serde(default)]
    pub score_diff: f64,
    #[serde(default)]
    pub comments: String,
}

#[derive(Error, Debug)]
pub enum VerdictParseError {
    #[error("No verdict found in judge output")]
    NoVerdictFound,

    #[error("Failed to parse verdict JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Invalid verdict format: {0}")]
    InvalidFormat(String),

    #[error("Field {field} out of range [0, 1]: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

impl LlmJudgeComparison {
    /// Parse a verdict from the judge's output text
    ///
    /// Accepted forms, in order of preference:
    /// ```text
    /// <verdict>
    /// {"similarity": 0.8, ...}
    /// </verdict>
    /// ```
    /// a fenced ```json block, or a bare JSON object.
    pub fn parse(judge_output: &str) -> Result<Self, VerdictParseError> {
        debug!(output_len = judge_output.len(), "Parsing judge verdict");

        let json = Self::find_verdict_block(judge_output)?
            .or_else(|| Self::find_fenced_json(judge_output))
            .or_else(|| Self::find_bare_object(judge_output))
            .ok_or(VerdictParseError::NoVerdictFound)?;

        let mut verdict: LlmJudgeComparison = serde_json::from_str(json)?;
        verdict.validate()?;
        verdict.set_score_diff();
        Ok(verdict)
    }

    pub fn set_score_diff(&mut self) {
        self.score_diff = self.left_evaluation.overall_score - self.right_evaluation.overall_score;
    }

    fn validate(&self) -> Result<(), VerdictParseError> {
        let fields = [
            ("similarity", self.similarity),
            ("difficulty", self.difficulty),
            ("issue_clarity", self.issue_clarity),
            ("logical_consistency", self.logical_consistency),
            ("confidence", self.confidence),
        ];
        for (field, value) in fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(VerdictParseError::OutOfRange { field, value });
            }
        }
        Ok(())
    }

    fn find_verdict_block(output: &str) -> Result<Option<&str>, VerdictParseError> {
        let start = output.find("<verdict>");
        let end = output.find("</verdict>");

        match (start, end) {
            (Some(start), Some(end)) if start < end => {
                Ok(Some(output[start + "<verdict>".len()..end].trim()))
            }
            (Some(_), Some(_)) => Err(VerdictParseError::InvalidFormat(
                "Malformed verdict block".to_string(),
            )),
            _ => Ok(None),
        }
    }

    fn find_fenced_json(output: &str) -> Option<&str> {
        let start = output.find("```json")? + "```json".len();
        let end = output[start..].find("```")? + start;
        Some(output[start..end].trim())
    }

    fn find_bare_object(output: &str) -> Option<&str> {
        let start = output.find('{')?;
        let end = output.rfind('}')?;
        (start < end).then(|| &output[start..=end])
    }

    /// Get a short description of the verdict for logging
    pub fn short_description(&self) -> String {
        format!(
            "similarity {:.0}%, score diff {:+.2} (confidence: {:.0}%)",
            self.similarity * 100.0,
            self.score_diff,
            self.confidence * 100.0
        )
    }
}
