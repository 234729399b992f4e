use std::sync::Arc;

use ontoeval_diff::{
    compare, CacheStatus, CachedComparator, ComparisonCache, DiffComparison, DiffInput,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::{LlmJudgeComparison, VerdictParseError};

pub const METADIFF_JUDGE: &str = "metadiff_judge";
pub const LLM_JUDGE: &str = "llm_judge";

#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("Completion backend error: {0}")]
    Backend(String),

    #[error("Failed to parse judge verdict: {0}")]
    Verdict(#[from] VerdictParseError),

    #[error("No verdict after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        attempts: usize,
        last_error: VerdictParseError,
    },
}

/// Inputs shared by every judge
#[derive(Debug, Clone, Copy)]
pub struct JudgeRequest<'a> {
    pub target: &'a DiffInput,
    pub predicted: &'a DiffInput,
    /// Issue text the change was made for, if known
    pub issue_text: Option<&'a str>,
}

/// Result produced by a judge, tagged with the judge that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "judge", rename_all = "snake_case")]
pub enum JudgeComparison {
    MetadiffJudge(DiffComparison),
    LlmJudge(LlmJudgeComparison),
}

impl JudgeComparison {
    pub fn similarity(&self) -> f64 {
        match self {
            JudgeComparison::MetadiffJudge(c) => c.similarity,
            JudgeComparison::LlmJudge(c) => c.similarity,
        }
    }

    pub fn judge_name(&self) -> &'static str {
        match self {
            JudgeComparison::MetadiffJudge(_) => METADIFF_JUDGE,
            JudgeComparison::LlmJudge(_) => LLM_JUDGE,
        }
    }

    pub fn as_metadiff(&self) -> Option<&DiffComparison> {
        match self {
            JudgeComparison::MetadiffJudge(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_llm(&self) -> Option<&LlmJudgeComparison> {
        match self {
            JudgeComparison::LlmJudge(c) => Some(c),
            _ => None,
        }
    }

    /// The judge's own fields without the `judge` tag
    pub fn fields(&self) -> Map<String, Value> {
        let value = match self {
            JudgeComparison::MetadiffJudge(c) => serde_json::to_value(c),
            JudgeComparison::LlmJudge(c) => serde_json::to_value(c),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// A named strategy for scoring a predicted diff against a target diff
pub trait Judge: Send + Sync {
    /// Key under which results are stored in a benchmark record
    fn name(&self) -> &str;

    fn compare(&self, request: &JudgeRequest<'_>) -> Result<JudgeComparison, JudgeError>;
}

/// Judge backed by the textual diff comparison engine
#[derive(Clone, Default)]
pub struct MetadiffJudge {
    comparator: Option<CachedComparator>,
}

impl MetadiffJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, cache: Arc<dyn ComparisonCache>) -> Self {
        self.comparator = Some(CachedComparator::new(cache));
        self
    }

    pub fn compare_diffs(&self, target: &DiffInput, predicted: &DiffInput) -> DiffComparison {
        self.compare_with_status(target, predicted).0
    }

    /// Compare and report whether the result came from the cache.
    ///
    /// Without a cache every comparison is a miss.
    pub fn compare_with_status(
        &self,
        target: &DiffInput,
        predicted: &DiffInput,
    ) -> (DiffComparison, CacheStatus) {
        match &self.comparator {
            Some(comparator) => {
                let (comparison, status) = comparator.compare(target, predicted);
                debug!(?status, "Metadiff judge comparison");
                (comparison, status)
            }
            None => (compare(target, predicted), CacheStatus::Miss),
        }
    }
}

impl Judge for MetadiffJudge {
    fn name(&self) -> &str {
        METADIFF_JUDGE
    }

    fn compare(&self, request: &JudgeRequest<'_>) -> Result<JudgeComparison, JudgeError> {
        Ok(JudgeComparison::MetadiffJudge(
            self.compare_diffs(request.target, request.predicted),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoeval_diff::MemoryCache;

    fn request<'a>(target: &'a DiffInput, predicted: &'a DiffInput) -> JudgeRequest<'a> {
        JudgeRequest {
            target,
            predicted,
            issue_text: None,
        }
    }

    #[test]
    fn test_metadiff_judge_wraps_comparison() {
        let target = DiffInput::from("+a\n+b\n");
        let predicted = DiffInput::from("+a\n");

        let judge = MetadiffJudge::new();
        let result = judge.compare(&request(&target, &predicted)).unwrap();

        assert_eq!(judge.name(), METADIFF_JUDGE);
        assert_eq!(result.judge_name(), METADIFF_JUDGE);
        assert_eq!(result.similarity(), 0.5);
        assert!(result.as_metadiff().is_some());
        assert!(result.as_llm().is_none());
    }

    #[test]
    fn test_metadiff_judge_uses_cache() {
        let cache = Arc::new(MemoryCache::new());
        let judge = MetadiffJudge::new().with_cache(cache.clone());
        let target = DiffInput::from("+a");
        let predicted = DiffInput::from("+b");

        judge.compare(&request(&target, &predicted)).unwrap();
        assert_eq!(cache.len(), 1);

        let (_, status) = judge.compare_with_status(&target, &predicted);
        assert_eq!(status, CacheStatus::Hit);
        let (_, status) = MetadiffJudge::new().compare_with_status(&target, &predicted);
        assert_eq!(status, CacheStatus::Miss);
    }

    #[test]
    fn test_serialized_with_judge_tag() {
        let result = JudgeComparison::MetadiffJudge(compare("+a", "+a"));
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["judge"], "metadiff_judge");
        assert_eq!(value["similarity"], 1.0);
        assert_eq!(value["identical"], true);

        let back: JudgeComparison = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_fields_drop_tag() {
        let result = JudgeComparison::MetadiffJudge(compare("+a", "+b"));
        let fields = result.fields();

        assert!(!fields.contains_key("judge"));
        assert_eq!(fields["similarity"], 0.0);
        assert!(fields.contains_key("metadiff_color_html"));
    }
}
