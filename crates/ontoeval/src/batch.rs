use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{debug, info};

use ontoeval_judge::{Judge, JudgeComparison, JudgeRequest, MetadiffJudge};
use ontoeval_logging::{LogEvent, Logger, SkipReason};
use ontoeval_report::{write_markdown, BenchmarkFile, BenchmarkRecord};

pub struct BatchOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub markdown_directory: Option<PathBuf>,
    pub max_diff_size_lines: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub compared: usize,
    pub skipped: usize,
    /// Judge runs that errored; their records are still compared
    pub failed: usize,
    pub mean_similarity: Option<f64>,
}

/// Compares every record of a benchmark file and writes the results
pub struct BatchRunner {
    metadiff: MetadiffJudge,
    /// Extra judges run after the metadiff judge
    judges: Vec<Arc<dyn Judge>>,
    logger: Arc<Logger>,
}

impl BatchRunner {
    pub fn new(metadiff: MetadiffJudge, judges: Vec<Arc<dyn Judge>>, logger: Arc<Logger>) -> Self {
        Self {
            metadiff,
            judges,
            logger,
        }
    }

    pub async fn run(&self, options: &BatchOptions) -> Result<BatchSummary> {
        let started = Instant::now();
        let records = BenchmarkFile::load(&options.input)?;

        self.logger.log(&LogEvent::BatchStarted {
            input: options.input.clone(),
            records: records.len(),
        });

        let mut summary = BatchSummary::default();
        let mut tasks = JoinSet::new();

        for (index, mut record) in records.into_iter().enumerate() {
            record.populate_derived_fields();

            if let Some(reason) = skip_reason(&record, options.max_diff_size_lines) {
                self.logger.log(&LogEvent::RecordSkipped {
                    label: record.label(),
                    reason,
                });
                summary.skipped += 1;
                continue;
            }

            let metadiff = self.metadiff.clone();
            let judges = self.judges.clone();
            let logger = Arc::clone(&self.logger);
            tasks.spawn_blocking(move || {
                (index, evaluate_record(record, &metadiff, &judges, &logger))
            });
        }

        let mut results: Vec<(usize, BenchmarkRecord)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, (record, failed)) = joined.context("Comparison task panicked")?;
            summary.failed += failed;
            results.push((index, record));
        }
        results.sort_by_key(|(index, _)| *index);
        let results: Vec<BenchmarkRecord> = results.into_iter().map(|(_, r)| r).collect();

        summary.compared = results.len();
        summary.mean_similarity = mean_similarity(&results);

        BenchmarkFile::save_flat(&options.output, &results)?;
        info!(path = %options.output.display(), records = results.len(), "Wrote results");

        if let Some(ref dir) = options.markdown_directory {
            for record in &results {
                let path = write_markdown(dir, record)?;
                self.logger.log(&LogEvent::ReportWritten { path });
            }
        }

        self.logger.log(&LogEvent::BatchCompleted {
            compared: summary.compared,
            skipped: summary.skipped,
            mean_similarity: summary.mean_similarity,
            duration_secs: started.elapsed().as_secs_f64(),
        });

        Ok(summary)
    }
}

/// Oversized target diffs are checked first, then a missing prediction
fn skip_reason(record: &BenchmarkRecord, max_diff_size_lines: usize) -> Option<SkipReason> {
    let lines = record.diff_size_lines.unwrap_or(0);
    if lines > max_diff_size_lines {
        return Some(SkipReason::DiffTooLarge {
            lines,
            limit: max_diff_size_lines,
        });
    }
    if !record.has_predicted_diff() {
        return Some(SkipReason::NoPredictedDiff);
    }
    None
}

fn evaluate_record(
    mut record: BenchmarkRecord,
    metadiff: &MetadiffJudge,
    judges: &[Arc<dyn Judge>],
    logger: &Logger,
) -> (BenchmarkRecord, usize) {
    let label = record.label();
    logger.log(&LogEvent::ComparisonStarted {
        label: label.clone(),
    });

    let target = record.target_diff();
    let predicted = record.predicted_diff.clone().unwrap_or_default();

    let (comparison, status) = metadiff.compare_with_status(&target, &predicted);
    logger.log(&LogEvent::ComparisonCompleted {
        label: label.clone(),
        identical: comparison.identical,
        similarity: comparison.similarity,
        in_common: comparison.changes_in_common.len(),
        unique_to_target: comparison.changes_in_diff1.len(),
        unique_to_prediction: comparison.changes_in_diff2.len(),
        cached: status == ontoeval_diff::CacheStatus::Hit,
    });
    record.insert_comparison(JudgeComparison::MetadiffJudge(comparison));

    let issue_text = record.issue_text();
    let mut failed = 0;
    for judge in judges {
        let request = JudgeRequest {
            target: &target,
            predicted: &predicted,
            issue_text: issue_text.as_deref(),
        };
        match judge.compare(&request) {
            Ok(result) => {
                debug!(pr = record.pr_number, judge = judge.name(), "Judge finished");
                logger.log(&LogEvent::JudgeCompleted {
                    label: label.clone(),
                    judge: judge.name().to_string(),
                    similarity: result.similarity(),
                });
                record.insert_comparison(result);
            }
            // Judges are independent; the record keeps whatever results it has
            Err(e) => {
                logger.log(&LogEvent::ErrorEncountered {
                    label: format!("{} ({})", label, judge.name()),
                    error: e.to_string(),
                });
                failed += 1;
            }
        }
    }

    (record, failed)
}

fn mean_similarity(records: &[BenchmarkRecord]) -> Option<f64> {
    let scores: Vec<f64> = records
        .iter()
        .filter_map(|r| r.metadiff_comparison().map(|c| c.similarity))
        .collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoeval_diff::{DiffInput, MemoryCache};
    use ontoeval_judge::JudgeError;
    use ontoeval_logging::LogFormat;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    struct FixedJudge;

    impl Judge for FixedJudge {
        fn name(&self) -> &str {
            "metadiff_judge"
        }

        fn compare(&self, request: &JudgeRequest<'_>) -> Result<JudgeComparison, JudgeError> {
            Ok(JudgeComparison::MetadiffJudge(ontoeval_diff::compare(
                request.target,
                request.target,
            )))
        }
    }

    struct FailingJudge;

    impl Judge for FailingJudge {
        fn name(&self) -> &str {
            "failing"
        }

        fn compare(&self, _request: &JudgeRequest<'_>) -> Result<JudgeComparison, JudgeError> {
            Err(JudgeError::Backend("offline".into()))
        }
    }

    fn write_input(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("input.json");
        let records = json!([
            {"pr_number": 3, "title": "three", "diff": "+a\n+b\n", "predicted_diff": "+a\n+c\n"},
            {"pr_number": 1, "title": "one", "diff": "+a\n", "predicted_diff": ["+a"]},
            {"pr_number": 2, "title": "no prediction", "diff": "+a\n", "predicted_diff": null},
            {"pr_number": 4, "title": "huge", "diff": "+a\n+b\n+c\n+d\n", "predicted_diff": "+a\n"}
        ]);
        std::fs::write(&path, records.to_string()).unwrap();
        path
    }

    fn options(dir: &TempDir, input: PathBuf) -> BatchOptions {
        BatchOptions {
            input,
            output: dir.path().join("out").join("results.json"),
            markdown_directory: Some(dir.path().join("md")),
            max_diff_size_lines: 3,
        }
    }

    fn runner(judges: Vec<Arc<dyn Judge>>) -> BatchRunner {
        BatchRunner::new(
            MetadiffJudge::new(),
            judges,
            Arc::new(Logger::new(LogFormat::Compact)),
        )
    }

    #[test]
    fn test_skip_reason_order() {
        let mut record = BenchmarkRecord {
            pr_number: 1,
            diff: Some(DiffInput::from("+a\n+b\n")),
            ..Default::default()
        };
        record.populate_derived_fields();

        assert_eq!(
            skip_reason(&record, 1),
            Some(SkipReason::DiffTooLarge { lines: 2, limit: 1 })
        );
        assert_eq!(skip_reason(&record, 10), Some(SkipReason::NoPredictedDiff));

        record.predicted_diff = Some(DiffInput::from("+a"));
        assert_eq!(skip_reason(&record, 10), None);
    }

    #[tokio::test]
    async fn test_batch_compares_and_skips() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir);
        let options = options(&dir, input);

        let summary = runner(vec![]).run(&options).await.unwrap();

        assert_eq!(summary.compared, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed, 0);
        let mean = summary.mean_similarity.unwrap();
        assert!((mean - (1.0 / 3.0 + 1.0) / 2.0).abs() < 1e-12);

        let output: Value =
            serde_json::from_str(&std::fs::read_to_string(&options.output).unwrap()).unwrap();
        let output = output.as_array().unwrap();
        assert_eq!(output.len(), 2);
        // input order is kept
        assert_eq!(output[0]["pr_number"], 3);
        assert_eq!(output[1]["pr_number"], 1);
        assert_eq!(output[1]["predicted_diff_identical"], true);
        assert_eq!(output[1]["metadiff_judge_similarity"], 1.0);
        assert_eq!(output[0]["changes_unique_to_prediction"], json!([[1, "c"]]));

        let md_dir = dir.path().join("md");
        assert!(md_dir.join("3.md").exists());
        assert!(md_dir.join("1.md").exists());
        assert!(!md_dir.join("2.md").exists());
    }

    #[tokio::test]
    async fn test_batch_uses_cache() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir);
        let mut options = options(&dir, input);
        options.markdown_directory = None;

        let cache = Arc::new(MemoryCache::new());
        let runner = BatchRunner::new(
            MetadiffJudge::new().with_cache(cache.clone()),
            vec![],
            Arc::new(Logger::new(LogFormat::Compact)),
        );
        runner.run(&options).await.unwrap();
        assert_eq!(cache.len(), 2);

        let again = runner.run(&options).await.unwrap();
        assert_eq!(again.compared, 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_extra_judge_result_replaces_same_name() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir);
        let options = options(&dir, input);

        let summary = runner(vec![Arc::new(FixedJudge)]).run(&options).await.unwrap();
        assert_eq!(summary.mean_similarity, Some(1.0));
    }

    #[tokio::test]
    async fn test_failing_judge_keeps_metadiff_result() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir);
        let options = options(&dir, input);

        let judges: Vec<Arc<dyn Judge>> = vec![Arc::new(FailingJudge), Arc::new(FixedJudge)];
        let summary = runner(judges).run(&options).await.unwrap();
        assert_eq!(summary.compared, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed, 2);
        // the judge after the failing one still ran
        assert_eq!(summary.mean_similarity, Some(1.0));

        let output: Value =
            serde_json::from_str(&std::fs::read_to_string(&options.output).unwrap()).unwrap();
        let output = output.as_array().unwrap();
        assert_eq!(output.len(), 2);
        for row in output {
            assert_eq!(row["metadiff_judge_identical"], true);
            assert_eq!(row["metadiff_judge_similarity"], 1.0);
            assert!(row.get("failing_similarity").is_none());
        }
        assert!(dir.path().join("md").join("3.md").exists());
    }

    #[tokio::test]
    async fn test_failing_judge_alone_keeps_records() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir);
        let mut options = options(&dir, input);
        options.markdown_directory = None;

        let summary = runner(vec![Arc::new(FailingJudge)]).run(&options).await.unwrap();
        assert_eq!(summary.compared, 2);
        assert_eq!(summary.failed, 2);
        let mean = summary.mean_similarity.unwrap();
        assert!((mean - (1.0 / 3.0 + 1.0) / 2.0).abs() < 1e-12);

        let output: Value =
            serde_json::from_str(&std::fs::read_to_string(&options.output).unwrap()).unwrap();
        assert_eq!(output.as_array().unwrap().len(), 2);
        assert!(output[0]["metadiff_judge_similarity"].is_number());
        assert_eq!(output[1]["metadiff_judge_similarity"], 1.0);
    }

    #[tokio::test]
    async fn test_missing_input_is_error() {
        let dir = TempDir::new().unwrap();
        let options = options(&dir, dir.path().join("missing.json"));
        let err = runner(vec![]).run(&options).await.unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }
}
