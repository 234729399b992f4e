use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Why a benchmark record was not compared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The agent produced no diff
    NoPredictedDiff,
    /// The target diff exceeds the configured size limit
    DiffTooLarge { lines: usize, limit: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoPredictedDiff => write!(f, "no diff produced by the agent"),
            SkipReason::DiffTooLarge { lines, limit } => {
                write!(f, "diff has {} lines (limit {})", lines, limit)
            }
        }
    }
}

/// Structured log events for a benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    BatchStarted {
        input: PathBuf,
        records: usize,
    },
    ComparisonStarted {
        label: String,
    },
    ComparisonCompleted {
        label: String,
        identical: bool,
        similarity: f64,
        in_common: usize,
        unique_to_target: usize,
        unique_to_prediction: usize,
        cached: bool,
    },
    JudgeCompleted {
        label: String,
        judge: String,
        similarity: f64,
    },
    RecordSkipped {
        label: String,
        reason: SkipReason,
    },
    ReportWritten {
        path: PathBuf,
    },
    BatchCompleted {
        compared: usize,
        skipped: usize,
        mean_similarity: Option<f64>,
        duration_secs: f64,
    },
    ErrorEncountered {
        label: String,
        error: String,
    },
}

impl LogEvent {
    /// The event as a JSON object stamped with the current UTC time
    fn to_timestamped_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let serde_json::Value::Object(ref mut fields) = value {
            fields.insert(
                "timestamp".into(),
                chrono::Utc::now().to_rfc3339().into(),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Colored, multi-line progress for terminals
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
    /// One short line per event
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            other => return Err(format!("Unknown log format '{}'", other)),
        };
        Ok(format)
    }
}

/// Writes benchmark events to stderr, optionally mirrored to a JSON-lines file
pub struct Logger {
    format: LogFormat,
    mirror: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            mirror: None,
        }
    }

    /// Also append every event, timestamped, to `path`
    pub fn with_file(format: LogFormat, path: &Path) -> std::io::Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let mut logger = Self::new(format);
        logger.mirror = Some(Mutex::new(file));
        Ok(logger)
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn log(&self, event: &LogEvent) {
        self.mirror_to_file(event);

        match self.format {
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
            LogFormat::Json => {
                if let Ok(line) = serde_json::to_string(event) {
                    let _ = writeln!(std::io::stderr(), "{}", line);
                }
            }
        }
    }

    fn mirror_to_file(&self, event: &LogEvent) {
        let Some(mirror) = &self.mirror else {
            return;
        };
        if let Ok(mut file) = mirror.lock() {
            let _ = writeln!(file, "{}", event.to_timestamped_json());
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::BatchStarted { input, records } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} {} ({} {})",
                    "▶".bright_blue(),
                    "ontoeval batch".bold().bright_white(),
                    records,
                    if *records == 1 { "record" } else { "records" }
                );
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "Input:".dimmed(),
                    input.display().to_string().dimmed()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::ComparisonStarted { label } => {
                let _ = writeln!(stderr, "{} Comparing {}", "🔍".dimmed(), label.bold());
            }
            LogEvent::ComparisonCompleted {
                identical,
                similarity,
                in_common,
                unique_to_target,
                unique_to_prediction,
                cached,
                ..
            } => {
                let verdict = if *identical {
                    "✓ identical".bright_green().to_string()
                } else if *similarity >= 0.5 {
                    format!("≈ similarity {:.0}%", similarity * 100.0)
                        .bright_yellow()
                        .to_string()
                } else {
                    format!("✗ similarity {:.0}%", similarity * 100.0)
                        .bright_red()
                        .to_string()
                };
                let _ = writeln!(
                    stderr,
                    "    {} {} {}, {}, {}{}",
                    verdict,
                    "│".dimmed(),
                    format!("{} common", in_common).normal(),
                    format!("<{} target", unique_to_target).red(),
                    format!(">{} prediction", unique_to_prediction).green(),
                    if *cached { " (cached)".dimmed().to_string() } else { String::new() }
                );
            }
            LogEvent::JudgeCompleted {
                judge, similarity, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {}: {:.2}",
                    "⚖".bright_magenta(),
                    judge.bright_magenta(),
                    similarity
                );
            }
            LogEvent::RecordSkipped { label, reason } => {
                let _ = writeln!(
                    stderr,
                    "{} Skipping {}: {}",
                    "🚫".dimmed(),
                    label,
                    reason.to_string().dimmed()
                );
            }
            LogEvent::ReportWritten { path } => {
                let _ = writeln!(
                    stderr,
                    "    {} {}",
                    "📄".dimmed(),
                    path.display().to_string().dimmed()
                );
            }
            LogEvent::BatchCompleted {
                compared,
                skipped,
                mean_similarity,
                duration_secs,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} {} compared, {} skipped ({:.1}s)",
                    "✓".bright_green(),
                    compared,
                    skipped,
                    duration_secs
                );
                if let Some(mean) = mean_similarity {
                    let _ = writeln!(stderr, "  {} {:.3}", "Mean similarity:".dimmed(), mean);
                }
            }
            LogEvent::ErrorEncountered { label, error } => {
                let _ = writeln!(
                    stderr,
                    "{} Error on {}: {}",
                    "✗".bright_red(),
                    label,
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::BatchStarted { records, .. } => {
                format!("[{}] batch:start {}", timestamp, records)
            }
            LogEvent::ComparisonStarted { .. } => return, // Skip in compact mode
            LogEvent::ComparisonCompleted {
                label,
                identical,
                similarity,
                cached,
                ..
            } => format!(
                "[{}] compare:{} identical={} similarity={:.3}{}",
                timestamp,
                label,
                identical,
                similarity,
                if *cached { " cached" } else { "" }
            ),
            LogEvent::JudgeCompleted {
                label,
                judge,
                similarity,
            } => format!("[{}] judge:{}:{} {:.3}", timestamp, label, judge, similarity),
            LogEvent::RecordSkipped { label, reason } => {
                format!("[{}] skip:{} {}", timestamp, label, reason)
            }
            LogEvent::ReportWritten { path } => {
                format!("[{}] report {}", timestamp, path.display())
            }
            LogEvent::BatchCompleted {
                compared,
                skipped,
                duration_secs,
                ..
            } => format!(
                "[{}] batch:done {} compared {} skipped {:.1}s",
                timestamp, compared, skipped, duration_secs
            ),
            LogEvent::ErrorEncountered { label, error } => {
                format!("[{}] error:{}:{}", timestamp, label, error)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }
}
