use std::path::{Path, PathBuf};

use ontoeval_diff::Change;
use ontoeval_judge::LLM_JUDGE;
use tracing::debug;

use crate::record::{write_file, BenchmarkRecord, ReportError};

/// Render one change as a Markdown bullet
pub fn render_change(change: &Change) -> String {
    format!("- {} :: `{}`\n", change.direction.label(), change.text)
}

/// Render a benchmark record as a Markdown page
pub fn render_markdown(record: &BenchmarkRecord) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!("# {} - {}", record.pr_number, record.title));
    parts.push(format!("\n - [{}]({})\n", record.url, record.url));
    parts.push(format!("\n{}\n", record.body.as_deref().unwrap_or("")));

    match record.metadiff_comparison() {
        Some(comparison) => {
            parts.push(format!("## Metadiff ({})\n", comparison.similarity));
            parts.push(comparison.metadiff_color_html.clone());

            parts.push("Unique to target:\n".to_string());
            parts.extend(comparison.changes_in_diff1.iter().map(render_change));

            parts.push("Unique to prediction:\n".to_string());
            parts.extend(comparison.changes_in_diff2.iter().map(render_change));
        }
        None => {
            parts.push("## Metadiff\n".to_string());
            parts.push("_Not compared._\n".to_string());
        }
    }

    if let Some(llm) = record.comparisons.get(LLM_JUDGE).and_then(|c| c.as_llm()) {
        parts.push("## LLM Judge\n".to_string());
        parts.push("```json".to_string());
        // serializing plain numbers and strings does not fail
        parts.push(serde_json::to_string_pretty(llm).unwrap_or_default());
        parts.push("```".to_string());
    }

    parts.push("\n## Issues\n".to_string());
    for issue in &record.linked_issues {
        parts.push(format!("- [{}]({})\n", issue.title, issue.url));
        parts.push(issue.body.clone().unwrap_or_default());
    }

    parts.join("\n")
}

/// Write `<dir>/<pr_number>.md` and return its path
pub fn write_markdown(dir: &Path, record: &BenchmarkRecord) -> Result<PathBuf, ReportError> {
    let path = dir.join(format!("{}.md", record.pr_number));
    write_file(&path, &render_markdown(record))?;
    debug!(path = %path.display(), "Wrote markdown report");
    Ok(path)
}
