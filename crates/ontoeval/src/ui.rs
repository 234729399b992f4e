use anyhow::Result;
use colored::Colorize;

use ontoeval_diff::{Classification, DiffComparison, MetadiffLine};
use ontoeval_report::CombinedResults;

pub fn print_comparison(comparison: &DiffComparison) -> Result<()> {
    let lines = comparison.metadiff_lines()?;

    if lines.is_empty() {
        println!("{}", "No changes in either diff.".dimmed());
    } else {
        println!("{}", "=== Metadiff ===".bright_blue().bold());
        for line in &lines {
            println!("{}", format_metadiff_line(line));
        }
    }

    println!();
    println!("{}  {}", "Result:".dimmed(), format_verdict(comparison));
    println!(
        "{}  {} in common, {} unique to target, {} unique to prediction",
        "Changes:".dimmed(),
        comparison.changes_in_common.len(),
        comparison.changes_in_diff1.len().to_string().red(),
        comparison.changes_in_diff2.len().to_string().green(),
    );

    Ok(())
}

fn format_metadiff_line(line: &MetadiffLine) -> String {
    let rendered = line.render();
    match line.classification {
        Classification::Common => rendered.normal().to_string(),
        Classification::TargetOnly => rendered.red().to_string(),
        Classification::PredictedOnly => rendered.green().to_string(),
    }
}

fn format_verdict(comparison: &DiffComparison) -> String {
    if comparison.identical {
        "identical".bright_green().bold().to_string()
    } else {
        let pct = format!("similarity {:.0}%", comparison.similarity * 100.0);
        if comparison.similarity >= 0.5 {
            pct.bright_yellow().to_string()
        } else {
            pct.bright_red().to_string()
        }
    }
}

pub fn print_combined(combined: &CombinedResults) {
    println!(
        "{}  {} in union, {} in common, {} in union only",
        "PRs:".dimmed(),
        combined.prs_in_union.len(),
        combined.prs_in_common.len().to_string().bright_green(),
        (combined.prs_in_union.len() - combined.prs_in_common.len())
            .to_string()
            .yellow(),
    );

    println!();
    println!("{}", "=== PR presence ===".bright_blue().bold());
    for line in presence_table(combined) {
        println!("{}", line);
    }

    println!();
    println!("{}", "=== Means by experiment ===".bright_blue().bold());
    for line in means_table(combined) {
        println!("{}", line);
    }

    println!();
    println!("{}  {} rows", "Combined:".dimmed(), combined.rows.len());
}

fn presence_table(combined: &CombinedResults) -> Vec<String> {
    let ids: Vec<&str> = combined.experiment_ids().collect();
    let mut lines = vec![format!("{:>8}  {}", "pr", ids.join("  "))];
    for (pr, present) in combined.presence_matrix() {
        let cells: Vec<String> = ids
            .iter()
            .zip(&present)
            .map(|(id, p)| format!("{:<width$}", if *p { "x" } else { "." }, width = id.len()))
            .collect();
        lines.push(format!("{:>8}  {}", pr, cells.join("  ")));
    }
    lines
}

fn means_table(combined: &CombinedResults) -> Vec<String> {
    let mut lines = vec![format!("experiment  {}", combined.columns.join("  "))];
    for (id, means) in combined.means() {
        let cells: Vec<String> = means.iter().map(|m| format!("{:.4}", m)).collect();
        lines.push(format!("{}  {}", id, cells.join("  ")));
    }
    lines
}
