use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::record::{write_file, BenchmarkFile, ReportError};

/// Columns a row must carry to be combined; their means are reported
pub const DEFAULT_COMBINE_COLUMNS: [&str; 2] = ["metadiff_judge_similarity", "llm_judge_score_diff"];

#[derive(Debug, Clone)]
pub struct CombineOptions {
    /// Keep every PR seen in any run instead of only the PRs every run has
    pub use_union: bool,
    /// Append the result file's stem to the experiment id
    pub include_run_id: bool,
    pub columns: Vec<String>,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            use_union: false,
            include_run_id: false,
            columns: DEFAULT_COMBINE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Experiment id for a result file laid out as `<experiment>/<run>/<file>.json`.
///
/// Files without a grandparent directory fall back to their own stem.
pub fn experiment_id_for(path: &Path, include_run_id: bool) -> String {
    let file_stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let experiment = path
        .parent()
        .and_then(Path::parent)
        .and_then(Path::file_stem)
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty());

    match experiment {
        Some(experiment) if include_run_id => format!("{}_{}", experiment, file_stem),
        Some(experiment) => experiment,
        None => file_stem,
    }
}

/// The flattened rows of one result file that carry every combined column
#[derive(Debug, Clone)]
pub struct ExperimentRun {
    pub experiment_id: String,
    pub path: PathBuf,
    /// Records in the file before filtering
    pub total: usize,
    pub rows: Vec<Value>,
}

impl ExperimentRun {
    pub fn load(path: &Path, options: &CombineOptions) -> Result<Self, ReportError> {
        let experiment_id = experiment_id_for(path, options.include_run_id);
        let records = BenchmarkFile::load(path)?;
        let total = records.len();

        let mut rows = Vec::with_capacity(total);
        for mut record in records {
            if record.experiment_id.is_none() {
                record.experiment_id = Some(experiment_id.clone());
            }
            let row = record.to_flat_json()?;
            if options.columns.iter().all(|c| row.get(c).is_some()) {
                rows.push(row);
            }
        }

        info!(
            path = %path.display(),
            experiment = %experiment_id,
            total,
            kept = rows.len(),
            "Loaded run"
        );

        Ok(Self {
            experiment_id,
            path: path.to_path_buf(),
            total,
            rows,
        })
    }

    pub fn pr_numbers(&self) -> BTreeSet<u64> {
        self.rows.iter().filter_map(pr_number).collect()
    }
}

fn pr_number(row: &Value) -> Option<u64> {
    row.get("pr_number").and_then(Value::as_u64)
}

/// Rows from several runs, restricted to the PRs they share unless the
/// union was asked for
#[derive(Debug, Clone)]
pub struct CombinedResults {
    pub columns: Vec<String>,
    pub prs_by_experiment: BTreeMap<String, BTreeSet<u64>>,
    pub prs_in_union: BTreeSet<u64>,
    pub prs_in_common: BTreeSet<u64>,
    pub rows: Vec<Value>,
}

impl CombinedResults {
    pub fn load(files: &[PathBuf], options: &CombineOptions) -> Result<Self, ReportError> {
        let runs = files
            .iter()
            .map(|path| ExperimentRun::load(path, options))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_runs(runs, options))
    }

    /// A later run with an already seen experiment id replaces the earlier one
    pub fn from_runs(runs: Vec<ExperimentRun>, options: &CombineOptions) -> Self {
        let mut by_experiment: BTreeMap<String, ExperimentRun> = BTreeMap::new();
        for run in runs {
            if let Some(previous) = by_experiment.insert(run.experiment_id.clone(), run) {
                warn!(
                    experiment = %previous.experiment_id,
                    path = %previous.path.display(),
                    "Run replaced by a later file with the same experiment id"
                );
            }
        }

        let prs_by_experiment: BTreeMap<String, BTreeSet<u64>> = by_experiment
            .iter()
            .map(|(id, run)| (id.clone(), run.pr_numbers()))
            .collect();
        let prs_in_union: BTreeSet<u64> = prs_by_experiment.values().flatten().copied().collect();
        let prs_in_common = intersection(prs_by_experiment.values());

        let rows = by_experiment
            .into_values()
            .flat_map(|run| run.rows)
            .filter(|row| {
                options.use_union || pr_number(row).is_some_and(|pr| prs_in_common.contains(&pr))
            })
            .collect();

        Self {
            columns: options.columns.clone(),
            prs_by_experiment,
            prs_in_union,
            prs_in_common,
            rows,
        }
    }

    pub fn experiment_ids(&self) -> impl Iterator<Item = &str> {
        self.prs_by_experiment.keys().map(String::as_str)
    }

    /// One entry per PR in the union, with one presence flag per experiment
    /// in id order
    pub fn presence_matrix(&self) -> Vec<(u64, Vec<bool>)> {
        self.prs_in_union
            .iter()
            .map(|pr| {
                let present = self
                    .prs_by_experiment
                    .values()
                    .map(|prs| prs.contains(pr))
                    .collect();
                (*pr, present)
            })
            .collect()
    }

    /// Mean of each column per experiment id, in column order.
    ///
    /// Rows where any column is null or not a number are left out.
    pub fn means(&self) -> BTreeMap<String, Vec<f64>> {
        let mut totals: BTreeMap<String, (Vec<f64>, usize)> = BTreeMap::new();

        for row in &self.rows {
            let Some(values) = self
                .columns
                .iter()
                .map(|c| row.get(c).and_then(Value::as_f64))
                .collect::<Option<Vec<f64>>>()
            else {
                continue;
            };
            let experiment = row
                .get("experiment_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            let (sums, count) = totals
                .entry(experiment)
                .or_insert_with(|| (vec![0.0; values.len()], 0));
            for (sum, value) in sums.iter_mut().zip(values) {
                *sum += value;
            }
            *count += 1;
        }

        totals
            .into_iter()
            .map(|(id, (sums, count))| {
                let means = sums.into_iter().map(|s| s / count as f64).collect();
                (id, means)
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(&self.rows)?;
        write_file(path, &json)
    }
}

fn intersection<'a>(mut sets: impl Iterator<Item = &'a BTreeSet<u64>>) -> BTreeSet<u64> {
    let Some(first) = sets.next() else {
        return BTreeSet::new();
    };
    sets.fold(first.clone(), |acc, set| acc.intersection(set).copied().collect())
}
