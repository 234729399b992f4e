mod batch;
mod config;
mod ui;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use ontoeval_db::Database;
use ontoeval_diff::{ComparisonCache, DiffInput};
use ontoeval_judge::{CommandBackend, Judge, LlmJudge, MetadiffJudge};
use ontoeval_logging::{init_tracing, LogEvent, LogFormat, Logger};
use ontoeval_report::{write_markdown, BenchmarkFile, CombineOptions, CombinedResults};

use crate::batch::{BatchOptions, BatchRunner};
use crate::config::ProjectConfig;

#[derive(Parser, Debug)]
#[command(
    name = "ontoeval",
    about = "Compare predicted ontology edits against curated pull requests",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Working directory holding ontoeval.toml (default: current directory)
    #[arg(long, global = true)]
    working_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormatChoice>,

    /// Tracing filter, e.g. `info` or `ontoeval_diff=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare a target diff file with a predicted diff file
    Compare {
        /// Target diff (`-` reads stdin)
        target: PathBuf,

        /// Predicted diff (`-` reads stdin)
        predicted: PathBuf,

        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,

        /// Skip the comparison cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Compare every record of a benchmark JSON file
    Batch {
        /// JSON array of benchmark records
        input: PathBuf,

        /// Where to write the compared records
        #[arg(short, long)]
        output: PathBuf,

        /// Write one Markdown report per record into this directory
        #[arg(long)]
        markdown_directory: Option<PathBuf>,

        /// Skip records whose target diff has more lines than this
        #[arg(long)]
        max_diff_size_lines: Option<usize>,

        /// Skip the comparison cache
        #[arg(long)]
        no_cache: bool,

        /// Also append events as JSON lines to this file
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Run the LLM judge through this program; the prompt goes to its
        /// stdin and the verdict is read from its stdout
        #[arg(long)]
        judge_command: Option<PathBuf>,

        /// Argument passed to the judge command (repeatable)
        #[arg(long = "judge-arg", allow_hyphen_values = true, requires = "judge_command")]
        judge_args: Vec<String>,
    },

    /// Render Markdown reports for already compared records
    Render {
        /// JSON array of compared benchmark records
        input: PathBuf,

        /// Output directory
        #[arg(short = 'd', long)]
        directory: PathBuf,
    },

    /// Merge compared result files from several experiment runs
    Combine {
        /// Result files, laid out as `<experiment>/<run>/<file>.json`
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Where to write the combined rows
        #[arg(short, long)]
        output: PathBuf,

        /// Keep PRs missing from some runs
        #[arg(long)]
        use_union: bool,

        /// Append each file's stem to its experiment id
        #[arg(long)]
        include_run_id: bool,

        /// Column a row must have and whose mean is reported (repeatable)
        #[arg(long = "column")]
        columns: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    let log_format = config.log_format(cli.log_format.map(Into::into));
    init_tracing(&config.log_level(cli.log_level.as_deref()), log_format);

    match cli.command {
        Commands::Compare {
            target,
            predicted,
            json,
            no_cache,
        } => {
            let (target, predicted) = read_diff_pair(&target, &predicted)?;
            let judge = metadiff_judge(&config, no_cache);
            let comparison = judge.compare_diffs(&target, &predicted);

            if json {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else {
                ui::print_comparison(&comparison)?;
            }
        }
        Commands::Batch {
            input,
            output,
            markdown_directory,
            max_diff_size_lines,
            no_cache,
            log_file,
            judge_command,
            judge_args,
        } => {
            let logger = match log_file {
                Some(ref path) => Logger::with_file(log_format, path)
                    .with_context(|| format!("Failed to open log file {}", path.display()))?,
                None => Logger::new(log_format),
            };

            let options = BatchOptions {
                input,
                output,
                markdown_directory: config.markdown_directory(markdown_directory.as_deref()),
                max_diff_size_lines: config.max_diff_size_lines(max_diff_size_lines),
            };
            let mut judges: Vec<Arc<dyn Judge>> = Vec::new();
            if let Some(program) = judge_command {
                let backend = CommandBackend::new(program, judge_args);
                judges.push(Arc::new(LlmJudge::new(Box::new(backend))));
            }

            let runner = BatchRunner::new(metadiff_judge(&config, no_cache), judges, Arc::new(logger));
            runner.run(&options).await?;
        }
        Commands::Render { input, directory } => {
            let logger = Logger::new(log_format);
            let records = BenchmarkFile::load(&input)?;
            for record in &records {
                let path = write_markdown(&directory, record)?;
                logger.log(&LogEvent::ReportWritten { path });
            }
        }
        Commands::Combine {
            files,
            output,
            use_union,
            include_run_id,
            columns,
        } => {
            let mut options = CombineOptions {
                use_union,
                include_run_id,
                ..Default::default()
            };
            if !columns.is_empty() {
                options.columns = columns;
            }

            let combined = CombinedResults::load(&files, &options)?;
            combined.save(&output)?;
            ui::print_combined(&combined);
            println!("Combined {} files into {}", files.len(), output.display());
        }
    }

    Ok(())
}

/// Metadiff judge backed by the SQLite cache unless caching is off.
///
/// A cache that fails to open only costs a warning.
fn metadiff_judge(config: &ProjectConfig, no_cache: bool) -> MetadiffJudge {
    let judge = MetadiffJudge::new();
    if !config.cache_enabled(no_cache) {
        return judge;
    }

    match open_cache(config.cache_path()) {
        Ok(cache) => judge.with_cache(cache),
        Err(e) => {
            warn!(error = %e, "Comparison cache unavailable, continuing without it");
            judge
        }
    }
}

fn open_cache(path: Option<&Path>) -> Result<Arc<dyn ComparisonCache>> {
    let db = match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            Database::open_at(path)
                .with_context(|| format!("Failed to open cache at {}", path.display()))?
        }
        None => Database::open().context("Failed to open cache database")?,
    };
    let cache: Arc<dyn ComparisonCache> = Arc::new(db);
    Ok(cache)
}

fn read_diff_pair(target: &Path, predicted: &Path) -> Result<(DiffInput, DiffInput)> {
    if is_stdin(target) && is_stdin(predicted) {
        anyhow::bail!("Only one of the diffs can be read from stdin");
    }
    Ok((read_diff(target)?, read_diff(predicted)?))
}

fn read_diff(path: &Path) -> Result<DiffInput> {
    let text = if is_stdin(path) {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read diff from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read diff {}", path.display()))?
    };
    Ok(DiffInput::Text(text))
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}
