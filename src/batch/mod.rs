/// Batch conversion
///
/// This module handles:
/// - Loading conversion plans from TOML
/// - Expanding plans into one job per (input, format) pair
/// - Running jobs on a fixed-size worker pool
/// - The plain-text and JSON batch reports
///
/// There is no retry and no cancellation: a failed job is logged, written to
/// a failure log and left out of the produced files.
mod report;

pub use report::{conversion_report, export_json, write_report, REPORT_FILE};

use crate::convert::logging::write_failure_log;
use crate::convert::pandoc;
use crate::error::{Error, IoContext, Result};
use crate::types::{ConversionJob, ConversionOutcome, OutputFormat};
use crate::ui;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

pub const DEFAULT_WORKERS: usize = 4;

/// One output of a planned conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedOutput {
    pub format: OutputFormat,
    #[serde(default)]
    pub options: Vec<String>,
}

/// One input file and the outputs to produce from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedConversion {
    pub input: PathBuf,
    #[serde(default, rename = "output")]
    pub outputs: Vec<PlannedOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchPlan {
    #[serde(default)]
    pub input_dir: Option<PathBuf>,
    #[serde(default, rename = "conversion")]
    pub conversions: Vec<PlannedConversion>,
}

fn output(format: OutputFormat, options: &[&str]) -> PlannedOutput {
    PlannedOutput { format, options: options.iter().map(|s| s.to_string()).collect() }
}

/// The two sample documents, each to PDF, DOCX and HTML
pub fn default_plan(input_dir: &Path) -> BatchPlan {
    BatchPlan {
        input_dir: Some(input_dir.to_path_buf()),
        conversions: vec![
            PlannedConversion {
                input: PathBuf::from("sample_report.md"),
                outputs: vec![
                    output(OutputFormat::Pdf, &["--pdf-engine=pdflatex", "--toc"]),
                    output(OutputFormat::Docx, &["--toc"]),
                    output(OutputFormat::Html, &["--standalone", "--toc"]),
                ],
            },
            PlannedConversion {
                input: PathBuf::from("complex_report.md"),
                outputs: vec![
                    output(OutputFormat::Pdf, &["--pdf-engine=pdflatex", "--toc", "--number-sections"]),
                    output(OutputFormat::Docx, &["--toc"]),
                    output(OutputFormat::Html, &["--standalone", "--toc", "--css=github.css"]),
                ],
            },
        ],
    }
}

pub fn parse_plan(text: &str) -> std::result::Result<BatchPlan, toml::de::Error> {
    toml::from_str(text)
}

/// Load a plan and anchor its `input_dir` at the plan file's directory.
pub fn load_plan(path: &Path) -> Result<BatchPlan> {
    if !path.is_file() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).at(path)?;
    let plan = parse_plan(&text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    debug!("Loaded plan {} with {} conversions", path.display(), plan.conversions.len());
    Ok(anchor_plan(plan, path.parent().unwrap_or_else(|| Path::new("."))))
}

/// A relative `input_dir`, or none at all, is taken relative to `plan_dir`.
/// Inputs are left as written; [`BatchPlan::input_path`] joins them once.
pub fn anchor_plan(mut plan: BatchPlan, plan_dir: &Path) -> BatchPlan {
    let base = match &plan.input_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => plan_dir.join(dir),
        None => plan_dir.to_path_buf(),
    };
    plan.input_dir = Some(base);
    plan
}

impl BatchPlan {
    /// Where a conversion's input lives: absolute inputs as is, relative
    /// ones inside `input_dir`
    pub fn input_path(&self, conversion: &PlannedConversion) -> PathBuf {
        match &self.input_dir {
            Some(dir) if conversion.input.is_relative() => dir.join(&conversion.input),
            _ => conversion.input.clone(),
        }
    }
}

/// `<stem>_to_<fmt>.<ext>` inside `out_dir`
pub fn output_path(input: &Path, format: OutputFormat, out_dir: &Path) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    out_dir.join(format!("{}_to_{}.{}", stem, format.as_str(), format.extension()))
}

/// One job per planned output. Missing inputs are skipped and returned.
pub fn expand_jobs(plan: &BatchPlan, out_dir: &Path) -> (Vec<ConversionJob>, Vec<PathBuf>) {
    let mut jobs = Vec::new();
    let mut skipped = Vec::new();

    for conversion in &plan.conversions {
        let input = plan.input_path(conversion);
        if !input.is_file() {
            ui::warn(&format!("skipping {}: file not found", input.display()));
            skipped.push(input);
            continue;
        }
        for out in &conversion.outputs {
            jobs.push(ConversionJob::new(
                &input,
                out.format,
                out.options.clone(),
                output_path(&input, out.format, out_dir),
            ));
        }
    }
    (jobs, skipped)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    /// Every job's outcome, sorted by output path
    pub outcomes: Vec<ConversionOutcome>,
    /// Files that were written, sorted
    pub produced: Vec<PathBuf>,
    #[serde(with = "secs")]
    pub duration: Duration,
}

mod secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

impl BatchResult {
    pub fn failures(&self) -> impl Iterator<Item = &ConversionOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// True when there were jobs and none of them succeeded
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.produced.is_empty()
    }
}

fn run_job<F>(job: ConversionJob, log_dir: Option<&Path>, convert: &F) -> ConversionOutcome
where
    F: Fn(&ConversionJob) -> Result<ConversionOutcome>,
{
    let label = job.label();
    ui::status(&format!("Converting {}", label));
    let start = Instant::now();

    match convert(&job) {
        Ok(outcome) => {
            ui::success(&format!("Converted {}", label));
            outcome
        }
        Err(e) => {
            ui::warn(&format!("conversion failed for {}: {}", label, e));
            let outcome = ConversionOutcome::failure(job, start.elapsed(), e.to_string());
            if let Some(dir) = log_dir
                && let Err(log_err) = write_failure_log(dir, &outcome)
            {
                ui::warn(&format!("could not write failure log: {}", log_err));
            }
            outcome
        }
    }
}

/// Run `jobs` with `convert` on a pool of exactly `workers` threads
pub fn run_batch_with<F>(jobs: Vec<ConversionJob>, workers: usize, log_dir: Option<&Path>, convert: F) -> Result<BatchResult>
where
    F: Fn(&ConversionJob) -> Result<ConversionOutcome> + Sync,
{
    let workers = workers.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("docstack-worker-{}", i))
        .build()
        .map_err(|e| Error::Config(format!("could not start {} workers: {}", workers, e)))?;

    info!("Starting batch conversion of {} jobs with {} workers", jobs.len(), workers);
    let start = Instant::now();
    let (tx, rx) = mpsc::channel();
    let convert = &convert;

    pool.scope(|scope| {
        for job in jobs {
            let tx = tx.clone();
            scope.spawn(move |_| {
                // The receiver outlives the scope
                let _ = tx.send(run_job(job, log_dir, convert));
            });
        }
    });
    drop(tx);

    // Completion order
    let mut outcomes: Vec<ConversionOutcome> = rx.into_iter().collect();
    outcomes.sort_by(|a, b| a.job.output.cmp(&b.job.output));
    let produced = outcomes.iter().filter(|o| o.success).map(|o| o.job.output.clone()).collect();

    Ok(BatchResult { outcomes, produced, duration: start.elapsed() })
}

/// Run `jobs` through pandoc
pub fn run_batch(jobs: Vec<ConversionJob>, workers: usize, log_dir: Option<&Path>) -> Result<BatchResult> {
    run_batch_with(jobs, workers, log_dir, pandoc::convert)
}
