//! Failure logging for conversion jobs.
//!
//! Each failed job gets its own log file with the full converter output.

use crate::types::ConversionOutcome;
use log::debug;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where the log for a job's output would be written
pub fn failure_log_path(log_dir: &Path, outcome: &ConversionOutcome) -> PathBuf {
    let name = outcome
        .job
        .output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "conversion".to_string());
    log_dir.join(format!("{}.log", name.replace(['/', '\\'], "_")))
}

/// Write a failure log for `outcome` into `log_dir`.
///
/// # Arguments
/// * `log_dir` - Directory to write logs to (created if missing)
/// * `outcome` - The failed conversion, including captured output
pub fn write_failure_log(log_dir: &Path, outcome: &ConversionOutcome) -> std::io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let log_path = failure_log_path(log_dir, outcome);
    debug!("Writing failure log to {:?}", log_path);

    let mut file = File::create(&log_path)?;
    let job = &outcome.job;

    writeln!(file, "=== Conversion Failure ===")?;
    writeln!(file, "Input: {}", job.input.display())?;
    writeln!(file, "Output: {}", job.output.display())?;
    writeln!(file, "Format: {}", job.format)?;
    writeln!(file, "Options: {}", job.options.join(" "))?;
    writeln!(file, "Duration: {:?}", outcome.duration)?;
    writeln!(file)?;

    if !outcome.stderr.is_empty() {
        writeln!(file, "--- stderr ---")?;
        writeln!(file, "{}", outcome.stderr)?;
    }
    if !outcome.stdout.is_empty() {
        writeln!(file, "--- stdout ---")?;
        writeln!(file, "{}", outcome.stdout)?;
    }
    if !outcome.warnings.is_empty() {
        writeln!(file)?;
        writeln!(file, "--- Warnings ---")?;
        for w in &outcome.warnings {
            writeln!(file, "  - {}", w)?;
        }
    }

    file.flush()?;
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConversionJob, OutputFormat};
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_write_failure_log_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let job = ConversionJob::new(
            "data/sample_report.md",
            OutputFormat::Pdf,
            vec!["--pdf-engine=pdflatex".into()],
            "build/sample_report_to_pdf.pdf",
        );
        let outcome = ConversionOutcome::failure(job, Duration::from_secs(1), "pdflatex not found".to_string());

        let path = write_failure_log(&temp_dir.path().join("logs"), &outcome).unwrap();
        assert_eq!(path, temp_dir.path().join("logs/sample_report_to_pdf.pdf.log"));

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("Input: data/sample_report.md"));
        assert!(content.contains("Options: --pdf-engine=pdflatex"));
        assert!(content.contains("pdflatex not found"));
    }
}
