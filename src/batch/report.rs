//! Batch report export: plain text and JSON.

use super::BatchResult;
use crate::error::{IoContext, Result};
use crate::ui::pad;
use serde_json::json;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use unicode_width::UnicodeWidthStr;

pub const REPORT_FILE: &str = "conversion_report.txt";

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}

/// Human-readable summary, grouped by input file
pub fn conversion_report(result: &BatchResult) -> String {
    let mut out = String::new();
    out.push_str("Batch Conversion Report\n");
    out.push_str(&"=".repeat(50));
    out.push_str("\n\n");
    out.push_str(&format!("Total conversions: {}\n\n", result.produced.len()));

    let mut by_input: BTreeMap<String, Vec<(String, f64)>> = BTreeMap::new();
    for outcome in result.outcomes.iter().filter(|o| o.success) {
        by_input
            .entry(file_name(&outcome.job.input))
            .or_default()
            .push((file_name(&outcome.job.output), outcome.duration.as_secs_f64()));
    }
    let width = by_input.values().flatten().map(|(name, _)| UnicodeWidthStr::width(name.as_str())).max().unwrap_or(0);

    for (input, outputs) in &by_input {
        out.push_str(&format!("Input: {}\n", input));
        for (name, secs) in outputs {
            out.push_str(&format!("  → {}  {:>6.1}s\n", pad(name, width), secs));
        }
        out.push('\n');
    }

    let failed = result.failed_count();
    if failed > 0 {
        out.push_str(&format!("Failed conversions: {}\n", failed));
        for outcome in result.failures() {
            let reason = outcome.stderr.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("unknown error");
            out.push_str(&format!("  ✗ {}: {}\n", outcome.job.label(), reason));
        }
        out.push('\n');
        out.push_str(&format!("Conversion completed with {} failure(s).\n", failed));
    } else {
        out.push_str("Conversion completed successfully!\n");
    }
    out
}

/// Write [`conversion_report`] to `out_dir/conversion_report.txt`
pub fn write_report(result: &BatchResult, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir).at(out_dir)?;
    let path = out_dir.join(REPORT_FILE);
    fs::write(&path, conversion_report(result)).at(&path)?;
    Ok(path)
}

/// Export the batch result as JSON.
///
/// Includes summary counts, the produced files and every outcome with its
/// captured output.
pub fn export_json(result: &BatchResult, output_path: &Path) -> Result<()> {
    let report = json!({
        "summary": {
            "total": result.outcomes.len(),
            "succeeded": result.produced.len(),
            "failed": result.failed_count(),
            "duration_secs": result.duration.as_secs_f64(),
        },
        "produced": result.produced,
        "outcomes": result.outcomes,
    });

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).at(parent)?;
    }
    let file = File::create(output_path).at(output_path)?;
    serde_json::to_writer_pretty(file, &report)?;
    Ok(())
}
