/// Core data structures shared across commands
///
/// This module defines the output formats, conversion jobs and external
/// tools that docstack drives, plus the outcome records used for reports.
use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Target document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Docx,
    Html,
    Epub,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
            OutputFormat::Html => "html",
            OutputFormat::Epub => "epub",
        }
    }

    /// File extension for generated files
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Pandoc writer name, None when pandoc should infer it (PDF goes through LaTeX)
    pub fn pandoc_writer(&self) -> Option<&'static str> {
        match self {
            OutputFormat::Pdf => None,
            OutputFormat::Docx => Some("docx"),
            OutputFormat::Html => Some("html"),
            OutputFormat::Epub => Some("epub"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "docx" => Ok(OutputFormat::Docx),
            "html" | "htm" => Ok(OutputFormat::Html),
            "epub" => Ok(OutputFormat::Epub),
            other => Err(Error::Config(format!("unknown output format '{}'", other))),
        }
    }
}

/// One external-converter invocation
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub format: OutputFormat,
    pub options: Vec<String>,
    pub output: PathBuf,
}

impl ConversionJob {
    pub fn new(input: impl Into<PathBuf>, format: OutputFormat, options: Vec<String>, output: impl Into<PathBuf>) -> Self {
        Self { input: input.into(), format, options, output: output.into() }
    }

    /// Short label for status lines: "report.md → report_to_pdf.pdf"
    pub fn label(&self) -> String {
        format!("{} → {}", file_name(&self.input), file_name(&self.output))
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}

/// Result of running a single conversion job
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConversionOutcome {
    pub job: ConversionJob,
    pub success: bool,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
    /// Converter warnings extracted from stderr
    pub warnings: Vec<String>,
}

impl ConversionOutcome {
    pub fn failure(job: ConversionJob, duration: Duration, message: String) -> Self {
        Self { job, success: false, duration, stdout: String::new(), stderr: message, warnings: vec![] }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

/// External binaries docstack knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Pandoc,
    Chromium,
    WeasyPrint,
    XeLatex,
    PdfLatex,
}

impl Tool {
    pub const ALL: [Tool; 5] = [Tool::Pandoc, Tool::Chromium, Tool::WeasyPrint, Tool::XeLatex, Tool::PdfLatex];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Pandoc => "pandoc",
            Tool::Chromium => "chromium",
            Tool::WeasyPrint => "weasyprint",
            Tool::XeLatex => "xelatex",
            Tool::PdfLatex => "pdflatex",
        }
    }

    /// Binary names searched on PATH, in order
    pub fn candidates(&self) -> &'static [&'static str] {
        match self {
            Tool::Pandoc => &["pandoc"],
            Tool::Chromium => &["chromium", "chromium-browser", "google-chrome", "google-chrome-stable", "chrome"],
            Tool::WeasyPrint => &["weasyprint"],
            Tool::XeLatex => &["xelatex"],
            Tool::PdfLatex => &["pdflatex"],
        }
    }

    /// Environment variable that overrides the binary location
    pub fn env_override(&self) -> &'static str {
        match self {
            Tool::Pandoc => "DOCSTACK_PANDOC",
            Tool::Chromium => "DOCSTACK_CHROMIUM",
            Tool::WeasyPrint => "DOCSTACK_WEASYPRINT",
            Tool::XeLatex => "DOCSTACK_XELATEX",
            Tool::PdfLatex => "DOCSTACK_PDFLATEX",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse_is_case_insensitive() {
        assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!(" docx ".parse::<OutputFormat>().unwrap(), OutputFormat::Docx);
        assert_eq!("htm".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert!("odt".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_pdf_has_no_pandoc_writer() {
        assert_eq!(OutputFormat::Pdf.pandoc_writer(), None);
        assert_eq!(OutputFormat::Docx.pandoc_writer(), Some("docx"));
    }

    #[test]
    fn test_outcome_serializes_duration_as_seconds() {
        let job = ConversionJob::new("a.md", OutputFormat::Html, vec![], "a_to_html.html");
        let outcome = ConversionOutcome::failure(job, Duration::from_millis(1500), "boom".into());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["duration"], 1.5);
        assert_eq!(json["job"]["format"], "html");
    }

    #[test]
    fn test_job_label() {
        let job = ConversionJob::new("/data/sample_report.md", OutputFormat::Pdf, vec![], "/build/sample_report_to_pdf.pdf");
        assert_eq!(job.label(), "sample_report.md → sample_report_to_pdf.pdf");
    }
}
