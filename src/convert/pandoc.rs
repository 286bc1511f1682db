//! Pandoc invocations.

use super::run_tool;
use crate::error::{Error, IoContext, Result};
use crate::types::{ConversionJob, ConversionOutcome, OutputFormat, Tool};
use log::{debug, warn};
use std::fmt;
use std::fs;
use std::str::FromStr;

/// LaTeX variables shared by the PDF presets
const LATEX_VARIABLES: [&str; 6] = [
    "--variable=geometry:margin=1in",
    "--variable=fontsize=11pt",
    "--variable=colorlinks=true",
    "--variable=linkcolor=blue",
    "--variable=urlcolor=blue",
    "--variable=citecolor=green",
];

/// Named flag sets for common conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    PdfLatex,
    PdfXelatex,
    Docx,
    Html,
    EpubPdf,
}

impl Preset {
    pub const ALL: [Preset; 5] = [Preset::PdfLatex, Preset::PdfXelatex, Preset::Docx, Preset::Html, Preset::EpubPdf];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::PdfLatex => "pdf-latex",
            Preset::PdfXelatex => "pdf-xelatex",
            Preset::Docx => "docx",
            Preset::Html => "html",
            Preset::EpubPdf => "epub-pdf",
        }
    }

    /// Output format the preset produces
    pub fn format(&self) -> OutputFormat {
        match self {
            Preset::Docx => OutputFormat::Docx,
            Preset::Html => OutputFormat::Html,
            Preset::PdfLatex | Preset::PdfXelatex | Preset::EpubPdf => OutputFormat::Pdf,
        }
    }

    pub fn options(&self) -> Vec<String> {
        let toc = ["--toc", "--toc-depth=3"];
        let opts: Vec<&str> = match self {
            Preset::PdfLatex | Preset::PdfXelatex => {
                let engine = if *self == Preset::PdfLatex { "--pdf-engine=pdflatex" } else { "--pdf-engine=xelatex" };
                let mut v = vec![engine];
                v.extend(LATEX_VARIABLES);
                v.extend(toc);
                v.push("--number-sections");
                v
            }
            Preset::Docx => {
                let mut v = vec!["--from=markdown"];
                v.extend(toc);
                v.extend(["--number-sections", "--highlight-style=tango"]);
                v
            }
            Preset::Html => vec!["--standalone", "--toc"],
            Preset::EpubPdf => {
                let mut v = vec!["--pdf-engine=xelatex"];
                v.extend(LATEX_VARIABLES);
                v.extend(["--extract-media=./images", "--wrap=none"]);
                v.extend(toc);
                v.push("--number-sections");
                v
            }
        };
        opts.into_iter().map(str::to_string).collect()
    }

    /// LaTeX engine the preset needs, if any
    pub fn engine(&self) -> Option<Tool> {
        match self {
            Preset::PdfLatex => Some(Tool::PdfLatex),
            Preset::PdfXelatex | Preset::EpubPdf => Some(Tool::XeLatex),
            Preset::Docx | Preset::Html => None,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == s.trim())
            .ok_or_else(|| Error::Config(format!("unknown preset '{}'", s)))
    }
}

/// True for options that select the pandoc writer (`--to=html`, `-t html`, ...)
fn names_writer(option: &str) -> bool {
    matches!(option, "--to" | "-t" | "--write" | "-w")
        || option.starts_with("--to=")
        || option.starts_with("--write=")
        || (option.len() > 2 && (option.starts_with("-t") || option.starts_with("-w")) && !option.starts_with("--"))
}

/// `input -o output [--to=<writer>] <options...>`
pub fn args_for(job: &ConversionJob) -> Vec<String> {
    let mut args = vec![job.input.display().to_string(), "-o".to_string(), job.output.display().to_string()];
    if let Some(writer) = job.format.pandoc_writer()
        && !job.options.iter().any(|o| names_writer(o))
    {
        args.push(format!("--to={}", writer));
    }
    args.extend(job.options.iter().cloned());
    args
}

/// Pandoc `[WARNING]` lines from stderr
pub fn extract_warnings(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .filter_map(|l| l.trim().strip_prefix("[WARNING]"))
        .map(|l| l.trim().to_string())
        .collect()
}

/// Run one conversion job through pandoc
pub fn convert(job: &ConversionJob) -> Result<ConversionOutcome> {
    if !job.input.is_file() {
        return Err(Error::MissingInput(job.input.clone()));
    }
    if let Some(parent) = job.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).at(parent)?;
    }

    let args = args_for(job);
    debug!("pandoc {}", args.join(" "));
    let output = run_tool(Tool::Pandoc, &args, None)?;

    let warnings = extract_warnings(&output.stderr);
    for w in &warnings {
        warn!("{}: {}", job.label(), w);
    }
    Ok(ConversionOutcome {
        job: job.clone(),
        success: true,
        duration: output.duration,
        stdout: output.stdout,
        stderr: output.stderr,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_for_docx() {
        let job = ConversionJob::new("in/report.md", OutputFormat::Docx, vec!["--toc".into()], "out/report.docx");
        assert_eq!(args_for(&job), vec!["in/report.md", "-o", "out/report.docx", "--to=docx", "--toc"]);
    }

    #[test]
    fn test_args_for_pdf_omits_writer() {
        let job = ConversionJob::new("a.md", OutputFormat::Pdf, Preset::PdfLatex.options(), "a.pdf");
        let args = args_for(&job);
        assert!(!args.iter().any(|a| a.starts_with("--to=")));
        assert_eq!(args[3], "--pdf-engine=pdflatex");
        assert!(args.contains(&"--number-sections".to_string()));
    }

    #[test]
    fn test_explicit_writer_is_not_duplicated() {
        let job = ConversionJob::new("a.md", OutputFormat::Html, vec!["--to=html5".into()], "a.html");
        let args = args_for(&job);
        assert_eq!(args.iter().filter(|a| a.starts_with("--to=")).count(), 1);
    }

    #[test]
    fn test_toc_options_keep_the_writer() {
        let job = ConversionJob::new(
            "a.md",
            OutputFormat::Html,
            vec!["--toc".into(), "--toc-depth=2".into()],
            "out.txt",
        );
        assert_eq!(args_for(&job), vec!["a.md", "-o", "out.txt", "--to=html", "--toc", "--toc-depth=2"]);

        for preset in [Preset::Docx, Preset::Html] {
            let job = ConversionJob::new("a.md", preset.format(), preset.options(), "a.out");
            let expected = format!("--to={}", preset.format());
            assert!(args_for(&job).contains(&expected), "{} lost its writer", preset);
        }
    }

    #[test]
    fn test_short_writer_flags_are_recognised() {
        for opts in [vec!["-t", "html5"], vec!["-thtml5"], vec!["--write=html5"], vec!["--to", "html5"]] {
            let options = opts.iter().map(|s| s.to_string()).collect();
            let job = ConversionJob::new("a.md", OutputFormat::Html, options, "a.html");
            assert!(!args_for(&job).contains(&"--to=html".to_string()), "{:?}", opts);
        }
    }

    #[test]
    fn test_presets() {
        assert_eq!("pdf-xelatex".parse::<Preset>().unwrap(), Preset::PdfXelatex);
        assert!("word".parse::<Preset>().is_err());
        assert_eq!(Preset::Html.options(), vec!["--standalone", "--toc"]);
        assert!(Preset::Docx.options().contains(&"--highlight-style=tango".to_string()));
        assert!(Preset::EpubPdf.options().contains(&"--wrap=none".to_string()));
        assert_eq!(Preset::EpubPdf.engine(), Some(Tool::XeLatex));
        assert_eq!(Preset::Docx.format(), OutputFormat::Docx);
    }

    #[test]
    fn test_extract_warnings() {
        let stderr = "[WARNING] Could not fetch resource 'x.png'\nother line\n  [WARNING] Duplicate identifier 'intro'\n";
        assert_eq!(
            extract_warnings(stderr),
            vec!["Could not fetch resource 'x.png'", "Duplicate identifier 'intro'"]
        );
    }

    #[test]
    fn test_convert_missing_input() {
        let job = ConversionJob::new("/nonexistent/a.md", OutputFormat::Html, vec![], "/tmp/a.html");
        assert!(matches!(convert(&job), Err(Error::MissingInput(_))));
    }
}
