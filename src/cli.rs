use crate::convert::pandoc::Preset;
use crate::convert::print::PrintBackend;
use crate::report_pdf::HtmlEngine;
use crate::types::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "docstack")]
#[command(about = "Generate DOCX, HTML and PDF documents from Markdown, templates and data")]
#[command(version)]
pub struct CliArgs {
    /// Style configuration file (YAML)
    /// Default lookup: $DOCSTACK_CONFIG, ./docstack.yaml, then the user config dir
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the sample report document from scratch
    DocxSample {
        #[arg(long, short = 'o', default_value = "sample_report.docx")]
        output: PathBuf,

        /// Directory holding optional images (product.png)
        #[arg(long, default_value = "assets")]
        assets: PathBuf,
    },

    /// Render an HTML or DOCX template with JSON data
    Template {
        /// Template file (.docx, or any text file for HTML)
        template: PathBuf,

        /// JSON data file
        #[arg(long, short = 'd', value_name = "FILE")]
        data: PathBuf,

        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Also print the rendered HTML to this PDF
        #[arg(long, value_name = "PDF")]
        pdf: Option<PathBuf>,

        #[arg(long, default_value = "auto")]
        backend: PrintBackend,
    },

    /// Write the starter templates and sample data
    InitTemplates {
        #[arg(long, default_value = "templates")]
        dir: PathBuf,
    },

    /// Convert Markdown to DOCX without external tools
    Md2docx {
        /// Markdown file, or a directory of them
        input: PathBuf,

        /// Output file (or directory when the input is a directory)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Convert Markdown to a standalone HTML page
    Md2html {
        input: PathBuf,

        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Page title (defaults to the front matter title)
        #[arg(long)]
        title: Option<String>,

        /// Add a table of contents page
        #[arg(long)]
        toc: bool,

        #[arg(long)]
        title_page: bool,
    },

    /// Convert one file with pandoc
    Convert {
        input: PathBuf,

        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Named flag set (pdf-latex, pdf-xelatex, docx, html, epub-pdf)
        #[arg(long, conflicts_with = "to")]
        preset: Option<Preset>,

        /// Output format; inferred from the output extension when omitted
        #[arg(long)]
        to: Option<OutputFormat>,

        /// Extra pandoc options, after `--`
        #[arg(last = true)]
        options: Vec<String>,
    },

    /// Run a batch of pandoc conversions in parallel
    Batch {
        /// Plan file (TOML); the built-in sample plan when omitted
        #[arg(long, value_name = "FILE")]
        plan: Option<PathBuf>,

        /// Input directory for the built-in plan
        #[arg(long, default_value = "data/markdown")]
        input_dir: PathBuf,

        #[arg(long, default_value = "build")]
        out_dir: PathBuf,

        #[arg(long, default_value_t = crate::batch::DEFAULT_WORKERS)]
        workers: usize,

        /// Failure logs directory (default: <out-dir>/logs)
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Also write a JSON summary to this file
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,
    },

    /// Write the sample Markdown documents used by the built-in batch plan
    Samples {
        #[arg(long, default_value = "data/markdown")]
        dir: PathBuf,
    },

    /// Combine dated articles into one PDF
    Combine {
        /// Directory of `YYYY-MM-DD - Title.md` files
        dir: PathBuf,

        #[arg(long, short = 'o', default_value = "combined_articles.pdf")]
        output: PathBuf,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        subtitle: Option<String>,

        /// Write the combined Markdown instead of a PDF
        #[arg(long)]
        markdown_only: bool,
    },

    /// Print an HTML file to PDF
    PrintPdf {
        html: PathBuf,

        /// Output PDF (default: the input with a .pdf extension)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        #[arg(long, default_value = "auto")]
        backend: PrintBackend,

        #[arg(long, default_value = "A4")]
        size: String,

        /// Margin on all sides
        #[arg(long, default_value = "1in")]
        margin: String,

        /// Text shown at the top of every page
        #[arg(long)]
        header: Option<String>,

        /// Text shown at the bottom of every page
        #[arg(long)]
        footer: Option<String>,

        /// Milliseconds the browser gets to run scripts before printing
        #[arg(long, default_value_t = 2000)]
        wait_ms: u64,

        /// Drop background colours and images
        #[arg(long)]
        no_background: bool,
    },

    /// Convert Markdown reports to styled PDFs
    Report {
        /// A single report; every report in --reports-dir when omitted
        file: Option<PathBuf>,

        #[arg(long, default_value = "reports")]
        reports_dir: PathBuf,

        /// Keep running and reconvert reports when they change
        #[arg(long)]
        watch: bool,

        /// Convert even when the PDF is newer than the Markdown
        #[arg(long)]
        force: bool,

        /// Poll interval for --watch, in seconds
        #[arg(long, default_value_t = 1)]
        interval: u64,

        #[arg(long, default_value = "auto")]
        backend: PrintBackend,

        /// HTML renderer: pandoc, native, or auto (pandoc when installed)
        #[arg(long, default_value = "auto")]
        engine: HtmlEngine,
    },

    /// Print a DOCX's main XML with volatile identifiers removed
    Normalize {
        docx: PathBuf,

        /// Compare against this golden file instead of printing
        #[arg(long, value_name = "FILE")]
        golden: Option<PathBuf>,

        /// Rewrite the golden file
        #[arg(long, requires = "golden")]
        update: bool,
    },

    /// Report which external tools are installed
    CheckTools,
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        CliArgs::parse()
    }

    /// Validate argument combinations clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Template { template, pdf: Some(_), .. } if is_docx(template) => {
                Err("--pdf only applies to HTML templates".to_string())
            }
            Command::Batch { workers: 0, .. } => Err("--workers must be at least 1".to_string()),
            Command::Report { file: Some(_), watch: true, .. } => {
                Err("--watch covers the whole reports directory; drop the file argument".to_string())
            }
            Command::Report { interval: 0, watch: true, .. } => Err("--interval must be at least 1".to_string()),
            _ => Ok(()),
        }
    }
}

/// True for `.docx` paths
pub fn is_docx(path: &std::path::Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("docx"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("docstack").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_convert_with_preset_and_trailing_options() {
        let args = parse(&["convert", "in.md", "-o", "out.pdf", "--preset", "pdf-xelatex", "--", "--toc"]);
        match args.command {
            Command::Convert { preset, to, options, .. } => {
                assert_eq!(preset, Some(Preset::PdfXelatex));
                assert_eq!(to, None);
                assert_eq!(options, vec!["--toc".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_preset_conflicts_with_to() {
        let result = CliArgs::try_parse_from(["docstack", "convert", "a.md", "-o", "a.html", "--preset", "html", "--to", "html"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        assert!(CliArgs::try_parse_from(["docstack", "convert", "a.md", "-o", "a.pdf", "--preset", "nope"]).is_err());
    }

    #[test]
    fn test_batch_defaults() {
        let args = parse(&["batch"]);
        match args.command {
            Command::Batch { plan, input_dir, out_dir, workers, json, .. } => {
                assert!(plan.is_none());
                assert_eq!(input_dir, PathBuf::from("data/markdown"));
                assert_eq!(out_dir, PathBuf::from("build"));
                assert_eq!(workers, 4);
                assert!(json.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let args = parse(&["md2docx", "notes.md", "--config", "style.yaml"]);
        assert_eq!(args.config, Some(PathBuf::from("style.yaml")));
    }

    #[test]
    fn test_validate_rejects_pdf_for_docx_template() {
        let args = parse(&["template", "t.docx", "-d", "data.json", "-o", "out.docx", "--pdf", "out.pdf"]);
        assert!(args.validate().is_err());

        let args = parse(&["template", "t.html", "-d", "data.json", "-o", "out.html", "--pdf", "out.pdf"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        assert!(parse(&["batch", "--workers", "0"]).validate().is_err());
        assert!(parse(&["batch", "--workers", "1"]).validate().is_ok());
    }

    #[test]
    fn test_update_requires_golden() {
        assert!(CliArgs::try_parse_from(["docstack", "normalize", "a.docx", "--update"]).is_err());
        assert!(parse(&["normalize", "a.docx", "--golden", "g.xml", "--update"]).validate().is_ok());
    }

    #[test]
    fn test_print_pdf_backend() {
        match parse(&["print-pdf", "page.html", "--backend", "weasyprint", "--footer", "Page"]).command {
            Command::PrintPdf { backend, footer, wait_ms, .. } => {
                assert_eq!(backend, PrintBackend::WeasyPrint);
                assert_eq!(footer.as_deref(), Some("Page"));
                assert_eq!(wait_ms, 2000);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_report_engine() {
        match parse(&["report"]).command {
            Command::Report { engine, reports_dir, .. } => {
                assert_eq!(engine, HtmlEngine::Auto);
                assert_eq!(reports_dir, PathBuf::from("reports"));
            }
            other => panic!("unexpected command {:?}", other),
        }
        match parse(&["report", "--engine", "pandoc"]).command {
            Command::Report { engine, .. } => assert_eq!(engine, HtmlEngine::Pandoc),
            other => panic!("unexpected command {:?}", other),
        }
        assert!(CliArgs::try_parse_from(["docstack", "report", "--engine", "latex"]).is_err());
    }
}
