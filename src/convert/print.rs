//! HTML to PDF printing.
//!
//! Page geometry and running headers/footers are expressed as an `@page`
//! block from [`page_css`]. Chromium gets it injected into a temporary copy
//! of the page; weasyprint gets it as an extra stylesheet.

use super::{run_program, which_tool};
use crate::css::{page_css, PageSetup};
use crate::error::{Error, IoContext, Result};
use crate::types::Tool;
use crate::ui;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

lazy_static! {
    static ref HEAD_CLOSE: Regex = Regex::new(r"(?i)</head\s*>").expect("valid regex");
}

/// Keeps background colours and images in print
const PRINT_BACKGROUND_CSS: &str = "html { -webkit-print-color-adjust: exact; print-color-adjust: exact; }\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOptions {
    pub page: PageSetup,
    /// Time the browser gets to run scripts (charts) before printing
    pub wait_ms: u64,
    pub print_background: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self { page: PageSetup::default(), wait_ms: 2000, print_background: true }
    }
}

impl PrintOptions {
    fn stylesheet(&self) -> String {
        let mut css = page_css(&self.page);
        if self.print_background {
            css.push_str(PRINT_BACKGROUND_CSS);
        }
        css
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintBackend {
    Chromium,
    WeasyPrint,
    /// weasyprint, then chromium, whichever is installed
    Auto,
}

impl fmt::Display for PrintBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrintBackend::Chromium => "chromium",
            PrintBackend::WeasyPrint => "weasyprint",
            PrintBackend::Auto => "auto",
        })
    }
}

impl FromStr for PrintBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(PrintBackend::Chromium),
            "weasyprint" => Ok(PrintBackend::WeasyPrint),
            "auto" => Ok(PrintBackend::Auto),
            other => Err(Error::Config(format!("unknown print backend '{}'", other))),
        }
    }
}

/// Insert a `<style>` block before `</head>`, or at the top without a head
pub fn inject_css(html: &str, css: &str) -> String {
    let style = format!("<style>\n{}</style>\n", css);
    match HEAD_CLOSE.find(html) {
        Some(m) => format!("{}{}{}", &html[..m.start()], style, &html[m.start()..]),
        None => format!("{}{}", style, html),
    }
}

/// `file://` URL for an absolute path
pub fn file_url(path: &Path) -> String {
    let mut url = String::from("file://");
    for ch in path.to_string_lossy().replace('\\', "/").chars() {
        match ch {
            ' ' => url.push_str("%20"),
            '#' => url.push_str("%23"),
            '%' => url.push_str("%25"),
            '?' => url.push_str("%3F"),
            c => url.push(c),
        }
    }
    url
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().at(".")?;
    Ok(cwd.join(path))
}

pub fn chromium_args(html_url: &str, pdf: &Path, wait_ms: u64) -> Vec<String> {
    vec![
        "--headless".to_string(),
        "--disable-gpu".to_string(),
        "--no-sandbox".to_string(),
        "--no-pdf-header-footer".to_string(),
        "--run-all-compositor-stages-before-draw".to_string(),
        format!("--virtual-time-budget={}", wait_ms),
        format!("--print-to-pdf={}", pdf.display()),
        html_url.to_string(),
    ]
}

fn print_chromium(html: &Path, pdf: &Path, opts: &PrintOptions) -> Result<()> {
    let browser = which_tool(Tool::Chromium)?;
    let source = fs::read_to_string(html).at(html)?;

    // Sibling temp file so relative resources still resolve
    let dir = html.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new().prefix(".docstack-print-").suffix(".html").tempfile_in(dir).at(dir)?;
    tmp.write_all(inject_css(&source, &opts.stylesheet()).as_bytes()).at(tmp.path())?;
    tmp.flush().at(tmp.path())?;

    let url = file_url(&absolute(tmp.path())?);
    run_program(Tool::Chromium.name(), &browser, &chromium_args(&url, pdf, opts.wait_ms), None)?;
    Ok(())
}

fn print_weasyprint(html: &Path, pdf: &Path, opts: &PrintOptions) -> Result<()> {
    let weasyprint = which_tool(Tool::WeasyPrint)?;
    let mut css = tempfile::Builder::new().prefix("docstack-page-").suffix(".css").tempfile().at(std::env::temp_dir())?;
    css.write_all(opts.stylesheet().as_bytes()).at(css.path())?;
    css.flush().at(css.path())?;

    let args = vec![
        html.display().to_string(),
        pdf.display().to_string(),
        "-s".to_string(),
        css.path().display().to_string(),
    ];
    run_program(Tool::WeasyPrint.name(), &weasyprint, &args, None)?;
    Ok(())
}

fn print_with(backend: PrintBackend, html: &Path, pdf: &Path, opts: &PrintOptions) -> Result<()> {
    // A stale PDF would pass the output check below
    if pdf.exists() {
        fs::remove_file(pdf).at(pdf)?;
    }
    match backend {
        PrintBackend::Chromium => print_chromium(html, pdf, opts)?,
        PrintBackend::WeasyPrint => print_weasyprint(html, pdf, opts)?,
        PrintBackend::Auto => return Err(Error::Config("auto backend has no printer of its own".to_string())),
    }
    let size = fs::metadata(pdf).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(Error::ToolFailed {
            tool: backend.to_string(),
            status: "exit 0".to_string(),
            stderr: format!("no PDF was written to {}", pdf.display()),
        });
    }
    debug!("{} wrote {} ({} bytes)", backend, pdf.display(), size);
    Ok(())
}

/// Print `html` to `pdf`, returning the backend that produced it
pub fn print_to_pdf(html: &Path, pdf: &Path, opts: &PrintOptions, backend: PrintBackend) -> Result<PrintBackend> {
    if !html.is_file() {
        return Err(Error::MissingInput(html.to_path_buf()));
    }
    let html = absolute(html)?;
    let pdf = absolute(pdf)?;
    if let Some(parent) = pdf.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }

    if backend != PrintBackend::Auto {
        print_with(backend, &html, &pdf, opts)?;
        return Ok(backend);
    }

    let available: Vec<PrintBackend> = [(PrintBackend::WeasyPrint, Tool::WeasyPrint), (PrintBackend::Chromium, Tool::Chromium)]
        .into_iter()
        .filter(|(_, tool)| which_tool(*tool).is_ok())
        .map(|(b, _)| b)
        .collect();
    if available.is_empty() {
        return Err(Error::ToolNotFound { tool: "weasyprint or chromium".to_string() });
    }

    let mut last_err = None;
    for candidate in available {
        match print_with(candidate, &html, &pdf, opts) {
            Ok(()) => return Ok(candidate),
            Err(e) => {
                ui::warn(&format!("{} could not print {}: {}", candidate, html.display(), e));
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| Error::ToolNotFound { tool: "weasyprint or chromium".to_string() }))
}
