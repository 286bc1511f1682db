//! Combine dated Markdown articles into one document.
//!
//! Articles are named `YYYY-MM-DD - Title.md` (optionally with a code after
//! the date). Each becomes a top-level section with its date as subtitle,
//! separated by page breaks.

use crate::convert::pandoc::{self, Preset};
use crate::error::{Error, IoContext, Result};
use crate::frontmatter::split_front_matter;
use crate::types::{ConversionJob, ConversionOutcome};
use crate::ui;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref ARTICLE_NAME: Regex =
        Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:\s+[^\s-]+)?\s*-\s*(.+)\.md$").expect("valid regex");
    static ref LEADING_DATE: Regex = Regex::new(r"^(\d{4}-\d{2}-\d{2})\s*").expect("valid regex");
}

const PAGE_BREAK: &str = "\\newpage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineOptions {
    pub title: String,
    pub subtitle: String,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            title: "Research Article Collection".to_string(),
            subtitle: "Combined technical documents and research articles".to_string(),
        }
    }
}

/// `(date, title)` from an article file name
pub fn parse_article_filename(name: &str) -> Result<(String, String)> {
    if let Some(caps) = ARTICLE_NAME.captures(name) {
        return Ok((caps[1].to_string(), caps[2].trim().to_string()));
    }
    if let Some(caps) = LEADING_DATE.captures(name) {
        let rest = &name[caps[0].len()..];
        let title = rest.strip_suffix(".md").unwrap_or(rest).trim();
        return Ok((caps[1].to_string(), title.to_string()));
    }
    Err(Error::Config(format!("could not parse date from filename '{}'", name)))
}

/// Article body without front matter, trimmed
pub fn strip_front_matter(content: &str) -> &str {
    split_front_matter(content).1.trim()
}

fn article_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::MissingInput(dir.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .at(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(Error::MissingInput(dir.join("*.md")));
    }
    Ok(files)
}

/// Build the combined Markdown for every article in `dir`
pub fn combine_articles(dir: &Path, opts: &CombineOptions) -> Result<String> {
    let files = article_files(dir)?;

    let mut articles = Vec::new();
    for path in &files {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let parsed = parse_article_filename(&name)
            .and_then(|(date, title)| fs::read_to_string(path).at(path).map(|content| (date, title, content)));
        match parsed {
            Ok((date, title, content)) => {
                articles.push(format!("# {}\n## {}\n\n{}", title, date, strip_front_matter(&content)));
            }
            Err(e) => ui::warn(&format!("skipping {}: {}", name, e)),
        }
    }
    debug!("Combined {} of {} articles", articles.len(), files.len());

    let mut out = format!("# {}\n*{}*\n\n{}\n\n", opts.title, opts.subtitle, PAGE_BREAK);
    out.push_str(&articles.join(&format!("\n\n{}\n\n", PAGE_BREAK)));
    out.push('\n');
    Ok(out)
}

/// Flags for the combined PDF: the xelatex preset with a two-level TOC
pub fn combined_pdf_options() -> Vec<String> {
    Preset::PdfXelatex
        .options()
        .into_iter()
        .map(|o| if o.starts_with("--toc-depth=") { "--toc-depth=2".to_string() } else { o })
        .collect()
}

/// Combine the articles in `dir` and render them to `output` as PDF
pub fn combine_to_pdf(dir: &Path, output: &Path, opts: &CombineOptions) -> Result<ConversionOutcome> {
    let markdown = combine_articles(dir, opts)?;

    let out_dir = match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.to_path_buf(),
        None => PathBuf::from("."),
    };
    fs::create_dir_all(&out_dir).at(&out_dir)?;

    // Removed on drop
    let mut tmp = tempfile::Builder::new().prefix("combined-").suffix(".md").tempfile_in(&out_dir).at(&out_dir)?;
    tmp.write_all(markdown.as_bytes()).at(tmp.path())?;
    tmp.flush().at(tmp.path())?;

    let job = ConversionJob::new(tmp.path(), crate::types::OutputFormat::Pdf, combined_pdf_options(), output);
    pandoc::convert(&job)
}
