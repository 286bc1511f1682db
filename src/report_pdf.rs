/// Markdown report to PDF generator
///
/// This module handles:
/// - Converting every report in a directory (skipping up-to-date PDFs)
/// - Producing styled HTML through pandoc, or natively when pandoc is absent
/// - Printing the HTML to PDF, keeping the HTML when no printer works
/// - Watching reports and reconverting on change
use crate::config::StyleConfig;
use crate::convert::print::{print_to_pdf, PrintBackend, PrintOptions};
use crate::convert::{run_tool, which_tool};
use crate::css::{generate_css, PageSetup};
use crate::error::{Error, IoContext, Result};
use crate::html::{add_page_structure, render_standalone, title_from_stem, HtmlOptions};
use crate::types::Tool;
use crate::ui;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{self, Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, SystemTime};

/// What `convert` produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportStatus {
    /// The PDF is newer than its Markdown
    UpToDate,
    Pdf(PathBuf),
    /// HTML was written but no printer could make a PDF
    HtmlOnly(PathBuf),
}

/// How the intermediate HTML is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlEngine {
    /// pandoc when installed, otherwise native
    Auto,
    Pandoc,
    Native,
}

impl FromStr for HtmlEngine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(HtmlEngine::Auto),
            "pandoc" => Ok(HtmlEngine::Pandoc),
            "native" => Ok(HtmlEngine::Native),
            other => Err(Error::Config(format!("unknown HTML engine '{}' (auto, pandoc, native)", other))),
        }
    }
}

impl fmt::Display for HtmlEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HtmlEngine::Auto => "auto",
            HtmlEngine::Pandoc => "pandoc",
            HtmlEngine::Native => "native",
        };
        f.write_str(name)
    }
}

pub struct ReportGenerator {
    reports_dir: PathBuf,
    config: StyleConfig,
    engine: HtmlEngine,
    backend: PrintBackend,
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// pandoc runs inside the reports directory so relative image links resolve.
/// Every path it gets must therefore be absolute.
fn pandoc_args(md: &Path, html: &Path, css: &Path, title: &str) -> Result<Vec<String>> {
    let abs = |p: &Path| path::absolute(p).at(p).map(|p| p.display().to_string());
    Ok(vec![
        "--from=gfm".to_string(),
        abs(md)?,
        "-o".to_string(),
        abs(html)?,
        "--standalone".to_string(),
        "--toc".to_string(),
        "--toc-depth=3".to_string(),
        "--css".to_string(),
        abs(css)?,
        "--variable".to_string(),
        format!("pagetitle={}", title),
    ])
}

impl ReportGenerator {
    pub fn new(reports_dir: impl Into<PathBuf>, config: StyleConfig) -> Result<Self> {
        let reports_dir = reports_dir.into();
        if !reports_dir.is_dir() {
            return Err(Error::MissingInput(reports_dir));
        }
        let figures = reports_dir.parent().map(|p| p.join("figures")).unwrap_or_else(|| PathBuf::from("figures"));
        if !figures.is_dir() {
            ui::warn(&format!("figures directory not found: {} (images may be missing from the PDF)", figures.display()));
        }
        Ok(Self { reports_dir, config, engine: HtmlEngine::Auto, backend: PrintBackend::Auto })
    }

    pub fn with_engine(mut self, engine: HtmlEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_backend(mut self, backend: PrintBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Sorted `*.md` files in the reports directory
    pub fn markdown_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.reports_dir)
            .at(&self.reports_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        files.sort();
        Ok(files)
    }

    fn use_pandoc(&self) -> bool {
        match self.engine {
            HtmlEngine::Pandoc => true,
            HtmlEngine::Native => false,
            HtmlEngine::Auto => which_tool(Tool::Pandoc).is_ok(),
        }
    }

    fn pandoc_html(&self, md: &Path, html: &Path, css: &Path, title: &str) -> Result<()> {
        let args = pandoc_args(md, html, css, title)?;
        run_tool(Tool::Pandoc, &args, Some(&self.reports_dir))?;

        let produced = fs::read_to_string(html).at(html)?;
        fs::write(html, add_page_structure(&produced, title)).at(html)
    }

    fn native_html(&self, md: &Path, html: &Path, title: &str) -> Result<()> {
        let source = fs::read_to_string(md).at(md)?;
        let opts = HtmlOptions {
            title: Some(title.to_string()),
            toc: true,
            toc_depth: 3,
            title_page: true,
            ..Default::default()
        };
        fs::write(html, render_standalone(&source, &opts, &self.config)).at(html)
    }

    /// Convert one report. Skips work when the PDF is newer, unless `force`.
    pub fn convert(&self, md: &Path, force: bool) -> Result<ReportStatus> {
        if !md.is_file() {
            return Err(Error::MissingInput(md.to_path_buf()));
        }
        let pdf = md.with_extension("pdf");
        if !force
            && let (Some(md_time), Some(pdf_time)) = (modified(md), modified(&pdf))
            && pdf_time > md_time
        {
            ui::status(&format!("PDF up to date: {}", pdf.display()));
            return Ok(ReportStatus::UpToDate);
        }

        let file_name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        ui::status(&format!("Converting {} -> {}", file_name(md), file_name(&pdf)));

        let stem = md.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let title = title_from_stem(&stem);
        let css = md.with_extension("css");
        let html = md.with_extension("html");
        fs::write(&css, generate_css(&self.config)).at(&css)?;

        if self.use_pandoc() {
            debug!("Rendering {} with pandoc", md.display());
            self.pandoc_html(md, &html, &css, &title)?;
        } else {
            debug!("Rendering {} natively", md.display());
            self.native_html(md, &html, &title)?;
        }

        let opts = PrintOptions { page: PageSetup::from_config(&self.config.page), ..Default::default() };
        match print_to_pdf(&html, &pdf, &opts, self.backend) {
            Ok(backend) => {
                ui::success(&format!("PDF generated with {}: {}", backend, pdf.display()));
                Ok(ReportStatus::Pdf(pdf))
            }
            Err(e) => {
                ui::warn(&format!("no PDF printer worked: {}", e));
                ui::status(&format!("HTML generated: {}", html.display()));
                ui::status("To make a PDF, open it in a browser and print to PDF,");
                ui::status("or install weasyprint or a Chromium-based browser and rerun.");
                Ok(ReportStatus::HtmlOnly(html))
            }
        }
    }

    /// Convert every report. Returns `(converted, failed)`.
    pub fn convert_all(&self, force: bool) -> Result<(usize, usize)> {
        let files = self.markdown_files()?;
        if files.is_empty() {
            ui::warn(&format!("no Markdown files found in {}", self.reports_dir.display()));
            return Ok((0, 0));
        }
        ui::status(&format!("Found {} Markdown files", files.len()));

        let (mut converted, mut failed) = (0, 0);
        for md in &files {
            match self.convert(md, force) {
                Ok(ReportStatus::Pdf(_) | ReportStatus::UpToDate) => converted += 1,
                Ok(ReportStatus::HtmlOnly(_)) => failed += 1,
                Err(e) => {
                    ui::warn(&format!("{}: {}", md.display(), e));
                    failed += 1;
                }
            }
        }

        ui::status(&format!("Converted: {}", converted));
        ui::status(&format!("Failed: {}", failed));
        ui::status(&format!("Directory: {}", self.reports_dir.display()));
        Ok((converted, failed))
    }

    /// Files whose mtime moved past what `seen` recorded. New files are
    /// recorded without being reported; deleted files are forgotten.
    pub fn changed_files(&self, seen: &mut HashMap<PathBuf, SystemTime>) -> Result<Vec<PathBuf>> {
        seen.retain(|path, _| path.is_file());
        let mut changed = Vec::new();
        for md in self.markdown_files()? {
            let Some(now) = modified(&md) else { continue };
            match seen.insert(md.clone(), now) {
                Some(before) if now > before => changed.push(md),
                _ => {}
            }
        }
        Ok(changed)
    }

    /// Poll for changes every `interval` and reconvert with force. Runs until
    /// the process is interrupted.
    pub fn watch(&self, interval: Duration) -> Result<()> {
        let mut seen = HashMap::new();
        self.changed_files(&mut seen)?;
        for md in seen.keys() {
            ui::status(&format!("Watching {}", md.display()));
        }
        info!("Waiting for changes (Ctrl+C to stop)");

        loop {
            thread::sleep(interval);
            for md in self.changed_files(&mut seen)? {
                ui::status(&format!("Change detected: {}", md.display()));
                if let Err(e) = self.convert(&md, true) {
                    ui::warn(&format!("{}: {}", md.display(), e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn reports() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let reports = dir.path().join("reports");
        fs::create_dir_all(&reports).unwrap();
        fs::create_dir_all(dir.path().join("figures")).unwrap();
        (dir, reports)
    }

    #[test]
    fn test_missing_reports_dir() {
        let dir = TempDir::new().unwrap();
        let err = ReportGenerator::new(dir.path().join("nope"), StyleConfig::default()).err();
        assert!(matches!(err, Some(Error::MissingInput(_))));
    }

    #[test]
    fn test_up_to_date_pdf_is_skipped() {
        let (_dir, reports) = reports();
        let md = reports.join("final_analysis_report.md");
        fs::write(&md, "# Report\n").unwrap();
        std::thread::sleep(Duration::from_millis(20));
        fs::write(reports.join("final_analysis_report.pdf"), b"%PDF-1.4").unwrap();

        let generator = ReportGenerator::new(&reports, StyleConfig::default()).unwrap();
        assert_eq!(generator.convert(&md, false).unwrap(), ReportStatus::UpToDate);
        assert!(!reports.join("final_analysis_report.html").exists());
    }

    #[test]
    fn test_native_conversion_writes_css_and_html() {
        let (_dir, reports) = reports();
        let md = reports.join("final_analysis_report.md");
        fs::write(&md, "# Findings\n\nSome text.\n\n## Details\n").unwrap();

        let generator = ReportGenerator::new(&reports, StyleConfig::default()).unwrap().with_engine(HtmlEngine::Native);
        let status = generator.convert(&md, true).unwrap();
        assert!(matches!(status, ReportStatus::Pdf(_) | ReportStatus::HtmlOnly(_)));

        let css = fs::read_to_string(reports.join("final_analysis_report.css")).unwrap();
        assert!(css.contains("@page"));
        let html = fs::read_to_string(reports.join("final_analysis_report.html")).unwrap();
        assert!(html.contains("<title>Final Analysis Report</title>"));
        assert!(html.contains(r#"<div class="title-page">"#));
        assert!(html.contains(r#"<nav id="TOC">"#));
    }

    #[test]
    fn test_convert_all_counts() {
        let (_dir, reports) = reports();
        let generator = ReportGenerator::new(&reports, StyleConfig::default()).unwrap().with_engine(HtmlEngine::Native);
        assert_eq!(generator.convert_all(false).unwrap(), (0, 0));

        fs::write(reports.join("a.md"), "# A\n").unwrap();
        fs::write(reports.join("b.md"), "# B\n").unwrap();
        let (converted, failed) = generator.convert_all(false).unwrap();
        assert_eq!(converted + failed, 2);
    }

    #[test]
    fn test_changed_files_detects_modification() {
        let (_dir, reports) = reports();
        let md = reports.join("a.md");
        fs::write(&md, "# A\n").unwrap();
        let generator = ReportGenerator::new(&reports, StyleConfig::default()).unwrap();

        let mut seen = HashMap::new();
        assert!(generator.changed_files(&mut seen).unwrap().is_empty());
        assert!(seen.contains_key(&md));

        let earlier = seen[&md] - Duration::from_secs(10);
        seen.insert(md.clone(), earlier);
        assert_eq!(generator.changed_files(&mut seen).unwrap(), vec![md.clone()]);
        assert!(generator.changed_files(&mut seen).unwrap().is_empty());
    }

    #[test]
    fn test_changed_files_forgets_deleted_reports() {
        let (_dir, reports) = reports();
        let kept = reports.join("a.md");
        let removed = reports.join("b.md");
        fs::write(&kept, "# A\n").unwrap();
        fs::write(&removed, "# B\n").unwrap();
        let generator = ReportGenerator::new(&reports, StyleConfig::default()).unwrap();

        let mut seen = HashMap::new();
        generator.changed_files(&mut seen).unwrap();
        assert_eq!(seen.len(), 2);

        fs::remove_file(&removed).unwrap();
        assert!(generator.changed_files(&mut seen).unwrap().is_empty());
        assert_eq!(seen.keys().collect::<Vec<_>>(), vec![&kept]);
    }

    #[test]
    fn test_pandoc_args_are_absolute() {
        let args = pandoc_args(
            Path::new("reports/a.md"),
            Path::new("reports/a.html"),
            Path::new("reports/a.css"),
            "A",
        )
        .unwrap();
        let html = &args[args.iter().position(|a| a == "-o").unwrap() + 1];
        assert!(Path::new(html).is_absolute());
        assert!(html.ends_with("a.html"));
        assert!(!html.contains("reports/reports"));
        assert!(Path::new(&args[1]).is_absolute());
        assert!(Path::new(&args[8]).is_absolute());
        assert_eq!(args.last().unwrap(), "pagetitle=A");
    }

    #[test]
    fn test_engine_names() {
        assert_eq!("pandoc".parse::<HtmlEngine>().unwrap(), HtmlEngine::Pandoc);
        assert_eq!("Native".parse::<HtmlEngine>().unwrap(), HtmlEngine::Native);
        assert_eq!(HtmlEngine::Auto.to_string(), "auto");
        assert!("latex".parse::<HtmlEngine>().is_err());
    }
}
