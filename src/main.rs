// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod batch;
mod cli;
mod combine;
mod config;
mod convert;
mod css;
mod docx;
mod error;
mod frontmatter;
mod html;
mod markdown;
mod md2docx;
mod normalize;
mod report_pdf;
mod sample_docx;
mod samples;
mod template;
mod types;
mod ui;

use cli::Command;
use convert::pandoc::{self, Preset};
use convert::print::{print_to_pdf, PrintOptions};
use css::{Margins, PageSetup};
use error::{Error, IoContext, Result};
use normalize::GoldenStatus;
use report_pdf::{ReportGenerator, ReportStatus};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use types::{ConversionJob, OutputFormat, Tool};

fn main() {
    env_logger::init();

    let args = cli::CliArgs::parse_args();

    if let Err(e) = args.validate() {
        ui::print_error(&e);
        std::process::exit(1);
    }

    match run(&args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            ui::print_error(&e.to_string());
            std::process::exit(1);
        }
    }
}

/// Dispatch one subcommand, returning the process exit code
fn run(args: &cli::CliArgs) -> Result<i32> {
    let config_path = args.config.as_deref();

    match &args.command {
        Command::DocxSample { output, assets } => {
            create_parent(output)?;
            let doc = sample_docx::build_sample_report(assets);
            doc.save(output)?;
            ui::success(&format!("Document created: {}", output.display()));
            Ok(0)
        }
        Command::Template { template, data, output, pdf, backend } => {
            run_template(template, data, output, pdf.as_deref(), *backend)
        }
        Command::InitTemplates { dir } => {
            for path in template::init_templates(dir)? {
                ui::status(&format!("Created {}", path.display()));
            }
            Ok(0)
        }
        Command::Md2docx { input, output } => {
            let config = config::load_style_config(config_path)?;
            if input.is_dir() {
                let out_dir = output.clone().unwrap_or_else(|| input.clone());
                let written = md2docx::convert_dir(input, &out_dir, &config)?;
                ui::success(&format!("Converted {} files into {}", written.len(), out_dir.display()));
            } else {
                let output = output.clone().unwrap_or_else(|| input.with_extension("docx"));
                create_parent(&output)?;
                md2docx::convert_file(input, &output, &config)?;
                ui::success(&format!("Document created: {}", output.display()));
            }
            Ok(0)
        }
        Command::Md2html { input, output, title, toc, title_page } => {
            if !input.is_file() {
                return Err(Error::MissingInput(input.clone()));
            }
            let config = config::load_style_config(config_path)?;
            let source = fs::read_to_string(input).at(input)?;
            let opts = html::HtmlOptions { title: title.clone(), toc: *toc, title_page: *title_page, ..Default::default() };
            let output = output.clone().unwrap_or_else(|| input.with_extension("html"));
            create_parent(&output)?;
            fs::write(&output, html::render_standalone(&source, &opts, &config)).at(&output)?;
            ui::success(&format!("HTML written: {}", output.display()));
            Ok(0)
        }
        Command::Convert { input, output, preset, to, options } => {
            run_convert(input, output, *preset, *to, options)
        }
        Command::Batch { plan, input_dir, out_dir, workers, log_dir, json } => {
            run_batch(plan.as_deref(), input_dir, out_dir, *workers, log_dir.as_deref(), json.as_deref())
        }
        Command::Samples { dir } => {
            for path in samples::write_samples(dir)? {
                ui::status(&format!("Created {}", path.display()));
            }
            Ok(0)
        }
        Command::Combine { dir, output, title, subtitle, markdown_only } => {
            let defaults = combine::CombineOptions::default();
            let opts = combine::CombineOptions {
                title: title.clone().unwrap_or(defaults.title),
                subtitle: subtitle.clone().unwrap_or(defaults.subtitle),
            };
            if *markdown_only {
                let output = output.with_extension("md");
                create_parent(&output)?;
                fs::write(&output, combine::combine_articles(dir, &opts)?).at(&output)?;
                ui::success(&format!("Combined Markdown written: {}", output.display()));
            } else {
                let outcome = combine::combine_to_pdf(dir, output, &opts)?;
                for w in &outcome.warnings {
                    ui::warn(w);
                }
                ui::success(&format!("Combined PDF written: {}", output.display()));
            }
            Ok(0)
        }
        Command::PrintPdf { html, output, backend, size, margin, header, footer, wait_ms, no_background } => {
            if !html.is_file() {
                return Err(Error::MissingInput(html.clone()));
            }
            let opts = PrintOptions {
                page: PageSetup {
                    size: size.clone(),
                    margins: Margins::uniform(margin),
                    header: header.clone(),
                    footer: footer.clone(),
                },
                wait_ms: *wait_ms,
                print_background: !no_background,
            };
            let pdf = output.clone().unwrap_or_else(|| html.with_extension("pdf"));
            let used = print_to_pdf(html, &pdf, &opts, *backend)?;
            ui::success(&format!("PDF generated with {}: {}", used, pdf.display()));
            Ok(0)
        }
        Command::Report { file, reports_dir, watch, force, interval, backend, engine } => {
            let config = config::load_style_config(config_path)?;
            let generator = ReportGenerator::new(reports_dir, config)?.with_engine(*engine).with_backend(*backend);
            run_report(&generator, file.as_deref(), *watch, *force, *interval)
        }
        Command::Normalize { docx, golden, update } => {
            let normalized = normalize::normalize_docx(docx)?;
            let Some(golden) = golden else {
                println!("{}", normalized);
                return Ok(0);
            };
            match normalize::check_golden(&normalized, golden, *update)? {
                GoldenStatus::Matches => {
                    ui::success(&format!("{} matches {}", docx.display(), golden.display()));
                    Ok(0)
                }
                GoldenStatus::Written => {
                    ui::status(&format!("Golden written: {}", golden.display()));
                    Ok(0)
                }
                GoldenStatus::Missing => {
                    ui::print_error(&format!("golden file {} does not exist; rerun with --update", golden.display()));
                    Ok(1)
                }
                GoldenStatus::Differs { expected_len, actual_len, first_difference } => {
                    ui::print_error(&format!(
                        "{} differs from {} at byte {} (expected {} bytes, got {})",
                        docx.display(),
                        golden.display(),
                        first_difference,
                        expected_len,
                        actual_len
                    ));
                    Ok(1)
                }
            }
        }
        Command::CheckTools => {
            print_tool_table(&convert::check_tools(&Tool::ALL));
            Ok(0)
        }
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).at(parent)?;
    }
    Ok(())
}

fn run_template(template: &Path, data: &Path, output: &Path, pdf: Option<&Path>, backend: convert::print::PrintBackend) -> Result<i32> {
    if !template.is_file() {
        return Err(Error::MissingInput(template.to_path_buf()));
    }
    let data = template::load_data(data)?;

    if cli::is_docx(template) {
        template::render_docx_template(template, &data, output)?;
        ui::success(&format!("Document created: {}", output.display()));
        return Ok(0);
    }

    let rendered = template::render_html_template(template, &data)?;
    create_parent(output)?;
    fs::write(output, rendered).at(output)?;
    ui::success(&format!("HTML written: {}", output.display()));

    if let Some(pdf) = pdf {
        let used = print_to_pdf(output, pdf, &PrintOptions::default(), backend)?;
        ui::success(&format!("PDF generated with {}: {}", used, pdf.display()));
    }
    Ok(0)
}

fn run_convert(input: &Path, output: &Path, preset: Option<Preset>, to: Option<OutputFormat>, extra: &[String]) -> Result<i32> {
    let (format, mut options) = match (preset, to) {
        (Some(preset), _) => {
            if let Some(engine) = preset.engine()
                && convert::which_tool(engine).is_err()
            {
                ui::warn(&format!("preset {} needs {}, which was not found", preset, engine));
            }
            (preset.format(), preset.options())
        }
        (None, Some(format)) => (format, Vec::new()),
        (None, None) => {
            let ext = output.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
            let format = OutputFormat::from_str(&ext)
                .map_err(|_| Error::Config(format!("cannot infer a format from '{}'; pass --to", output.display())))?;
            (format, Vec::new())
        }
    };
    options.extend(extra.iter().cloned());

    let job = ConversionJob::new(input, format, options, output);
    let outcome = pandoc::convert(&job)?;
    for w in &outcome.warnings {
        ui::warn(w);
    }
    ui::success(&format!("Converted {} in {:.1}s", job.label(), outcome.duration.as_secs_f64()));
    Ok(0)
}

fn run_batch(
    plan: Option<&Path>,
    input_dir: &Path,
    out_dir: &Path,
    workers: usize,
    log_dir: Option<&Path>,
    json: Option<&Path>,
) -> Result<i32> {
    let plan = match plan {
        Some(path) => batch::load_plan(path)?,
        None => batch::default_plan(input_dir),
    };
    let (jobs, skipped) = batch::expand_jobs(&plan, out_dir);
    if jobs.is_empty() {
        let missing = skipped.into_iter().next().unwrap_or_else(|| input_dir.to_path_buf());
        return Err(Error::MissingInput(missing));
    }

    let log_dir = log_dir.map(Path::to_path_buf).unwrap_or_else(|| out_dir.join("logs"));
    let result = batch::run_batch(jobs, workers, Some(&log_dir))?;

    let report = batch::write_report(&result, out_dir)?;
    ui::status(&format!(
        "{} of {} conversions succeeded in {:.1}s",
        result.produced.len(),
        result.outcomes.len(),
        result.duration.as_secs_f64()
    ));
    ui::status(&format!("Report written: {}", report.display()));
    if let Some(json) = json {
        batch::export_json(&result, json)?;
        ui::status(&format!("JSON summary written: {}", json.display()));
    }

    Ok(if result.all_failed() { 1 } else { 0 })
}

fn run_report(generator: &ReportGenerator, file: Option<&Path>, watch: bool, force: bool, interval: u64) -> Result<i32> {
    if watch {
        generator.convert_all(force)?;
        generator.watch(Duration::from_secs(interval))?;
        return Ok(0);
    }

    if let Some(file) = file {
        // Bare names refer to the reports directory
        let path: PathBuf =
            if file.exists() { file.to_path_buf() } else { generator.reports_dir().join(file) };
        return Ok(match generator.convert(&path, force)? {
            ReportStatus::HtmlOnly(_) => 1,
            ReportStatus::Pdf(_) | ReportStatus::UpToDate => 0,
        });
    }

    let (converted, failed) = generator.convert_all(force)?;
    Ok(if converted == 0 && failed > 0 { 1 } else { 0 })
}

fn print_tool_table(statuses: &[convert::ToolStatus]) {
    println!("{}  {}  Version", ui::pad("Tool", 12), ui::pad("Status", 9));
    println!("{}", "-".repeat(60));
    for status in statuses {
        let state = if status.available() { "found" } else { "missing" };
        let detail = match (&status.version, &status.path) {
            (Some(version), Some(path)) => format!("{} ({})", version, path.display()),
            (None, Some(path)) => path.display().to_string(),
            _ => format!("set {} to override", status.tool.env_override()),
        };
        println!("{}  {}  {}", ui::pad(status.tool.name(), 12), ui::pad(state, 9), detail);
    }
}
