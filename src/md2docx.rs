/// Native Markdown to DOCX conversion
///
/// This module handles:
/// - Mapping the parsed Markdown block tree onto `DocxBuilder` calls
/// - Applying the configured DOCX styles
/// - Single-file and whole-directory conversion
use crate::config::StyleConfig;
use crate::docx::{Alignment, DocxBuilder, RunProps, TextRun};
use crate::error::{Error, IoContext, Result};
use crate::frontmatter;
use crate::markdown::{self, Block, ListItem, Run};
use crate::ui;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Widest picture placed in the page body
const MAX_IMAGE_WIDTH_IN: f64 = 6.0;
/// Pixel density assumed when sizing images
const IMAGE_DPI: f64 = 96.0;

fn text_runs(runs: &[Run]) -> Vec<TextRun> {
    runs.iter()
        .map(|run| {
            let mut props = RunProps {
                bold: run.style.bold,
                italic: run.style.italic,
                underline: run.style.underline,
                strike: run.style.strike,
                ..Default::default()
            };
            if run.style.code {
                props.font = RunProps::monospace().font;
            }
            TextRun { text: run.text.clone(), props, link: run.link.clone() }
        })
        .collect()
}

fn add_image(doc: &mut DocxBuilder, src: &str, alt: &str, base_dir: &Path) {
    if src.starts_with("http://") || src.starts_with("https://") {
        ui::warn(&format!("remote image {} skipped", src));
        return;
    }
    let path = base_dir.join(src);
    let width = image::image_dimensions(&path)
        .map(|(w, _)| (w as f64 / IMAGE_DPI).min(MAX_IMAGE_WIDTH_IN))
        .unwrap_or(MAX_IMAGE_WIDTH_IN);

    let placed = doc.add_picture(&path, width).map(|mut picture| {
        picture.align(Alignment::Center);
    });
    match placed {
        Ok(()) if !alt.trim().is_empty() => {
            doc.add_paragraph().style("Caption").align(Alignment::Center).text(alt.trim());
        }
        Ok(()) => {}
        Err(e) => ui::warn(&format!("image {} skipped: {}", path.display(), e)),
    }
}

fn add_list(doc: &mut DocxBuilder, ordered: bool, start: u64, items: &[ListItem], level: u32, base_dir: &Path) {
    if ordered && level == 0 {
        doc.restart_numbering(start);
    }
    for item in items {
        doc.add_list_item(&text_runs(&item.runs), ordered, level);
        for child in &item.children {
            match child {
                Block::List { ordered, start, items } => add_list(doc, *ordered, *start, items, level + 1, base_dir),
                other => add_block(doc, other, base_dir),
            }
        }
    }
}

fn add_block(doc: &mut DocxBuilder, block: &Block, base_dir: &Path) {
    match block {
        Block::Heading { level, runs } => {
            doc.add_heading("", *level).runs(&text_runs(runs));
        }
        Block::Paragraph(runs) => {
            doc.add_paragraph().runs(&text_runs(runs));
        }
        Block::List { ordered, start, items } => add_list(doc, *ordered, *start, items, 0, base_dir),
        Block::CodeBlock { text, .. } => {
            doc.add_code_block(text);
        }
        Block::Quote(blocks) => {
            for inner in blocks {
                match inner {
                    Block::Paragraph(runs) => {
                        doc.add_quote(&text_runs(runs));
                    }
                    other => add_block(doc, other, base_dir),
                }
            }
        }
        Block::Table { header, rows } => {
            let header: Vec<Vec<TextRun>> = header
                .iter()
                .map(|cell| {
                    text_runs(cell)
                        .into_iter()
                        .map(|mut r| {
                            r.props.bold = true;
                            r
                        })
                        .collect::<Vec<_>>()
                })
                .collect();
            let rows: Vec<Vec<Vec<TextRun>>> =
                rows.iter().map(|row| row.iter().map(|cell| text_runs(cell)).collect::<Vec<_>>()).collect();
            doc.add_table(header, rows);
        }
        Block::Rule => {
            doc.add_paragraph();
        }
        Block::Image { src, alt } => add_image(doc, src, alt, base_dir),
        Block::PageBreak => {
            doc.add_page_break();
        }
    }
}

/// Build a document from Markdown. Images resolve relative to `base_dir`.
pub fn convert_markdown(md: &str, config: &StyleConfig, base_dir: &Path) -> DocxBuilder {
    let (meta, body) = frontmatter::extract(md);
    let mut doc = DocxBuilder::new();
    doc.apply_styles(&config.docx.styles);

    if let Some(author) = &meta.author {
        doc.set_author(author.as_str());
    }
    if let Some(title) = &meta.title {
        doc.set_title(title.as_str());
        doc.add_heading(title, 0);
    }

    let parsed = markdown::parse(body);
    debug!("Markdown parsed into {} blocks", parsed.blocks.len());
    for block in &parsed.blocks {
        add_block(&mut doc, block, base_dir);
    }
    doc
}

/// Convert one Markdown file to DOCX
pub fn convert_file(input: &Path, output: &Path, config: &StyleConfig) -> Result<()> {
    if !input.is_file() {
        return Err(Error::MissingInput(input.to_path_buf()));
    }
    let md = fs::read_to_string(input).at(input)?;
    let base_dir = input.parent().unwrap_or_else(|| Path::new("."));
    let doc = convert_markdown(&md, config, base_dir);
    doc.save(output)?;
    info!("Wrote {} ({} body elements)", output.display(), doc.len());
    Ok(())
}

/// Convert every `*.md` in `input_dir` to `out_dir/<stem>.docx`.
///
/// Returns the files written. Per-file failures are reported and skipped.
pub fn convert_dir(input_dir: &Path, out_dir: &Path, config: &StyleConfig) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(Error::MissingInput(input_dir.to_path_buf()));
    }
    let mut inputs: Vec<PathBuf> = fs::read_dir(input_dir)
        .at(input_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    inputs.sort();

    if inputs.is_empty() {
        ui::warn(&format!("no Markdown files found in {}", input_dir.display()));
        return Ok(Vec::new());
    }

    fs::create_dir_all(out_dir).at(out_dir)?;
    let mut written = Vec::new();
    for input in inputs {
        let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let output = out_dir.join(format!("{}.docx", stem));
        ui::status(&format!("Converting {} -> {}", input.display(), output.display()));
        match convert_file(&input, &output, config) {
            Ok(()) => written.push(output),
            Err(e) => ui::warn(&format!("{}: {}", input.display(), e)),
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"---
title: "Sample Report"
author: Batch
---

# Introduction

Some **bold** and *italic* text with `code`.

1. first
2. second
   - nested bullet

```python
def hello_world():
    return True
```

> Quoted line

| Name | Value |
|------|-------|
| Temp | 25°C  |

---

\newpage

## After the break
"#;

    #[test]
    fn test_convert_markdown_maps_blocks() {
        let doc = convert_markdown(SAMPLE, &StyleConfig::default(), Path::new("."));
        let xml = doc.document_xml();

        assert!(xml.contains(r#"<w:pStyle w:val="Title"/>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="Heading1"/>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="Heading2"/>"#));
        assert!(xml.contains(r#"<w:rPr><w:b/></w:rPr><w:t xml:space="preserve">bold</w:t>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="ListNumber"/>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="ListBullet"/><w:numPr><w:ilvl w:val="1"/>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="NoSpacing"/>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="Quote"/>"#));
        assert!(xml.contains(r#"<w:tblStyle w:val="TableGrid"/>"#));
        assert!(xml.contains(r#"<w:br w:type="page"/>"#));
        // Front matter is not rendered as text
        assert!(!xml.contains("author: Batch"));
    }

    #[test]
    fn test_missing_image_is_skipped() {
        let dir = TempDir::new().unwrap();
        let doc = convert_markdown("![chart](figures/none.png)\n\ntext\n", &StyleConfig::default(), dir.path());
        let xml = doc.document_xml();
        assert!(!xml.contains("<w:drawing>"));
        assert!(xml.contains("text"));
    }

    #[test]
    fn test_local_image_is_embedded_with_caption() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("figures")).unwrap();
        image::RgbImage::new(192, 96).save(dir.path().join("figures/chart.png")).unwrap();

        let doc = convert_markdown("![Revenue](figures/chart.png)\n", &StyleConfig::default(), dir.path());
        let xml = doc.document_xml();
        assert!(xml.contains("<w:drawing>"));
        // 192 px at 96 dpi is two inches
        assert!(xml.contains(r#"<wp:extent cx="1828800" cy="914400"/>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="Caption"/>"#));
    }

    #[test]
    fn test_convert_dir() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input_md");
        let out = dir.path().join("output_docx");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("a.md"), "# A\n").unwrap();
        fs::write(input.join("b.md"), "# B\n").unwrap();
        fs::write(input.join("notes.txt"), "ignored").unwrap();

        let written = convert_dir(&input, &out, &StyleConfig::default()).unwrap();
        assert_eq!(written, vec![out.join("a.docx"), out.join("b.docx")]);
        assert!(out.join("a.docx").is_file());
    }

    #[test]
    fn test_convert_dir_without_markdown_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let written = convert_dir(dir.path(), &dir.path().join("out"), &StyleConfig::default()).unwrap();
        assert!(written.is_empty());
    }
}
