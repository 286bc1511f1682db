//! Placeholder substitution inside `.docx` templates.
//!
//! Word freely splits typed text across runs, so `{{ name }}` can arrive as
//! `{{</w:t></w:r><w:r><w:t>name }}`. Parts are healed first, then paragraphs
//! and table rows that hold nothing but a block tag are replaced by the bare
//! tag so `{{#each}}` repeats whole rows and paragraphs.
//!
//! Two helpers emit runs of their own and are moved out of the run they were
//! typed in:
//!
//! - `{{rich text bold=true italic=true color="FF0000" size=14}}` writes a
//!   formatted run
//! - `{{image path 40}}` embeds a picture 40 mm wide (pixel size at 96 dpi
//!   when the width is left out), adding the media part and relationship

use super::{registry, undeclared_error, undeclared_variables};
use crate::docx::xml::{self, escape_xml, Relationship, REL_IMAGE};
use crate::docx::{read_image, run_xml, RunProps, EMU_PER_INCH, EMU_PER_MM};
use crate::error::{Error, IoContext, Result};
use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderError, RenderErrorReason,
};
use lazy_static::lazy_static;
use log::debug;
use regex::{Captures, Regex};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES: &str = "[Content_Types].xml";
/// Pixel density assumed for images without an explicit width
const IMAGE_DPI: f64 = 96.0;
/// Drawing ids for embedded images start here, clear of ids Word assigns
const FIRST_DOC_PR_ID: u32 = 10_000;

lazy_static! {
    static ref HEADER_FOOTER: Regex = Regex::new(r"^word/(header|footer)\d*\.xml$").expect("valid regex");
    static ref ROW: Regex = Regex::new(r"(?s)<w:tr(?:\s[^>]*[^/])?>.*?</w:tr>").expect("valid regex");
    static ref PARAGRAPH: Regex = Regex::new(r"(?s)<w:p(?:\s[^>]*[^/])?>.*?</w:p>").expect("valid regex");
    static ref TEXT: Regex = Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("valid regex");
    static ref BLOCK_TAG: Regex = Regex::new(r"^\{\{~?\s*(?:#|/|else\b|\^)[^{}]*\}\}$").expect("valid regex");
    static ref EXPRESSION: Regex = Regex::new(r"(?s)\{\{.*?\}\}").expect("valid regex");
    static ref RUN: Regex = Regex::new(r"(?s)<w:r(?:\s[^>]*[^/])?>.*?</w:r>").expect("valid regex");
    static ref RUN_PROPS: Regex = Regex::new(r"(?s)<w:rPr>.*?</w:rPr>").expect("valid regex");
    static ref RUN_HELPER: Regex =
        Regex::new(r"\{\{\{?~?\s*(?:rich|image)\s[^{}]*\}?\}\}").expect("valid regex");
}

/// Parts that carry template text
fn is_template_part(name: &str) -> bool {
    name == "word/document.xml" || HEADER_FOOTER.is_match(name)
}

/// Remove markup that splits a `{{ ... }}` expression. An expression still
/// open at the end of its paragraph is left as it was.
fn heal(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    // Output length and remaining input just after the `{{` being healed
    let mut open: Option<(usize, &str)> = None;
    // Last text character and the output length right after it
    let mut last_text: Option<(char, usize)> = None;
    let mut rest = xml;

    while let Some(ch) = rest.chars().next() {
        if ch == '<'
            && let Some(end) = rest.find('>')
        {
            let tag = &rest[..=end];
            if let Some((out_len, resume)) = open
                && tag == "</w:p>"
            {
                out.truncate(out_len);
                rest = resume;
                open = None;
                last_text = None;
                continue;
            }
            if open.is_none() {
                out.push_str(tag);
            }
            rest = &rest[end + 1..];
            continue;
        }
        let next = &rest[ch.len_utf8()..];
        if open.is_none() && ch == '{' && matches!(last_text, Some(('{', _))) {
            if let Some((_, end)) = last_text {
                out.truncate(end);
            }
            out.push(ch);
            open = Some((out.len(), next));
        } else {
            if open.is_some() && ch == '}' && matches!(last_text, Some(('}', _))) {
                open = None;
            }
            out.push(ch);
        }
        last_text = Some((ch, out.len()));
        rest = next;
    }
    out
}

fn unescape_entities(s: &str) -> String {
    s.replace("&quot;", "\"").replace("&apos;", "'").replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

/// Expressions must reach handlebars as typed, not XML-escaped
fn unescape_expressions(xml: &str) -> String {
    EXPRESSION.replace_all(xml, |c: &Captures| unescape_entities(&c[0])).into_owned()
}

fn element_text(element: &str) -> String {
    TEXT.captures_iter(element).map(|c| c[1].to_string()).collect()
}

/// Replace rows, then paragraphs, whose whole text is one block tag
fn lift_blocks(xml: &str) -> String {
    let lift = |c: &Captures| {
        let text = element_text(&c[0]);
        let text = text.trim();
        if BLOCK_TAG.is_match(text) { text.to_string() } else { c[0].to_string() }
    };
    let rows = ROW.replace_all(xml, lift);
    PARAGRAPH.replace_all(&rows, lift).into_owned()
}

/// Close the run around each `rich`/`image` expression and reopen it after,
/// with the same run properties
fn lift_runs(xml: &str) -> String {
    RUN.replace_all(xml, |c: &Captures| {
        let run = &c[0];
        if !RUN_HELPER.is_match(run) {
            return run.to_string();
        }
        let props = RUN_PROPS.find(run).map(|m| m.as_str()).unwrap_or_default();
        let reopen = format!("<w:r>{}<w:t xml:space=\"preserve\">", props);
        RUN_HELPER.replace_all(run, |e: &Captures| format!("</w:t></w:r>{}{}", &e[0], reopen)).into_owned()
    })
    .into_owned()
}

/// Heal, unescape and lift one XML part, ready for rendering
pub fn prepare_part(xml: &str) -> String {
    lift_runs(&lift_blocks(&unescape_expressions(&heal(xml))))
}

fn read_entry(archive: &mut ZipArchive<File>, index: usize, template: &Path) -> Result<(String, Vec<u8>)> {
    let mut entry = archive.by_index(index)?;
    let name = entry.name().to_string();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).at(template)?;
    Ok((name, bytes))
}

/// Prepared template parts in archive order
fn template_parts(template: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    if !template.is_file() {
        return Err(Error::MissingInput(template.to_path_buf()));
    }
    let file = File::open(template).at(template)?;
    let mut archive = ZipArchive::new(file)?;
    let mut parts = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let (name, bytes) = read_entry(&mut archive, i, template)?;
        if is_template_part(&name) {
            let xml = String::from_utf8(bytes).map_err(|e| Error::Docx(format!("{} is not UTF-8: {}", name, e)))?;
            parts.push((name, prepare_part(&xml).into_bytes()));
        } else {
            parts.push((name, bytes));
        }
    }
    Ok(parts)
}

/// Variables the template references that `data` does not define
pub fn undeclared_docx_variables(template: &Path, data: &Value) -> Result<Vec<String>> {
    let mut missing = Vec::new();
    for (name, bytes) in template_parts(template)? {
        if is_template_part(&name) {
            missing.extend(undeclared_variables(&String::from_utf8_lossy(&bytes), data));
        }
    }
    missing.sort();
    missing.dedup();
    Ok(missing)
}

fn helper_error(msg: String) -> RenderError {
    RenderErrorReason::Other(msg).into()
}

/// Scalar parameter as text; strings are used as is
fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn hash_flag(h: &Helper<'_>, name: &str) -> bool {
    h.hash_get(name).is_some_and(|v| v.value().as_bool().unwrap_or(false))
}

fn rich_helper(
    h: &Helper<'_>,
    _: &Handlebars<'_>,
    _: &Context,
    _: &mut RenderContext<'_, '_>,
    out: &mut dyn Output,
) -> HelperResult {
    let text = h.param(0).map(|p| param_text(p.value())).unwrap_or_default();
    let props = RunProps {
        bold: hash_flag(h, "bold"),
        italic: hash_flag(h, "italic"),
        underline: hash_flag(h, "underline"),
        strike: hash_flag(h, "strike"),
        font: h.hash_get("font").and_then(|v| v.value().as_str()).map(str::to_string),
        size: h.hash_get("size").and_then(|v| v.value().as_f64()).map(|s| s as f32),
        color: h.hash_get("color").map(|v| param_text(v.value())),
    };
    out.write(&run_xml(&text, &props))?;
    Ok(())
}

/// An image embedded by the `image` helper
#[derive(Debug, Clone)]
struct EmbeddedImage {
    rel_id: String,
    name: String,
    ext: String,
    mime: String,
    bytes: Vec<u8>,
}

/// Images collected while rendering. Only the document body may embed them,
/// since headers and footers carry their own relationships.
#[derive(Debug, Default)]
struct ImageSink {
    images: Vec<EmbeddedImage>,
    in_body: bool,
}

struct ImageHelper {
    sink: Arc<Mutex<ImageSink>>,
}

impl HelperDef for ImageHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let path = h
            .param(0)
            .and_then(|p| p.value().as_str())
            .ok_or_else(|| helper_error("image needs a path".to_string()))?;
        let width_mm = h.param(1).and_then(|p| p.value().as_f64());

        let mut sink = self.sink.lock().map_err(|_| helper_error("image state poisoned".to_string()))?;
        if !sink.in_body {
            return Err(helper_error(format!("image {} is only supported in the document body", path)));
        }
        let image = read_image(Path::new(path)).map_err(|e| helper_error(e.to_string()))?;
        let width_emu = match width_mm {
            Some(mm) if mm > 0.0 => mm * EMU_PER_MM,
            _ => image.width_px as f64 / IMAGE_DPI * EMU_PER_INCH,
        };
        let (cx, cy) = image.extent_emu(width_emu);

        let n = sink.images.len() + 1;
        let rel_id = format!("rIdTplImage{}", n);
        let name = format!("template_image{}.{}", n, image.ext);
        out.write(&xml::inline_picture_xml(&rel_id, FIRST_DOC_PR_ID + n as u32, &name, cx, cy))?;
        debug!("Embedding {} as {} ({}x{} EMU)", path, name, cx, cy);
        sink.images.push(EmbeddedImage { rel_id, name, ext: image.ext, mime: image.mime, bytes: image.bytes });
        Ok(())
    }
}

/// Insert `addition` before the closing `tag`, or fail when the part lacks it
fn insert_before(part: &str, tag: &str, addition: &str) -> Result<String> {
    let at = part.rfind(tag).ok_or_else(|| Error::Docx(format!("template part has no {}", tag)))?;
    Ok(format!("{}{}{}", &part[..at], addition, &part[at..]))
}

/// Add relationships, content types and media parts for embedded images
fn attach_images(parts: &mut Vec<(String, Vec<u8>)>, images: Vec<EmbeddedImage>) -> Result<()> {
    if images.is_empty() {
        return Ok(());
    }
    let rels: String = images
        .iter()
        .map(|img| {
            xml::relationship_xml(&Relationship {
                id: img.rel_id.clone(),
                rel_type: REL_IMAGE,
                target: format!("media/{}", img.name),
                external: false,
            })
        })
        .collect();

    match parts.iter_mut().find(|(name, _)| name == DOCUMENT_RELS) {
        Some((_, bytes)) => {
            let patched = insert_before(&String::from_utf8_lossy(bytes), "</Relationships>", &rels)?;
            *bytes = patched.into_bytes();
        }
        None => {
            let empty = xml::document_rels_xml(&[]);
            parts.push((DOCUMENT_RELS.to_string(), insert_before(&empty, "</Relationships>", &rels)?.into_bytes()));
        }
    }

    if let Some((_, bytes)) = parts.iter_mut().find(|(name, _)| name == CONTENT_TYPES) {
        let mut types = String::from_utf8_lossy(bytes).into_owned();
        for img in &images {
            if !types.to_ascii_lowercase().contains(&format!("extension=\"{}\"", img.ext.to_ascii_lowercase())) {
                types = insert_before(&types, "</Types>", &xml::default_content_type_xml(&img.ext, &img.mime))?;
            }
        }
        *bytes = types.into_bytes();
    }

    for img in images {
        parts.push((format!("word/media/{}", img.name), img.bytes));
    }
    Ok(())
}

/// Render every template part, returning the parts of the finished package
fn render_parts(parts: Vec<(String, Vec<u8>)>, data: &Value) -> Result<Vec<(String, Vec<u8>)>> {
    let sink = Arc::new(Mutex::new(ImageSink::default()));
    let mut hb = registry(escape_xml);
    hb.register_helper("rich", Box::new(rich_helper));
    hb.register_helper("image", Box::new(ImageHelper { sink: Arc::clone(&sink) }));

    let mut rendered_parts = Vec::with_capacity(parts.len());
    for (name, bytes) in parts {
        if !is_template_part(&name) {
            rendered_parts.push((name, bytes));
            continue;
        }
        if let Ok(mut sink) = sink.lock() {
            sink.in_body = name == DOCUMENT_PART;
        }
        let src = String::from_utf8_lossy(&bytes);
        let rendered = hb.render_template(&src, data)?;
        debug!("Rendered {} ({} -> {} bytes)", name, bytes.len(), rendered.len());
        rendered_parts.push((name, rendered.into_bytes()));
    }

    let images = sink.lock().map(|mut s| std::mem::take(&mut s.images)).unwrap_or_default();
    attach_images(&mut rendered_parts, images)?;
    Ok(rendered_parts)
}

/// Render a `.docx` template with `data` into `output`. Nothing is written
/// unless the whole template renders.
pub fn render_docx_template(template: &Path, data: &Value, output: &Path) -> Result<()> {
    let parts = template_parts(template)?;

    let mut missing = Vec::new();
    for (name, bytes) in &parts {
        if is_template_part(name) {
            missing.extend(undeclared_variables(&String::from_utf8_lossy(bytes), data));
        }
    }
    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Err(undeclared_error(&missing));
    }

    let parts = render_parts(parts, data)?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opt = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, bytes) in &parts {
        zip.start_file(name.as_str(), opt)?;
        zip.write_all(bytes).at(output)?;
    }
    let bytes = zip.finish()?.into_inner();

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).at(parent)?;
    }
    fs::write(output, bytes).at(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::{DocxBuilder, TextRun};
    use crate::normalize::extract_main_xml;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_heal_joins_split_expression() {
        let xml = r#"<w:r><w:t>Hello {</w:t></w:r><w:r><w:t>{ na</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>me }}!</w:t></w:r>"#;
        assert_eq!(heal(xml), r#"<w:r><w:t>Hello {{ name }}!</w:t></w:r>"#);
    }

    #[test]
    fn test_heal_leaves_plain_markup() {
        let xml = r#"<w:p><w:r><w:t>{ not a tag }</w:t></w:r></w:p>"#;
        assert_eq!(heal(xml), xml);
    }

    #[test]
    fn test_heal_stops_at_paragraph_end() {
        let xml = concat!(
            r#"<w:p><w:r><w:t>{{ oops</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>{</w:t></w:r><w:r><w:t>{name}}</w:t></w:r></w:p>"#,
        );
        assert_eq!(
            heal(xml),
            concat!(r#"<w:p><w:r><w:t>{{ oops</w:t></w:r></w:p>"#, r#"<w:p><w:r><w:t>{{name}}</w:t></w:r></w:p>"#)
        );
    }

    #[test]
    fn test_lift_runs_splits_around_helpers() {
        let xml = r#"<w:p><w:r><w:rPr><w:i/></w:rPr><w:t xml:space="preserve">Logo: {{image logo 30}} end</w:t></w:r><w:r><w:t>{{name}}</w:t></w:r></w:p>"#;
        assert_eq!(
            lift_runs(xml),
            concat!(
                r#"<w:p><w:r><w:rPr><w:i/></w:rPr><w:t xml:space="preserve">Logo: </w:t></w:r>{{image logo 30}}"#,
                r#"<w:r><w:rPr><w:i/></w:rPr><w:t xml:space="preserve"> end</w:t></w:r><w:r><w:t>{{name}}</w:t></w:r></w:p>"#,
            )
        );
    }

    #[test]
    fn test_lift_block_paragraphs_and_rows() {
        let xml = concat!(
            r#"<w:p><w:r><w:t xml:space="preserve">{{#each items}}</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>{{this}}</w:t></w:r></w:p>"#,
            r#"<w:p w:rsidR="1"><w:r><w:t>{{/each}}</w:t></w:r></w:p>"#,
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>{{#each rows}}</w:t></w:r></w:p></w:tc><w:tc><w:p/></w:tc></w:tr>"#,
            r#"<w:tr><w:tc><w:p><w:r><w:t>{{name}}</w:t></w:r></w:p></w:tc></w:tr>"#,
            r#"<w:tr><w:tc><w:p><w:r><w:t>{{/each}}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        );
        let lifted = lift_blocks(xml);
        assert!(lifted.starts_with("{{#each items}}<w:p><w:r><w:t>{{this}}</w:t></w:r></w:p>{{/each}}"));
        assert!(lifted.contains("<w:tbl>{{#each rows}}<w:tr>"));
        assert!(lifted.ends_with("</w:tr>{{/each}}</w:tbl>"));
    }

    #[test]
    fn test_expression_entities_are_unescaped() {
        let xml = r#"<w:t>{{replace status &quot;_&quot; &quot; &quot;}} &amp; more</w:t>"#;
        assert_eq!(unescape_expressions(xml), r#"<w:t>{{replace status "_" " "}} &amp; more</w:t>"#);
    }

    fn template(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("t.docx");
        let mut doc = DocxBuilder::new();
        doc.add_heading("{{title}}", 1);
        doc.add_paragraph().text("{{#each people}}");
        doc.add_paragraph().text("{{name}} & co");
        doc.add_paragraph().text("{{/each}}");
        doc.add_table(
            vec![vec![TextRun::plain("Region")]],
            vec![
                vec![vec![TextRun::plain("{{#each rows}}")]],
                vec![vec![TextRun::plain("{{region}}")]],
                vec![vec![TextRun::plain("{{/each}}")]],
            ],
        );
        doc.save(&path).unwrap();
        path
    }

    #[test]
    fn test_render_docx_template() {
        let dir = TempDir::new().unwrap();
        let tpl = template(dir.path());
        let out = dir.path().join("out/rendered.docx");
        let data = json!({
            "title": "Q3 <Report>",
            "people": [{"name": "Ann"}, {"name": "Bo"}],
            "rows": [{"region": "North"}, {"region": "South"}]
        });
        render_docx_template(&tpl, &data, &out).unwrap();

        let xml = extract_main_xml(&out).unwrap();
        assert!(xml.contains("Q3 &lt;Report&gt;"));
        assert!(xml.contains("Ann &amp; co"));
        assert!(xml.contains("Bo &amp; co"));
        assert!(xml.contains("North"));
        assert!(xml.contains("South"));
        assert!(!xml.contains("{{"));
        // header plus one row per region
        assert_eq!(xml.matches("<w:tr>").count(), 3);
    }

    #[test]
    fn test_render_reports_all_missing_variables() {
        let dir = TempDir::new().unwrap();
        let tpl = template(dir.path());
        let data = json!({"people": [{"nome": "x"}], "rows": []});
        let err = render_docx_template(&tpl, &data, &dir.path().join("o.docx")).unwrap_err();
        match err {
            Error::Template(msg) => {
                assert!(msg.contains("title"), "{}", msg);
                assert!(msg.contains("name"), "{}", msg);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!dir.path().join("o.docx").exists());
        assert_eq!(undeclared_docx_variables(&tpl, &data).unwrap(), vec!["name", "title"]);
    }

    fn single_paragraph_template(dir: &Path, text: &str) -> std::path::PathBuf {
        let path = dir.join("single.docx");
        let mut doc = DocxBuilder::new();
        doc.add_paragraph().text(text);
        doc.save(&path).unwrap();
        path
    }

    fn read_part(docx: &Path, name: &str) -> String {
        let mut archive = ZipArchive::new(File::open(docx).unwrap()).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_failed_render_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let tpl = single_paragraph_template(dir.path(), "{{upper count}}");
        let out = dir.path().join("out/report.docx");
        let err = render_docx_template(&tpl, &json!({"count": 3}), &out).unwrap_err();
        assert!(matches!(err, Error::Template(_)), "{:?}", err);
        assert!(!out.exists());
    }

    #[test]
    fn test_failed_render_keeps_previous_output() {
        let dir = TempDir::new().unwrap();
        let tpl = single_paragraph_template(dir.path(), "{{image logo 20}}");
        let out = dir.path().join("report.docx");
        fs::write(&out, b"previous").unwrap();
        let missing = dir.path().join("none.png").display().to_string();
        assert!(render_docx_template(&tpl, &json!({"logo": missing}), &out).is_err());
        assert_eq!(fs::read(&out).unwrap(), b"previous");
    }

    #[test]
    fn test_rich_helper_writes_formatted_run() {
        let dir = TempDir::new().unwrap();
        let tpl = single_paragraph_template(dir.path(), r#"Status: {{{rich label bold=true color="FF0000" size=14}}}!"#);
        let out = dir.path().join("rich.docx");
        render_docx_template(&tpl, &json!({"label": "Late <2 days>"}), &out).unwrap();

        let xml = extract_main_xml(&out).unwrap();
        assert!(xml.contains(concat!(
            r#"<w:r><w:rPr><w:b/><w:color w:val="FF0000"/><w:sz w:val="28"/><w:szCs w:val="28"/></w:rPr>"#,
            r#"<w:t xml:space="preserve">Late &lt;2 days&gt;</w:t></w:r>"#
        )));
        assert!(xml.contains(r#"<w:t xml:space="preserve">Status: </w:t></w:r>"#));
        assert!(xml.contains(r#"<w:t xml:space="preserve">!</w:t></w:r>"#));
        assert!(!xml.contains("{{"));
    }

    #[test]
    fn test_image_helper_embeds_media() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("logo.png");
        image::RgbImage::new(200, 100).save(&png).unwrap();
        let tpl = single_paragraph_template(dir.path(), "Logo: {{image logo 50}} end");
        let out = dir.path().join("image.docx");
        render_docx_template(&tpl, &json!({"logo": png.display().to_string()}), &out).unwrap();

        let xml = extract_main_xml(&out).unwrap();
        // 50 mm wide, half as tall
        assert!(xml.contains(r#"<wp:extent cx="1800000" cy="900000"/>"#));
        assert!(xml.contains(r#"<a:blip r:embed="rIdTplImage1"/>"#));
        assert!(xml.contains(r#"<w:t xml:space="preserve">Logo: </w:t>"#));
        assert!(xml.contains(r#"<w:t xml:space="preserve"> end</w:t>"#));

        let rels = read_part(&out, "word/_rels/document.xml.rels");
        assert!(rels.contains(r#"Id="rIdTplImage1""#));
        assert!(rels.contains(r#"Target="media/template_image1.png""#));
        assert!(rels.contains(r#"Target="styles.xml""#));
        let types = read_part(&out, "[Content_Types].xml");
        assert_eq!(types.matches(r#"Extension="png""#).count(), 1);

        let mut archive = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut media = Vec::new();
        archive.by_name("word/media/template_image1.png").unwrap().read_to_end(&mut media).unwrap();
        assert_eq!(media, fs::read(&png).unwrap());
    }

    #[test]
    fn test_image_without_width_uses_pixel_size() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("dot.png");
        image::RgbImage::new(96, 48).save(&png).unwrap();
        let tpl = single_paragraph_template(dir.path(), "{{image dot}}");
        let out = dir.path().join("dot.docx");
        render_docx_template(&tpl, &json!({"dot": png.display().to_string()}), &out).unwrap();
        // one inch at 96 dpi
        assert!(extract_main_xml(&out).unwrap().contains(r#"<wp:extent cx="914400" cy="457200"/>"#));
    }

    #[test]
    fn test_missing_template() {
        let dir = TempDir::new().unwrap();
        let err = render_docx_template(&dir.path().join("none.docx"), &json!({}), &dir.path().join("o.docx"));
        assert!(matches!(err, Err(Error::MissingInput(_))));
    }
}
