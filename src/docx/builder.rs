use super::styles::{style_id, styles_xml};
use super::xml::{self, escape_xml, Relationship, REL_HYPERLINK, REL_IMAGE, REL_NUMBERING, REL_SETTINGS, REL_STYLES};
use crate::config::DocxStyle;
use crate::error::{Error, IoContext, Result};
use chrono::{DateTime, Utc};
use image::ImageReader;
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const EMU_PER_INCH: f64 = 914_400.0;
pub const EMU_PER_MM: f64 = 36_000.0;
/// Text width of an A4 page with 1 inch margins, in twentieths of a point
const TEXT_WIDTH_TWIPS: u32 = 9026;
const BULLET_NUM_ID: u32 = 1;
const DECIMAL_NUM_ID: u32 = 2;
const MONOSPACE_FONT: &str = "Courier New";

/// Paragraph alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
        }
    }
}

/// Direct run formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunProps {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub font: Option<String>,
    /// Points
    pub size: Option<f32>,
    /// `#RRGGBB`
    pub color: Option<String>,
}

impl RunProps {
    pub fn bold() -> Self {
        Self { bold: true, ..Default::default() }
    }

    pub fn italic() -> Self {
        Self { italic: true, ..Default::default() }
    }

    pub fn monospace() -> Self {
        Self { font: Some(MONOSPACE_FONT.to_string()), ..Default::default() }
    }
}

/// An image file read for embedding
#[derive(Debug, Clone)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    /// File extension of the detected format ("png", "jpg", ...)
    pub ext: String,
    pub mime: String,
    pub width_px: u32,
    pub height_px: u32,
}

impl ImageData {
    /// `(cx, cy)` in EMU for a picture `width_emu` wide, keeping the aspect ratio
    pub fn extent_emu(&self, width_emu: f64) -> (u64, u64) {
        let cx = width_emu.round() as u64;
        let cy = (cx as f64 * self.height_px as f64 / self.width_px as f64).round() as u64;
        (cx, cy)
    }
}

/// Read an image and detect its format and pixel size
pub fn read_image(path: &Path) -> Result<ImageData> {
    if !path.is_file() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let bytes = fs::read(path).at(path)?;
    let reader = ImageReader::new(Cursor::new(&bytes)).with_guessed_format().at(path)?;
    let format = reader
        .format()
        .ok_or_else(|| Error::Docx(format!("unrecognised image format: {}", path.display())))?;
    let (width_px, height_px) = reader.into_dimensions()?;
    if width_px == 0 || height_px == 0 {
        return Err(Error::Docx(format!("image has no pixels: {}", path.display())));
    }
    Ok(ImageData {
        ext: format.extensions_str().first().copied().unwrap_or("bin").to_string(),
        mime: format.to_mime_type().to_string(),
        bytes,
        width_px,
        height_px,
    })
}

/// Formatted text with an optional hyperlink target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub props: RunProps,
    pub link: Option<String>,
}

impl TextRun {
    pub fn new(text: impl Into<String>, props: RunProps) -> Self {
        Self { text: text.into(), props, link: None }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, RunProps::default())
    }
}

impl From<&str> for TextRun {
    fn from(text: &str) -> Self {
        Self::plain(text)
    }
}

#[derive(Debug, Clone)]
struct Picture {
    rel_id: String,
    doc_pr_id: u32,
    name: String,
    cx: u64,
    cy: u64,
}

#[derive(Debug, Clone)]
enum Inline {
    Text { text: String, props: RunProps, link_rel: Option<String> },
    PageBreak,
    Picture(Picture),
}

#[derive(Debug, Clone, Default)]
struct Paragraph {
    style: Option<String>,
    align: Option<Alignment>,
    numbering: Option<(u32, u32)>,
    inlines: Vec<Inline>,
}

#[derive(Debug, Clone)]
struct Table {
    style: String,
    cols: usize,
    header: Option<Vec<Vec<Inline>>>,
    rows: Vec<Vec<Vec<Inline>>>,
}

#[derive(Debug, Clone)]
enum Element {
    Paragraph(Paragraph),
    Table(Table),
}

/// Builds a `.docx` package from scratch.
///
/// Elements are appended in document order; nothing is written until
/// [`DocxBuilder::save`] or [`DocxBuilder::to_bytes`].
#[derive(Debug, Clone)]
pub struct DocxBuilder {
    body: Vec<Element>,
    rels: Vec<Relationship>,
    /// (zip path, bytes)
    media: Vec<(String, Vec<u8>)>,
    /// (extension, mime type)
    media_types: Vec<(String, String)>,
    styles: BTreeMap<String, DocxStyle>,
    numbering_restarts: Vec<(u32, u64)>,
    ordered_num_id: u32,
    next_doc_pr_id: u32,
    title: Option<String>,
    author: String,
    created: DateTime<Utc>,
}

/// Parse a `SOURCE_DATE_EPOCH` value (seconds since the epoch)
fn epoch_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let secs = value?.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(secs, 0)
}

impl Default for DocxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocxBuilder {
    pub fn new() -> Self {
        let fixed = |id: &str, rel_type: &'static str, target: &str| Relationship {
            id: id.to_string(),
            rel_type,
            target: target.to_string(),
            external: false,
        };
        let mut doc = Self {
            body: Vec::new(),
            rels: vec![
                fixed("rId1", REL_STYLES, "styles.xml"),
                fixed("rId2", REL_NUMBERING, "numbering.xml"),
                fixed("rId3", REL_SETTINGS, "settings.xml"),
            ],
            media: Vec::new(),
            media_types: Vec::new(),
            styles: BTreeMap::new(),
            numbering_restarts: Vec::new(),
            ordered_num_id: DECIMAL_NUM_ID,
            next_doc_pr_id: 1,
            title: None,
            author: "docstack".to_string(),
            created: Utc::now(),
        };
        if let Some(created) = epoch_timestamp(std::env::var("SOURCE_DATE_EPOCH").ok().as_deref()) {
            doc.set_created(created);
        }
        doc
    }

    /// Fix the `docProps/core.xml` timestamps
    pub fn set_created(&mut self, created: DateTime<Utc>) -> &mut Self {
        self.created = created;
        self
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    pub fn set_author(&mut self, author: impl Into<String>) -> &mut Self {
        self.author = author.into();
        self
    }

    /// Style overrides keyed by display name, see [`super::styles`]
    pub fn apply_styles(&mut self, styles: &BTreeMap<String, DocxStyle>) -> &mut Self {
        for (name, style) in styles {
            self.styles.insert(name.clone(), style.clone());
        }
        self
    }

    /// Number of top-level body elements (paragraphs and tables)
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    fn push_paragraph(&mut self, paragraph: Paragraph) -> ParagraphBuilder<'_> {
        self.body.push(Element::Paragraph(paragraph));
        let index = self.body.len() - 1;
        ParagraphBuilder { doc: self, index }
    }

    fn add_rel(&mut self, rel_type: &'static str, target: String, external: bool) -> String {
        let id = format!("rId{}", self.rels.len() + 1);
        self.rels.push(Relationship { id: id.clone(), rel_type, target, external });
        id
    }

    fn link_rel(&mut self, url: &str) -> String {
        if let Some(rel) = self.rels.iter().find(|r| r.rel_type == REL_HYPERLINK && r.target == url) {
            return rel.id.clone();
        }
        self.add_rel(REL_HYPERLINK, url.to_string(), true)
    }

    fn inlines(&mut self, runs: &[TextRun]) -> Vec<Inline> {
        runs.iter()
            .map(|run| Inline::Text {
                text: run.text.clone(),
                props: run.props.clone(),
                link_rel: run.link.as_deref().map(|url| self.link_rel(url)),
            })
            .collect()
    }

    /// Heading paragraph; level 0 is the document title
    pub fn add_heading(&mut self, text: &str, level: u8) -> ParagraphBuilder<'_> {
        let style = match level {
            0 => "Title".to_string(),
            l => format!("Heading{}", l.min(6)),
        };
        let mut builder = self.push_paragraph(Paragraph { style: Some(style), ..Default::default() });
        if !text.is_empty() {
            builder.text(text);
        }
        builder
    }

    /// Empty Normal paragraph to be filled through the returned builder
    pub fn add_paragraph(&mut self) -> ParagraphBuilder<'_> {
        self.push_paragraph(Paragraph::default())
    }

    /// Table in the "TableGrid" style. Rows shorter than the widest row are padded.
    pub fn add_table(&mut self, header: Vec<Vec<TextRun>>, rows: Vec<Vec<Vec<TextRun>>>) -> &mut Self {
        let cols = rows.iter().map(Vec::len).chain(std::iter::once(header.len())).max().unwrap_or(0);
        if cols == 0 {
            debug!("Skipping empty table");
            return self;
        }
        let header: Option<Vec<Vec<Inline>>> =
            if header.is_empty() { None } else { Some(header.iter().map(|c| self.inlines(c)).collect()) };
        let mut body_rows: Vec<Vec<Vec<Inline>>> = Vec::with_capacity(rows.len());
        for row in &rows {
            let cells: Vec<Vec<Inline>> = row.iter().map(|c| self.inlines(c)).collect();
            body_rows.push(cells);
        }
        self.body.push(Element::Table(Table { style: "TableGrid".to_string(), cols, header, rows: body_rows }));
        self
    }

    /// Bulleted or numbered list paragraph at nesting `level` (0-based)
    pub fn add_list_item(&mut self, runs: &[TextRun], ordered: bool, level: u32) -> ParagraphBuilder<'_> {
        let (style, num_id) =
            if ordered { ("ListNumber", self.ordered_num_id) } else { ("ListBullet", BULLET_NUM_ID) };
        let inlines = self.inlines(runs);
        self.push_paragraph(Paragraph {
            style: Some(style.to_string()),
            numbering: Some((num_id, level.min(8))),
            inlines,
            ..Default::default()
        })
    }

    /// Start a fresh numbered list; following ordered items count from `start`
    pub fn restart_numbering(&mut self, start: u64) -> &mut Self {
        let num_id = DECIMAL_NUM_ID + 1 + self.numbering_restarts.len() as u32;
        self.numbering_restarts.push((num_id, start));
        self.ordered_num_id = num_id;
        self
    }

    /// Monospace "NoSpacing" paragraph; lines are joined with breaks
    pub fn add_code_block(&mut self, text: &str) -> ParagraphBuilder<'_> {
        let inlines = vec![Inline::Text { text: text.to_string(), props: RunProps::monospace(), link_rel: None }];
        self.push_paragraph(Paragraph { style: Some("NoSpacing".to_string()), inlines, ..Default::default() })
    }

    pub fn add_quote(&mut self, runs: &[TextRun]) -> ParagraphBuilder<'_> {
        let inlines = self.inlines(runs);
        self.push_paragraph(Paragraph { style: Some("Quote".to_string()), inlines, ..Default::default() })
    }

    pub fn add_page_break(&mut self) -> &mut Self {
        self.body.push(Element::Paragraph(Paragraph { inlines: vec![Inline::PageBreak], ..Default::default() }));
        self
    }

    /// Embed an image in its own paragraph, `width_inches` wide with the
    /// aspect ratio preserved.
    pub fn add_picture(&mut self, path: &Path, width_inches: f64) -> Result<ParagraphBuilder<'_>> {
        let image = read_image(path)?;
        if !self.media_types.iter().any(|(e, _)| *e == image.ext) {
            self.media_types.push((image.ext.clone(), image.mime.clone()));
        }

        let name = format!("image{}.{}", self.media.len() + 1, image.ext);
        let (cx, cy) = image.extent_emu(width_inches * EMU_PER_INCH);
        debug!("Embedding {} as {} ({}x{} px)", path.display(), name, image.width_px, image.height_px);
        self.media.push((format!("word/media/{}", name), image.bytes));
        let rel_id = self.add_rel(REL_IMAGE, format!("media/{}", name), false);

        let doc_pr_id = self.next_doc_pr_id;
        self.next_doc_pr_id += 1;

        let picture = Picture { rel_id, doc_pr_id, name, cx, cy };
        Ok(self.push_paragraph(Paragraph { inlines: vec![Inline::Picture(picture)], ..Default::default() }))
    }

    /// Serialise the package into memory
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opt = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let part = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, data: &[u8]| -> Result<()> {
            zip.start_file(name, opt)?;
            zip.write_all(data).map_err(|e| Error::io(name, e))?;
            Ok(())
        };

        part(&mut zip, "[Content_Types].xml", xml::content_types_xml(&self.media_types).as_bytes())?;
        part(&mut zip, "_rels/.rels", xml::package_rels_xml().as_bytes())?;
        part(
            &mut zip,
            "docProps/core.xml",
            xml::core_xml(self.title.as_deref(), &self.author, &self.created).as_bytes(),
        )?;
        part(&mut zip, "docProps/app.xml", xml::app_xml().as_bytes())?;
        part(&mut zip, "word/document.xml", self.document_xml().as_bytes())?;
        part(&mut zip, "word/styles.xml", styles_xml(&self.styles).as_bytes())?;
        part(&mut zip, "word/numbering.xml", xml::numbering_xml(&self.numbering_restarts).as_bytes())?;
        part(&mut zip, "word/settings.xml", xml::settings_xml().as_bytes())?;
        part(&mut zip, "word/_rels/document.xml.rels", xml::document_rels_xml(&self.rels).as_bytes())?;
        for (name, bytes) in &self.media {
            part(&mut zip, name, bytes)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).at(parent)?;
        }
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).at(path)
    }

    /// `word/document.xml` as it will be written
    pub fn document_xml(&self) -> String {
        let mut body = String::new();
        for element in &self.body {
            match element {
                Element::Paragraph(p) => paragraph_xml(&mut body, p),
                Element::Table(t) => table_xml(&mut body, t),
            }
            body.push('\n');
        }
        xml::document_xml(&body)
    }
}

/// Fills one paragraph appended by [`DocxBuilder`]
pub struct ParagraphBuilder<'a> {
    doc: &'a mut DocxBuilder,
    index: usize,
}

impl ParagraphBuilder<'_> {
    fn paragraph(&mut self) -> Option<&mut Paragraph> {
        match self.doc.body.get_mut(self.index) {
            Some(Element::Paragraph(p)) => Some(p),
            _ => None,
        }
    }

    fn push(&mut self, inline: Inline) {
        if let Some(p) = self.paragraph() {
            p.inlines.push(inline);
        }
    }

    /// Plain run
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.run(text, RunProps::default())
    }

    pub fn run(&mut self, text: &str, props: RunProps) -> &mut Self {
        self.push(Inline::Text { text: text.to_string(), props, link_rel: None });
        self
    }

    /// Hyperlinked run
    pub fn link(&mut self, text: &str, url: &str, props: RunProps) -> &mut Self {
        let rel = self.doc.link_rel(url);
        self.push(Inline::Text { text: text.to_string(), props, link_rel: Some(rel) });
        self
    }

    pub fn runs(&mut self, runs: &[TextRun]) -> &mut Self {
        let inlines = self.doc.inlines(runs);
        if let Some(p) = self.paragraph() {
            p.inlines.extend(inlines);
        }
        self
    }

    /// Paragraph style by display name ("List Bullet") or id ("ListBullet")
    pub fn style(&mut self, name: &str) -> &mut Self {
        let id = style_id(name);
        if let Some(p) = self.paragraph() {
            p.style = Some(id);
        }
        self
    }

    pub fn align(&mut self, align: Alignment) -> &mut Self {
        if let Some(p) = self.paragraph() {
            p.align = Some(align);
        }
        self
    }
}

fn run_props_xml(props: &RunProps, hyperlink: bool) -> String {
    let mut rpr = String::new();
    if hyperlink {
        rpr.push_str(r#"<w:rStyle w:val="Hyperlink"/>"#);
    }
    if let Some(font) = &props.font {
        let font = escape_xml(font);
        rpr.push_str(&format!(r#"<w:rFonts w:ascii="{0}" w:hAnsi="{0}" w:cs="{0}"/>"#, font));
    }
    if props.bold {
        rpr.push_str("<w:b/>");
    }
    if props.italic {
        rpr.push_str("<w:i/>");
    }
    if props.strike {
        rpr.push_str("<w:strike/>");
    }
    if let Some(color) = props.color.as_deref().map(|c| c.trim_start_matches('#')) {
        if color.len() == 6 && color.chars().all(|c| c.is_ascii_hexdigit()) {
            rpr.push_str(&format!(r#"<w:color w:val="{}"/>"#, color.to_ascii_uppercase()));
        }
    }
    if let Some(size) = props.size {
        let half_points = (size * 2.0).round() as u32;
        rpr.push_str(&format!(r#"<w:sz w:val="{0}"/><w:szCs w:val="{0}"/>"#, half_points));
    }
    if props.underline {
        rpr.push_str(r#"<w:u w:val="single"/>"#);
    }
    if rpr.is_empty() { rpr } else { format!("<w:rPr>{}</w:rPr>", rpr) }
}

/// A complete `<w:r>` for text outside a builder, as emitted by template helpers
pub fn run_xml(text: &str, props: &RunProps) -> String {
    let mut out = String::from("<w:r>");
    out.push_str(&run_props_xml(props, false));
    run_text_xml(&mut out, text);
    out.push_str("</w:r>");
    out
}

/// Run content: `\n` becomes `<w:br/>`, `\t` becomes `<w:tab/>`
fn run_text_xml(out: &mut String, text: &str) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<w:br/>");
        }
        for (j, piece) in line.split('\t').enumerate() {
            if j > 0 {
                out.push_str("<w:tab/>");
            }
            if !piece.is_empty() {
                out.push_str("<w:t xml:space=\"preserve\">");
                out.push_str(&escape_xml(piece));
                out.push_str("</w:t>");
            }
        }
    }
}

fn inlines_xml(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text { text, props, link_rel } => {
                if text.is_empty() {
                    continue;
                }
                if let Some(rel) = link_rel {
                    out.push_str(&format!("<w:hyperlink r:id=\"{}\">", rel));
                }
                out.push_str("<w:r>");
                out.push_str(&run_props_xml(props, link_rel.is_some()));
                run_text_xml(out, text);
                out.push_str("</w:r>");
                if link_rel.is_some() {
                    out.push_str("</w:hyperlink>");
                }
            }
            Inline::PageBreak => out.push_str(r#"<w:r><w:br w:type="page"/></w:r>"#),
            Inline::Picture(pic) => out.push_str(&xml::inline_picture_xml(&pic.rel_id, pic.doc_pr_id, &pic.name, pic.cx, pic.cy)),
        }
    }
}

fn paragraph_xml(out: &mut String, p: &Paragraph) {
    out.push_str("<w:p>");
    let mut ppr = String::new();
    if let Some(style) = &p.style {
        ppr.push_str(&format!("<w:pStyle w:val=\"{}\"/>", escape_xml(style)));
    }
    if let Some((num_id, ilvl)) = p.numbering {
        ppr.push_str(&format!("<w:numPr><w:ilvl w:val=\"{}\"/><w:numId w:val=\"{}\"/></w:numPr>", ilvl, num_id));
    }
    if let Some(align) = p.align {
        ppr.push_str(&format!("<w:jc w:val=\"{}\"/>", align.as_str()));
    }
    if !ppr.is_empty() {
        out.push_str(&format!("<w:pPr>{}</w:pPr>", ppr));
    }
    inlines_xml(out, &p.inlines);
    out.push_str("</w:p>");
}

fn table_row_xml(out: &mut String, cells: &[Vec<Inline>], cols: usize, col_width: u32, header: bool) {
    out.push_str("<w:tr>");
    if header {
        out.push_str("<w:trPr><w:tblHeader/></w:trPr>");
    }
    for i in 0..cols {
        out.push_str(&format!("<w:tc><w:tcPr><w:tcW w:w=\"{}\" w:type=\"dxa\"/></w:tcPr><w:p>", col_width));
        if let Some(cell) = cells.get(i) {
            inlines_xml(out, cell);
        }
        out.push_str("</w:p></w:tc>");
    }
    out.push_str("</w:tr>");
}

fn table_xml(out: &mut String, t: &Table) {
    let col_width = TEXT_WIDTH_TWIPS / t.cols as u32;
    out.push_str(&format!(
        "<w:tbl><w:tblPr><w:tblStyle w:val=\"{}\"/><w:tblW w:w=\"0\" w:type=\"auto\"/><w:tblLook w:val=\"04A0\" w:firstRow=\"1\" w:lastRow=\"0\" w:firstColumn=\"1\" w:lastColumn=\"0\" w:noHBand=\"0\" w:noVBand=\"1\"/></w:tblPr><w:tblGrid>",
        escape_xml(&t.style)
    ));
    for _ in 0..t.cols {
        out.push_str(&format!("<w:gridCol w:w=\"{}\"/>", col_width));
    }
    out.push_str("</w:tblGrid>");
    if let Some(header) = &t.header {
        table_row_xml(out, header, t.cols, col_width, true);
    }
    for row in &t.rows {
        table_row_xml(out, row, t.cols, col_width, false);
    }
    out.push_str("</w:tbl>");
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
