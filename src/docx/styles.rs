//! `word/styles.xml`: the built-in style table plus configured overrides.
//!
//! Config keys use Word's display names ("Heading 1", "List Bullet"); the
//! style id is the name without spaces. Names that match no built-in style
//! become new paragraph styles based on Normal.

use super::xml::{escape_xml, NS_W};
use crate::config::{hex_to_rgb, DocxStyle};
use crate::ui;
use log::debug;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StyleKind {
    Paragraph,
    Character,
    Table,
}

impl StyleKind {
    fn as_str(self) -> &'static str {
        match self {
            StyleKind::Paragraph => "paragraph",
            StyleKind::Character => "character",
            StyleKind::Table => "table",
        }
    }
}

struct StyleDef {
    id: String,
    name: String,
    kind: StyleKind,
    based_on: Option<&'static str>,
    next: Option<&'static str>,
    outline_level: Option<u8>,
    props: DocxStyle,
}

fn style(size: Option<f32>, bold: bool, italic: bool, color: Option<&str>) -> DocxStyle {
    DocxStyle {
        size,
        bold: bold.then_some(true),
        italic: italic.then_some(true),
        color: color.map(str::to_string),
        ..Default::default()
    }
}

fn builtin_styles() -> Vec<StyleDef> {
    let para = |id: &str, name: &str, props: DocxStyle| StyleDef {
        id: id.to_string(),
        name: name.to_string(),
        kind: StyleKind::Paragraph,
        based_on: Some("Normal"),
        next: Some("Normal"),
        outline_level: None,
        props,
    };

    let mut styles = vec![StyleDef {
        id: "Normal".into(),
        name: "Normal".into(),
        kind: StyleKind::Paragraph,
        based_on: None,
        next: None,
        outline_level: None,
        props: DocxStyle {
            font: Some("Calibri".into()),
            size: Some(11.0),
            space_after: Some(8.0),
            line_spacing: Some(1.08),
            ..Default::default()
        },
    }];

    styles.push(para(
        "Title",
        "Title",
        DocxStyle { space_after: Some(15.0), ..style(Some(26.0), false, false, Some("#17365D")) },
    ));

    let headings: [(f32, bool, &str); 6] = [
        (14.0, false, "#365F91"),
        (13.0, false, "#4F81BD"),
        (11.0, false, "#4F81BD"),
        (11.0, true, "#4F81BD"),
        (11.0, false, "#243F60"),
        (11.0, true, "#243F60"),
    ];
    for (i, (size, italic, color)) in headings.into_iter().enumerate() {
        let level = i + 1;
        let mut def = para(
            &format!("Heading{}", level),
            &format!("heading {}", level),
            DocxStyle {
                space_before: Some(if level == 1 { 24.0 } else { 10.0 }),
                space_after: Some(0.0),
                keep_with_next: Some(true),
                ..style(Some(size), level <= 4, italic, Some(color))
            },
        );
        def.outline_level = Some(i as u8);
        styles.push(def);
    }

    styles.push(para("ListBullet", "List Bullet", DocxStyle { space_after: Some(2.0), ..Default::default() }));
    styles.push(para("ListNumber", "List Number", DocxStyle { space_after: Some(2.0), ..Default::default() }));
    styles.push(para("Quote", "Quote", style(None, false, true, Some("#404040"))));
    styles.push(para(
        "NoSpacing",
        "No Spacing",
        DocxStyle { space_after: Some(0.0), line_spacing: Some(1.0), ..Default::default() },
    ));
    styles.push(para("Caption", "Caption", style(Some(9.0), false, true, Some("#44546A"))));

    styles.push(StyleDef {
        id: "Hyperlink".into(),
        name: "Hyperlink".into(),
        kind: StyleKind::Character,
        based_on: None,
        next: None,
        outline_level: None,
        props: DocxStyle { underline: Some(true), color: Some("#0563C1".into()), ..Default::default() },
    });
    styles.push(StyleDef {
        id: "TableGrid".into(),
        name: "Table Grid".into(),
        kind: StyleKind::Table,
        based_on: None,
        next: None,
        outline_level: None,
        props: DocxStyle { space_after: Some(0.0), line_spacing: Some(1.0), ..Default::default() },
    });
    styles
}

/// Style id for a display name: `"Heading 1"` -> `"Heading1"`
pub fn style_id(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Field-wise merge; `over` wins where set
pub fn merge_style(base: &DocxStyle, over: &DocxStyle) -> DocxStyle {
    DocxStyle {
        font: over.font.clone().or_else(|| base.font.clone()),
        size: over.size.or(base.size),
        bold: over.bold.or(base.bold),
        italic: over.italic.or(base.italic),
        underline: over.underline.or(base.underline),
        color: over.color.clone().or_else(|| base.color.clone()),
        line_spacing: over.line_spacing.or(base.line_spacing),
        space_before: over.space_before.or(base.space_before),
        space_after: over.space_after.or(base.space_after),
        indent: over.indent.or(base.indent),
        keep_with_next: over.keep_with_next.or(base.keep_with_next),
    }
}

fn toggle(tag: &str, value: Option<bool>) -> String {
    match value {
        Some(true) => format!("<w:{}/>", tag),
        Some(false) => format!("<w:{} w:val=\"0\"/>", tag),
        None => String::new(),
    }
}

/// `<w:rPr>` content for a style
fn run_props_xml(style_name: &str, props: &DocxStyle) -> String {
    let mut out = String::new();
    if let Some(font) = &props.font {
        let font = escape_xml(font);
        out.push_str(&format!(r#"<w:rFonts w:ascii="{0}" w:hAnsi="{0}" w:cs="{0}" w:eastAsia="{0}"/>"#, font));
    }
    out.push_str(&toggle("b", props.bold));
    out.push_str(&toggle("i", props.italic));
    if let Some(color) = &props.color {
        match hex_to_rgb(color) {
            Ok((r, g, b)) => out.push_str(&format!(r#"<w:color w:val="{:02X}{:02X}{:02X}"/>"#, r, g, b)),
            Err(e) => ui::warn(&format!("style '{}': {}, colour ignored", style_name, e)),
        }
    }
    if let Some(size) = props.size {
        let half_points = (size * 2.0).round() as u32;
        out.push_str(&format!(r#"<w:sz w:val="{0}"/><w:szCs w:val="{0}"/>"#, half_points));
    }
    match props.underline {
        Some(true) => out.push_str(r#"<w:u w:val="single"/>"#),
        Some(false) => out.push_str(r#"<w:u w:val="none"/>"#),
        None => {}
    }
    out
}

/// `<w:pPr>` content for a style
fn paragraph_props_xml(props: &DocxStyle, outline_level: Option<u8>) -> String {
    let mut out = String::new();
    if props.keep_with_next == Some(true) {
        out.push_str("<w:keepNext/><w:keepLines/>");
    }
    if props.space_before.is_some() || props.space_after.is_some() || props.line_spacing.is_some() {
        out.push_str("<w:spacing");
        if let Some(before) = props.space_before {
            out.push_str(&format!(" w:before=\"{}\"", (before * 20.0).round() as i64));
        }
        if let Some(after) = props.space_after {
            out.push_str(&format!(" w:after=\"{}\"", (after * 20.0).round() as i64));
        }
        if let Some(line) = props.line_spacing {
            out.push_str(&format!(" w:line=\"{}\" w:lineRule=\"auto\"", (line * 240.0).round() as i64));
        }
        out.push_str("/>");
    }
    if let Some(indent) = props.indent {
        out.push_str(&format!("<w:ind w:firstLine=\"{}\"/>", (indent * 1440.0).round() as i64));
    }
    if let Some(level) = outline_level {
        out.push_str(&format!("<w:outlineLvl w:val=\"{}\"/>", level));
    }
    out
}

fn style_xml(def: &StyleDef) -> String {
    let default_attr = if def.id == "Normal" { " w:default=\"1\"" } else { "" };
    let mut out = format!(
        "<w:style w:type=\"{}\"{} w:styleId=\"{}\"><w:name w:val=\"{}\"/>",
        def.kind.as_str(),
        default_attr,
        escape_xml(&def.id),
        escape_xml(&def.name)
    );
    if let Some(base) = def.based_on {
        out.push_str(&format!("<w:basedOn w:val=\"{}\"/>", base));
    }
    if let Some(next) = def.next {
        out.push_str(&format!("<w:next w:val=\"{}\"/>", next));
    }
    out.push_str("<w:qFormat/>");

    let ppr = match def.kind {
        StyleKind::Character => String::new(),
        _ => paragraph_props_xml(&def.props, def.outline_level),
    };
    if !ppr.is_empty() {
        out.push_str(&format!("<w:pPr>{}</w:pPr>", ppr));
    }
    let rpr = run_props_xml(&def.name, &def.props);
    if !rpr.is_empty() {
        out.push_str(&format!("<w:rPr>{}</w:rPr>", rpr));
    }
    if def.kind == StyleKind::Table {
        out.push_str(concat!(
            "<w:tblPr><w:tblBorders>",
            r#"<w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
            r#"<w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
            r#"<w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
            r#"<w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
            r#"<w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
            r#"<w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
            "</w:tblBorders>",
            r#"<w:tblCellMar><w:left w:w="108" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar>"#,
            "</w:tblPr>"
        ));
    }
    out.push_str("</w:style>");
    out
}

/// Render `word/styles.xml` with `overrides` applied
pub fn styles_xml(overrides: &BTreeMap<String, DocxStyle>) -> String {
    let mut defs = builtin_styles();

    for (name, props) in overrides {
        let id = style_id(name);
        match defs.iter_mut().find(|d| d.id == id) {
            Some(def) => {
                debug!("Overriding style {}", id);
                def.props = merge_style(&def.props, props);
            }
            None => {
                debug!("Creating paragraph style {} ({})", id, name);
                defs.push(StyleDef {
                    id,
                    name: name.clone(),
                    kind: StyleKind::Paragraph,
                    based_on: Some("Normal"),
                    next: Some("Normal"),
                    outline_level: None,
                    props: props.clone(),
                });
            }
        }
    }

    let mut out = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<w:styles xmlns:w=\"{}\">",
        NS_W
    );
    out.push_str("<w:docDefaults><w:rPrDefault><w:rPr><w:lang w:val=\"en-US\"/></w:rPr></w:rPrDefault><w:pPrDefault/></w:docDefaults>");
    for def in &defs {
        out.push_str(&style_xml(def));
    }
    out.push_str("</w:styles>");
    out
}
