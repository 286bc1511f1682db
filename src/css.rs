/// Stylesheet generation
///
/// This module handles:
/// - Turning a [`StyleConfig`] into the report stylesheet used for HTML and PDF output
/// - Building standalone `@page` blocks for the print backends
use crate::config::{PageConfig, StyleConfig};

fn rule(css: &mut String, selector: &str, decls: &[(&str, &str)]) {
    css.push_str(selector);
    css.push_str(" {\n");
    for (prop, value) in decls {
        css.push_str("    ");
        css.push_str(prop);
        css.push_str(": ");
        css.push_str(value);
        css.push_str(";\n");
    }
    css.push_str("}\n\n");
}

fn comment(css: &mut String, text: &str) {
    css.push_str("/* ");
    css.push_str(text);
    css.push_str(" */\n");
}

/// Build the full report stylesheet
pub fn generate_css(c: &StyleConfig) -> String {
    let mut css = String::with_capacity(4096);

    if c.advanced.css_reset {
        comment(&mut css, "Reset");
        rule(&mut css, "*", &[("box-sizing", "border-box")]);
    }

    let content = &c.content;
    rule(
        &mut css,
        "body",
        &[
            ("font-family", &content.font_family),
            ("font-size", &content.font_size),
            ("font-weight", &content.font_weight),
            ("line-height", &content.line_height),
            ("color", &content.color),
            ("max-width", &content.max_width),
            ("margin", &content.margin),
            ("padding", &content.padding),
        ],
    );

    let tp = &c.title_page;
    comment(&mut css, "Title page");
    rule(
        &mut css,
        ".title-page",
        &[
            ("page-break-after", "always"),
            ("display", &tp.display),
            ("flex-direction", "column"),
            ("justify-content", &tp.justify_content),
            ("align-items", &tp.align_items),
            ("min-height", &tp.min_height),
            ("text-align", &tp.text_align),
            ("padding", &tp.padding),
        ],
    );
    rule(
        &mut css,
        ".title-page h1",
        &[
            ("font-family", &tp.font_family),
            ("font-size", &tp.font_size),
            ("font-weight", &tp.font_weight),
            ("color", &tp.color),
            ("margin", &tp.margin),
            ("line-height", &tp.line_height),
        ],
    );

    let toc = &c.toc;
    comment(&mut css, "Table of contents");
    rule(&mut css, ".toc-page", &[("page-break-after", "always")]);
    rule(
        &mut css,
        ".toc-title",
        &[
            ("font-family", &toc.item_font_family),
            ("font-size", &toc.title_font_size),
            ("font-weight", &toc.title_font_weight),
            ("color", &toc.title_color),
            ("margin-bottom", &toc.title_margin_bottom),
            ("text-align", &toc.title_text_align),
        ],
    );
    rule(&mut css, "nav#TOC", &[("max-width", &toc.max_width), ("margin", &toc.margin)]);
    rule(&mut css, "nav#TOC ul", &[("list-style", &toc.list_style), ("padding", &toc.padding)]);
    rule(
        &mut css,
        "nav#TOC li",
        &[
            ("font-family", &toc.item_font_family),
            ("font-size", &toc.item_font_size),
            ("font-weight", &toc.item_font_weight),
            ("margin", &toc.item_margin),
            ("line-height", &toc.item_line_height),
        ],
    );
    rule(&mut css, "nav#TOC a", &[("text-decoration", &toc.link_text_decoration), ("color", &toc.link_color)]);
    rule(&mut css, "nav#TOC a:hover", &[("color", &toc.link_hover_color)]);

    rule(&mut css, ".main-content", &[("padding", &content.padding)]);

    let img = &c.images;
    comment(&mut css, "Images");
    rule(
        &mut css,
        "img",
        &[("max-width", "100% !important"), ("height", "auto !important"), ("page-break-inside", "avoid")],
    );
    let max_width = format!("{} !important", img.max_width);
    let max_height = format!("{} !important", img.max_height);
    rule(
        &mut css,
        "img[src*=\"figures/\"]",
        &[
            ("max-width", &max_width),
            ("max-height", &max_height),
            ("display", &img.display),
            ("margin", &img.margin),
            ("box-shadow", &img.box_shadow),
        ],
    );

    let h = &c.headers;
    comment(&mut css, "Headings");
    rule(
        &mut css,
        "h1, h2, h3, h4, h5, h6",
        &[
            ("font-family", &h.font_family),
            ("color", &h.color),
            ("margin-top", &h.margin_top),
            ("margin-bottom", &h.margin_bottom),
            ("font-weight", &h.font_weight),
            ("line-height", &h.line_height),
            ("page-break-after", &h.page_break_after),
        ],
    );
    for (tag, level) in h.levels() {
        rule(&mut css, tag, &[("font-size", &level.font_size), ("margin-top", &level.margin_top)]);
    }
    rule(&mut css, "h1, h2, h3", &[("page-break-after", "avoid")]);

    let text = &c.text;
    let orphans = text.orphans.to_string();
    let widows = text.widows.to_string();
    comment(&mut css, "Text");
    rule(
        &mut css,
        "p",
        &[("margin-bottom", &text.paragraph_margin_bottom), ("orphans", &orphans), ("widows", &widows)],
    );
    rule(&mut css, "li", &[("margin-bottom", &text.list_margin_bottom), ("line-height", &text.list_line_height)]);
    rule(&mut css, "ul, ol", &[("margin-bottom", &text.paragraph_margin_bottom)]);

    if let Some(b) = &c.bold_text {
        rule(
            &mut css,
            "strong, b",
            &[
                ("font-family", &b.font_family),
                ("font-size", &b.font_size),
                ("font-weight", &b.font_weight),
                ("color", &b.color),
            ],
        );
    }

    if let Some(fc) = &c.figure_captions {
        rule(
            &mut css,
            "figcaption",
            &[
                ("font-family", &fc.font_family),
                ("font-size", &fc.font_size),
                ("font-weight", &fc.font_weight),
                ("font-style", &fc.font_style),
                ("color", &fc.color),
                ("margin-top", &fc.margin_top),
                ("margin-bottom", &fc.margin_bottom),
            ],
        );
    }

    comment(&mut css, "Tables");
    rule(
        &mut css,
        "table",
        &[
            ("border-collapse", &c.table.border_collapse),
            ("width", &c.table.width),
            ("margin", &c.table.margin),
            ("page-break-inside", &c.table.page_break_inside),
        ],
    );
    rule(
        &mut css,
        "th, td",
        &[
            ("border", &c.table_cell.border),
            ("padding", &c.table_cell.padding),
            ("word-wrap", &c.table_cell.word_wrap),
            ("font-size", &c.table_cell.font_size),
        ],
    );
    rule(
        &mut css,
        "th",
        &[
            ("background-color", &c.table_header.background_color),
            ("font-weight", &c.table_header.font_weight),
            ("color", &c.table_header.color),
        ],
    );
    rule(&mut css, "td", &[("color", &c.table_cell.color)]);

    comment(&mut css, "Code");
    rule(
        &mut css,
        "code",
        &[
            ("font-family", &c.code.font_family),
            ("background-color", &c.code.background_color),
            ("padding", &c.code.padding),
            ("border-radius", &c.code.border_radius),
            ("font-size", &c.code.font_size),
            ("color", &c.code.color),
        ],
    );
    rule(
        &mut css,
        "pre",
        &[
            ("font-family", &c.pre.font_family),
            ("background-color", &c.pre.background_color),
            ("padding", &c.pre.padding),
            ("border-radius", &c.pre.border_radius),
            ("overflow-x", &c.pre.overflow_x),
            ("page-break-inside", &c.pre.page_break_inside),
            ("font-size", &c.pre.font_size),
            ("color", &c.pre.color),
        ],
    );
    // Inline code styling must not leak into fenced blocks
    rule(&mut css, "pre code", &[("background-color", "transparent"), ("padding", "0")]);

    rule(
        &mut css,
        "blockquote",
        &[
            ("border-left", &c.blockquote.border_left),
            ("padding-left", &c.blockquote.padding_left),
            ("margin-left", &c.blockquote.margin_left),
            ("color", &c.blockquote.color),
            ("page-break-inside", &c.blockquote.page_break_inside),
        ],
    );

    let p = &c.page;
    let margin = format!("{} {} {} {}", p.margin_top, p.margin_right, p.margin_bottom, p.margin_left);
    comment(&mut css, "Page rules");
    rule(&mut css, "@page", &[("size", &p.size), ("margin", &margin)]);
    rule(&mut css, "@page :first", &[("margin-top", "4cm")]);
    css.push_str("@page {\n");
    let mut footer = String::new();
    rule(
        &mut footer,
        "@bottom-center",
        &[
            ("content", &c.footer.content),
            ("font-family", &content.font_family),
            ("font-size", &c.footer.font_size),
            ("font-weight", &content.font_weight),
            ("color", &c.footer.color),
        ],
    );
    for line in footer.trim_end().lines() {
        css.push_str("    ");
        css.push_str(line);
        css.push('\n');
    }
    css.push_str("}\n\n");

    comment(&mut css, "Utilities");
    css.push_str(&format!(".page-break {{\n    {};\n}}\n\n", c.utilities.page_break.trim_end_matches(';')));
    css.push_str(&format!(".no-break {{\n    {};\n}}\n", c.utilities.no_break.trim_end_matches(';')));

    css
}

/// Page margins as CSS lengths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Margins {
    pub top: String,
    pub right: String,
    pub bottom: String,
    pub left: String,
}

impl Margins {
    pub fn uniform(value: &str) -> Self {
        Self { top: value.to_string(), right: value.to_string(), bottom: value.to_string(), left: value.to_string() }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform("2cm")
    }
}

/// Page geometry plus optional running header/footer text.
///
/// Header and footer text may contain `{page}` and `{pages}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSetup {
    pub size: String,
    pub margins: Margins,
    pub header: Option<String>,
    pub footer: Option<String>,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self { size: "A4".to_string(), margins: Margins::default(), header: None, footer: None }
    }
}

impl PageSetup {
    pub fn from_config(page: &PageConfig) -> Self {
        Self {
            size: page.size.clone(),
            margins: Margins {
                top: page.margin_top.clone(),
                right: page.margin_right.clone(),
                bottom: page.margin_bottom.clone(),
                left: page.margin_left.clone(),
            },
            header: None,
            footer: None,
        }
    }
}

/// Build an `@page` block for the print backends
pub fn page_css(setup: &PageSetup) -> String {
    let m = &setup.margins;
    let mut css = format!(
        "@page {{\n    size: {};\n    margin: {} {} {} {};\n",
        setup.size, m.top, m.right, m.bottom, m.left
    );
    if let Some(header) = &setup.header {
        css.push_str(&format!("    @top-center {{\n        content: {};\n    }}\n", css_content(header)));
    }
    if let Some(footer) = &setup.footer {
        css.push_str(&format!("    @bottom-center {{\n        content: {};\n    }}\n", css_content(footer)));
    }
    css.push_str("}\n");
    css
}

/// Convert text with `{page}`/`{pages}` tokens into a CSS `content` value
pub fn css_content(text: &str) -> String {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        let (token, counter) = if rest.starts_with("{pages}") {
            ("{pages}", "counter(pages)")
        } else if rest.starts_with("{page}") {
            ("{page}", "counter(page)")
        } else {
            let Some(ch) = rest.chars().next() else { break };
            literal.push(ch);
            rest = &rest[ch.len_utf8()..];
            continue;
        };
        if !literal.is_empty() {
            parts.push(quote(&literal));
            literal.clear();
        }
        parts.push(counter.to_string());
        rest = &rest[token.len()..];
    }
    if !literal.is_empty() {
        parts.push(quote(&literal));
    }

    if parts.is_empty() { "\"\"".to_string() } else { parts.join(" ") }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
