//! Standalone HTML page assembly.
//!
//! Two entry points produce the same page layout (title page, TOC page,
//! `main-content` body):
//!
//! - [`render_standalone`] builds the whole page natively from Markdown.
//! - [`add_page_structure`] post-processes a page pandoc already produced.

use crate::config::StyleConfig;
use crate::css::generate_css;
use crate::frontmatter;
use crate::markdown::{self, Heading};
use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_TOC_TITLE: &str = "Contents";

lazy_static! {
    static ref BODY_OPEN: Regex = Regex::new(r"(?is)<body\b([^>]*)>").expect("valid regex");
    static ref CLASS_ATTR: Regex = Regex::new(r#"(?is)\bclass\s*=\s*"([^"]*)""#).expect("valid regex");
    static ref TOC_NAV: Regex =
        Regex::new(r#"(?is)<nav\b[^>]*\bid\s*=\s*"TOC"[^>]*>.*?</nav>"#).expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Page title; falls back to front matter, then "Document"
    pub title: Option<String>,
    pub toc: bool,
    pub toc_depth: u8,
    pub toc_title: String,
    pub title_page: bool,
    /// Appended after the generated stylesheet
    pub extra_css: Option<String>,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            title: None,
            toc: false,
            toc_depth: 3,
            toc_title: DEFAULT_TOC_TITLE.to_string(),
            title_page: false,
            extra_css: None,
        }
    }
}

/// Render Markdown into a complete HTML page with inline CSS
pub fn render_standalone(markdown_src: &str, opts: &HtmlOptions, config: &StyleConfig) -> String {
    let (meta, body_md) = frontmatter::extract(markdown_src);
    let title = opts.title.clone().or(meta.title).unwrap_or_else(|| "Document".to_string());

    let mut css = generate_css(config);
    if let Some(extra) = &opts.extra_css {
        css.push('\n');
        css.push_str(extra);
    }

    let mut html = String::with_capacity(css.len() + body_md.len() * 2);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(&title)));
    html.push_str("<style>\n");
    html.push_str(&css);
    html.push_str("</style>\n</head>\n<body class=\"main-content\">\n");

    if opts.title_page {
        html.push_str(&title_page_div(&title));
    }
    if opts.toc {
        let entries: Vec<Heading> =
            markdown::headings(body_md).into_iter().filter(|h| h.level <= opts.toc_depth).collect();
        let nav = format!("<nav id=\"TOC\">\n{}</nav>", toc_list(&entries));
        html.push_str(&toc_page_div(&opts.toc_title, &nav));
    }

    html.push_str(&markdown::to_html(body_md));
    html.push_str("</body>\n</html>\n");
    html
}

/// Add title page, TOC page and `main-content` class to HTML produced
/// elsewhere. Returns the input unchanged when it has no `<body>`.
pub fn add_page_structure(html: &str, title: &str) -> String {
    let Some(caps) = BODY_OPEN.captures(html) else {
        return html.to_string();
    };
    let (Some(whole), Some(attrs)) = (caps.get(0), caps.get(1)) else {
        return html.to_string();
    };

    let body_tag = format!("<body{}>", with_main_content_class(attrs.as_str()));
    let rest = &html[whole.end()..];

    let mut inserted = title_page_div(title);
    let remainder = match TOC_NAV.find(rest) {
        Some(nav) => {
            inserted.push_str(&toc_page_div(DEFAULT_TOC_TITLE, nav.as_str()));
            format!("{}{}", &rest[..nav.start()], &rest[nav.end()..])
        }
        None => rest.to_string(),
    };

    format!("{}{}\n{}{}", &html[..whole.start()], body_tag, inserted, remainder)
}

fn with_main_content_class(attrs: &str) -> String {
    if let Some(class) = CLASS_ATTR.captures(attrs).and_then(|c| c.get(1)) {
        if class.as_str().split_whitespace().any(|c| c == "main-content") {
            return attrs.to_string();
        }
        let joined = if class.as_str().trim().is_empty() {
            "main-content".to_string()
        } else {
            format!("{} main-content", class.as_str().trim())
        };
        return format!("{}{}{}", &attrs[..class.start()], joined, &attrs[class.end()..]);
    }
    format!("{} class=\"main-content\"", attrs)
}

fn title_page_div(title: &str) -> String {
    format!("<div class=\"title-page\">\n<h1>{}</h1>\n</div>\n", escape_html(title))
}

fn toc_page_div(toc_title: &str, nav: &str) -> String {
    format!("<div class=\"toc-page\">\n<h1 class=\"toc-title\">{}</h1>\n{}\n</div>\n", escape_html(toc_title), nav)
}

/// Nested `<ul>` list linking to heading ids
fn toc_list(entries: &[Heading]) -> String {
    let mut out = String::new();
    let mut stack: Vec<u8> = Vec::new();

    for h in entries {
        loop {
            match stack.last().copied() {
                None => {
                    out.push_str("<ul>\n<li>");
                    stack.push(h.level);
                    break;
                }
                Some(top) if h.level > top => {
                    out.push_str("\n<ul>\n<li>");
                    stack.push(h.level);
                    break;
                }
                Some(top) if h.level == top => {
                    out.push_str("</li>\n<li>");
                    break;
                }
                Some(_) => {
                    out.push_str("</li>\n</ul>");
                    stack.pop();
                }
            }
        }
        out.push_str(&format!("<a href=\"#{}\">{}</a>", escape_html(&h.id), escape_html(&h.text)));
    }
    for _ in stack {
        out.push_str("</li>\n</ul>\n");
    }
    out
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// `final_analysis_report` -> `Final Analysis Report`
pub fn title_from_stem(stem: &str) -> String {
    let spaced = stem.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    let mut prev_alpha = false;
    for ch in spaced.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PANDOC_OUTPUT: &str = r##"<!DOCTYPE html>
<html>
<head><title>x</title></head>
<body>
<nav id="TOC" role="doc-toc">
<ul>
<li><a href="#intro">Intro</a></li>
</ul>
</nav>
<h1 id="intro">Intro</h1>
<p>Body text.</p>
</body>
</html>
"##;

    #[test]
    fn test_title_from_stem() {
        assert_eq!(title_from_stem("final_analysis_report"), "Final Analysis Report");
        assert_eq!(title_from_stem("q3_API_summary"), "Q3 Api Summary");
        assert_eq!(title_from_stem(""), "");
    }

    #[test]
    fn test_add_page_structure_moves_toc() {
        let out = add_page_structure(PANDOC_OUTPUT, "Final Report");
        assert!(out.contains(r#"<body class="main-content">"#));

        let title = out.find(r#"<div class="title-page">"#).expect("title page");
        let toc = out.find(r#"<div class="toc-page">"#).expect("toc page");
        let nav = out.find(r#"<nav id="TOC""#).expect("nav");
        let heading = out.find(r#"<h1 id="intro">"#).expect("content");
        assert!(title < toc && toc < nav && nav < heading);
        assert_eq!(out.matches("<nav").count(), 1);
        assert!(out.contains("<h1>Final Report</h1>"));
        assert!(out.contains(r#"<h1 class="toc-title">Contents</h1>"#));
    }

    #[test]
    fn test_add_page_structure_without_toc() {
        let html = "<html><BODY class=\"x\">\n<p>hi</p></BODY></html>";
        let out = add_page_structure(html, "T");
        assert!(out.contains(r#"<body class="x main-content">"#));
        assert!(out.contains(r#"<div class="title-page">"#));
        assert!(!out.contains("toc-page"));
        assert!(out.contains("<p>hi</p>"));
    }

    #[test]
    fn test_add_page_structure_without_body_is_unchanged() {
        let html = "<p>fragment</p>";
        assert_eq!(add_page_structure(html, "T"), html);
    }

    #[test]
    fn test_render_standalone_layout() {
        let md = "---\ntitle: From Front Matter\n---\n# One\n\n## Two\n\n#### Deep\n\ntext\n";
        let opts = HtmlOptions { toc: true, title_page: true, ..Default::default() };
        let html = render_standalone(md, &opts, &StyleConfig::default());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<meta charset=\"utf-8\">"));
        assert!(html.contains("<title>From Front Matter</title>"));
        assert!(html.contains("<body class=\"main-content\">"));
        assert!(html.contains("<a href=\"#one\">One</a>"));
        assert!(html.contains("<a href=\"#two\">Two</a>"));
        // Below toc_depth
        assert!(!html.contains("href=\"#deep\""));
        assert!(html.contains("<h4 id=\"deep\">Deep</h4>"));
        assert!(!html.contains("title: From Front Matter"));
    }

    #[test]
    fn test_render_standalone_extra_css_and_title_override() {
        let opts = HtmlOptions {
            title: Some("A & B".into()),
            extra_css: Some(".custom { color: red; }".into()),
            ..Default::default()
        };
        let html = render_standalone("text", &opts, &StyleConfig::default());
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(html.contains(".custom { color: red; }"));
        assert!(!html.contains("toc-page"));
        assert!(!html.contains("<div class=\"title-page\">"));
    }

    #[test]
    fn test_toc_list_nesting() {
        let h = |level, id: &str| Heading { level, text: id.to_string(), id: id.to_string() };
        let out = toc_list(&[h(1, "a"), h(2, "b"), h(3, "c"), h(1, "d")]);
        assert_eq!(out.matches("<ul>").count(), 3);
        assert_eq!(out.matches("</ul>").count(), 3);
        assert_eq!(out.matches("<li>").count(), out.matches("</li>").count());
    }
}
