//! Markdown document model.
//!
//! Parses Markdown with pulldown-cmark into a small block/run tree that the
//! DOCX writer can walk. HTML output goes straight through pulldown-cmark's
//! renderer (see [`html`]).
//!
//! # Module Organization
//!
//! - `mod.rs` - Block/Run model and the event-stream builder
//! - `html` - HTML body rendering with stable heading ids, heading outline for TOCs

mod html;

pub use html::{headings, slugify_unique, to_html, Heading};

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Markdown extensions enabled for every parse
pub(crate) fn parser_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_FOOTNOTES);
    opts.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    opts
}

/// Inline formatting flags for a run of text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub code: bool,
}

/// A span of uniformly formatted text. A `"\n"` inside the text is a hard line break.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
    pub link: Option<String>,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Self { text: text.into(), style, link: None }
    }
}

/// Concatenated text of a run list
pub fn runs_text(runs: &[Run]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListItem {
    pub runs: Vec<Run>,
    /// Nested lists, code blocks and further paragraphs
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, runs: Vec<Run> },
    Paragraph(Vec<Run>),
    List { ordered: bool, start: u64, items: Vec<ListItem> },
    CodeBlock { lang: Option<String>, text: String },
    Quote(Vec<Block>),
    Table { header: Vec<Vec<Run>>, rows: Vec<Vec<Vec<Run>>> },
    Rule,
    Image { src: String, alt: String },
    /// A paragraph consisting solely of `\newpage` or `\pagebreak`
    PageBreak,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

enum Container {
    Root(Vec<Block>),
    Quote(Vec<Block>),
    Footnote { label: String, blocks: Vec<Block> },
    List { ordered: bool, start: u64, items: Vec<ListItem> },
    Item(ListItem),
    Table { header: Vec<Vec<Run>>, rows: Vec<Vec<Vec<Run>>>, row: Vec<Vec<Run>> },
}

#[derive(Default)]
struct InlineState {
    bold: u32,
    italic: u32,
    strike: u32,
    links: Vec<String>,
    /// (destination, alt text) while inside an image tag
    image: Option<(String, String)>,
}

impl InlineState {
    fn style(&self, code: bool) -> RunStyle {
        RunStyle { bold: self.bold > 0, italic: self.italic > 0, underline: false, strike: self.strike > 0, code }
    }
}

struct Builder {
    stack: Vec<Container>,
    runs: Vec<Run>,
    images: Vec<(String, String)>,
    inline: InlineState,
    code: Option<(Option<String>, String)>,
}

impl Builder {
    fn new() -> Self {
        Self { stack: vec![Container::Root(Vec::new())], runs: Vec::new(), images: Vec::new(), inline: InlineState::default(), code: None }
    }

    fn push_run(&mut self, text: &str, code: bool) {
        let style = self.inline.style(code);
        let link = self.inline.links.last().cloned();
        // Merge with the previous run when formatting matches
        if let Some(last) = self.runs.last_mut()
            && last.style == style
            && last.link == link
            && last.text != "\n"
            && text != "\n"
        {
            last.text.push_str(text);
            return;
        }
        self.runs.push(Run { text: text.to_string(), style, link });
    }

    /// Tight list items carry text without a paragraph; move it into the item
    /// before a nested block opens.
    fn flush_item_text(&mut self) {
        if self.runs.is_empty() {
            return;
        }
        if let Some(Container::Item(item)) = self.stack.last_mut() {
            let runs = std::mem::take(&mut self.runs);
            if item.runs.is_empty() && item.children.is_empty() {
                item.runs = runs;
            } else {
                item.children.push(Block::Paragraph(runs));
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(Container::Root(blocks)) | Some(Container::Quote(blocks)) => blocks.push(block),
            Some(Container::Footnote { blocks, .. }) => blocks.push(block),
            Some(Container::Item(item)) => match block {
                Block::Paragraph(runs) if item.runs.is_empty() && item.children.is_empty() => item.runs = runs,
                other => item.children.push(other),
            },
            // Lists only hold items and tables only hold cells
            Some(Container::List { .. }) | Some(Container::Table { .. }) | None => {}
        }
    }

    fn finish_paragraph(&mut self) {
        let runs = std::mem::take(&mut self.runs);
        let images = std::mem::take(&mut self.images);
        let text = runs_text(&runs);
        let trimmed = text.trim();

        if trimmed == "\\newpage" || trimmed == "\\pagebreak" {
            self.push_block(Block::PageBreak);
            return;
        }
        // Images follow the text they were written in
        if !runs.is_empty() && (!trimmed.is_empty() || images.is_empty()) {
            self.push_block(Block::Paragraph(runs));
        }
        self.push_images(images);
    }

    fn push_images(&mut self, images: Vec<(String, String)>) {
        for (src, alt) in images {
            self.push_block(Block::Image { src, alt });
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.flush_item_text();
            }
            Tag::Heading { .. } => {
                self.flush_item_text();
                self.runs.clear();
            }
            Tag::BlockQuote(_) => {
                self.flush_item_text();
                self.stack.push(Container::Quote(Vec::new()));
            }
            Tag::CodeBlock(kind) => {
                self.flush_item_text();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().filter(|l| !l.is_empty()).map(str::to_string)
                    }
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((lang, String::new()));
            }
            Tag::List(start) => {
                self.flush_item_text();
                self.stack.push(Container::List { ordered: start.is_some(), start: start.unwrap_or(1), items: Vec::new() });
            }
            Tag::Item => self.stack.push(Container::Item(ListItem::default())),
            Tag::FootnoteDefinition(label) => {
                self.flush_item_text();
                self.stack.push(Container::Footnote { label: label.to_string(), blocks: Vec::new() });
            }
            Tag::Table(_) => {
                self.flush_item_text();
                self.stack.push(Container::Table { header: Vec::new(), rows: Vec::new(), row: Vec::new() });
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(Container::Table { row, .. }) = self.stack.last_mut() {
                    row.clear();
                }
            }
            Tag::TableCell => self.runs.clear(),
            Tag::Emphasis => self.inline.italic += 1,
            Tag::Strong => self.inline.bold += 1,
            Tag::Strikethrough => self.inline.strike += 1,
            Tag::Link { dest_url, .. } => self.inline.links.push(dest_url.to_string()),
            Tag::Image { dest_url, .. } => self.inline.image = Some((dest_url.to_string(), String::new())),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.finish_paragraph(),
            TagEnd::Heading(level) => {
                let runs = std::mem::take(&mut self.runs);
                let images = std::mem::take(&mut self.images);
                self.push_block(Block::Heading { level: level as u8, runs });
                self.push_images(images);
            }
            TagEnd::BlockQuote(_) => {
                if let Some(Container::Quote(blocks)) = self.stack.pop() {
                    self.push_block(Block::Quote(blocks));
                }
            }
            TagEnd::CodeBlock => {
                if let Some((lang, mut text)) = self.code.take() {
                    if text.ends_with('\n') {
                        text.pop();
                    }
                    self.push_block(Block::CodeBlock { lang, text });
                }
            }
            TagEnd::List(_) => {
                if let Some(Container::List { ordered, start, items }) = self.stack.pop() {
                    self.push_block(Block::List { ordered, start, items });
                }
            }
            TagEnd::Item => {
                self.flush_item_text();
                if let Some(Container::Item(item)) = self.stack.pop()
                    && let Some(Container::List { items, .. }) = self.stack.last_mut()
                {
                    items.push(item);
                }
            }
            TagEnd::FootnoteDefinition => {
                if let Some(Container::Footnote { label, mut blocks }) = self.stack.pop() {
                    match blocks.first_mut() {
                        Some(Block::Paragraph(runs)) => runs.insert(0, Run::plain(format!("[{}]: ", label))),
                        _ => blocks.insert(0, Block::Paragraph(vec![Run::plain(format!("[{}]:", label))])),
                    }
                    for block in blocks {
                        self.push_block(block);
                    }
                }
            }
            TagEnd::Table => {
                if let Some(Container::Table { header, rows, .. }) = self.stack.pop() {
                    self.push_block(Block::Table { header, rows });
                }
            }
            TagEnd::TableHead => {
                if let Some(Container::Table { header, row, .. }) = self.stack.last_mut() {
                    *header = std::mem::take(row);
                }
            }
            TagEnd::TableRow => {
                if let Some(Container::Table { rows, row, .. }) = self.stack.last_mut() {
                    rows.push(std::mem::take(row));
                }
            }
            TagEnd::TableCell => {
                let cell = std::mem::take(&mut self.runs);
                if let Some(Container::Table { row, .. }) = self.stack.last_mut() {
                    row.push(cell);
                }
            }
            TagEnd::Emphasis => self.inline.italic = self.inline.italic.saturating_sub(1),
            TagEnd::Strong => self.inline.bold = self.inline.bold.saturating_sub(1),
            TagEnd::Strikethrough => self.inline.strike = self.inline.strike.saturating_sub(1),
            TagEnd::Link => {
                self.inline.links.pop();
            }
            TagEnd::Image => {
                let Some((src, alt)) = self.inline.image.take() else { return };
                // Cells only hold runs; keep the alt text in place of the picture
                if matches!(self.stack.last(), Some(Container::Table { .. })) {
                    if !alt.is_empty() {
                        self.push_run(&alt, false);
                    }
                } else {
                    self.images.push((src, alt));
                }
            }
            _ => {}
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some((_, code)) = self.code.as_mut() {
                    code.push_str(&text);
                } else if let Some((_, alt)) = self.inline.image.as_mut() {
                    alt.push_str(&text);
                } else {
                    self.push_run(&text, false);
                }
            }
            Event::Code(text) | Event::InlineMath(text) | Event::DisplayMath(text) => self.push_run(&text, true),
            Event::SoftBreak => {
                if self.inline.image.is_none() {
                    self.push_run(" ", false);
                }
            }
            Event::HardBreak => self.push_run("\n", false),
            Event::Rule => {
                self.flush_item_text();
                self.push_block(Block::Rule);
            }
            Event::TaskListMarker(checked) => self.push_run(if checked { "☒ " } else { "☐ " }, false),
            Event::FootnoteReference(label) => self.push_run(&format!("[{}]", label), false),
            Event::Html(_) | Event::InlineHtml(_) => {}
        }
    }

    fn finish(mut self) -> Document {
        // Unbalanced input cannot happen with pulldown-cmark, but drain anyway
        while self.stack.len() > 1 {
            match self.stack.pop() {
                Some(Container::Quote(blocks)) => self.push_block(Block::Quote(blocks)),
                Some(Container::List { ordered, start, items }) => self.push_block(Block::List { ordered, start, items }),
                _ => {}
            }
        }
        match self.stack.pop() {
            Some(Container::Root(blocks)) => Document { blocks },
            _ => Document::default(),
        }
    }
}

/// Parse Markdown into the block model
pub fn parse(markdown: &str) -> Document {
    let mut builder = Builder::new();
    for event in Parser::new_ext(markdown, parser_options()) {
        builder.event(event);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> RunStyle {
        RunStyle { bold: true, ..Default::default() }
    }

    #[test]
    fn test_headings_and_paragraph() {
        let doc = parse("# Title\n\nSome **bold** text.\n\n## Section\n");
        assert_eq!(doc.blocks.len(), 3);
        assert_eq!(doc.blocks[0], Block::Heading { level: 1, runs: vec![Run::plain("Title")] });
        assert_eq!(
            doc.blocks[1],
            Block::Paragraph(vec![Run::plain("Some "), Run::styled("bold", bold()), Run::plain(" text.")])
        );
        assert!(matches!(doc.blocks[2], Block::Heading { level: 2, .. }));
    }

    #[test]
    fn test_nested_emphasis() {
        let doc = parse("***both*** and *it*\n");
        let Block::Paragraph(runs) = &doc.blocks[0] else { panic!("expected paragraph") };
        assert!(runs[0].style.bold && runs[0].style.italic);
        assert_eq!(runs[0].text, "both");
        assert!(runs[2].style.italic && !runs[2].style.bold);
    }

    #[test]
    fn test_tight_nested_list() {
        let doc = parse("- one\n- two\n  - inner\n- three\n");
        let Block::List { ordered, items, .. } = &doc.blocks[0] else { panic!("expected list") };
        assert!(!ordered);
        assert_eq!(items.len(), 3);
        assert_eq!(runs_text(&items[1].runs), "two");
        let Block::List { items: inner, .. } = &items[1].children[0] else { panic!("expected nested list") };
        assert_eq!(runs_text(&inner[0].runs), "inner");
    }

    #[test]
    fn test_loose_ordered_list_with_start() {
        let doc = parse("3. first\n\n4. second\n");
        let Block::List { ordered, start, items } = &doc.blocks[0] else { panic!("expected list") };
        assert!(ordered);
        assert_eq!(*start, 3);
        assert_eq!(runs_text(&items[0].runs), "first");
        assert!(items[0].children.is_empty());
    }

    #[test]
    fn test_code_block_keeps_language_and_text() {
        let doc = parse("```python\ndef hello_world():\n    return True\n```\n");
        assert_eq!(
            doc.blocks[0],
            Block::CodeBlock { lang: Some("python".into()), text: "def hello_world():\n    return True".into() }
        );
    }

    #[test]
    fn test_table() {
        let doc = parse("| Name | Value |\n|---|---|\n| Temp | 25°C |\n| Pressure | 1013 hPa |\n");
        let Block::Table { header, rows } = &doc.blocks[0] else { panic!("expected table") };
        assert_eq!(header.len(), 2);
        assert_eq!(runs_text(&header[0]), "Name");
        assert_eq!(rows.len(), 2);
        assert_eq!(runs_text(&rows[1][1]), "1013 hPa");
    }

    #[test]
    fn test_quote_and_rule() {
        let doc = parse("> quoted *text*\n\n---\n");
        let Block::Quote(inner) = &doc.blocks[0] else { panic!("expected quote") };
        assert!(matches!(inner[0], Block::Paragraph(_)));
        assert_eq!(doc.blocks[1], Block::Rule);
    }

    #[test]
    fn test_page_break_marker() {
        let doc = parse("intro\n\n\\newpage\n\nnext\n");
        assert_eq!(doc.blocks[1], Block::PageBreak);
    }

    #[test]
    fn test_standalone_image() {
        let doc = parse("![Revenue trend](figures/revenue.png)\n");
        assert_eq!(doc.blocks[0], Block::Image { src: "figures/revenue.png".into(), alt: "Revenue trend".into() });
    }

    #[test]
    fn test_image_inside_text_follows_paragraph() {
        let doc = parse("see ![chart](x.png) here\n\nnext\n");
        assert_eq!(
            doc.blocks,
            vec![
                Block::Paragraph(vec![Run::plain("see  here")]),
                Block::Image { src: "x.png".into(), alt: "chart".into() },
                Block::Paragraph(vec![Run::plain("next")]),
            ]
        );
    }

    #[test]
    fn test_image_in_table_cell_stays_in_cell() {
        let doc = parse("| A | B |\n|---|---|\n| ![pic](p.png) | 2 |\n\nafter\n");
        assert_eq!(doc.blocks.len(), 2);
        let Block::Table { rows, .. } = &doc.blocks[0] else { panic!("expected table") };
        assert_eq!(runs_text(&rows[0][0]), "pic");
        assert_eq!(doc.blocks[1], Block::Paragraph(vec![Run::plain("after")]));
    }

    #[test]
    fn test_image_in_heading_follows_heading() {
        let doc = parse("# Title ![logo](logo.png)\n\nbody\n");
        assert_eq!(doc.blocks.len(), 3);
        let Block::Heading { level: 1, runs } = &doc.blocks[0] else { panic!("expected heading") };
        assert_eq!(runs_text(runs).trim(), "Title");
        assert_eq!(doc.blocks[1], Block::Image { src: "logo.png".into(), alt: "logo".into() });
        assert_eq!(doc.blocks[2], Block::Paragraph(vec![Run::plain("body")]));
    }

    #[test]
    fn test_link_and_code_runs() {
        let doc = parse("see [docs](https://example.com) and `cfg`\n");
        let Block::Paragraph(runs) = &doc.blocks[0] else { panic!("expected paragraph") };
        assert_eq!(runs[1].link.as_deref(), Some("https://example.com"));
        assert!(runs.iter().any(|r| r.style.code && r.text == "cfg"));
    }

    #[test]
    fn test_hard_break_is_separate_run() {
        let doc = parse("line one  \nline two\n");
        let Block::Paragraph(runs) = &doc.blocks[0] else { panic!("expected paragraph") };
        assert!(runs.iter().any(|r| r.text == "\n"));
        assert!(runs_text(runs).starts_with("line one\nline two") || runs_text(runs).starts_with("line one \nline two"));
    }
}
