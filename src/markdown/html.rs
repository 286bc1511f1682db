use super::parser_options;
use pulldown_cmark::{html, CowStr, Event, Parser, Tag, TagEnd};
use std::collections::HashSet;

/// A heading in document order, with the anchor id used in rendered HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub id: String,
}

/// Slug `text`, suffixing `-1`, `-2`, ... until the id is unused
pub fn slugify_unique(text: &str, seen: &mut HashSet<String>) -> String {
    let mut base = slug::slugify(text);
    if base.is_empty() {
        base = "section".to_string();
    }
    let mut candidate = base.clone();
    let mut n = 0;
    while seen.contains(&candidate) {
        n += 1;
        candidate = format!("{}-{}", base, n);
    }
    seen.insert(candidate.clone());
    candidate
}

/// Headings of a Markdown document in order. Explicit `{#id}` attributes win
/// over generated slugs.
pub fn headings(markdown: &str) -> Vec<Heading> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut current: Option<(u8, Option<String>, String)> = None;

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                current = Some((level as u8, id.map(|id| id.to_string()), String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, _, buf)) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, _, buf)) = current.as_mut() {
                    buf.push(' ');
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, explicit, text)) = current.take() {
                    let text = text.trim().to_string();
                    let id = match explicit {
                        Some(id) => {
                            seen.insert(id.clone());
                            id
                        }
                        None => slugify_unique(&text, &mut seen),
                    };
                    out.push(Heading { level, text, id });
                }
            }
            _ => {}
        }
    }
    out
}

/// Render Markdown to an HTML fragment. Every heading carries the id
/// reported by [`headings`].
pub fn to_html(markdown: &str) -> String {
    let ids = headings(markdown);
    let mut ids = ids.into_iter();

    let events = Parser::new_ext(markdown, parser_options()).map(|event| match event {
        Event::Start(Tag::Heading { level, id, classes, attrs }) => {
            let id = ids.next().map(|h| CowStr::from(h.id)).or(id);
            Event::Start(Tag::Heading { level, id, classes, attrs })
        }
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}
