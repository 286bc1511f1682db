/// Style configuration module
///
/// This module handles:
/// - Loading the YAML style configuration (explicit path, env var, cwd, user config dir)
/// - Filling every missing key with built-in defaults
/// - Colour parsing for DOCX style definitions
///
/// The same file drives both the generated CSS (HTML/PDF output) and the
/// DOCX style table.
use crate::error::{Error, IoContext, Result};
use crate::ui;
use log::debug;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a style config file
pub const CONFIG_ENV: &str = "DOCSTACK_CONFIG";

/// File name looked up in the current directory
pub const LOCAL_CONFIG: &str = "docstack.yaml";

fn s(v: &str) -> String {
    v.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub page: PageConfig,
    pub content: ContentConfig,
    pub title_page: TitlePageConfig,
    pub toc: TocConfig,
    pub images: ImagesConfig,
    pub headers: HeadersConfig,
    pub text: TextConfig,
    pub bold_text: Option<BoldTextConfig>,
    pub figure_captions: Option<CaptionConfig>,
    pub table: TableConfig,
    pub table_cell: TableCellConfig,
    pub table_header: TableHeaderConfig,
    pub code: CodeConfig,
    pub pre: PreConfig,
    pub blockquote: BlockquoteConfig,
    pub footer: FooterConfig,
    pub utilities: UtilitiesConfig,
    pub advanced: AdvancedConfig,
    pub docx: DocxConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub size: String,
    pub margin_top: String,
    pub margin_bottom: String,
    pub margin_left: String,
    pub margin_right: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self { size: s("A4"), margin_top: s("2cm"), margin_bottom: s("2cm"), margin_left: s("2cm"), margin_right: s("2cm") }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub font_family: String,
    pub font_size: String,
    pub font_weight: String,
    pub line_height: String,
    pub color: String,
    pub max_width: String,
    pub margin: String,
    pub padding: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            font_family: s(r#"-apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif"#),
            font_size: s("14px"),
            font_weight: s("normal"),
            line_height: s("1.6"),
            color: s("#24292f"),
            max_width: s("none"),
            margin: s("0 auto"),
            padding: s("0"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TitlePageConfig {
    pub display: String,
    pub justify_content: String,
    pub align_items: String,
    pub min_height: String,
    pub text_align: String,
    pub padding: String,
    pub font_family: String,
    pub font_size: String,
    pub font_weight: String,
    pub color: String,
    pub margin: String,
    pub line_height: String,
}

impl Default for TitlePageConfig {
    fn default() -> Self {
        Self {
            display: s("flex"),
            justify_content: s("center"),
            align_items: s("center"),
            min_height: s("90vh"),
            text_align: s("center"),
            padding: s("2cm"),
            font_family: s("inherit"),
            font_size: s("36pt"),
            font_weight: s("700"),
            color: s("#0969da"),
            margin: s("0"),
            line_height: s("1.2"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TocConfig {
    pub title_font_size: String,
    pub title_font_weight: String,
    pub title_color: String,
    pub title_margin_bottom: String,
    pub title_text_align: String,
    pub max_width: String,
    pub margin: String,
    pub list_style: String,
    pub padding: String,
    pub item_font_family: String,
    pub item_font_size: String,
    pub item_font_weight: String,
    pub item_margin: String,
    pub item_line_height: String,
    pub link_text_decoration: String,
    pub link_color: String,
    pub link_hover_color: String,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            title_font_size: s("24pt"),
            title_font_weight: s("700"),
            title_color: s("#24292f"),
            title_margin_bottom: s("1em"),
            title_text_align: s("left"),
            max_width: s("100%"),
            margin: s("0"),
            list_style: s("none"),
            padding: s("0 0 0 1em"),
            item_font_family: s("inherit"),
            item_font_size: s("12pt"),
            item_font_weight: s("normal"),
            item_margin: s("0.3em 0"),
            item_line_height: s("1.4"),
            link_text_decoration: s("none"),
            link_color: s("#0969da"),
            link_hover_color: s("#0550ae"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub max_width: String,
    pub max_height: String,
    pub display: String,
    pub margin: String,
    pub box_shadow: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { max_width: s("90%"), max_height: s("70vh"), display: s("block"), margin: s("1em auto"), box_shadow: s("none") }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HeadingLevel {
    pub font_size: String,
    pub margin_top: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HeadersConfig {
    pub font_family: String,
    pub color: String,
    pub margin_top: String,
    pub margin_bottom: String,
    pub font_weight: String,
    pub line_height: String,
    pub page_break_after: String,
    pub h1: Option<HeadingLevel>,
    pub h2: Option<HeadingLevel>,
    pub h3: Option<HeadingLevel>,
    pub h4: Option<HeadingLevel>,
    pub h5: Option<HeadingLevel>,
    pub h6: Option<HeadingLevel>,
}

impl HeadersConfig {
    /// Per-level overrides in h1..h6 order
    pub fn levels(&self) -> Vec<(&'static str, &HeadingLevel)> {
        [("h1", &self.h1), ("h2", &self.h2), ("h3", &self.h3), ("h4", &self.h4), ("h5", &self.h5), ("h6", &self.h6)]
            .into_iter()
            .filter_map(|(tag, level)| level.as_ref().map(|l| (tag, l)))
            .collect()
    }
}

impl Default for HeadersConfig {
    fn default() -> Self {
        let level = |size: &str, top: &str| Some(HeadingLevel { font_size: s(size), margin_top: s(top) });
        Self {
            font_family: s("inherit"),
            color: s("#1f2328"),
            margin_top: s("1.5em"),
            margin_bottom: s("0.5em"),
            font_weight: s("600"),
            line_height: s("1.25"),
            page_break_after: s("avoid"),
            h1: level("2em", "0"),
            h2: level("1.5em", "1.5em"),
            h3: level("1.25em", "1.2em"),
            h4: None,
            h5: None,
            h6: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub paragraph_margin_bottom: String,
    pub orphans: u32,
    pub widows: u32,
    pub list_margin_bottom: String,
    pub list_line_height: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            paragraph_margin_bottom: s("1em"),
            orphans: 3,
            widows: 3,
            list_margin_bottom: s("0.25em"),
            list_line_height: s("1.5"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoldTextConfig {
    pub font_family: String,
    pub font_size: String,
    pub font_weight: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaptionConfig {
    pub font_family: String,
    pub font_size: String,
    pub font_weight: String,
    pub font_style: String,
    pub color: String,
    pub margin_top: String,
    pub margin_bottom: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub border_collapse: String,
    pub width: String,
    pub margin: String,
    pub page_break_inside: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { border_collapse: s("collapse"), width: s("100%"), margin: s("1em 0"), page_break_inside: s("avoid") }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TableCellConfig {
    pub border: String,
    pub padding: String,
    pub word_wrap: String,
    pub font_size: String,
    pub color: String,
}

impl Default for TableCellConfig {
    fn default() -> Self {
        Self {
            border: s("1px solid #d0d7de"),
            padding: s("6px 13px"),
            word_wrap: s("break-word"),
            font_size: s("0.9em"),
            color: s("#24292f"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TableHeaderConfig {
    pub background_color: String,
    pub font_weight: String,
    pub color: String,
}

impl Default for TableHeaderConfig {
    fn default() -> Self {
        Self { background_color: s("#f6f8fa"), font_weight: s("600"), color: s("#24292f") }
    }
}

const MONOSPACE: &str = r#"ui-monospace, SFMono-Regular, "SF Mono", Menlo, Consolas, monospace"#;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    pub font_family: String,
    pub background_color: String,
    pub padding: String,
    pub border_radius: String,
    pub font_size: String,
    pub color: String,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            font_family: s(MONOSPACE),
            background_color: s("rgba(175, 184, 193, 0.2)"),
            padding: s("0.2em 0.4em"),
            border_radius: s("6px"),
            font_size: s("85%"),
            color: s("#24292f"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreConfig {
    pub font_family: String,
    pub background_color: String,
    pub padding: String,
    pub border_radius: String,
    pub overflow_x: String,
    pub page_break_inside: String,
    pub font_size: String,
    pub color: String,
}

impl Default for PreConfig {
    fn default() -> Self {
        Self {
            font_family: s(MONOSPACE),
            background_color: s("#f6f8fa"),
            padding: s("16px"),
            border_radius: s("6px"),
            overflow_x: s("auto"),
            page_break_inside: s("avoid"),
            font_size: s("85%"),
            color: s("#24292f"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BlockquoteConfig {
    pub border_left: String,
    pub padding_left: String,
    pub margin_left: String,
    pub color: String,
    pub page_break_inside: String,
}

impl Default for BlockquoteConfig {
    fn default() -> Self {
        Self {
            border_left: s("0.25em solid #d0d7de"),
            padding_left: s("1em"),
            margin_left: s("0"),
            color: s("#57606a"),
            page_break_inside: s("avoid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FooterConfig {
    /// Raw CSS `content` value, e.g. `"Page " counter(page)`
    pub content: String,
    pub font_size: String,
    pub color: String,
}

impl Default for FooterConfig {
    fn default() -> Self {
        Self { content: s(r#""Page " counter(page) " of " counter(pages)"#), font_size: s("9pt"), color: s("#57606a") }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UtilitiesConfig {
    pub page_break: String,
    pub no_break: String,
}

impl Default for UtilitiesConfig {
    fn default() -> Self {
        Self { page_break: s("page-break-before: always"), no_break: s("page-break-inside: avoid") }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AdvancedConfig {
    pub css_reset: bool,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self { css_reset: true }
    }
}

/// DOCX paragraph/character style overrides, keyed by Word style name ("Heading 1", "Normal")
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DocxConfig {
    pub styles: BTreeMap<String, DocxStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DocxStyle {
    pub font: Option<String>,
    /// Font size in points
    pub size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    /// `#RRGGBB`
    pub color: Option<String>,
    /// Line spacing multiple (1.0 = single)
    pub line_spacing: Option<f32>,
    /// Points
    pub space_before: Option<f32>,
    /// Points
    pub space_after: Option<f32>,
    /// First-line indent in inches
    pub indent: Option<f32>,
    pub keep_with_next: Option<bool>,
}

/// Load the style configuration.
///
/// Lookup order: explicit path, `DOCSTACK_CONFIG`, `./docstack.yaml`,
/// `<config dir>/docstack/style.yaml`, then built-in defaults. An explicit
/// path must exist; implicit candidates that are missing are skipped.
pub fn load_style_config(explicit: Option<&Path>) -> Result<StyleConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::MissingInput(path.to_path_buf()));
        }
        return parse_config_file(path);
    }

    for candidate in implicit_candidates() {
        if candidate.is_file() {
            debug!("Using style config {:?}", candidate);
            return parse_config_file(&candidate);
        }
        debug!("No style config at {:?}", candidate);
    }

    ui::warn("no style configuration found, using built-in defaults");
    Ok(StyleConfig::default())
}

fn implicit_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(path) = env::var(CONFIG_ENV) {
        candidates.push(PathBuf::from(path));
    }
    candidates.push(PathBuf::from(LOCAL_CONFIG));
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("docstack").join("style.yaml"));
    }
    candidates
}

/// Parse a YAML style file; an empty file yields the defaults
pub fn parse_config_file(path: &Path) -> Result<StyleConfig> {
    let text = fs::read_to_string(path).at(path)?;
    parse_config_str(&text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

pub fn parse_config_str(text: &str) -> std::result::Result<StyleConfig, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(StyleConfig::default());
    }
    serde_yaml::from_str(text)
}

/// Convert `#RRGGBB` (or `RRGGBB`) into its components
pub fn hex_to_rgb(hex: &str) -> Result<(u8, u8, u8)> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::Config(format!("invalid colour '{}', expected #RRGGBB", hex)));
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|e| Error::Config(e.to_string()));
    Ok((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
