/// DOCX (OOXML) writer
///
/// This module handles:
/// - Building Word documents from scratch without a template
/// - The style table (built-ins plus YAML overrides)
/// - Embedding images and hyperlinks
///
/// # Module Organization
///
/// - `builder` - `DocxBuilder` and `ParagraphBuilder`, body serialisation, packaging
/// - `styles` - `word/styles.xml` generation and style merging
/// - `xml` - Static package parts and XML escaping
mod builder;
pub mod styles;
pub mod xml;

pub use builder::{
    read_image, run_xml, Alignment, DocxBuilder, ImageData, ParagraphBuilder, RunProps, TextRun, EMU_PER_INCH, EMU_PER_MM,
};
