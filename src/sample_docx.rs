//! The "document from scratch" sample: a short report built entirely through
//! [`DocxBuilder`] calls, with no template.

use crate::docx::{Alignment, DocxBuilder, RunProps, TextRun};
use crate::ui;
use std::path::Path;

const SAMPLE_ROWS: [(&str, &str, &str); 3] =
    [("Temperature", "25°C", "Normal"), ("Pressure", "1013 hPa", "Normal"), ("Humidity", "60%", "High")];

const OBSERVATIONS: [&str; 3] = [
    "The system is operating correctly",
    "No errors detected in the logs",
    "Performance within normal parameters",
];

/// Picture width in inches
const PICTURE_WIDTH: f64 = 3.0;

pub fn build_sample_report(assets_dir: &Path) -> DocxBuilder {
    let mut doc = DocxBuilder::new();
    doc.set_title("Sample Report");

    doc.add_heading("Sample Report", 0).align(Alignment::Center);

    doc.add_paragraph()
        .text("This document was generated entirely from scratch ")
        .run("using the docstack DOCX builder", RunProps::bold())
        .text(", without a template.");

    doc.add_heading("Sample Data", 1);
    let header = ["Name", "Value", "Status"].iter().map(|h| vec![TextRun::plain(*h)]).collect();
    let rows = SAMPLE_ROWS
        .iter()
        .map(|(name, value, status)| vec![vec![TextRun::plain(*name)], vec![TextRun::plain(*value)], vec![TextRun::plain(*status)]])
        .collect();
    doc.add_table(header, rows);

    doc.add_heading("Observations", 1);
    for item in OBSERVATIONS {
        doc.add_list_item(&[TextRun::plain(item)], false, 0);
    }

    let image = assets_dir.join("product.png");
    if image.exists() {
        doc.add_heading("Sample Image", 1);
        match doc.add_picture(&image, PICTURE_WIDTH) {
            Ok(_) => {
                doc.add_paragraph().run("Image inserted dynamically", RunProps::italic());
            }
            Err(e) => ui::warn(&format!("could not add image {}: {}", image.display(), e)),
        }
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sample_without_assets() {
        let dir = TempDir::new().unwrap();
        let doc = build_sample_report(dir.path());
        let xml = doc.document_xml();

        assert!(xml.contains(r#"<w:pStyle w:val="Title"/><w:jc w:val="center"/>"#));
        assert!(xml.contains(r#"<w:rPr><w:b/></w:rPr><w:t xml:space="preserve">using the docstack DOCX builder</w:t>"#));
        assert!(xml.contains("Humidity"));
        assert_eq!(xml.matches("<w:tr>").count(), 4);
        assert_eq!(xml.matches(r#"<w:pStyle w:val="ListBullet"/>"#).count(), 3);
        assert!(!xml.contains("Sample Image"));
        // title, intro, 2 headings, table, 3 bullets
        assert_eq!(doc.len(), 8);
    }

    #[test]
    fn test_sample_with_product_image() {
        let dir = TempDir::new().unwrap();
        image::RgbImage::new(300, 150).save(dir.path().join("product.png")).unwrap();
        let doc = build_sample_report(dir.path());
        let xml = doc.document_xml();

        assert!(xml.contains("Sample Image"));
        assert!(xml.contains(r#"<wp:extent cx="2743200" cy="1371600"/>"#));
        assert!(xml.contains(r#"<w:rPr><w:i/></w:rPr><w:t xml:space="preserve">Image inserted dynamically</w:t>"#));
    }

    #[test]
    fn test_unreadable_image_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("product.png"), b"garbage").unwrap();
        let doc = build_sample_report(dir.path());
        let xml = doc.document_xml();
        assert!(!xml.contains("<w:drawing>"));
        assert!(!xml.contains("Image inserted dynamically"));
    }
}
