/// Tests for the DOCX builder
#[cfg(test)]
mod tests {
    use crate::config::DocxStyle;
    use crate::docx::builder::epoch_timestamp;
    use crate::docx::{Alignment, DocxBuilder, RunProps, TextRun};
    use chrono::{TimeZone, Utc};
    use crate::error::Error;
    use std::collections::BTreeMap;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    fn part_names(bytes: &[u8]) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn test_package_contains_required_parts() {
        let mut doc = DocxBuilder::new();
        doc.add_paragraph().text("hello");
        let bytes = doc.to_bytes().unwrap();
        let names = part_names(&bytes);
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/core.xml",
            "docProps/app.xml",
            "word/document.xml",
            "word/styles.xml",
            "word/numbering.xml",
            "word/settings.xml",
            "word/_rels/document.xml.rels",
        ] {
            assert!(names.iter().any(|n| n == part), "missing {}", part);
        }
    }

    #[test]
    fn test_set_created_fixes_core_timestamps() {
        let mut doc = DocxBuilder::new();
        doc.set_created(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        doc.add_paragraph().text("hello");
        let core = read_part(&doc.to_bytes().unwrap(), "docProps/core.xml");
        assert!(core.contains(r#"<dcterms:created xsi:type="dcterms:W3CDTF">2024-01-02T03:04:05Z</dcterms:created>"#));
        assert!(core.contains(r#"<dcterms:modified xsi:type="dcterms:W3CDTF">2024-01-02T03:04:05Z</dcterms:modified>"#));

        let again = read_part(&doc.to_bytes().unwrap(), "docProps/core.xml");
        assert_eq!(core, again);
    }

    #[test]
    fn test_source_date_epoch_values() {
        assert_eq!(epoch_timestamp(Some("1704164645")), Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()));
        assert_eq!(epoch_timestamp(Some(" 0 ")), Some(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(epoch_timestamp(Some("yesterday")), None);
        assert_eq!(epoch_timestamp(None), None);
    }

    #[test]
    fn test_heading_levels_and_alignment() {
        let mut doc = DocxBuilder::new();
        doc.add_heading("Sample Report", 0).align(Alignment::Center);
        doc.add_heading("Sample Data", 1);
        doc.add_heading("Deep", 9);
        let xml = doc.document_xml();
        assert!(xml.contains(r#"<w:pStyle w:val="Title"/><w:jc w:val="center"/>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="Heading1"/>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="Heading6"/>"#));
        assert!(xml.contains(r#"<w:t xml:space="preserve">Sample Report</w:t>"#));
    }

    #[test]
    fn test_runs_are_escaped_and_formatted() {
        let mut doc = DocxBuilder::new();
        doc.add_paragraph()
            .text("a < b & ")
            .run("bold", RunProps::bold())
            .run(" italic", RunProps::italic());
        let xml = doc.document_xml();
        assert!(xml.contains(r#"<w:t xml:space="preserve">a &lt; b &amp; </w:t>"#));
        assert!(xml.contains(r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">bold</w:t></w:r>"#));
        assert!(xml.contains(r#"<w:rPr><w:i/></w:rPr><w:t xml:space="preserve"> italic</w:t>"#));
    }

    #[test]
    fn test_code_block_lines_become_breaks() {
        let mut doc = DocxBuilder::new();
        doc.add_code_block("fn main() {\n    run();\n}");
        let xml = doc.document_xml();
        assert!(xml.contains(r#"<w:pStyle w:val="NoSpacing"/>"#));
        assert!(xml.contains(r#"w:ascii="Courier New""#));
        assert_eq!(xml.matches("<w:br/>").count(), 2);
        assert!(xml.contains(r#"<w:t xml:space="preserve">    run();</w:t>"#));
    }

    #[test]
    fn test_table_pads_short_rows() {
        let mut doc = DocxBuilder::new();
        let header = vec![vec![TextRun::plain("Name")], vec![TextRun::plain("Value")], vec![TextRun::plain("Status")]];
        let rows = vec![
            vec![vec![TextRun::plain("Temperature")], vec![TextRun::plain("25°C")], vec![TextRun::plain("Normal")]],
            vec![vec![TextRun::plain("Short")]],
        ];
        doc.add_table(header, rows);
        let xml = doc.document_xml();
        assert!(xml.contains(r#"<w:tblStyle w:val="TableGrid"/>"#));
        assert_eq!(xml.matches("<w:gridCol ").count(), 3);
        assert_eq!(xml.matches("<w:tr>").count(), 3);
        assert_eq!(xml.matches("<w:tc>").count(), 9);
        assert!(xml.contains("<w:tblHeader/>"));
    }

    #[test]
    fn test_empty_table_is_skipped() {
        let mut doc = DocxBuilder::new();
        doc.add_table(Vec::new(), Vec::new());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_list_items_use_numbering() {
        let mut doc = DocxBuilder::new();
        doc.add_list_item(&[TextRun::plain("bullet")], false, 0);
        doc.add_list_item(&[TextRun::plain("nested")], false, 1);
        doc.restart_numbering(4);
        doc.add_list_item(&[TextRun::plain("fourth")], true, 0);
        let xml = doc.document_xml();
        assert!(xml.contains(r#"<w:pStyle w:val="ListBullet"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr>"#));
        assert!(xml.contains(r#"<w:ilvl w:val="1"/><w:numId w:val="1"/>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="ListNumber"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="3"/></w:numPr>"#));

        let numbering = read_part(&doc.to_bytes().unwrap(), "word/numbering.xml");
        assert!(numbering.contains(r#"<w:startOverride w:val="4"/>"#));
    }

    #[test]
    fn test_hyperlinks_share_relationships() {
        let mut doc = DocxBuilder::new();
        doc.add_paragraph()
            .link("docs", "https://example.com", RunProps::default())
            .text(" and ")
            .link("again", "https://example.com", RunProps::default());
        let xml = doc.document_xml();
        assert_eq!(xml.matches(r#"<w:hyperlink r:id="rId4">"#).count(), 2);
        assert!(xml.contains(r#"<w:rStyle w:val="Hyperlink"/>"#));

        let rels = read_part(&doc.to_bytes().unwrap(), "word/_rels/document.xml.rels");
        assert_eq!(rels.matches("TargetMode=\"External\"").count(), 1);
    }

    #[test]
    fn test_page_break_and_quote() {
        let mut doc = DocxBuilder::new();
        doc.add_quote(&[TextRun::plain("quoted")]);
        doc.add_page_break();
        let xml = doc.document_xml();
        assert!(xml.contains(r#"<w:pStyle w:val="Quote"/>"#));
        assert!(xml.contains(r#"<w:br w:type="page"/>"#));
    }

    #[test]
    fn test_add_picture_keeps_aspect_ratio() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("product.png");
        image::RgbImage::new(400, 200).save(&path).unwrap();

        let mut doc = DocxBuilder::new();
        doc.add_picture(&path, 3.0).unwrap().align(Alignment::Center);
        let xml = doc.document_xml();
        assert!(xml.contains(r#"<wp:extent cx="2743200" cy="1371600"/>"#));
        assert!(xml.contains(r#"<a:blip r:embed="rId4"/>"#));

        let bytes = doc.to_bytes().unwrap();
        assert!(part_names(&bytes).iter().any(|n| n == "word/media/image1.png"));
        let types = read_part(&bytes, "[Content_Types].xml");
        assert!(types.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
    }

    #[test]
    fn test_add_picture_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut doc = DocxBuilder::new();
        let err = doc.add_picture(&dir.path().join("nope.png"), 3.0).err();
        assert!(matches!(err, Some(Error::MissingInput(_))));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_add_picture_rejects_non_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, "not an image").unwrap();
        let mut doc = DocxBuilder::new();
        assert!(matches!(doc.add_picture(&path, 3.0), Err(Error::Docx(_))));
    }

    #[test]
    fn test_truncated_png_is_image_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\n\0\0").unwrap();
        assert!(matches!(crate::docx::read_image(&path), Err(Error::Image(_))));
    }

    #[test]
    fn test_apply_styles_reaches_styles_part() {
        let mut styles = BTreeMap::new();
        styles.insert("Heading 1".to_string(), DocxStyle { font: Some("Georgia".into()), ..Default::default() });
        let mut doc = DocxBuilder::new();
        doc.apply_styles(&styles).add_heading("Styled", 1);
        let xml = read_part(&doc.to_bytes().unwrap(), "word/styles.xml");
        assert!(xml.contains(r#"w:ascii="Georgia""#));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out/report.docx");
        let mut doc = DocxBuilder::new();
        doc.set_title("Report").add_paragraph().text("x");
        doc.save(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(read_part(&bytes, "docProps/core.xml").contains("<dc:title>Report</dc:title>"));
    }
}
