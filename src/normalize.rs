//! Golden-file normalisation of `word/document.xml`.
//!
//! Word and the DOCX writer stamp revision ids and drawing ids that change
//! between runs; stripping them leaves XML that can be compared byte for byte.

use crate::error::{Error, IoContext, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const VOLATILE_PATTERNS: &[&str] = &[
    r#"w:rsid[A-Za-z]*="[^"]+""#,
    r#"w14:paraId="[^"]+""#,
    r#"w14:textId="[^"]+""#,
    r#"w:paraId="[^"]+""#,
    r#"w:paraIdDel="[^"]+""#,
    r#"w:paraIdParent="[^"]+""#,
    r#"wp:docPr\s+id="[^"]+""#,
    r#"pic:cNvPr\s+id="[^"]+""#,
    r#"cx:uid="[^"]+""#,
];

lazy_static! {
    static ref VOLATILE: Vec<Regex> =
        VOLATILE_PATTERNS.iter().map(|p| Regex::new(p).expect("valid volatile pattern")).collect();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// Strip volatile attributes, collapse whitespace and trim
pub fn normalize_xml(xml: &str) -> String {
    let mut out = xml.to_string();
    for re in VOLATILE.iter() {
        out = re.replace_all(&out, "").into_owned();
    }
    WHITESPACE.replace_all(&out, " ").trim().to_string()
}

/// Read `word/document.xml` out of a `.docx`
pub fn extract_main_xml(docx: &Path) -> Result<String> {
    if !docx.exists() {
        return Err(Error::MissingInput(docx.to_path_buf()));
    }
    let file = File::open(docx).at(docx)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entry = archive.by_name("word/document.xml")?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).at(docx)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn normalize_docx(docx: &Path) -> Result<String> {
    Ok(normalize_xml(&extract_main_xml(docx)?))
}

/// Result of comparing a document against its golden file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoldenStatus {
    Matches,
    /// Update was requested and the golden file was written
    Written,
    /// No golden file and no update requested
    Missing,
    Differs { expected_len: usize, actual_len: usize, first_difference: usize },
}

/// Compare normalised XML with `golden`, writing it when `update` is set
pub fn check_golden(normalized: &str, golden: &Path, update: bool) -> Result<GoldenStatus> {
    if !update && !golden.exists() {
        return Ok(GoldenStatus::Missing);
    }
    if update {
        if let Some(parent) = golden.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).at(parent)?;
        }
        std::fs::write(golden, normalized).at(golden)?;
        return Ok(GoldenStatus::Written);
    }

    let expected = std::fs::read_to_string(golden).at(golden)?;
    if expected == normalized {
        return Ok(GoldenStatus::Matches);
    }
    let first_difference = expected
        .bytes()
        .zip(normalized.bytes())
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| expected.len().min(normalized.len()));
    Ok(GoldenStatus::Differs { expected_len: expected.len(), actual_len: normalized.len(), first_difference })
}
