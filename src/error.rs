//! Crate-wide error type.
//!
//! Every command funnels its failure into one of these variants so the
//! top-level handler can tell a missing input apart from a converter crash
//! or an unwritable output directory.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("{tool} is not installed or not in PATH")]
    ToolNotFound { tool: String },

    #[error("{tool} failed ({status}): {stderr}")]
    ToolFailed { tool: String, status: String, stderr: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("docx error: {0}")]
    Docx(String),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid JSON data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

/// Attach a path to an `io::Result`.
pub trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}

impl From<handlebars::RenderError> for Error {
    fn from(e: handlebars::RenderError) -> Self {
        Error::Template(e.to_string())
    }
}

impl From<handlebars::TemplateError> for Error {
    fn from(e: handlebars::TemplateError) -> Self {
        Error::Template(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_message_names_path() {
        let err = Error::MissingInput(PathBuf::from("data/report.md"));
        assert_eq!(err.to_string(), "input not found: data/report.md");
    }

    #[test]
    fn test_io_context_keeps_path() {
        let res: std::io::Result<()> = Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
        let err = res.at("/readonly/out.docx").unwrap_err();
        assert!(err.to_string().starts_with("/readonly/out.docx"));
    }
}
