//! YAML front matter handling for Markdown sources.

use log::debug;
use std::collections::BTreeMap;

/// Metadata carried in a document's front matter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub extra: BTreeMap<String, String>,
}

/// Split a document into `(front_matter, body)`.
///
/// Front matter starts at a first non-blank line of `---` and ends at the next
/// `---` line. Without a closing delimiter everything after the opening line
/// is treated as body.
pub fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let trimmed = content.trim_start_matches(['\n', '\r', ' ', '\t']);
    let Some(rest) = trimmed.strip_prefix("---") else {
        return (None, content);
    };
    // The opening delimiter must be alone on its line
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    (None, rest)
}

/// Parse front matter into [`Metadata`].
///
/// Falls back to a line-wise `key: value` scan when the block is not valid YAML.
pub fn parse_front_matter(yaml: &str) -> Metadata {
    let pairs = match serde_yaml::from_str::<BTreeMap<String, serde_yaml::Value>>(yaml) {
        Ok(map) => map.into_iter().map(|(k, v)| (k, yaml_scalar(&v))).collect::<Vec<_>>(),
        Err(e) => {
            debug!("front matter is not valid YAML ({}), using key: value scan", e);
            yaml.lines()
                .filter_map(|line| line.split_once(':'))
                .map(|(k, v)| (k.trim().to_string(), unquote(v.trim()).to_string()))
                .filter(|(k, _)| !k.is_empty())
                .collect()
        }
    };

    let mut meta = Metadata::default();
    for (key, value) in pairs {
        match key.as_str() {
            "title" => meta.title = Some(value),
            "author" => meta.author = Some(value),
            "date" => meta.date = Some(value),
            _ => {
                meta.extra.insert(key, value);
            }
        }
    }
    meta
}

/// Convenience: split and parse in one step
pub fn extract(content: &str) -> (Metadata, &str) {
    match split_front_matter(content) {
        (Some(yaml), body) => (parse_front_matter(yaml), body),
        (None, body) => (Metadata::default(), body),
    }
}

fn yaml_scalar(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(other).map(|s| s.trim().to_string()).unwrap_or_default(),
    }
}

fn unquote(v: &str) -> &str {
    v.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_with_front_matter() {
        let doc = "---\ntitle: \"Sample Report\"\nauthor: Batch\n---\n\n# Body\n";
        let (fm, body) = split_front_matter(doc);
        assert_eq!(fm, Some("title: \"Sample Report\"\nauthor: Batch\n"));
        assert_eq!(body, "\n# Body\n");
    }

    #[test]
    fn test_split_tolerates_leading_blank_lines() {
        let doc = "\n---\ntitle: x\n---\nbody";
        let (fm, body) = split_front_matter(doc);
        assert_eq!(fm, Some("title: x\n"));
        assert_eq!(body, "body");
    }

    #[test]
    fn test_split_without_front_matter() {
        let doc = "# Title\n\n---\n\ntext";
        let (fm, body) = split_front_matter(doc);
        assert!(fm.is_none());
        assert_eq!(body, doc);
    }

    #[test]
    fn test_split_unclosed_front_matter_keeps_remainder() {
        let (fm, body) = split_front_matter("---\ntitle: x\nbody text");
        assert!(fm.is_none());
        assert_eq!(body, "title: x\nbody text");
    }

    #[test]
    fn test_parse_known_keys() {
        let meta = parse_front_matter("title: \"Complex Technical Report\"\nauthor: Advanced Systems\ndate: 2024\nlang: it\n");
        assert_eq!(meta.title.as_deref(), Some("Complex Technical Report"));
        assert_eq!(meta.author.as_deref(), Some("Advanced Systems"));
        assert_eq!(meta.date.as_deref(), Some("2024"));
        assert_eq!(meta.extra.get("lang").map(String::as_str), Some("it"));
    }

    #[test]
    fn test_parse_falls_back_on_invalid_yaml() {
        let meta = parse_front_matter("title: Report: Q3\n  bad: [indent\n");
        assert_eq!(meta.title.as_deref(), Some("Report: Q3"));
    }
}
