//! Sample Markdown documents used by the default batch plan.

use crate::error::{IoContext, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const SAMPLE_REPORT: &str = r#"---
title: "Sample Report"
author: "Batch Processing System"
date: "2024"
---

# Sample Report

This is a sample document for batch conversion testing.

## Section 1

Content for section 1.

## Section 2

Content for section 2.

### Subsection

More detailed content.
"#;

pub const COMPLEX_REPORT: &str = r#"---
title: "Complex Technical Report"
author: "Advanced Systems"
date: "2024"
---

# Complex Technical Report

## Introduction

This report covers advanced technical topics.

## Technical Details

### Architecture

The system architecture includes multiple components:

1. Input data loader
2. Template processor
   - Markdown front matter
   - Style configuration
3. Format converter

### Implementation

Implementation details are provided below.

```python
def hello_world():
    print("Hello, World!")
    return True
```

## Results

| Metric     | Before | After  |
|------------|--------|--------|
| Throughput | 120/s  | 310/s  |
| Latency    | 85 ms  | 32 ms  |

> Results show significant improvements.
"#;

/// `(file name, content)` for every sample document
pub const SAMPLES: [(&str, &str); 2] = [("sample_report.md", SAMPLE_REPORT), ("complex_report.md", COMPLEX_REPORT)];

/// Write the sample documents into `dir`
pub fn write_samples(dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).at(dir)?;
    SAMPLES
        .iter()
        .map(|(name, content)| {
            let path = dir.join(name);
            fs::write(&path, content).at(&path)?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{default_plan, expand_jobs};
    use crate::frontmatter;
    use tempfile::TempDir;

    #[test]
    fn test_samples_feed_the_default_plan() {
        let dir = TempDir::new().unwrap();
        let written = write_samples(&dir.path().join("markdown")).unwrap();
        assert_eq!(written.len(), 2);

        let (jobs, skipped) = expand_jobs(&default_plan(&dir.path().join("markdown")), &dir.path().join("build"));
        assert_eq!(jobs.len(), 6);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_samples_have_titles() {
        for (_, content) in SAMPLES {
            let (meta, body) = frontmatter::extract(content);
            assert!(meta.title.is_some());
            assert!(body.trim_start().starts_with("# "));
        }
    }
}
