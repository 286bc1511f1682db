/// Template rendering
///
/// This module handles:
/// - Handlebars rendering of HTML templates in strict mode
/// - Placeholder substitution inside DOCX templates
/// - Reporting every undeclared variable before rendering
/// - Writing the starter templates for `init-templates`
///
/// # Module Organization
///
/// - `docx` - Run healing, block lifting and zip rewriting for `.docx` templates
/// - `samples` - Starter DOCX/HTML templates and their sample data
mod docx;
mod samples;

pub use docx::{prepare_part, render_docx_template, undeclared_docx_variables};
pub use samples::{init_templates, sample_data, BASIC_TEMPLATE, HTML_TEMPLATE, SAMPLE_DATA};

use crate::error::{Error, IoContext, Result};
use handlebars::{handlebars_helper, Handlebars};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::Path;

lazy_static! {
    static ref EXPRESSION: Regex = Regex::new(r"(?s)\{\{\{?(.*?)\}?\}\}").expect("valid regex");
    static ref NUMBER: Regex = Regex::new(r"^-?\d+(\.\d+)?$").expect("valid regex");
}

handlebars_helper!(upper: |s: str| s.to_uppercase());
handlebars_helper!(lower: |s: str| s.to_lowercase());
handlebars_helper!(replace: |s: str, from: str, to: str| s.replace(from, to));
handlebars_helper!(status_class_helper: |s: str| status_class(s));

/// CSS class for a status keyword used in report data
pub fn status_class(status: &str) -> &'static str {
    match status.trim().to_ascii_lowercase().as_str() {
        "excellent" | "outstanding" => "excellent",
        "good" | "positive" => "good",
        "poor" | "bad" | "negative" | "warning" | "critical" => "warning",
        "completed" | "done" => "status-completed",
        "in_progress" | "in progress" | "active" => "status-in_progress",
        "planning" | "planned" => "status-planning",
        _ => "neutral",
    }
}

/// Registry with strict mode and the report helpers. `eq` is built in.
pub(crate) fn registry(escape: fn(&str) -> String) -> Handlebars<'static> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);
    hb.register_escape_fn(escape);
    hb.register_helper("upper", Box::new(upper));
    hb.register_helper("lower", Box::new(lower));
    hb.register_helper("replace", Box::new(replace));
    hb.register_helper("status_class", Box::new(status_class_helper));
    hb
}

/// Render an HTML template held in memory
pub fn render_html_str(src: &str, data: &Value) -> Result<String> {
    let missing = undeclared_variables(src, data);
    if !missing.is_empty() {
        return Err(undeclared_error(&missing));
    }
    Ok(registry(handlebars::html_escape).render_template(src, data)?)
}

pub fn render_html_template(template: &Path, data: &Value) -> Result<String> {
    if !template.is_file() {
        return Err(Error::MissingInput(template.to_path_buf()));
    }
    let src = fs::read_to_string(template).at(template)?;
    render_html_str(&src, data)
}

/// Read a JSON data file
pub fn load_data(path: &Path) -> Result<Value> {
    if !path.is_file() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).at(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub(crate) fn undeclared_error(missing: &[String]) -> Error {
    Error::Template(format!("undeclared variables in template: {}", missing.join(", ")))
}

/// List simple `{{path}}` references that cannot be resolved in `data`.
///
/// Best effort: `#each` scopes to the first element of the array, `#with`
/// to the named object, and anything under an empty or unknown scope is
/// not checked. Arguments of `#if`/`#unless` are allowed to be missing.
pub fn undeclared_variables(src: &str, data: &Value) -> Vec<String> {
    let mut scopes: Vec<Option<&Value>> = vec![Some(data)];
    let mut missing: Vec<String> = Vec::new();

    for cap in EXPRESSION.captures_iter(src) {
        let expr = cap[1].trim_matches(|c: char| c == '~' || c.is_whitespace());
        let scope = scopes.last().copied().flatten();

        if let Some(block) = expr.strip_prefix('#') {
            let mut parts = block.split_whitespace();
            let helper = parts.next().unwrap_or_default();
            let arg = parts.next();
            let pushed = match (helper, arg) {
                ("each", Some(path)) | ("with", Some(path)) => match scope {
                    Some(ctx) if is_path(path) => match resolve(ctx, path) {
                        Some(Value::Array(items)) => items.first(),
                        Some(value) if helper == "with" => Some(value),
                        Some(_) => None,
                        None => {
                            missing.push(path.to_string());
                            None
                        }
                    },
                    _ => None,
                },
                _ => scope,
            };
            scopes.push(pushed);
            continue;
        }
        if expr.starts_with('/') {
            if scopes.len() > 1 {
                scopes.pop();
            }
            continue;
        }
        if expr.is_empty() || expr.starts_with(['!', '>', '^']) || expr == "else" || expr.starts_with("else ") {
            continue;
        }

        let Some(ctx) = scope else { continue };
        let mut tokens = expr.split_whitespace();
        let first = tokens.next().unwrap_or_default();
        // A bare path, or a helper call whose arguments are paths
        let paths: Vec<&str> = if tokens.clone().next().is_none() { vec![first] } else { tokens.collect() };
        for path in paths {
            if is_path(path) && resolve(ctx, path).is_none() {
                missing.push(path.to_string());
            }
        }
    }

    missing.sort();
    missing.dedup();
    missing
}

/// True for references worth checking: not literals, data variables or parent paths
fn is_path(token: &str) -> bool {
    !(token.is_empty()
        || token.starts_with(['"', '\'', '@', '(', '.'])
        || token.contains('=')
        || token.contains('(')
        || token.contains(')')
        || token == "this"
        || token == "true"
        || token == "false"
        || token == "null"
        || NUMBER.is_match(token))
}

fn resolve<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("this.").unwrap_or(path);
    path.split('.').try_fold(ctx, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_html_with_helpers() {
        let data = json!({"name": "Revenue", "status": "in_progress", "n": 2});
        let out = render_html_str(
            r#"<p class="{{status_class status}}">{{upper name}} {{replace status "_" " "}}{{#if (eq n 2)}} two{{/if}}</p>"#,
            &data,
        )
        .unwrap();
        assert_eq!(out, r#"<p class="status-in_progress">REVENUE in progress two</p>"#);
    }

    #[test]
    fn test_html_values_are_escaped() {
        let out = render_html_str("{{v}}", &json!({"v": "<b>&</b>"})).unwrap();
        assert_eq!(out, "&lt;b&gt;&amp;&lt;/b&gt;");
    }

    #[test]
    fn test_missing_variable_is_named() {
        let err = render_html_str("{{report.title}} {{company.name}}", &json!({"report": {}})).unwrap_err();
        match err {
            Error::Template(msg) => {
                assert!(msg.contains("company.name"), "{}", msg);
                assert!(msg.contains("report.title"), "{}", msg);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_undeclared_variables_follow_each_scope() {
        let data = json!({
            "title": "T",
            "rows": [{"region": "North"}],
            "empty": []
        });
        let src = "{{title}} {{#each rows}}{{region}} {{revenue}} {{@index}} {{this.region}}{{/each}}\
                   {{#each empty}}{{anything}}{{/each}}{{#if flag}}{{missing_in_if}}{{/if}}{{! comment }}";
        assert_eq!(undeclared_variables(src, &data), vec!["missing_in_if", "revenue"]);
    }

    #[test]
    fn test_undeclared_missing_each_source() {
        let src = "{{#each sections}}{{title}}{{/each}}";
        assert_eq!(undeclared_variables(src, &json!({})), vec!["sections"]);
    }

    #[test]
    fn test_helper_arguments_are_checked() {
        let src = r#"{{upper name}} {{replace status "_" " "}}"#;
        assert_eq!(undeclared_variables(src, &json!({"name": "x"})), vec!["status"]);
    }

    #[test]
    fn test_status_class() {
        assert_eq!(status_class("Excellent"), "excellent");
        assert_eq!(status_class("completed"), "status-completed");
        assert_eq!(status_class("whatever"), "neutral");
    }

    #[test]
    fn test_render_html_template_missing_file() {
        let err = render_html_template(Path::new("/nonexistent/t.html"), &json!({})).unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }
}
