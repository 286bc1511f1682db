//! Starter templates written by `init-templates`.

use crate::docx::{DocxBuilder, TextRun};
use crate::error::{IoContext, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const BASIC_TEMPLATE: &str = "basic_template.docx";
pub const HTML_TEMPLATE: &str = "report_template.html";
pub const SAMPLE_DATA: &str = "report_data.json";

/// DOCX template with placeholders, a paragraph loop and a table row loop.
/// Every tag is written as a single run.
pub fn basic_template() -> DocxBuilder {
    let mut doc = DocxBuilder::new();
    doc.set_title("Report template");

    doc.add_heading("{{report_title}}", 1);
    doc.add_paragraph().text("Company: {{company_name}}");
    doc.add_paragraph().text("Date: {{publication_date}}\tVersion: {{version}}");

    doc.add_heading("Executive Summary", 2);
    doc.add_paragraph().text("{{executive_summary}}");
    doc.add_heading("Introduction", 2);
    doc.add_paragraph().text("{{introduction}}");

    doc.add_heading("Overview", 2);
    doc.add_paragraph().text("{{#each sections}}");
    doc.add_heading("{{title}}", 3);
    doc.add_paragraph().text("{{content}}");
    doc.add_paragraph().text("{{/each}}");

    doc.add_heading("Sales Details by Region", 2);
    let cells = |texts: [&str; 3]| texts.iter().map(|t| vec![TextRun::plain(*t)]).collect::<Vec<_>>();
    doc.add_table(
        cells(["Region", "Revenue (k€)", "Change vs Q2"]),
        vec![
            cells(["{{#each sales_by_region}}", "", ""]),
            cells(["{{region}}", "{{revenue_k_eur}}", "{{change_vs_q2}}"]),
            cells(["{{/each}}", "", ""]),
        ],
    );

    doc.add_heading("Key Achievements", 2);
    doc.add_paragraph().text("{{#each key_achievements}}");
    doc.add_list_item(&[TextRun::plain("{{this}}")], false, 0);
    doc.add_paragraph().text("{{/each}}");

    doc.add_heading("Conclusion", 2);
    doc.add_paragraph().text("{{conclusion}}");
    doc
}

/// Data for both starter templates
pub fn sample_data() -> Value {
    json!({
        "report_title": "Quarterly Business Report",
        "company_name": "TechCorp Solutions",
        "publication_date": "2024-10-15",
        "version": "1.2",
        "executive_summary": "Revenue grew across every region in Q3, led by strong demand in the North.",
        "introduction": "This report summarises the commercial results of the third quarter.",
        "sections": [
            {"title": "Market", "content": "Demand remained stable with a modest increase in new customers."},
            {"title": "Operations", "content": "Delivery times improved after the warehouse consolidation."}
        ],
        "sales_by_region": [
            {"region": "North", "revenue_k_eur": 1250, "change_vs_q2": "+12.5%"},
            {"region": "Centre", "revenue_k_eur": 980, "change_vs_q2": "+4.1%"},
            {"region": "South", "revenue_k_eur": 720, "change_vs_q2": "-1.3%"}
        ],
        "key_achievements": [
            "Launched the new customer portal",
            "Reduced support response time by 30%",
            "Signed two strategic partnerships"
        ],
        "conclusion": "The outlook for Q4 is positive.",
        "company": {
            "name": "TechCorp Solutions",
            "address": "123 Business St, Tech City, TC 12345",
            "phone": "(555) 123-4567",
            "email": "info@techcorp.com"
        },
        "report": {
            "title": "Monthly Performance Report",
            "period": "November 2024",
            "generated_date": "December 1, 2024",
            "author": "Sarah Johnson",
            "version": "1.0"
        },
        "metrics": [
            {"name": "Revenue", "value": "$1,250,000", "change": "+12.5%", "status": "excellent"},
            {"name": "Active Users", "value": "45,230", "change": "+8.3%", "status": "good"},
            {"name": "Conversion Rate", "value": "3.2%", "change": "-0.1%", "status": "neutral"},
            {"name": "Customer Satisfaction", "value": "4.8/5", "change": "+0.2", "status": "excellent"}
        ],
        "projects": [
            {"name": "E-commerce Platform Redesign", "status": "completed", "completion_date": "Nov 15, 2024",
             "budget": "$180,000", "actual_cost": "$165,000", "roi": "340%"},
            {"name": "Mobile App Development", "status": "in_progress", "completion_date": "Jan 30, 2025",
             "budget": "$250,000", "actual_cost": "$198,000", "roi": "N/A"},
            {"name": "Data Analytics Dashboard", "status": "planning", "completion_date": "Mar 15, 2025",
             "budget": "$95,000", "actual_cost": "$0", "roi": "N/A"}
        ]
    })
}

pub const REPORT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{{report.title}}</title>
    <style>
        @page {
            size: A4;
            margin: 2.5cm 2cm 2cm 2cm;
            @top-right { content: "{{report.title}} - {{report.period}}"; font-size: 9pt; color: #666; }
            @bottom-center { content: "Page " counter(page) " of " counter(pages); font-size: 9pt; color: #666; }
        }
        body { font-family: 'Calibri', 'Arial', sans-serif; font-size: 11pt; line-height: 1.4; color: #333; }
        .header { border-bottom: 3px solid #2c3e50; padding-bottom: 20pt; margin-bottom: 30pt; }
        .company-name { font-size: 24pt; font-weight: bold; color: #2c3e50; }
        .report-info { text-align: right; font-size: 10pt; color: #666; }
        .report-title { font-size: 18pt; color: #34495e; margin: 15pt 0; }
        .section { margin-bottom: 25pt; page-break-inside: avoid; }
        .section h2 { font-size: 14pt; color: #2c3e50; border-bottom: 1px solid #bdc3c7; padding-bottom: 5pt; }
        table { width: 100%; border-collapse: collapse; margin: 20pt 0; }
        td, th { border: 1px solid #ddd; padding: 8pt; vertical-align: top; }
        th { background: #f8f9fa; text-align: left; }
        .metric-value { font-size: 16pt; font-weight: bold; }
        .badge { display: inline-block; padding: 2pt 6pt; border-radius: 3pt; font-size: 8pt; font-weight: bold; }
        .excellent, .status-completed { background: #d4edda; color: #155724; }
        .good { background: #d1ecf1; color: #0c5460; }
        .neutral, .status-planning { background: #fff3cd; color: #856404; }
        .warning { background: #f8d7da; color: #721c24; }
        .status-in_progress { background: #cce7ff; color: #004085; }
        .footer { margin-top: 40pt; padding-top: 15pt; border-top: 1px solid #bdc3c7; text-align: center; font-size: 9pt; color: #666; }
    </style>
</head>
<body>
    <div class="header">
        <div class="company-name">{{company.name}}</div>
        <div class="report-info">
            Report Period: {{report.period}}<br>
            Generated: {{report.generated_date}}<br>
            Version: {{report.version}}
        </div>
        <div class="report-title">{{report.title}}</div>
    </div>

    <div class="section">
        <h2>Executive Summary</h2>
        <p>This report provides an overview of {{company.name}}'s performance during {{report.period}}.</p>
    </div>

    <div class="section">
        <h2>Key Performance Indicators</h2>
        <table>
            <tr>
                {{#each metrics}}
                <td>
                    <div>{{upper name}}</div>
                    <div class="metric-value">{{value}}</div>
                    <span class="badge {{status_class status}}">{{change}}</span>
                </td>
                {{/each}}
            </tr>
        </table>
    </div>

    <div class="section">
        <h2>Project Portfolio</h2>
        <table>
            <tr><th>Project Name</th><th>Status</th><th>Completion Date</th><th>Budget</th><th>Actual Cost</th><th>ROI</th></tr>
            {{#each projects}}
            <tr>
                <td>{{name}}</td>
                <td><span class="badge {{status_class status}}">{{replace status "_" " "}}</span></td>
                <td>{{completion_date}}</td>
                <td>{{budget}}</td>
                <td>{{actual_cost}}</td>
                <td>{{roi}}</td>
            </tr>
            {{/each}}
        </table>
    </div>

    <div class="footer">
        <div>{{company.name}} | {{company.address}}</div>
        <div>{{company.phone}} | {{company.email}}</div>
        <div>Author: {{report.author}}</div>
    </div>
</body>
</html>
"#;

/// Write the starter templates and sample data into `dir`
pub fn init_templates(dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).at(dir)?;

    let docx = dir.join(BASIC_TEMPLATE);
    basic_template().save(&docx)?;

    let html = dir.join(HTML_TEMPLATE);
    fs::write(&html, REPORT_HTML).at(&html)?;

    let data = dir.join(SAMPLE_DATA);
    let text = serde_json::to_string_pretty(&sample_data())?;
    fs::write(&data, text).at(&data)?;

    Ok(vec![docx, html, data])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::extract_main_xml;
    use crate::template::{load_data, render_docx_template, render_html_template, undeclared_variables};
    use tempfile::TempDir;

    #[test]
    fn test_starter_templates_render_with_sample_data() {
        let dir = TempDir::new().unwrap();
        let written = init_templates(dir.path()).unwrap();
        assert_eq!(written.len(), 3);

        let data = load_data(&dir.path().join(SAMPLE_DATA)).unwrap();

        let html = render_html_template(&dir.path().join(HTML_TEMPLATE), &data).unwrap();
        assert!(html.contains("<title>Monthly Performance Report</title>"));
        assert!(html.contains("REVENUE"));
        assert!(html.contains(r#"class="badge status-in_progress">in progress</span>"#));

        let out = dir.path().join("report.docx");
        render_docx_template(&dir.path().join(BASIC_TEMPLATE), &data, &out).unwrap();
        let xml = extract_main_xml(&out).unwrap();
        assert!(xml.contains("Quarterly Business Report"));
        assert!(xml.contains("Operations"));
        assert!(xml.contains("Centre"));
        assert!(xml.contains("Signed two strategic partnerships"));
        assert!(!xml.contains("{{"));
    }

    #[test]
    fn test_html_template_declares_everything_it_uses() {
        assert!(undeclared_variables(REPORT_HTML, &sample_data()).is_empty());
    }
}
