//! HTML report rendering

use super::{ReportTable, REPORT_TITLE, STATUS_COLUMN};
use crate::models::{RecordStatus, ValidatedRecord};

const REPORT_STYLE: &str = "body{font-family:Arial,sans-serif;margin:20px;}\
table{width:100%;border-collapse:collapse;}th,td{border:1px solid #ddd;padding:8px;}\
th{background-color:#f2f2f2;}.status-ok{color:green;}.status-error{color:red;}";

/// Escape text for use in HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// CSS class for a status cell
pub fn status_class(status: RecordStatus) -> &'static str {
    match status {
        RecordStatus::Ok => "status-ok",
        RecordStatus::NotOk => "status-error",
    }
}

/// `<table>` element listing the records
pub fn render_records_table(records: &[ValidatedRecord]) -> String {
    let table = ReportTable::from_records(records);
    let mut html = String::from("<table><thead><tr>");

    for header in table.headers {
        html.push_str("<th>");
        html.push_str(&escape_html(header));
        html.push_str("</th>");
    }
    html.push_str("</tr></thead><tbody>");

    for row in &table.rows {
        html.push_str("<tr>");
        for (col, text) in row.cells.iter().enumerate() {
            if col == STATUS_COLUMN {
                html.push_str("<td class=\"");
                html.push_str(status_class(row.status));
                html.push_str("\">");
            } else {
                html.push_str("<td>");
            }
            html.push_str(&escape_html(text));
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }

    html.push_str("</tbody></table>");
    html
}

/// Complete standalone HTML report document
pub fn render_html_report(records: &[ValidatedRecord]) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"UTF-8\"><title>{title}</title>\
<style>{style}</style></head><body><h1>{title}</h1>{table}</body></html>",
        title = REPORT_TITLE,
        style = REPORT_STYLE,
        table = render_records_table(records),
    )
}
