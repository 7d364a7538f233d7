//! UI Routes - HTML pages for the rowcheck web interface

use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use crate::models::{Task, TaskStatus, ValidatedRecord};
use crate::services::report::html::escape_html;
use crate::services::report::render_records_table;
use crate::AppState;

/// Seconds between automatic reloads of an unfinished status page
const REFRESH_SECONDS: u32 = 2;

const PAGE_STYLE: &str = r#"
        body {
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 960px;
            margin: 40px auto;
            padding: 20px;
            line-height: 1.6;
        }
        h1 {
            color: #333;
            border-bottom: 2px solid #0066cc;
            padding-bottom: 10px;
        }
        .button {
            display: inline-block;
            padding: 10px 20px;
            background: #0066cc;
            color: white;
            text-decoration: none;
            border: none;
            border-radius: 4px;
            margin: 10px 5px 10px 0;
            cursor: pointer;
        }
        .button:hover {
            background: #0052a3;
        }
        .error {
            color: #b00020;
            background: #fdecea;
            padding: 10px;
            border-radius: 4px;
        }
        table { width: 100%; border-collapse: collapse; }
        th, td { border: 1px solid #ddd; padding: 8px; }
        th { background-color: #f2f2f2; }
        .status-ok { color: green; }
        .status-error { color: red; }
"#;

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new().route("/", get(root_page))
}

/// GET / - upload form
async fn root_page() -> impl IntoResponse {
    Html(upload_page(None))
}

fn layout(title: &str, head_extra: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    {head_extra}
    <title>{title}</title>
    <style>{style}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        head_extra = head_extra,
        style = PAGE_STYLE,
        body = body,
    )
}

/// Upload form, optionally showing why the previous attempt was rejected
pub fn upload_page(error: Option<&str>) -> String {
    let error_block = error
        .map(|msg| format!(r#"<p class="error">{}</p>"#, escape_html(msg)))
        .unwrap_or_default();

    let body = format!(
        r#"    <h1>Row Check</h1>
    <p>Upload an .xlsx file with a full name in column A and a birth date in column B.
    The first row is treated as a header.</p>
    {error_block}
    <form action="/upload" method="post" enctype="multipart/form-data">
        <input type="file" name="file" accept=".xlsx">
        <button type="submit" class="button">Upload</button>
    </form>
    <p><small>rowcheck v{version}</small></p>"#,
        error_block = error_block,
        version = env!("CARGO_PKG_VERSION"),
    );

    layout("Row Check - Upload", "", &body)
}

/// Processed rows of a completed task, or why they could not be shown
pub enum StatusRows<'a> {
    NotReady,
    Records(&'a [ValidatedRecord]),
    Unavailable(&'a str),
}

/// Status page for one task
pub fn status_page(task: &Task, rows: StatusRows<'_>) -> String {
    let id = task.task_id;
    let refresh = if task.is_terminal() {
        String::new()
    } else {
        format!(r#"<meta http-equiv="refresh" content="{}">"#, REFRESH_SECONDS)
    };

    let mut body = format!(
        r#"    <h1>Task status</h1>
    <p>Task: <code>{id}</code><br>
    File: {filename}<br>
    Status: <strong>{status}</strong></p>
"#,
        id = id,
        filename = escape_html(&task.original_filename),
        status = task.status,
    );

    match task.status {
        TaskStatus::Pending | TaskStatus::Processing => {
            body.push_str("    <p>Processing, this page refreshes automatically.</p>\n");
        }
        TaskStatus::Failed => {
            body.push_str(&format!(
                "    <p class=\"error\">{}</p>\n",
                escape_html(task.error_details.as_deref().unwrap_or("processing failed"))
            ));
        }
        TaskStatus::Completed => {
            body.push_str(&format!(
                r#"    <p>
        <a class="button" href="/download/xlsx?taskId={id}">Download spreadsheet</a>
        <a class="button" href="/download/pdf?taskId={id}">Download PDF</a>
        <a class="button" href="/view/pdf?taskId={id}">View PDF</a>
        <a class="button" href="/report/html?taskId={id}">HTML report</a>
    </p>
"#,
                id = id
            ));
            match rows {
                StatusRows::Records(records) => body.push_str(&render_records_table(records)),
                StatusRows::Unavailable(msg) => body.push_str(&format!(
                    "    <p class=\"error\">{}</p>\n",
                    escape_html(msg)
                )),
                StatusRows::NotReady => {}
            }
        }
    }

    body.push_str("\n    <p><a href=\"/\">Upload another file</a></p>");
    layout("Row Check - Status", &refresh, &body)
}
