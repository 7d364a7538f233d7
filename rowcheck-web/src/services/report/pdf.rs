//! PDF report rendering
//!
//! Fixed A4 portrait layout using the built-in Helvetica fonts, so no font
//! files are needed. Every page repeats the title and the header row. The
//! document carries no creation date or id, so identical records give
//! identical bytes.
//!
//! Built-in fonts only cover WinAnsi; characters outside Latin-1 are drawn
//! as `?`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use thiserror::Error;

use super::{ReportRow, ReportTable, REPORT_TITLE, STATUS_COLUMN};
use crate::models::{RecordStatus, ValidatedRecord};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 40;
const TITLE_SIZE: i64 = 14;
const FONT_SIZE: i64 = 8;
const ROW_HEIGHT: i64 = 16;
const TEXT_INSET: i64 = 3;
const TABLE_TOP: i64 = PAGE_HEIGHT - MARGIN - TITLE_SIZE - 18;
const COLUMN_WIDTHS: [i64; 6] = [130, 62, 52, 58, 48, 165];

/// Data rows per page (one line is taken by the repeated header)
pub const ROWS_PER_PAGE: usize = ((TABLE_TOP - MARGIN) / ROW_HEIGHT - 1) as usize;

#[derive(Debug, Error)]
#[error("failed to render PDF: {0}")]
pub struct PdfError(String);

/// Render records as a PDF document
pub fn render_pdf(records: &[ValidatedRecord]) -> Result<Vec<u8>, PdfError> {
    let table = ReportTable::from_records(records);
    let chunks: Vec<&[ReportRow]> = if table.rows.is_empty() {
        vec![&table.rows[..]]
    } else {
        table.rows.chunks(ROWS_PER_PAGE).collect()
    };
    let page_count = chunks.len();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_dictionary("Helvetica"));
    let bold_id = doc.add_object(font_dictionary("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut page_ids: Vec<ObjectId> = Vec::with_capacity(page_count);
    for (index, rows) in chunks.iter().enumerate() {
        let content = Content {
            operations: page_operations(&table, rows, index + 1, page_count),
        };
        let encoded = content.encode().map_err(|e| PdfError(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<Object>>(),
        "Count" => page_count as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![Object::Integer(0), Object::Integer(0), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| PdfError(e.to_string()))?;
    Ok(bytes)
}

fn font_dictionary(base_font: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn page_operations(
    table: &ReportTable,
    rows: &[ReportRow],
    page_number: usize,
    page_count: usize,
) -> Vec<Operation> {
    let mut ops = Vec::new();

    let title = format!("{} (page {} of {})", REPORT_TITLE, page_number, page_count);
    push_text(&mut ops, "F2", TITLE_SIZE, MARGIN, PAGE_HEIGHT - MARGIN - TITLE_SIZE, &title);

    // Header row on a light grey band
    let header_top = TABLE_TOP;
    ops.push(Operation::new("g", vec![Object::Real(0.95)]));
    ops.push(rect(MARGIN, header_top - ROW_HEIGHT, COLUMN_WIDTHS.iter().sum(), ROW_HEIGHT));
    ops.push(Operation::new("f", vec![]));
    ops.push(Operation::new("g", vec![0.into()]));
    push_row(&mut ops, header_top, "F2", table.headers.iter().map(|h| h.to_string()), None);

    for (index, row) in rows.iter().enumerate() {
        let top = header_top - ROW_HEIGHT * (index as i64 + 1);
        push_row(&mut ops, top, "F1", row.cells.iter().cloned(), Some(row.status));
    }

    ops
}

fn push_row(
    ops: &mut Vec<Operation>,
    top: i64,
    font: &str,
    cells: impl Iterator<Item = String>,
    status: Option<RecordStatus>,
) {
    let mut x = MARGIN;
    for (col, (text, width)) in cells.zip(COLUMN_WIDTHS).enumerate() {
        ops.push(rect(x, top - ROW_HEIGHT, width, ROW_HEIGHT));
        ops.push(Operation::new("S", vec![]));

        let colored = match status {
            Some(status) if col == STATUS_COLUMN => {
                ops.push(status_color(status));
                true
            }
            _ => false,
        };

        let fitted = fit_to_width(&text, width);
        push_text(ops, font, FONT_SIZE, x + TEXT_INSET, top - ROW_HEIGHT + 5, &fitted);

        if colored {
            ops.push(Operation::new("g", vec![0.into()]));
        }
        x += width;
    }
}

fn status_color(status: RecordStatus) -> Operation {
    let (r, g, b) = match status {
        RecordStatus::Ok => (0.0, 0.5, 0.0),
        RecordStatus::NotOk => (0.8, 0.0, 0.0),
    };
    Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)])
}

fn rect(x: i64, y: i64, width: i64, height: i64) -> Operation {
    Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()])
}

fn push_text(ops: &mut Vec<Operation>, font: &str, size: i64, x: i64, y: i64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(win_ansi_bytes(text), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

/// Truncate text so it fits a column, using an average glyph width of half
/// the font size
fn fit_to_width(text: &str, width: i64) -> String {
    let max_chars = ((width - 2 * TEXT_INSET) * 2 / FONT_SIZE).max(1) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch as u32 {
            0x20..=0x7E | 0xA0..=0xFF => ch as u32 as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn records(count: usize) -> Vec<ValidatedRecord> {
        (0..count)
            .map(|i| {
                if i % 2 == 0 {
                    ValidatedRecord::valid(
                        format!("Person {}", i),
                        NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
                        crate::models::Age { years: 44, months: 4 },
                    )
                } else {
                    ValidatedRecord::invalid(format!("Person {}", i), None, "missing birth date")
                }
            })
            .collect()
    }

    #[test]
    fn test_output_is_pdf() {
        let bytes = render_pdf(&records(3)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let first = render_pdf(&records(60)).unwrap();
        let second = render_pdf(&records(60)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_page_count() {
        let doc = Document::load_mem(&render_pdf(&records(0)).unwrap()).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let doc = Document::load_mem(&render_pdf(&records(ROWS_PER_PAGE)).unwrap()).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let doc = Document::load_mem(&render_pdf(&records(ROWS_PER_PAGE + 1)).unwrap()).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_fit_to_width_truncates_long_text() {
        let long = "x".repeat(200);
        let fitted = fit_to_width(&long, 62);
        assert!(fitted.ends_with("..."));
        assert!(fitted.chars().count() < 200);
        assert_eq!(fit_to_width("short", 130), "short");
    }

    #[test]
    fn test_non_latin_text_is_replaced() {
        assert_eq!(win_ansi_bytes("Ab\u{e9}"), vec![b'A', b'b', 0xE9]);
        assert_eq!(win_ansi_bytes("\u{418}\u{432}"), b"??".to_vec());
    }
}
