//! Spreadsheet codec for roster import and export
//!
//! Reading accepts any workbook format calamine detects (xlsx, xls, ods);
//! the first worksheet is used and its first row names the columns.
//! Writing always produces xlsx. Both directions are CPU-bound and are
//! called from `spawn_blocking` by the HTTP handlers.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use roster_common::models::{template_columns, Student, STUDENT_COLUMNS};
use roster_common::row::{CellValue, ImportRow};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::io::Cursor;
use thiserror::Error;

/// Content type of generated workbooks
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const TEMPLATE_EXAMPLE_IMAGE: &str =
    "(optional) data:image/png;base64,<base64 data>; leave blank for the default image";

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("could not read spreadsheet: {0}")]
    Read(#[from] calamine::Error),

    #[error("could not write spreadsheet: {0}")]
    Write(#[from] XlsxError),

    #[error("workbook contains no worksheets")]
    NoWorksheet,
}

/// Parse the first worksheet into untyped rows keyed by header name
///
/// Columns with a blank header are ignored and blank rows are skipped.
pub fn parse_rows(bytes: Vec<u8>) -> Result<Vec<ImportRow>, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoWorksheet)??;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(|cell| cell.to_string().trim().to_string()).collect(),
        None => return Ok(Vec::new()),
    };

    let parsed = rows
        .map(|cells| {
            let mut row = ImportRow::new();
            for (column, cell) in header.iter().zip(cells) {
                if !column.is_empty() {
                    row.insert(column, cell_value(cell));
                }
            }
            row
        })
        .filter(|row| !row.is_blank())
        .collect();

    Ok(parsed)
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => {
            CellValue::Text(text.clone())
        }
        Data::Float(number) => CellValue::Number(*number),
        Data::Int(number) => CellValue::Number(*number as f64),
        Data::DateTime(serial) => CellValue::Number(serial.as_f64()),
        Data::Bool(flag) => CellValue::Bool(*flag),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

/// Render a single-sheet workbook with a bold header row; every cell is text
pub fn render_rows<R, S>(columns: &[&str], rows: R) -> Result<Vec<u8>, SpreadsheetError>
where
    R: IntoIterator<Item = Vec<S>>,
    S: AsRef<str>,
{
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Students")?;

    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header_format)?;
    }
    for (index, values) in rows.into_iter().enumerate() {
        let row = (index + 1) as u32;
        for (col, value) in values.iter().enumerate() {
            sheet.write_string(row, col as u16, value.as_ref())?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Export workbook for a school's students
pub fn render_students(students: &[Student]) -> Result<Vec<u8>, SpreadsheetError> {
    render_rows(
        &STUDENT_COLUMNS,
        students.iter().map(|student| student.fields.values().to_vec()),
    )
}

/// Empty import template documenting every accepted column
pub fn render_template() -> Result<Vec<u8>, SpreadsheetError> {
    let example = vec![
        "Jane Doe",
        "5",
        "2015-04-02",
        "O+",
        "+1 555 0100",
        "12 Harbour Road",
        TEMPLATE_EXAMPLE_IMAGE,
    ];
    render_rows(&template_columns(), [example])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use roster_common::models::{StudentFields, DEFAULT_STUDENT_IMAGE, IMAGE_COLUMN};
    use uuid::Uuid;

    #[test]
    fn test_render_then_parse_preserves_text() {
        let bytes = render_rows(
            &["name", "grade", ""],
            vec![vec!["Ada", "5", "ignored"], vec!["", "", ""], vec!["Grace", "6", ""]],
        )
        .unwrap();

        let rows = parse_rows(bytes).unwrap();
        // The all-blank middle row is skipped
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text("name"), "Ada");
        assert_eq!(rows[0].text("grade"), "5");
        assert_eq!(rows[1].text("name"), "Grace");
        assert_eq!(rows[0].get(""), &CellValue::Empty);
    }

    #[test]
    fn test_numeric_cells_stay_numeric() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "name").unwrap();
        sheet.write_string(0, 1, "grade").unwrap();
        sheet.write_string(1, 0, "Ada").unwrap();
        sheet.write_number(1, 1, 5.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = parse_rows(bytes).unwrap();
        assert_eq!(rows[0].get("grade"), &CellValue::Number(5.0));
        // Non-text cells normalize to empty fields
        assert_eq!(rows[0].student_fields().grade, "");
    }

    #[test]
    fn test_header_only_sheet_has_no_rows() {
        let bytes = render_rows::<Vec<Vec<&str>>, &str>(&STUDENT_COLUMNS, Vec::new()).unwrap();
        assert!(parse_rows(bytes).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        let result = parse_rows(b"definitely not a workbook".to_vec());
        assert!(matches!(result, Err(SpreadsheetError::Read(_))));
    }

    #[test]
    fn test_export_columns_match_import_columns() {
        let student = Student {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            fields: StudentFields {
                name: "Ada".to_string(),
                grade: "5".to_string(),
                dob: "2015-04-02".to_string(),
                blood_group: "O+".to_string(),
                guardian_contact: "555-0100".to_string(),
                address: "1 Main St".to_string(),
            },
            image: DEFAULT_STUDENT_IMAGE.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let rows = parse_rows(render_students(&[student.clone()]).unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].student_fields(), student.fields);
    }

    #[test]
    fn test_template_documents_image_column() {
        let rows = parse_rows(render_template().unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].student_fields().is_complete());
        assert!(rows[0].text(IMAGE_COLUMN).starts_with("(optional) data:image/"));
    }
}
