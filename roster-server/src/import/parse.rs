//! Upload decoding
//!
//! Formats: XLSX / XLS / XLSB / ODS (auto-detected by calamine), with CSV
//! text as a fallback.
//! - Only the first worksheet is read
//! - The first non-blank row supplies the column headers
//! - Fully blank rows are skipped; unknown columns are ignored

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use roster_common::db::models::number_to_text;
use roster_common::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::Cursor;
use tracing::debug;

pub const EMPTY_OR_INVALID_FILE: &str = "Excel file is empty or has an invalid format.";

/// One decoded spreadsheet row, keyed by the recognized column headers
///
/// Serializes back to the header names so rejected rows can be returned in
/// the shape they were uploaded in. Empty cells are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SheetRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    /// Kept as JSON so numeric cells stay numbers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Name,
    Email,
    ContactNumber,
    Age,
    Gender,
    Location,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        match header.trim() {
            "Name" => Some(Column::Name),
            "Email" => Some(Column::Email),
            "ContactNumber" => Some(Column::ContactNumber),
            "Age" => Some(Column::Age),
            "Gender" => Some(Column::Gender),
            "Location" => Some(Column::Location),
            _ => None,
        }
    }
}

/// Loosely-typed cell value shared by the workbook and CSV readers
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    fn into_text(self) -> String {
        match self {
            Cell::Text(s) => s,
            Cell::Number(f) => number_to_text(f),
        }
    }

    fn into_json(self) -> Value {
        match self {
            Cell::Text(s) => Value::String(s),
            Cell::Number(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Value::from(f as i64)
            }
            Cell::Number(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
        }
    }
}

impl SheetRow {
    fn set(&mut self, column: Column, cell: Cell) {
        match column {
            Column::Name => self.name = Some(cell.into_text()),
            Column::Email => self.email = Some(cell.into_text()),
            Column::ContactNumber => self.contact_number = Some(cell.into_text()),
            Column::Age => self.age = Some(cell.into_json()),
            Column::Gender => self.gender = Some(cell.into_text()),
            Column::Location => self.location = Some(cell.into_text()),
        }
    }
}

/// Decode an uploaded buffer into rows
///
/// Fails with [`EMPTY_OR_INVALID_FILE`] when nothing decodes.
pub fn parse_upload(bytes: &[u8]) -> Result<Vec<SheetRow>> {
    let grid = match read_workbook(bytes) {
        Ok(grid) => grid,
        Err(workbook_err) => {
            debug!("Not a workbook ({}), trying CSV", workbook_err);
            let text = std::str::from_utf8(bytes)
                .map_err(|_| Error::Parse(EMPTY_OR_INVALID_FILE.to_string()))?;
            read_csv(text)?
        }
    };

    let rows = rows_from_grid(grid);
    if rows.is_empty() {
        return Err(Error::Parse(EMPTY_OR_INVALID_FILE.to_string()));
    }

    debug!("Decoded {} rows", rows.len());
    Ok(rows)
}

/// First worksheet as a grid of optional cells
fn read_workbook(bytes: &[u8]) -> std::result::Result<Vec<Vec<Option<Cell>>>, String> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|e| e.to_string())?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook does not contain any worksheets".to_string())?
        .map_err(|e| format!("failed to read first worksheet: {}", e))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect())
}

fn read_csv(text: &str) -> Result<Vec<Vec<Option<Cell>>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::Parse(format!("{} ({})", EMPTY_OR_INVALID_FILE, e)))?;
        grid.push(record.iter().map(cell_from_text).collect());
    }
    Ok(grid)
}

/// Header row + data rows -> keyed records
fn rows_from_grid(grid: Vec<Vec<Option<Cell>>>) -> Vec<SheetRow> {
    let mut lines = grid
        .into_iter()
        .filter(|cells| cells.iter().any(Option::is_some));

    let columns: Vec<Option<Column>> = match lines.next() {
        Some(header) => header
            .into_iter()
            .map(|cell| cell.and_then(|c| Column::from_header(&c.into_text())))
            .collect(),
        None => return Vec::new(),
    };

    lines
        .map(|cells| {
            let mut row = SheetRow::default();
            for (column, cell) in columns.iter().zip(cells) {
                if let (Some(column), Some(cell)) = (column, cell) {
                    row.set(*column, cell);
                }
            }
            row
        })
        .collect()
}

fn cell_from_data(data: &Data) -> Option<Cell> {
    match data {
        Data::Empty => None,
        Data::String(s) => cell_from_text(s),
        Data::Float(f) => Some(Cell::Number(*f)),
        Data::Int(i) => Some(Cell::Number(*i as f64)),
        Data::Bool(b) => Some(Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string())),
        Data::Error(e) => Some(Cell::Text(format!("#ERR:{:?}", e))),
        // Best-effort for date/time/duration variants
        other => cell_from_text(&other.to_string()),
    }
}

fn cell_from_text(raw: &str) -> Option<Cell> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(Cell::Text(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_csv_fallback_keys_by_header() {
        let csv = "Name,Email,ContactNumber,Age,Gender,Location,Extra\n\
                   Ann Lee, ann@x.io ,5551234,31,Female,Austin,ignored\n";

        let rows = parse_upload(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name.as_deref(), Some("Ann Lee"));
        assert_eq!(rows[0].email.as_deref(), Some("ann@x.io"));
        assert_eq!(rows[0].contact_number.as_deref(), Some("5551234"));
        assert_eq!(rows[0].age, Some(json!("31")));
        assert_eq!(rows[0].location.as_deref(), Some("Austin"));
    }

    #[test]
    fn test_blank_lines_and_missing_cells() {
        let csv = "Email,Name\n\n,Bob\nc@x.io\n";

        let rows = parse_upload(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].email, None);
        assert_eq!(rows[0].name.as_deref(), Some("Bob"));
        assert_eq!(rows[1].email.as_deref(), Some("c@x.io"));
        assert_eq!(rows[1].name, None);
    }

    #[test]
    fn test_header_only_is_empty_or_invalid() {
        let err = parse_upload(b"Name,Email,ContactNumber\n").unwrap_err();
        assert!(matches!(err, Error::Parse(ref m) if m == EMPTY_OR_INVALID_FILE));
    }

    #[test]
    fn test_binary_garbage_is_empty_or_invalid() {
        let err = parse_upload(&[0xff, 0xfe, 0x00, 0x9c, 0x80]).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_numeric_cells() {
        assert_eq!(Cell::Number(5551234.0).into_text(), "5551234");
        assert_eq!(Cell::Number(12.5).into_text(), "12.5");
        assert_eq!(Cell::Number(30.0).into_json(), json!(30));
    }

    #[test]
    fn test_serializes_with_upload_headers() {
        let row = SheetRow {
            name: Some("Ann".to_string()),
            contact_number: Some("1".to_string()),
            age: Some(json!(30)),
            ..SheetRow::default()
        };
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({"Name": "Ann", "ContactNumber": "1", "Age": 30})
        );
    }
}
