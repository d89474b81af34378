//! Dataset source - measurement rows from workbooks or JSON record files
//!
//! Workbooks (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`) are read from their
//! first sheet. The first non-empty row holds the column headers; every later
//! row becomes one record keyed by those headers.
//!
//! Any other file is read as a JSON array of objects, one object per
//! spreadsheet row, keyed by the spreadsheet column headers:
//!
//! ```json
//! [{"%x (distance from pylorus side)": 41.2, "%y (distance from bottom)": 63.0,
//!   "Area Of Innervation": 1520.4, "V/D": "V"}]
//! ```

use anyhow::Result;
use calamine::{open_workbook_auto, Data, Reader};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use crate::projection::extract::RawTable;

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load a rows file into a raw table, picking the reader by file extension
pub fn load_rows(path: &Path) -> Result<RawTable> {
    tracing::debug!("Reading rows from {:?}", path);
    let table = if is_workbook(path) {
        load_workbook(path)?
    } else {
        let content = std::fs::read_to_string(path)?;
        parse_rows(&content)?
    };
    tracing::info!(
        "Loaded {} rows, {} columns from {:?}",
        table.rows.len(),
        table.columns.len(),
        path
    );
    Ok(table)
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| WORKBOOK_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read the first sheet of a workbook
pub fn load_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .unwrap_or_default();
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow::anyhow!("Workbook {:?} has no sheets", path))??;
    tracing::debug!(
        "Sheet '{}' spans {} rows x {} columns",
        sheet,
        range.height(),
        range.width()
    );
    table_from_cells(range.rows())
}

/// Build a table from sheet rows; the first non-empty row is the header.
///
/// Header cells that are empty leave their column out. Fully empty data rows
/// are skipped.
pub fn table_from_cells<'a>(rows: impl Iterator<Item = &'a [Data]>) -> Result<RawTable> {
    let mut rows = rows.skip_while(|row| row.iter().all(|c| matches!(c, Data::Empty)));

    let header: Vec<Option<String>> = match rows.next() {
        Some(row) => row.iter().map(header_name).collect(),
        None => anyhow::bail!("Sheet has no header row"),
    };

    let mut table = RawTable::default();
    for name in header.iter().flatten() {
        if table.columns.contains(name) {
            tracing::warn!("Duplicate column header '{}', keeping the last one", name);
        } else {
            table.columns.push(name.clone());
        }
    }

    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut record = HashMap::with_capacity(table.columns.len());
        for (name, cell) in header.iter().zip(row) {
            if let Some(name) = name {
                record.insert(name.clone(), cell_value(cell));
            }
        }
        table.rows.push(record);
    }

    Ok(table)
}

fn header_name(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let name = s.trim();
            (!name.is_empty()).then(|| name.to_string())
        }
        other => Some(other.to_string()),
    }
}

/// Sheet cell to the JSON value the extractor reads
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => serde_json::Number::from_f64(dt.as_f64())
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) | Data::Empty => Value::Null,
    }
}

/// Parse rows JSON, collecting the union of columns over all rows
pub fn parse_rows(content: &str) -> Result<RawTable> {
    let json: Value = serde_json::from_str(content)?;
    let records = json
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Rows file must be a JSON array of objects"))?;

    let mut table = RawTable::default();
    for (i, record) in records.iter().enumerate() {
        let object = record
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("Row {} is not an object", i))?;

        let mut row = HashMap::with_capacity(object.len());
        for (column, value) in object {
            if !table.columns.iter().any(|c| c == column) {
                table.columns.push(column.clone());
            }
            row.insert(column.clone(), value.clone());
        }
        table.rows.push(row);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn test_parse_rows() {
        let table = parse_rows(
            r#"[{"a": 1, "b": "V"}, {"a": 2.5, "c": null}]"#,
        )
        .unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.columns.len(), 3);
        assert!(table.columns.contains(&"c".to_string()));
        assert_eq!(table.rows[1]["a"], Value::from(2.5));
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(parse_rows(r#"{"a": 1}"#).is_err());
        assert!(parse_rows(r#"[1, 2]"#).is_err());
    }

    #[test]
    fn test_load_rows_from_file() {
        let path = std::env::temp_dir().join("neuron_projector_rows_test.json");
        std::fs::write(&path, r#"[{"x": 1}]"#).unwrap();
        let table = load_rows(&path).unwrap();
        assert_eq!(table.columns, vec!["x".to_string()]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_sheet_header_row() {
        let sheet = vec![
            vec![Data::Empty, Data::Empty, Data::Empty, Data::Empty],
            vec![
                text(" %x (distance from pylorus side) "),
                text("Area Of Innervation"),
                Data::Empty,
                Data::Int(2024),
            ],
            vec![Data::Float(41.5), Data::Int(1520), text("ignored"), text("a")],
        ];
        let table = table_from_cells(sheet.iter().map(|r| r.as_slice())).unwrap();

        assert_eq!(
            table.columns,
            vec![
                "%x (distance from pylorus side)".to_string(),
                "Area Of Innervation".to_string(),
                "2024".to_string(),
            ]
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.rows[0]["%x (distance from pylorus side)"], Value::from(41.5));
        assert_eq!(table.rows[0]["2024"], Value::from("a"));
    }

    #[test]
    fn test_sheet_cell_types() {
        let sheet = vec![
            vec![text("int"), text("float"), text("text"), text("flag"), text("err"), text("blank"), text("iso")],
            vec![
                Data::Int(7),
                Data::Float(0.25),
                text("V"),
                Data::Bool(true),
                Data::Error(CellErrorType::Div0),
                Data::Empty,
                Data::DateTimeIso("2021-03-01T00:00:00".to_string()),
            ],
            vec![Data::Empty; 7],
            vec![Data::Float(f64::NAN), Data::Empty, text("D")],
        ];
        let table = table_from_cells(sheet.iter().map(|r| r.as_slice())).unwrap();
        assert_eq!(table.rows.len(), 2);

        let row = &table.rows[0];
        assert_eq!(row["int"], Value::from(7));
        assert_eq!(row["float"], Value::from(0.25));
        assert_eq!(row["text"], Value::from("V"));
        assert_eq!(row["flag"], Value::Bool(true));
        assert_eq!(row["err"], Value::Null);
        assert_eq!(row["blank"], Value::Null);
        assert_eq!(row["iso"], Value::from("2021-03-01T00:00:00"));

        // short rows only fill the columns they reach
        let short = &table.rows[1];
        assert_eq!(short["int"], Value::Null);
        assert_eq!(short["text"], Value::from("D"));
        assert!(!short.contains_key("flag"));
    }

    #[test]
    fn test_sheet_without_header_fails() {
        let sheet = vec![vec![Data::Empty, Data::Empty]];
        assert!(table_from_cells(sheet.iter().map(|r| r.as_slice())).is_err());
    }

    #[test]
    fn test_workbook_chosen_by_extension() {
        assert!(is_workbook(Path::new("res/IGLE_data.xlsx")));
        assert!(is_workbook(Path::new("res/IGLE_data.XLSX")));
        assert!(is_workbook(Path::new("legacy.xls")));
        assert!(!is_workbook(Path::new("res/IGLE_data.json")));
        assert!(!is_workbook(Path::new("rows")));
    }

    #[test]
    fn test_missing_workbook_fails() {
        let path = std::env::temp_dir().join("neuron_projector_missing.xlsx");
        std::fs::remove_file(&path).ok();
        assert!(load_rows(&path).is_err());
    }
}
