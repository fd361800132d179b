//! FILENAME: persistence/src/lib.rs
//! PURPOSE: Saves a workbook as a JSON document and loads it back.
//! CONTEXT: Only raw cell contents are stored. Loading replays `new_sheet`
//! and `set_cell_contents` in file order, so every computed value and
//! dependency edge is re-derived by the engine itself.

mod error;

pub use error::PersistenceError;

use engine::Workbook;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub type Result<T> = std::result::Result<T, PersistenceError>;

// ============================================================================
// SAVED MODEL
// ============================================================================

// Keys are optional so a document without one is reported by name rather
// than as a generic type error. Saving always fills them.

#[derive(Debug, Serialize, Deserialize)]
struct SavedWorkbook {
    sheets: Option<Vec<SavedSheet>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedSheet {
    name: Option<String>,
    /// Lowercase location to raw contents, in row-major order.
    #[serde(rename = "cell-contents")]
    cell_contents: Option<Map<String, Value>>,
}

fn required<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| PersistenceError::MissingKey(key.to_string()))
}

impl SavedWorkbook {
    fn from_workbook(workbook: &Workbook) -> Result<Self> {
        let mut sheets = Vec::with_capacity(workbook.num_sheets());
        for name in workbook.list_sheets() {
            let cell_contents = workbook
                .cell_contents(&name)?
                .into_iter()
                .map(|(location, contents)| (location.to_lowercase(), Value::String(contents)))
                .collect();
            sheets.push(SavedSheet {
                name: Some(name),
                cell_contents: Some(cell_contents),
            });
        }
        Ok(SavedWorkbook { sheets: Some(sheets) })
    }

    /// Replays the document through the workbook API, in file order.
    fn to_workbook(self) -> Result<Workbook> {
        let mut workbook = Workbook::new();
        for sheet in required(self.sheets, "sheets")? {
            let name = required(sheet.name, "name")?;
            let contents = required(sheet.cell_contents, "cell-contents")?;

            let (_, name) = workbook.new_sheet(Some(&name))?;
            for (location, raw) in &contents {
                let raw = raw.as_str().ok_or_else(|| {
                    PersistenceError::TypeMismatch(format!("contents of {}!{} must be a string", name, location))
                })?;
                workbook.set_cell_contents(&name, location, raw)?;
            }
            log::debug!("loaded sheet {:?} with {} cells", name, contents.len());
        }
        Ok(workbook)
    }
}

// ============================================================================
// SAVE
// ============================================================================

/// Writes the workbook as JSON.
pub fn save_workbook<W: Write>(workbook: &Workbook, writer: W) -> Result<()> {
    let saved = SavedWorkbook::from_workbook(workbook)?;
    serde_json::to_writer_pretty(writer, &saved)?;
    log::debug!("saved workbook with {} sheets", workbook.num_sheets());
    Ok(())
}

pub fn save_to_path(workbook: &Workbook, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    save_workbook(workbook, &mut writer)?;
    writer.flush()?;
    Ok(())
}

// ============================================================================
// LOAD
// ============================================================================

/// Reads a JSON document and rebuilds the workbook from it.
pub fn load_workbook<R: Read>(reader: R) -> Result<Workbook> {
    // Syntax errors surface as Json; anything failing the model after that
    // is a value of the wrong shape.
    let document: Value = serde_json::from_reader(reader)?;
    let saved: SavedWorkbook =
        serde_json::from_value(document).map_err(|e| PersistenceError::TypeMismatch(e.to_string()))?;
    saved.to_workbook()
}

pub fn load_from_path(path: &Path) -> Result<Workbook> {
    load_workbook(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{CellErrorType, CellValue, ErrorKind, WorkbookError};

    fn sample() -> Workbook {
        let mut wb = Workbook::new();
        wb.new_sheet(Some("Data")).unwrap();
        wb.new_sheet(Some("My Sheet")).unwrap();
        wb.set_cell_contents("Data", "A1", "12").unwrap();
        wb.set_cell_contents("Data", "B1", "=A1*2").unwrap();
        wb.set_cell_contents("Data", "C1", "=1/0").unwrap();
        wb.set_cell_contents("Data", "A2", "=A2").unwrap();
        wb.set_cell_contents("My Sheet", "A1", "='Data'!B1+1").unwrap();
        wb.set_cell_contents("My Sheet", "B3", "hello").unwrap();
        wb.set_cell_contents("My Sheet", "C3", "=Missing!A1").unwrap();
        wb
    }

    fn assert_same_cells(a: &Workbook, b: &Workbook) {
        assert_eq!(a.list_sheets(), b.list_sheets());
        for sheet in a.list_sheets() {
            let cells = a.cell_contents(&sheet).unwrap();
            assert_eq!(cells, b.cell_contents(&sheet).unwrap());
            for (location, _) in cells {
                assert_eq!(
                    a.get_cell_value(&sheet, &location).unwrap(),
                    b.get_cell_value(&sheet, &location).unwrap(),
                    "{}!{}",
                    sheet,
                    location
                );
            }
        }
    }

    fn load_str(text: &str) -> Result<Workbook> {
        load_workbook(text.as_bytes())
    }

    #[test]
    fn test_document_shape() {
        let mut out = Vec::new();
        save_workbook(&sample(), &mut out).unwrap();
        let doc: Value = serde_json::from_slice(&out).unwrap();

        let sheets = doc["sheets"].as_array().unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0]["name"], "Data");
        let keys: Vec<&String> = sheets[0]["cell-contents"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a1", "b1", "c1", "a2"]);
        assert_eq!(sheets[0]["cell-contents"]["b1"], "=A1*2");
    }

    #[test]
    fn test_round_trip_through_file() {
        let original = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");

        save_to_path(&original, &path).unwrap();
        let loaded = load_from_path(&path).unwrap();

        assert_same_cells(&original, &loaded);
        assert_eq!(
            loaded.get_cell_value("My Sheet", "A1").unwrap(),
            CellValue::Number(25.into())
        );
        match loaded.get_cell_value("Data", "A2").unwrap() {
            CellValue::Error(e) => assert_eq!(e.kind, CellErrorType::CircularReference),
            other => panic!("expected a circular reference, got {:?}", other),
        }
    }

    #[test]
    fn test_loaded_workbook_stays_live() {
        let mut out = Vec::new();
        save_workbook(&sample(), &mut out).unwrap();
        let mut loaded = load_workbook(out.as_slice()).unwrap();

        loaded.set_cell_contents("Data", "A1", "1").unwrap();
        assert_eq!(loaded.get_cell_value("My Sheet", "A1").unwrap(), CellValue::Number(3.into()));

        loaded.new_sheet(Some("missing")).unwrap();
        loaded.set_cell_contents("missing", "A1", "4").unwrap();
        assert_eq!(loaded.get_cell_value("My Sheet", "C3").unwrap(), CellValue::Number(4.into()));
    }

    #[test]
    fn test_forward_references_between_sheets() {
        let text = r#"{"sheets": [
            {"name": "First", "cell-contents": {"a1": "=Second!A1+1"}},
            {"name": "Second", "cell-contents": {"a1": "41"}}
        ]}"#;
        let wb = load_str(text).unwrap();
        assert_eq!(wb.get_cell_value("First", "A1").unwrap(), CellValue::Number(42.into()));
    }

    #[test]
    fn test_missing_keys() {
        let err = load_str(r#"{}"#).unwrap_err();
        assert!(matches!(&err, PersistenceError::MissingKey(k) if k == "sheets"));
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);

        let err = load_str(r#"{"sheets": [{"name": "S"}]}"#).unwrap_err();
        assert!(matches!(&err, PersistenceError::MissingKey(k) if k == "cell-contents"));

        let err = load_str(r#"{"sheets": [{"cell-contents": {}}]}"#).unwrap_err();
        assert!(matches!(&err, PersistenceError::MissingKey(k) if k == "name"));
    }

    #[test]
    fn test_type_mismatches() {
        let cases = [
            r#"[]"#,
            r#"{"sheets": {}}"#,
            r#"{"sheets": [5]}"#,
            r#"{"sheets": [{"name": 1, "cell-contents": {}}]}"#,
            r#"{"sheets": [{"name": "S", "cell-contents": []}]}"#,
            r#"{"sheets": [{"name": "S", "cell-contents": {"a1": 3}}]}"#,
        ];
        for text in cases {
            let err = load_str(text).unwrap_err();
            assert!(matches!(err, PersistenceError::TypeMismatch(_)), "{}: {:?}", text, err);
            assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        }
    }

    #[test]
    fn test_bad_content_inside_document() {
        let err = load_str(r#"{"sheets": [{"name": "S", "cell-contents": {"zz0": "1"}}]}"#).unwrap_err();
        assert!(matches!(err, PersistenceError::Workbook(WorkbookError::InvalidLocation(_))));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = load_str(
            r#"{"sheets": [{"name": "S", "cell-contents": {}}, {"name": "s", "cell-contents": {}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PersistenceError::Workbook(WorkbookError::DuplicateSheetName(_))));
    }

    #[test]
    fn test_malformed_json_and_missing_file() {
        assert!(matches!(load_str("{\"sheets\": ["), Err(PersistenceError::Json(_))));

        let dir = tempfile::tempdir().unwrap();
        let err = load_from_path(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)));
    }
}
