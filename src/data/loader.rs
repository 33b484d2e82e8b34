use std::path::Path;

use serde_json::Value as JsonValue;

use super::model::{CellValue, Row, Table, UNI_COLUMN};
use super::validate::FileKind;
use crate::error::IngestError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load one transcript file.  Dispatch on the kind the validator returned.
///
/// Every configured column other than `uni` must be present in the file;
/// extra columns are carried through untouched. Rows that merely repeat the
/// header are dropped, and each surviving row is stamped with the file stem
/// as its `uni`.
pub fn load_file<S: AsRef<str>>(
    path: &Path,
    kind: FileKind,
    columns: &[S],
) -> Result<Table, IngestError> {
    let uni = university_id(path)?;

    let mut table = match kind {
        FileKind::Csv => load_csv(path)?,
        FileKind::Json => load_json(path)?,
    };

    if kind == FileKind::Json && table.rows.is_empty() {
        // `[]` carries no schema to check
        table.columns = columns
            .iter()
            .map(|c| c.as_ref().to_string())
            .filter(|c| !c.eq_ignore_ascii_case(UNI_COLUMN))
            .collect();
    } else {
        check_columns(path, &table, columns)?;
    }

    let before = table.len();
    let columns_in_file = table.columns.clone();
    table.rows.retain(|row| !is_header_echo(row, &columns_in_file));
    if table.len() < before {
        log::debug!(
            "{}: dropped {} repeated header row(s)",
            path.display(),
            before - table.len()
        );
    }

    stamp_university(&mut table, &uni);
    Ok(table)
}

/// The university a file belongs to: its name without the extension.
pub fn university_id(path: &Path) -> Result<String, IngestError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| IngestError::NoUniversity {
            path: path.to_path_buf(),
        })
}

fn check_columns<S: AsRef<str>>(
    path: &Path,
    table: &Table,
    columns: &[S],
) -> Result<(), IngestError> {
    let missing: Vec<String> = columns
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| {
            !c.eq_ignore_ascii_case(UNI_COLUMN)
                && !table.columns.iter().any(|have| have.eq_ignore_ascii_case(c))
        })
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(IngestError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        })
    }
}

/// A row whose every cell spells out its own column name.
fn is_header_echo(row: &Row, columns: &[String]) -> bool {
    !columns.is_empty()
        && columns
            .iter()
            .all(|col| row.get(col).is_some_and(|v| v.matches_token(col)))
}

/// Replace any `uni` column the file carries, in whatever case, with the
/// file's own university.
fn stamp_university(table: &mut Table, uni: &str) {
    let is_uni = |c: &String| c.eq_ignore_ascii_case(UNI_COLUMN);
    table.columns.retain(|c| !is_uni(c));
    table.columns.push(UNI_COLUMN.to_string());
    for row in &mut table.rows {
        row.retain(|c, _| !is_uni(c));
        row.insert(UNI_COLUMN.to_string(), CellValue::Text(uni.to_string()));
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: comma-delimited, header row first.  Whitespace directly after
/// a delimiter is ignored in both the header and the data.
fn load_csv(path: &Path) -> Result<Table, IngestError> {
    let csv_err = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_err)?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let row: Row = columns
            .iter()
            .zip(record.iter())
            .map(|(col, raw)| (col.clone(), CellValue::guess(raw.trim_start())))
            .collect();
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "subject": "physics", "grade": "B+" },
///   { "subject": "maths",   "grade": 64 }
/// ]
/// ```
fn load_json(path: &Path) -> Result<Table, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue = serde_json::from_str(&text).map_err(|source| IngestError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let records = root.as_array().ok_or_else(|| IngestError::NotAnArray {
        path: path.to_path_buf(),
    })?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (index, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| IngestError::NotAnObject {
            path: path.to_path_buf(),
            index,
        })?;

        let mut row = Row::new();
        for (key, val) in obj {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
            row.insert(key.clone(), json_to_cell(val));
        }
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const COLUMNS: [&str; 3] = ["subject", "grade", "uni"];

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn csv_skips_initial_space_and_guesses_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "lse.csv", "subject, grade\nphysics, 65\nart,  B+\n");

        let table = load_file(&path, FileKind::Csv, &COLUMNS).unwrap();

        assert_eq!(table.columns, ["subject", "grade", "uni"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0]["grade"], CellValue::Integer(65));
        assert_eq!(table.rows[1]["grade"], CellValue::Text("B+".into()));
        assert_eq!(table.rows[1]["uni"], CellValue::Text("lse".into()));
    }

    #[test]
    fn repeated_header_rows_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "ucl.csv",
            "subject,grade\nart,C\nsubject,grade\nmaths,subject\n",
        );

        let table = load_file(&path, FileKind::Csv, &COLUMNS).unwrap();

        let subjects: Vec<String> = table.rows.iter().map(|r| r["subject"].to_string()).collect();
        assert_eq!(subjects, ["art", "maths"]);
    }

    #[test]
    fn json_header_echo_is_dropped_too() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "kcl.json",
            r#"[{"subject":"subject","grade":"grade"},{"subject":"art","grade":71}]"#,
        );

        let table = load_file(&path, FileKind::Json, &COLUMNS).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0]["grade"], CellValue::Integer(71));
    }

    #[test]
    fn uni_column_in_content_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "university_of_bristol.json",
            r#"[{"subject":"physics","grade":"A","uni":"oxford"}]"#,
        );

        let table = load_file(&path, FileKind::Json, &COLUMNS).unwrap();

        assert_eq!(table.columns, ["subject", "grade", "uni"]);
        assert_eq!(
            table.rows[0]["uni"],
            CellValue::Text("university_of_bristol".into())
        );
    }

    #[test]
    fn uni_column_in_any_case_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ucl.csv", "subject,grade,Uni\nart,B,oxford\n");

        let table = load_file(&path, FileKind::Csv, &COLUMNS).unwrap();

        assert_eq!(table.columns, ["subject", "grade", "uni"]);
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.rows[0]["uni"], CellValue::Text("ucl".into()));
        assert!(!table.rows[0].contains_key("Uni"));
    }

    #[test]
    fn required_columns_match_ignoring_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "lse.csv", "Subject,GRADE\nart,B\n");

        let table = load_file(&path, FileKind::Csv, &COLUMNS).unwrap();

        assert_eq!(table.columns, ["Subject", "GRADE", "uni"]);
    }

    #[test]
    fn json_records_without_keys_are_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "lse.json", "[{}]");

        let err = load_file(&path, FileKind::Json, &COLUMNS).unwrap_err();

        match err {
            IngestError::MissingColumns { missing, .. } => {
                assert_eq!(missing, ["subject", "grade"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn json_columns_keep_first_seen_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "lse.json",
            r#"[{"subject":"art","grade":"B","zeta":1,"alpha":2},{"term":"spring","subject":"law","grade":"C"}]"#,
        );

        let table = load_file(&path, FileKind::Json, &COLUMNS).unwrap();

        assert_eq!(table.columns, ["subject", "grade", "zeta", "alpha", "term", "uni"]);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "lse.csv", "subject,score\nart,50\n");

        let err = load_file(&path, FileKind::Csv, &COLUMNS).unwrap_err();

        match err {
            IngestError::MissingColumns { missing, .. } => assert_eq!(missing, ["grade"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_content_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let json = write(&dir, "bad.json", "{ not json");
        let object = write(&dir, "obj.json", r#"{"subject":"art"}"#);
        let ragged = write(&dir, "ragged.csv", "subject,grade\nart,B,extra\n");

        assert!(matches!(
            load_file(&json, FileKind::Json, &COLUMNS),
            Err(IngestError::Json { .. })
        ));
        assert!(matches!(
            load_file(&object, FileKind::Json, &COLUMNS),
            Err(IngestError::NotAnArray { .. })
        ));
        assert!(matches!(
            load_file(&ragged, FileKind::Csv, &COLUMNS),
            Err(IngestError::Csv { .. })
        ));
    }

    #[test]
    fn empty_json_array_loads_as_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "lse.json", "[]");

        let table = load_file(&path, FileKind::Json, &COLUMNS).unwrap();

        assert!(table.is_empty());
        assert_eq!(table.columns, ["subject", "grade", "uni"]);
    }

    #[test]
    fn loading_twice_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "lse.csv", "subject,grade\nart,B\nmaths,40\n");

        let first = load_file(&path, FileKind::Csv, &COLUMNS).unwrap();
        let second = load_file(&path, FileKind::Csv, &COLUMNS).unwrap();

        assert_eq!(first, second);
    }
}
