use std::collections::BTreeMap;
use std::fmt;

/// Column every row is stamped with: the university the row came from.
pub const UNI_COLUMN: &str = "uni";

/// Column the passing-rate calculation reads grades from.
pub const GRADE_COLUMN: &str = "grade";

// ---------------------------------------------------------------------------
// CellValue – a single cell of a transcript table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a CSV/JSON reader infers.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Guess the type of a raw text cell the way a CSV reader would.
    pub fn guess(s: &str) -> CellValue {
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() => return CellValue::Float(f),
            _ => {}
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::Text(s.to_string())
    }

    /// True when the cell renders exactly as `token`.
    ///
    /// Used to spot header lines that leaked into the data.
    pub fn matches_token(&self, token: &str) -> bool {
        match self {
            CellValue::Text(s) => s == token,
            CellValue::Null => false,
            other => other.to_string() == token,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Row / Table – what one source file loads into
// ---------------------------------------------------------------------------

/// One transcript entry: column name → value.
pub type Row = BTreeMap<String, CellValue>;

/// A loaded source file: ordered column names plus rows keyed by them.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Column names in file order (`uni` appended when stamped).
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Dataset – the combined, university-tagged table
// ---------------------------------------------------------------------------

/// The union of every loaded table under one column schema.
///
/// Each row holds exactly one value per schema column, in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// An empty dataset whose schema starts with the configured columns.
    pub fn with_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut dataset = Dataset::default();
        for col in columns {
            dataset.ensure_column(col.as_ref());
        }
        dataset
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` in the schema. Names match ignoring ASCII case,
    /// as SQLite identifiers do.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Value of `column` in row `row`, if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Append a loaded table. Columns the schema has not seen yet are added
    /// at the end and back-filled with `Null` for earlier rows.
    ///
    /// A column that differs from a known one only in case lands in the
    /// known column; the first spelling seen names it.
    pub fn append(&mut self, table: Table) {
        for col in &table.columns {
            self.ensure_column(col);
        }
        for row in table.rows {
            let mut aligned = vec![CellValue::Null; self.columns.len()];
            for (name, value) in row {
                if let Some(idx) = self.column_index(&name) {
                    aligned[idx] = value;
                }
            }
            self.rows.push(aligned);
        }
    }

    fn ensure_column(&mut self, name: &str) {
        if self.column_index(name).is_some() {
            return;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(CellValue::Null);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[(&str, CellValue)]]) -> Table {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
                .collect(),
        }
    }

    #[test]
    fn guess_infers_cell_types() {
        assert_eq!(CellValue::guess(""), CellValue::Null);
        assert_eq!(CellValue::guess("55"), CellValue::Integer(55));
        assert_eq!(CellValue::guess("5.5"), CellValue::Float(5.5));
        assert_eq!(CellValue::guess("true"), CellValue::Bool(true));
        assert_eq!(CellValue::guess("B+"), CellValue::Text("B+".into()));
        assert_eq!(CellValue::guess("inf"), CellValue::Text("inf".into()));
    }

    #[test]
    fn matches_token_compares_rendered_text() {
        assert!(CellValue::Text("grade".into()).matches_token("grade"));
        assert!(CellValue::Integer(7).matches_token("7"));
        assert!(!CellValue::Null.matches_token(""));
    }

    #[test]
    fn append_aligns_rows_to_growing_schema() {
        let mut ds = Dataset::with_columns(&["subject", "grade", "uni"]);
        ds.append(table(
            &["subject", "grade", "uni"],
            &[&[
                ("subject", CellValue::Text("art".into())),
                ("grade", CellValue::Text("B".into())),
                ("uni", CellValue::Text("lse".into())),
            ]],
        ));
        ds.append(table(
            &["subject", "grade", "term", "uni"],
            &[&[
                ("subject", CellValue::Text("maths".into())),
                ("grade", CellValue::Integer(70)),
                ("term", CellValue::Text("spring".into())),
                ("uni", CellValue::Text("ucl".into())),
            ]],
        ));

        assert_eq!(ds.columns(), ["subject", "grade", "uni", "term"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(0, "term"), Some(&CellValue::Null));
        assert_eq!(ds.value(1, "term"), Some(&CellValue::Text("spring".into())));
        assert_eq!(ds.value(1, "uni"), Some(&CellValue::Text("ucl".into())));
    }

    #[test]
    fn columns_differing_only_in_case_share_one_slot() {
        let mut ds = Dataset::with_columns(&["subject", "grade", "uni"]);
        ds.append(table(
            &["Subject", "grade", "Term", "uni"],
            &[&[
                ("Subject", CellValue::Text("art".into())),
                ("grade", CellValue::Text("B".into())),
                ("Term", CellValue::Text("autumn".into())),
                ("uni", CellValue::Text("lse".into())),
            ]],
        ));
        ds.append(table(
            &["subject", "GRADE", "term", "uni"],
            &[&[
                ("subject", CellValue::Text("law".into())),
                ("GRADE", CellValue::Integer(61)),
                ("term", CellValue::Text("spring".into())),
                ("uni", CellValue::Text("ucl".into())),
            ]],
        ));

        assert_eq!(ds.columns(), ["subject", "grade", "uni", "Term"]);
        assert_eq!(ds.value(0, "subject"), Some(&CellValue::Text("art".into())));
        assert_eq!(ds.value(1, "grade"), Some(&CellValue::Integer(61)));
        assert_eq!(ds.value(1, "TERM"), Some(&CellValue::Text("spring".into())));
    }
}
