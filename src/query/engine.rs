use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};

use crate::data::model::{CellValue, Dataset};
use crate::error::QueryError;

/// Name the combined dataset is bound to inside every query.
pub const DATASET_RELATION: &str = "df";

/// Anything that can answer a declarative query over the bound dataset.
pub trait QueryEngine {
    fn evaluate(&self, sql: &str) -> Result<RecordBatch, QueryError>;
}

// ---------------------------------------------------------------------------
// SQLite-backed engine
// ---------------------------------------------------------------------------

/// An in-memory SQLite database holding the dataset as table `df`.
///
/// Columns are declared without a type so every cell keeps the storage
/// class it was loaded with (a grade may be `'B+'` in one row and `55` in
/// the next).
pub struct SqliteEngine {
    conn: Connection,
}

impl SqliteEngine {
    /// Take ownership of the dataset and materialize it in SQLite.
    pub fn from_dataset(dataset: Dataset) -> Result<Self, QueryError> {
        let mut conn = Connection::open_in_memory()?;

        let column_list = dataset
            .columns()
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute_batch(&format!(
            "CREATE TABLE {} ({column_list})",
            quote_ident(DATASET_RELATION)
        ))?;

        let placeholders = vec!["?"; dataset.columns().len()].join(", ");
        let insert = format!(
            "INSERT INTO {} VALUES ({placeholders})",
            quote_ident(DATASET_RELATION)
        );

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&insert)?;
            for row in dataset.rows() {
                stmt.execute(params_from_iter(row.iter().map(to_sql_value)))?;
            }
        }
        tx.commit()?;

        log::debug!(
            "Bound {} rows x {} columns as relation '{DATASET_RELATION}'",
            dataset.len(),
            dataset.columns().len()
        );
        Ok(SqliteEngine { conn })
    }
}

impl QueryEngine for SqliteEngine {
    fn evaluate(&self, sql: &str) -> Result<RecordBatch, QueryError> {
        let mut stmt = self.conn.prepare(sql.trim())?;
        if !stmt.readonly() {
            return Err(QueryError::NotReadOnly);
        }

        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
        let width = names.len();

        let mut columns: Vec<Vec<SqlValue>> = vec![Vec::new(); width];
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (idx, column) in columns.iter_mut().enumerate() {
                column.push(row.get::<_, SqlValue>(idx)?);
            }
        }

        let mut fields = Vec::with_capacity(width);
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(width);
        for (name, values) in names.iter().zip(columns) {
            let array = to_arrow(values);
            fields.push(Field::new(name, array.data_type().clone(), true));
            arrays.push(array);
        }

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(cell: &CellValue) -> SqlValue {
    match cell {
        CellValue::Text(s) => SqlValue::Text(s.clone()),
        CellValue::Integer(i) => SqlValue::Integer(*i),
        CellValue::Float(f) => SqlValue::Real(*f),
        CellValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        CellValue::Null => SqlValue::Null,
    }
}

/// Pick the narrowest Arrow type that holds every value of a result column:
/// Int64, then Float64, then Utf8.
fn to_arrow(values: Vec<SqlValue>) -> ArrayRef {
    let has_values = values.iter().any(|v| !matches!(v, SqlValue::Null));
    let all_int = values
        .iter()
        .all(|v| matches!(v, SqlValue::Null | SqlValue::Integer(_)));
    let all_numeric = values
        .iter()
        .all(|v| matches!(v, SqlValue::Null | SqlValue::Integer(_) | SqlValue::Real(_)));

    if has_values && all_int {
        let ints: Vec<Option<i64>> = values
            .into_iter()
            .map(|v| match v {
                SqlValue::Integer(i) => Some(i),
                _ => None,
            })
            .collect();
        return Arc::new(Int64Array::from(ints));
    }

    if has_values && all_numeric {
        let floats: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| match v {
                SqlValue::Integer(i) => Some(i as f64),
                SqlValue::Real(f) => Some(f),
                _ => None,
            })
            .collect();
        return Arc::new(Float64Array::from(floats));
    }

    let texts: Vec<Option<String>> = values
        .into_iter()
        .map(|v| match v {
            SqlValue::Null => None,
            SqlValue::Integer(i) => Some(i.to_string()),
            SqlValue::Real(f) => Some(f.to_string()),
            SqlValue::Text(s) => Some(s),
            SqlValue::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
        })
        .collect();
    Arc::new(StringArray::from(texts))
}
