use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use arrow::util::pretty::pretty_format_batches;

use super::engine::QueryEngine;
use super::Query;

/// Printed in place of a result when a query cannot be evaluated.
pub const QUERY_FAILED_NOTICE: &str = "Formatting issue with SQL statement, skipping.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Succeeded { rows: usize, path: PathBuf },
    Failed { reason: String },
}

/// Outcome of every query, in the order they were run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<(String, QueryOutcome)>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, QueryOutcome::Succeeded { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Run each query in order, reporting to `out` and writing one CSV per
/// successful query into `output_dir`.
///
/// A query that fails to evaluate (or whose result cannot be written) is
/// noted and skipped; it never stops the rest of the batch. Only a failure
/// to write to `out` itself is returned as an error.
pub fn execute_queries<E, W>(
    queries: &[Query],
    engine: &E,
    output_dir: &Path,
    out: &mut W,
) -> io::Result<ExecutionReport>
where
    E: QueryEngine + ?Sized,
    W: Write,
{
    let mut report = ExecutionReport::default();

    for query in queries {
        let outcome = match engine.evaluate(&query.sql) {
            Ok(batch) => match present(query, &batch, output_dir, out)? {
                Ok(path) => QueryOutcome::Succeeded {
                    rows: batch.num_rows(),
                    path,
                },
                Err(e) => {
                    log::warn!("Could not save result of '{}': {e:#}", query.question);
                    writeln!(out, "Could not save the result of '{}', skipping.", query.question)?;
                    QueryOutcome::Failed {
                        reason: format!("{e:#}"),
                    }
                }
            },
            Err(e) => {
                log::warn!("Query '{}' failed: {e}", query.question);
                writeln!(out, "{QUERY_FAILED_NOTICE}")?;
                QueryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        report.outcomes.push((query.question.clone(), outcome));
    }

    Ok(report)
}

/// Print one result and persist it. The outer error is the report sink,
/// the inner one the rendering or the result file.
fn present<W: Write>(
    query: &Query,
    batch: &RecordBatch,
    output_dir: &Path,
    out: &mut W,
) -> io::Result<Result<PathBuf>> {
    let rendered = match pretty_format_batches(std::slice::from_ref(batch)) {
        Ok(table) => table.to_string(),
        Err(e) => return Ok(Err(e).context("rendering result table")),
    };
    writeln!(out, "The result of the query '{}' is as follows:", query.question)?;
    writeln!(out, "{rendered}")?;

    let path = output_dir.join(result_file_name(&query.question));
    Ok(write_result_csv(&path, batch).map(|()| path))
}

/// File name a question's result is saved under: spaces (and path
/// separators) become underscores.
pub fn result_file_name(question: &str) -> String {
    let stem: String = question
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    format!("{stem}.csv")
}

/// Write `batch` as CSV with a leading, unnamed, 0-based index column.
///
/// Rows go to a `.partial` sibling that is renamed over `path` once complete,
/// so a failed write never leaves a truncated result behind.
pub fn write_result_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let partial = partial_path(path);
    let written = write_csv(&partial, batch).and_then(|()| {
        fs::rename(&partial, path).with_context(|| format!("moving result to {}", path.display()))
    });
    if written.is_err() {
        if let Err(e) = fs::remove_file(&partial) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("Could not remove {}: {e}", partial.display());
            }
        }
    }
    written
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let schema = batch.schema();
    let mut header = vec![String::new()];
    header.extend(schema.fields().iter().map(|f| f.name().clone()));
    writer.write_record(&header).context("writing CSV header")?;

    for row in 0..batch.num_rows() {
        let mut record = Vec::with_capacity(batch.num_columns() + 1);
        record.push(row.to_string());
        for column in batch.columns() {
            let cell = if column.is_null(row) {
                String::new()
            } else {
                array_value_to_string(column, row)
                    .with_context(|| format!("formatting row {row}"))?
            };
            record.push(cell);
        }
        writer
            .write_record(&record)
            .with_context(|| format!("writing row {row}"))?;
    }

    writer.flush().context("flushing result file")?;
    Ok(())
}
