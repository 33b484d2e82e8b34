use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use crate::config::AnalysisConfig;
use crate::data::builder::{build_dataset, scan_directory, Ingested, ScannedFile};
use crate::data::model::GRADE_COLUMN;
use crate::query::engine::SqliteEngine;
use crate::query::executor::{execute_queries, ExecutionReport};
use crate::query::passing::{passing_rates, PassingRate};

/// Ingest the configured directory into one dataset.
pub fn ingest(config: &AnalysisConfig) -> Result<Ingested> {
    build_dataset(&config.directory, &config.columns, config.policy)
        .with_context(|| format!("ingesting {}", config.directory.display()))
}

/// The full run: ingest, bind the dataset, answer every configured query.
pub fn run_analysis<W: Write>(config: &AnalysisConfig, out: &mut W) -> Result<ExecutionReport> {
    let Ingested { dataset, .. } = ingest(config)?;

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating output directory {}", config.output_dir.display()))?;

    let engine = SqliteEngine::from_dataset(dataset).context("loading dataset into SQLite")?;
    let report = execute_queries(&config.queries, &engine, &config.output_dir, out)
        .context("writing query report")?;

    log::info!(
        "Answered {} of {} queries ({} skipped)",
        report.succeeded(),
        report.outcomes.len(),
        report.failed()
    );
    Ok(report)
}

/// Ingest and print the passing rate per university, computed natively.
pub fn run_passing_rates<W: Write>(
    config: &AnalysisConfig,
    out: &mut W,
) -> Result<Vec<PassingRate>> {
    let Ingested { dataset, .. } = ingest(config)?;
    let rates = passing_rates(&dataset, GRADE_COLUMN);

    let table = pretty_format_batches(&[rates_batch(&rates)?]).context("rendering rates")?;
    writeln!(out, "{table}")?;
    Ok(rates)
}

/// Report, without loading anything, which files would be ingested.
pub fn run_check<W: Write>(config: &AnalysisConfig, out: &mut W) -> Result<Vec<ScannedFile>> {
    let files = scan_directory(&config.directory)
        .with_context(|| format!("scanning {}", config.directory.display()))?;

    for file in &files {
        match file.verdict {
            Ok(kind) => writeln!(out, "{}: eligible ({})", file.name, kind.extension())?,
            Err(reason) => writeln!(out, "{}: skipped ({reason})", file.name)?,
        }
    }
    Ok(files)
}

fn rates_batch(rates: &[PassingRate]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("uni", DataType::Utf8, false),
        Field::new("passed", DataType::Int64, false),
        Field::new("total", DataType::Int64, false),
        Field::new("percentage", DataType::Int64, false),
    ]));
    let to_i64 = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rates.iter().map(|r| r.uni.as_str()))),
        Arc::new(Int64Array::from_iter_values(
            rates.iter().map(|r| to_i64(r.letter_passes + r.numeric_passes)),
        )),
        Arc::new(Int64Array::from_iter_values(rates.iter().map(|r| to_i64(r.total)))),
        Arc::new(Int64Array::from_iter_values(rates.iter().map(|r| to_i64(r.percentage)))),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}
