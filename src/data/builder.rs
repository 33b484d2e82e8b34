use std::fs;
use std::path::{Path, PathBuf};

use super::loader::load_file;
use super::model::Dataset;
use super::validate::{validate, FileKind, Rejection};
use crate::error::IngestError;

/// What to do with an eligible file whose content cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestPolicy {
    /// Log a warning and carry on with the remaining files.
    #[default]
    Skip,
    /// Abort the whole build on the first load error.
    Strict,
}

/// One directory entry together with the validator's verdict on it.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub name: String,
    pub path: PathBuf,
    pub verdict: Result<FileKind, Rejection>,
}

/// Per-file outcome of a build.
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    /// (file name, rows contributed)
    pub loaded: Vec<(String, usize)>,
    pub rejected: Vec<(String, Rejection)>,
    /// (file name, load error message)
    pub skipped: Vec<(String, String)>,
}

/// The combined dataset plus a record of how it was assembled.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub dataset: Dataset,
    pub summary: IngestSummary,
}

/// Validate every regular file in `dir`, in file-name order.
pub fn scan_directory(dir: &Path) -> Result<Vec<ScannedFile>, IngestError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| IngestError::Io { path, source }
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        let path = entry.path();
        let meta = fs::metadata(&path).map_err(io_err(&path))?;
        if meta.is_dir() {
            continue;
        }
        files.push((entry.file_name().to_string_lossy().into_owned(), path, meta.len()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(files
        .into_iter()
        .map(|(name, path, size)| {
            let verdict = validate(&name, size);
            ScannedFile { name, path, verdict }
        })
        .collect())
}

/// Load every eligible file in `dir` and union the results.
///
/// Rejected files contribute nothing. Files that pass validation but fail
/// to load are handled according to `policy`.
pub fn build_dataset<S: AsRef<str>>(
    dir: &Path,
    columns: &[S],
    policy: IngestPolicy,
) -> Result<Ingested, IngestError> {
    let mut dataset = Dataset::with_columns(columns);
    let mut summary = IngestSummary::default();

    for file in scan_directory(dir)? {
        let kind = match file.verdict {
            Ok(kind) => kind,
            Err(reason) => {
                summary.rejected.push((file.name, reason));
                continue;
            }
        };

        match load_file(&file.path, kind, columns) {
            Ok(table) => {
                log::debug!("Loaded {} rows from {}", table.len(), file.name);
                summary.loaded.push((file.name, table.len()));
                dataset.append(table);
            }
            Err(e) if policy == IngestPolicy::Skip => {
                log::warn!("File {} could not be loaded, skipping: {e}", file.name);
                summary.skipped.push((file.name, e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "Combined {} rows from {} file(s) ({} rejected, {} skipped)",
        dataset.len(),
        summary.loaded.len(),
        summary.rejected.len(),
        summary.skipped.len()
    );

    Ok(Ingested { dataset, summary })
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: [&str; 3] = ["subject", "grade", "uni"];

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lse.csv"), "subject,grade\nart,B\nmaths,45\n").unwrap();
        fs::write(
            dir.path().join("ucl.json"),
            r#"[{"subject":"art","grade":"A"},{"subject":"law","grade":60},{"subject":"law","grade":"D"}]"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not a transcript").unwrap();
        fs::write(dir.path().join("empty.csv"), "").unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();
        dir
    }

    #[test]
    fn union_of_eligible_files_only() {
        let dir = fixture_dir();

        let ingested = build_dataset(dir.path(), &COLUMNS, IngestPolicy::Skip).unwrap();

        assert_eq!(ingested.dataset.len(), 5);
        assert_eq!(
            ingested.summary.loaded,
            [("lse.csv".to_string(), 2), ("ucl.json".to_string(), 3)]
        );
        assert_eq!(
            ingested.summary.rejected,
            [
                ("empty.csv".to_string(), Rejection::Empty),
                ("notes.txt".to_string(), Rejection::UnsupportedFormat),
            ]
        );
    }

    #[test]
    fn malformed_file_is_skipped_by_default() {
        let dir = fixture_dir();
        fs::write(dir.path().join("broken.json"), "[{").unwrap();

        let ingested = build_dataset(dir.path(), &COLUMNS, IngestPolicy::Skip).unwrap();

        assert_eq!(ingested.dataset.len(), 5);
        assert_eq!(ingested.summary.skipped.len(), 1);
        assert_eq!(ingested.summary.skipped[0].0, "broken.json");
    }

    #[test]
    fn malformed_file_aborts_in_strict_mode() {
        let dir = fixture_dir();
        fs::write(dir.path().join("broken.json"), "[{").unwrap();

        let result = build_dataset(dir.path(), &COLUMNS, IngestPolicy::Strict);

        assert!(matches!(result, Err(IngestError::Json { .. })));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        assert!(matches!(
            build_dataset(&missing, &COLUMNS, IngestPolicy::Skip),
            Err(IngestError::Io { .. })
        ));
    }
}
