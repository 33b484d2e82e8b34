use std::fmt;

// ---------------------------------------------------------------------------
// Eligibility of a directory entry for ingestion
// ---------------------------------------------------------------------------

/// Recognized transcript formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Json,
}

impl FileKind {
    /// The suffix, dot included, this kind is recognized by.
    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Csv => ".csv",
            FileKind::Json => ".json",
        }
    }
}

/// Why a file was not ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnsupportedFormat,
    Empty,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::UnsupportedFormat => write!(f, "is not in correct .csv/.json format"),
            Rejection::Empty => write!(f, "is empty"),
        }
    }
}

/// Decide from name and size alone whether a file can be ingested.
///
/// The extension is checked before the size, so an empty `.txt` file is
/// reported as a format problem. Every rejection logs a skip notice.
pub fn validate(filename: &str, size_bytes: u64) -> Result<FileKind, Rejection> {
    let verdict = classify(filename, size_bytes);
    if let Err(reason) = verdict {
        log::info!("File {filename} {reason}, skipping.");
    }
    verdict
}

fn classify(filename: &str, size_bytes: u64) -> Result<FileKind, Rejection> {
    let kind = if filename.ends_with(FileKind::Csv.extension()) {
        FileKind::Csv
    } else if filename.ends_with(FileKind::Json.extension()) {
        FileKind::Json
    } else {
        return Err(Rejection::UnsupportedFormat);
    };
    if size_bytes == 0 {
        return Err(Rejection::Empty);
    }
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_extension_is_rejected_regardless_of_size() {
        assert_eq!(validate("non_csv.txt", 120), Err(Rejection::UnsupportedFormat));
        assert_eq!(validate("non_csv.txt", 0), Err(Rejection::UnsupportedFormat));
        assert_eq!(validate("README", 10), Err(Rejection::UnsupportedFormat));
        assert_eq!(validate("lse.csv.bak", 10), Err(Rejection::UnsupportedFormat));
    }

    #[test]
    fn empty_file_with_valid_suffix_is_rejected() {
        assert_eq!(validate("empty_csv.csv", 0), Err(Rejection::Empty));
        assert_eq!(validate("empty.json", 0), Err(Rejection::Empty));
    }

    #[test]
    fn non_empty_files_yield_their_kind() {
        assert_eq!(validate("lse.csv", 1), Ok(FileKind::Csv));
        assert_eq!(validate("university_of_bristol.json", 512), Ok(FileKind::Json));
    }

    #[test]
    fn suffix_match_is_case_sensitive() {
        assert_eq!(validate("LSE.CSV", 10), Err(Rejection::UnsupportedFormat));
    }
}
