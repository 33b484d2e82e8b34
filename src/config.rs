use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::builder::IngestPolicy;
use crate::data::model::UNI_COLUMN;
use crate::error::ConfigError;
use crate::query::Query;

pub const DEFAULT_DIRECTORY: &str = "data";
pub const DEFAULT_COLUMNS: [&str; 3] = ["subject", "grade", "uni"];

const TOP_SUBJECTS_SQL: &str = "SELECT subject, COUNT(*) AS num_of_students \
     FROM df GROUP BY subject \
     ORDER BY num_of_students DESC, subject ASC LIMIT 3";

const SINGLE_UNI_SUBJECTS_SQL: &str = "SELECT * FROM (\
     SELECT COUNT(*) AS students_enrolled, subject, COUNT(DISTINCT uni) AS num_of_unis \
     FROM df GROUP BY subject) WHERE num_of_unis <= 1";

const PASSING_RATE_SQL: &str = "
WITH passes_letters AS (
    SELECT COUNT(*) AS letter, uni
    FROM df
    WHERE grade IN ('D+', 'C-', 'C', 'C+', 'B-', 'B', 'B+', 'A-', 'A', 'A+')
    GROUP BY uni
),
passes_numbers AS (
    SELECT COUNT(*) AS number, uni
    FROM (
        SELECT
            CASE
                WHEN typeof(grade) IN ('integer', 'real') THEN CAST(grade AS INT)
                WHEN trim(grade) GLOB '[0-9]*' AND trim(grade) NOT GLOB '*[^0-9.]*'
                    THEN CAST(trim(grade) AS INT)
                ELSE NULL
            END AS num,
            uni
        FROM df
    )
    WHERE num IS NOT NULL AND num >= 50
    GROUP BY uni
),
unis AS (
    SELECT COUNT(*) AS total, uni
    FROM df
    GROUP BY uni
)
SELECT
    unis.uni,
    (COALESCE(passes_letters.letter, 0) + COALESCE(passes_numbers.number, 0)) * 100 / unis.total
        AS percentage
FROM unis
LEFT JOIN passes_numbers ON unis.uni = passes_numbers.uni
LEFT JOIN passes_letters ON passes_letters.uni = unis.uni
ORDER BY unis.uni
";

/// The three questions every analysis answers unless configured otherwise.
pub fn default_queries() -> Vec<Query> {
    vec![
        Query::new(
            "What are the top 3 most popular classes spanning all universities?",
            TOP_SUBJECTS_SQL,
        ),
        Query::new(
            "What are the courses offered by no more than 1 university and what is the number of students enrolled in each?",
            SINGLE_UNI_SUBJECTS_SQL,
        ),
        Query::new("What is the % passing rate at each university?", PASSING_RATE_SQL),
    ]
}

/// Everything one analysis run needs, passed explicitly into the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Directory holding `<uni>.csv` / `<uni>.json` transcripts.
    pub directory: PathBuf,
    /// Where `<question>.csv` result files are written.
    pub output_dir: PathBuf,
    /// Columns every transcript must provide (`uni` is stamped, not read).
    pub columns: Vec<String>,
    pub queries: Vec<Query>,
    pub policy: IngestPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            output_dir: PathBuf::from("."),
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            queries: default_queries(),
            policy: IngestPolicy::Skip,
        }
    }
}

/// On-disk shape of the config file; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    directory: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    columns: Option<Vec<String>>,
    strict: Option<bool>,
    queries: Option<Vec<Query>>,
}

impl AnalysisConfig {
    /// Defaults overlaid with the keys present in a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let mut config = AnalysisConfig::default();
        if let Some(directory) = file.directory {
            config.directory = directory;
        }
        if let Some(output_dir) = file.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(columns) = file.columns {
            config.columns = columns;
        }
        if let Some(strict) = file.strict {
            config.policy = if strict {
                IngestPolicy::Strict
            } else {
                IngestPolicy::Skip
            };
        }
        if let Some(queries) = file.queries {
            config.queries = queries;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns.iter().all(|c| c.eq_ignore_ascii_case(UNI_COLUMN)) {
            return Err(ConfigError::Invalid(
                "at least one transcript column besides 'uni' is required".into(),
            ));
        }
        if let Some(blank) = self.columns.iter().find(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("blank column name {blank:?}")));
        }
        let mut seen = std::collections::BTreeSet::new();
        // SQLite column names ignore ASCII case
        if let Some(dup) = self
            .columns
            .iter()
            .find(|c| !seen.insert(c.to_ascii_lowercase()))
        {
            return Err(ConfigError::Invalid(format!("column '{dup}' listed twice")));
        }
        if let Some(q) = self.queries.iter().find(|q| q.question.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "query with empty question text: {:?}",
                q.sql
            )));
        }
        Ok(())
    }
}
