use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::data::model::{CellValue, Dataset, UNI_COLUMN};

/// Lowest numeric score that counts as a pass.
pub const NUMERIC_PASS_MARK: i64 = 50;

// ---------------------------------------------------------------------------
// Letter grades
// ---------------------------------------------------------------------------

/// The letter vocabulary, lowest first. Derived `Ord` follows declaration
/// order, so `LetterGrade::DPlus <= g` is the pass test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LetterGrade {
    FMinus,
    F,
    FPlus,
    EMinus,
    E,
    EPlus,
    DMinus,
    D,
    DPlus,
    CMinus,
    C,
    CPlus,
    BMinus,
    B,
    BPlus,
    AMinus,
    A,
    APlus,
}

impl LetterGrade {
    pub const ALL: [LetterGrade; 18] = [
        LetterGrade::FMinus,
        LetterGrade::F,
        LetterGrade::FPlus,
        LetterGrade::EMinus,
        LetterGrade::E,
        LetterGrade::EPlus,
        LetterGrade::DMinus,
        LetterGrade::D,
        LetterGrade::DPlus,
        LetterGrade::CMinus,
        LetterGrade::C,
        LetterGrade::CPlus,
        LetterGrade::BMinus,
        LetterGrade::B,
        LetterGrade::BPlus,
        LetterGrade::AMinus,
        LetterGrade::A,
        LetterGrade::APlus,
    ];

    pub fn token(self) -> &'static str {
        match self {
            LetterGrade::FMinus => "F-",
            LetterGrade::F => "F",
            LetterGrade::FPlus => "F+",
            LetterGrade::EMinus => "E-",
            LetterGrade::E => "E",
            LetterGrade::EPlus => "E+",
            LetterGrade::DMinus => "D-",
            LetterGrade::D => "D",
            LetterGrade::DPlus => "D+",
            LetterGrade::CMinus => "C-",
            LetterGrade::C => "C",
            LetterGrade::CPlus => "C+",
            LetterGrade::BMinus => "B-",
            LetterGrade::B => "B",
            LetterGrade::BPlus => "B+",
            LetterGrade::AMinus => "A-",
            LetterGrade::A => "A",
            LetterGrade::APlus => "A+",
        }
    }

    pub fn is_pass(self) -> bool {
        self >= LetterGrade::DPlus
    }
}

impl FromStr for LetterGrade {
    type Err = ();

    /// Exact, case-sensitive token match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LetterGrade::ALL
            .into_iter()
            .find(|g| g.token() == s)
            .ok_or(())
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ---------------------------------------------------------------------------
// Grade – either notation, or neither
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Grade {
    Letter(LetterGrade),
    Numeric(i64),
    Unclassified(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
    Unclassified,
}

impl Grade {
    /// Classify a grade token. Letters win. Otherwise the space-trimmed text
    /// counts as a score only if it starts with a digit and holds nothing but
    /// digits and dots; the score is the leading integer run ("55.7" is 55).
    /// Signs, exponents and suffixes like "60%" leave it unclassified.
    pub fn parse(raw: &str) -> Grade {
        if let Ok(letter) = raw.parse::<LetterGrade>() {
            return Grade::Letter(letter);
        }
        let trimmed = raw.trim_matches(' ');
        let well_formed = trimmed.starts_with(|c: char| c.is_ascii_digit())
            && trimmed.chars().all(|c| c.is_ascii_digit() || c == '.');
        if !well_formed {
            return Grade::Unclassified(raw.to_string());
        }
        let whole = trimmed.split('.').next().unwrap_or(trimmed);
        // only digits remain, so a parse failure is overflow; SQLite saturates
        Grade::Numeric(whole.parse().unwrap_or(i64::MAX))
    }

    pub fn from_cell(cell: &CellValue) -> Grade {
        match cell {
            CellValue::Integer(i) => Grade::Numeric(*i),
            CellValue::Float(f) if f.is_finite() => Grade::Numeric(f.trunc() as i64),
            CellValue::Bool(b) => Grade::Numeric(i64::from(*b)),
            CellValue::Text(s) => Grade::parse(s),
            CellValue::Null => Grade::Unclassified(String::new()),
            other => Grade::Unclassified(other.to_string()),
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            Grade::Letter(l) if l.is_pass() => Outcome::Pass,
            Grade::Letter(_) => Outcome::Fail,
            Grade::Numeric(n) if *n >= NUMERIC_PASS_MARK => Outcome::Pass,
            Grade::Numeric(_) => Outcome::Fail,
            Grade::Unclassified(_) => Outcome::Unclassified,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-university passing rate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassingRate {
    pub uni: String,
    pub letter_passes: usize,
    pub numeric_passes: usize,
    pub total: usize,
    /// `(letter_passes + numeric_passes) * 100 / total`, truncated.
    pub percentage: usize,
}

/// Passing rate of every university present in `dataset`, ordered by `uni`.
///
/// Failing and unclassifiable grades count toward the total only.
pub fn passing_rates(dataset: &Dataset, grade_column: &str) -> Vec<PassingRate> {
    let (Some(uni_idx), Some(grade_idx)) = (
        dataset.column_index(UNI_COLUMN),
        dataset.column_index(grade_column),
    ) else {
        return Vec::new();
    };

    // uni → (letter, numeric, total)
    let mut tally: BTreeMap<String, (usize, usize, usize)> = BTreeMap::new();
    for row in dataset.rows() {
        let entry = tally.entry(row[uni_idx].to_string()).or_default();
        entry.2 += 1;
        match Grade::from_cell(&row[grade_idx]) {
            g @ Grade::Letter(_) if g.outcome() == Outcome::Pass => entry.0 += 1,
            g @ Grade::Numeric(_) if g.outcome() == Outcome::Pass => entry.1 += 1,
            _ => {}
        }
    }

    tally
        .into_iter()
        .map(|(uni, (letter_passes, numeric_passes, total))| PassingRate {
            uni,
            letter_passes,
            numeric_passes,
            total,
            percentage: (letter_passes + numeric_passes) * 100 / total,
        })
        .collect()
}
