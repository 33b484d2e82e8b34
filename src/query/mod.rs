//! Query layer: declarative questions over the combined dataset.
//!
//! ```text
//!   Dataset ──► engine (SQLite, relation `df`) ──► RecordBatch per query
//!                                                   │
//!                                        executor ──┴─► console + <question>.csv
//!
//!   Dataset ──► passing (native grade model) ──► PassingRate per university
//! ```

use serde::{Deserialize, Serialize};

pub mod engine;
pub mod executor;
pub mod passing;

/// A question and the SQL that answers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub question: String,
    pub sql: String,
}

impl Query {
    pub fn new(question: impl Into<String>, sql: impl Into<String>) -> Self {
        Query {
            question: question.into(),
            sql: sql.into(),
        }
    }
}
