//! Consolidate per-university transcript files into one dataset and answer
//! analytical questions over it.
//!
//! ```text
//!  data/<uni>.{csv,json} ──► data::builder ──► Dataset ──► query::engine ──► query::executor
//!                                                 │                              │
//!                                                 └─► query::passing      console + <question>.csv
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod query;

pub use config::AnalysisConfig;
pub use data::model::Dataset;
pub use error::{ConfigError, IngestError, QueryError};
