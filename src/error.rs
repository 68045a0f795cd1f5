use crate::schema::Category;
use thiserror::Error;

/// Errors surfaced by loading, canonicalizing and exporting inspection data.
///
/// Aggregation never fails: empty inputs yield empty outputs and zero
/// denominators yield zero rates.
#[derive(Error, Debug)]
pub enum QualityError {
    /// A column the category's schema requires is absent from the raw table.
    /// The dataset for that category is unusable until the file is fixed.
    #[error("{category} data is missing required column \"{column}\"")]
    Schema { category: Category, column: String },

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, QualityError>;
