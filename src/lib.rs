//! Defect aggregation for subcontractor inspection data.
//!
//! Raw category files are mapped onto one canonical record shape
//! ([`schema`]), narrowed by a [`types::FilterSelection`] ([`filter`]), and
//! summarized into rate, ranking, Pareto, share and heatmap figures
//! ([`engine`], [`dashboard`]). Filtered rows can be exported as a
//! single-sheet workbook ([`export`]).
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod schema;
pub mod types;
pub mod util;

pub use error::{QualityError, Result};
pub use schema::Category;
