//! Bulk import of monthly Pinterest account statistics from CSV uploads.
//!
//! An upload goes through three stages: [`upload`] pulls the file out of the
//! multipart body and checks its type and encoding, [`fields`] turns single
//! cells into dates and counters, and [`pipeline`] walks the rows and stores
//! them all-or-nothing.

pub mod fields;
pub mod pipeline;
pub mod upload;

use crate::error::AppError;

pub use fields::DateMode;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Expected a multipart/form-data upload")]
    NotMultipart,
    #[error("Invalid multipart body: {0}")]
    Multipart(String),
    #[error("No file uploaded")]
    MissingFile,
    #[error("Please upload a CSV file.")]
    NotCsv,
    #[error("CSV file must be UTF-8 encoded")]
    InvalidEncoding,
    #[error("CSV must contain columns: {columns}", columns = pipeline::required_columns_label())]
    MissingColumns,
    #[error("Error parsing CSV on line {line}: {message}")]
    Row { line: u64, message: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Database(e) => AppError::Database(e),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}
