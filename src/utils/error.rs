use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("extraction failed for '{dataset}' at offset {offset}: {reason}")]
    ExtractionFailed {
        dataset: String,
        offset: usize,
        reason: String,
    },

    #[error("no usable records for '{dataset}' after mapping")]
    EmptyResult { dataset: String },

    #[error("load failed for '{dataset}' after {committed} committed rows: {reason}")]
    LoadFailed {
        dataset: String,
        committed: usize,
        reason: String,
    },

    #[error("configuration error: {message}")]
    ConfigError { message: String },

    #[error("invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, EtlError>;
