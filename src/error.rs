use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("Location registry is empty: at least one location is required")]
    EmptyLocationRegistry,

    #[error("Duplicate location key: {0}")]
    DuplicateLocationKey(String),

    #[error("Duplicate location name: {0}")]
    DuplicateLocationName(String),

    #[error("Field '{field}' is registered to more than one owner: {first} and {second}")]
    AmbiguousField {
        field: String,
        first: String,
        second: String,
    },

    #[error("Mapping target '{0}' collides with a standard output column")]
    ReservedKpiName(String),

    #[error("Invalid tolerance {0}: must be non-negative")]
    InvalidTolerance(f64),

    #[error("Reconciliation total field '{0}' is also listed as a component field")]
    ReconciliationConfig(String),

    #[error("CSV rendering error: {0}")]
    Csv(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<csv::Error> for NormalizerError {
    fn from(err: csv::Error) -> Self {
        NormalizerError::Csv(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NormalizerError>;
