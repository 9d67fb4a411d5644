use gcxcore::errors::{CacheError, ConfigurationError, EstimationError, GcxError, LayoutError};
use thiserror::Error;

/// Errors of the data access and conversion layer. Core processing errors
/// pass through unchanged, everything store- or sink-specific is added
/// here.
#[derive(Error, Debug)]
pub enum DataError {
    #[error(transparent)]
    Core(#[from] GcxError),

    #[error("chromatogram '{0}' not found")]
    ChromatogramNotFound(String),

    #[error("scan {index} outside valid range [0, {count}) of '{id}'")]
    ScanOutOfRange {
        id: String,
        index: usize,
        count: usize,
    },

    #[error("scalar '{name}' missing from '{id}'")]
    MissingScalar { id: String, name: String },

    #[error("variable '{name}' missing from '{id}'")]
    MissingVariable { id: String, name: String },

    #[error("variable '{0}' was not declared before writing")]
    UndeclaredVariable(String),

    #[error("no ragged index variable is paired with '{0}'")]
    UnknownRaggedPairing(String),

    #[error("no mass values present in sources {0:?}")]
    EmptyMassRange(Vec<String>),

    #[error("conversion '{0}' has no sources")]
    NoSources(String),

    #[error("report serialization: {0}")]
    Report(#[from] serde_json::Error),
}

impl From<ConfigurationError> for DataError {
    fn from(error: ConfigurationError) -> Self {
        DataError::Core(error.into())
    }
}

impl From<LayoutError> for DataError {
    fn from(error: LayoutError) -> Self {
        DataError::Core(error.into())
    }
}

impl From<EstimationError> for DataError {
    fn from(error: EstimationError) -> Self {
        DataError::Core(error.into())
    }
}

impl From<CacheError> for DataError {
    fn from(error: CacheError) -> Self {
        DataError::Core(error.into())
    }
}
