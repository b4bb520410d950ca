//! Core error taxonomy

use thiserror::Error;

pub type MlResult<T> = Result<T, MlError>;

#[derive(Debug, Error)]
pub enum MlError {
    /// Dataset or model artifact missing, unreadable or corrupt
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// Input has the wrong shape for the model
    #[error("computation error: {0}")]
    Computation(String),
}

impl From<std::io::Error> for MlError {
    fn from(err: std::io::Error) -> Self {
        MlError::DataUnavailable(err.to_string())
    }
}

impl From<csv::Error> for MlError {
    fn from(err: csv::Error) -> Self {
        MlError::DataUnavailable(format!("dataset: {}", err))
    }
}

impl From<serde_json::Error> for MlError {
    fn from(err: serde_json::Error) -> Self {
        MlError::DataUnavailable(format!("model artifact: {}", err))
    }
}
