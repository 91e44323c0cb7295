#[cfg(feature = "python")]
use pyo3::exceptions::PyRuntimeError;
#[cfg(feature = "python")]
use pyo3::PyErr;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum VoyageError {
    #[error("Data not loaded: {0}")]
    NotLoaded(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid timestamp at row {row}: '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoyageError {
    /// True for the malformed-input failures that abort one vessel's computation.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::MissingColumn(_) | Self::InvalidTimestamp { .. } | Self::InvalidData(_)
        )
    }
}

#[cfg(feature = "python")]
impl From<VoyageError> for PyErr {
    fn from(err: VoyageError) -> PyErr {
        PyRuntimeError::new_err(err.to_string())
    }
}
