use thiserror::Error;

use crate::graphhopper_api::GraphHopperError;

#[derive(Debug, Error)]
pub enum MatrixProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Matrix provider failed: {0}")]
    Provider(#[from] GraphHopperError),

    #[error("Invalid matrix: expected {expected} locations, got {actual}")]
    InvalidMatrix { expected: usize, actual: usize },
}
