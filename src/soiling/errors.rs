use thiserror::Error;
use crate::errors::ShapeError;

/// Error depicting errors that occur during soiling separation
///
#[derive(Debug, Error, PartialEq)]
pub enum SoilingError {
    #[error("InputShapeError: {0}")]
    InputShape(String),
    #[error("OptimizationFailed: iteration {iteration}, solver status {status}")]
    OptimizationFailed { iteration: usize, status: String },
}

impl From<ShapeError> for SoilingError {
    fn from(e: ShapeError) -> Self {
        SoilingError::InputShape(e.0)
    }
}
