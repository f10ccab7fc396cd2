use thiserror::Error;
use crate::errors::{InterpolationError, ShapeError};
use crate::resampling::ResampleError;
use crate::solver::SolveError;

/// Error depicting errors that occur while separating shade losses
///
#[derive(Debug, Error)]
pub enum ShadeError {
    #[error("InputShapeError: {0}")]
    InputShape(String),
    #[error("OptimizationFailed: solver status {status}")]
    OptimizationFailed { status: String },
    #[error("InterpolationError: {0}")]
    Interpolation(#[from] InterpolationError),
}

impl From<SolveError> for ShadeError {
    fn from(e: SolveError) -> Self {
        ShadeError::OptimizationFailed { status: e.status }
    }
}

impl From<ShapeError> for ShadeError {
    fn from(e: ShapeError) -> Self {
        ShadeError::InputShape(e.0)
    }
}

impl From<ResampleError> for ShadeError {
    fn from(e: ResampleError) -> Self {
        match e {
            ResampleError::Interpolation(e) => ShadeError::Interpolation(e),
            e => ShadeError::InputShape(e.to_string()),
        }
    }
}
