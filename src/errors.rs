use thiserror::Error;

/// Error depicting errors that occur during linear interpolation
///
#[derive(Debug, Error, PartialEq)]
pub enum InterpolationError {
    #[error("x and y lengths differ: {0} vs {1}")]
    UnequalLengths(usize, usize),
    #[error("at least two control points are needed, got {0}")]
    IllegalLength(usize),
    #[error("control points must be finite and distinct")]
    ControlPoint,
}

/// Error depicting input data that does not have the expected shape
///
#[derive(Debug, Error, PartialEq)]
#[error("InputShapeError: {0}")]
pub struct ShapeError(pub String);
