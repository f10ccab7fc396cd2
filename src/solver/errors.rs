use thiserror::Error;

/// Error depicting a conic solve that did not end in an optimal solution
///
#[derive(Debug, Error, Clone, PartialEq)]
#[error("solver finished with status {status}")]
pub struct SolveError {
    pub status: String,
}
