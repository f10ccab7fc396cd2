use std::fmt;
use std::fmt::Formatter;
use serde::Serialize;

/// Domain the decomposed components live in
#[derive(Serialize, Clone, Copy, PartialEq, Debug)]
pub enum Scale {
    /// Same units as the performance index
    Raw,
    /// log10 of the performance index
    Log10,
}

/// Non-fatal conditions met during a decomposition
#[derive(Serialize, Clone, PartialEq, Debug)]
pub enum DecompositionWarning {
    /// Too short a series for a seasonal estimate, the seasonal term was forced to zero
    InsufficientData { days: usize, required: usize },
    /// Observations that could not be log transformed and were left out
    DroppedObservations { count: usize },
}

impl fmt::Display for DecompositionWarning {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            DecompositionWarning::InsufficientData { days, required } =>
                write!(f, "InsufficientData: {} days, {} needed for a seasonal term", days, required),
            DecompositionWarning::DroppedObservations { count } =>
                write!(f, "DroppedObservations: {} values not usable", count),
        }
    }
}

/// Result of a soiling separation, all series have the length of the input
#[derive(Serialize, Clone, Debug)]
pub struct SoilingDecomposition {
    pub soiling: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub degradation: Vec<f64>,
    pub residual: Vec<f64>,
    pub scale: Scale,
    /// Weights of the last solved iteration, one per second difference
    pub weights: Vec<f64>,
    pub warnings: Vec<DecompositionWarning>,
}

impl SoilingDecomposition {
    /// Sum of all components, which equals the (possibly log transformed) observations where they are known
    pub fn reconstruction(&self) -> Vec<f64> {
        self.soiling.iter()
            .zip(self.seasonal.iter())
            .zip(self.degradation.iter())
            .zip(self.residual.iter())
            .map(|(((s, se), d), r)| s + se + d + r)
            .collect()
    }
}
