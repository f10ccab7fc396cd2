use std::fmt;
use std::fmt::Formatter;
use chrono::{Datelike, NaiveDate};
use ndarray::Array2;
use serde::Serialize;
use crate::errors::ShapeError;

/// Preprocessed PV power data as handed over by the data-handling pipeline
///
/// Rows of the matrices are intra-day samples and columns are days.
#[derive(Debug, Clone)]
pub struct PowerData {
    /// Gap-filled, non-negative power readings
    pub filled_data_matrix: Array2<f64>,
    /// True where a sample is a valid daytime reading
    pub daytime: Array2<bool>,
    /// One flag per day, true for cloud-free days
    pub clear_days: Vec<bool>,
    /// One calendar date per matrix column
    pub day_index: Vec<NaiveDate>,
    /// Sampling interval in minutes
    pub data_sampling: f64,
}

impl PowerData {
    /// Returns a new PowerData after checking that all parts line up
    ///
    /// # Arguments
    ///
    /// * 'filled_data_matrix' - power matrix, samples x days
    /// * 'daytime' - daytime mask with the same shape as the power matrix
    /// * 'clear_days' - clear day flags, one per day
    /// * 'day_index' - dates, one per day
    /// * 'data_sampling' - sampling interval in minutes, inferred from the row count if None
    pub fn new(
        filled_data_matrix: Array2<f64>,
        daytime: Array2<bool>,
        clear_days: Vec<bool>,
        day_index: Vec<NaiveDate>,
        data_sampling: Option<f64>) -> Result<PowerData, ShapeError>
    {
        let (rows, days) = filled_data_matrix.dim();

        if daytime.dim() != (rows, days) {
            return Err(ShapeError(format!("daytime mask is {:?} but power matrix is {:?}", daytime.dim(), (rows, days))));
        }
        if clear_days.len() != days {
            return Err(ShapeError(format!("{} clear day flags for {} days", clear_days.len(), days)));
        }
        if day_index.len() != days {
            return Err(ShapeError(format!("{} dates in day index for {} days", day_index.len(), days)));
        }
        if rows == 0 || days == 0 {
            return Err(ShapeError("power matrix is empty".into()));
        }

        let data_sampling = match data_sampling {
            Some(s) if s > 0.0 && s.is_finite() => s,
            Some(s) => return Err(ShapeError(format!("sampling interval must be positive, got {}", s))),
            None => 24.0 * 60.0 / rows as f64,
        };

        Ok(PowerData {
            filled_data_matrix,
            daytime,
            clear_days,
            day_index,
            data_sampling,
        })
    }

    /// Number of days (columns)
    pub fn num_days(&self) -> usize {
        self.filled_data_matrix.ncols()
    }

    /// Day of year (1-based) for every day in the index
    pub fn days_of_year(&self) -> Vec<u32> {
        self.day_index.iter().map(|d| d.ordinal()).collect()
    }
}

/// Lifecycle of an expensive analysis run
#[derive(Serialize, Clone, PartialEq, Debug)]
pub enum RunStatus {
    NotRun,
    Running,
    Succeeded,
    Failed(String),
}

/// Implementation of the Display Trait for pretty print
impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            RunStatus::NotRun => write!(f, "NotRun"),
            RunStatus::Running => write!(f, "Running"),
            RunStatus::Succeeded => write!(f, "Succeeded"),
            RunStatus::Failed(reason) => write!(f, "Failed: {}", reason),
        }
    }
}

/// Returns a daily performance index, i.e. actual energy over expected energy.
/// Days with missing values or non-positive expected energy come out as NaN.
///
/// # Arguments
///
/// * 'actual' - measured daily energy
/// * 'expected' - modeled or expected daily energy
pub fn performance_index(actual: &[f64], expected: &[f64]) -> Result<Vec<f64>, ShapeError> {
    if actual.len() != expected.len() {
        return Err(ShapeError(format!("{} actual values for {} expected values", actual.len(), expected.len())));
    }

    let pi = actual.iter()
        .zip(expected.iter())
        .map(|(&a, &e)| if a.is_finite() && e.is_finite() && e > 0.0 { a / e } else { f64::NAN })
        .collect::<Vec<f64>>();

    Ok(pi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        start.iter_days().take(n).collect()
    }

    #[test]
    fn infers_sampling_from_row_count() {
        let data = PowerData::new(
            Array2::zeros((96, 3)),
            Array2::from_elem((96, 3), true),
            vec![true; 3],
            dates(3),
            None).unwrap();
        assert!((data.data_sampling - 15.0).abs() < 1e-12);
        assert_eq!(data.days_of_year(), vec![1, 2, 3]);
    }

    #[test]
    fn rejects_mask_shape_mismatch() {
        let err = PowerData::new(
            Array2::zeros((24, 3)),
            Array2::from_elem((24, 2), true),
            vec![true; 3],
            dates(3),
            Some(60.0));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_flag_length_mismatch() {
        let err = PowerData::new(
            Array2::zeros((24, 3)),
            Array2::from_elem((24, 3), true),
            vec![true; 2],
            dates(3),
            Some(60.0));
        assert!(err.is_err());
    }

    #[test]
    fn performance_index_masks_bad_days() {
        let pi = performance_index(&[1.0, 2.0, f64::NAN], &[2.0, 0.0, 1.0]).unwrap();
        assert!((pi[0] - 0.5).abs() < 1e-12);
        assert!(pi[1].is_nan());
        assert!(pi[2].is_nan());
    }

    #[test]
    fn status_prints_failure_reason() {
        assert_eq!(RunStatus::Failed("PrimalInfeasible".into()).to_string(), "Failed: PrimalInfeasible");
    }
}
