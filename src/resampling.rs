use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use thiserror::Error;
use crate::errors::{InterpolationError, ShapeError};
use crate::interpolation::resample_uniform;

/// Resamples every day's daytime power trace onto 2^power evenly spaced points over [0, 1].
/// Each resampled column is rescaled so that its sum equals the day's daytime energy,
/// days without positive energy come out as all zeros.
///
/// Days are independent of each other and are processed in parallel, each writing
/// to its own output column.
///
/// # Arguments
///
/// * 'data' - power matrix, samples x days
/// * 'mask' - daytime mask with the same shape as 'data'
/// * 'power' - resolution exponent, the output has 2^power rows
pub fn batch_process(data: &Array2<f64>, mask: &Array2<bool>, power: u32) -> Result<Array2<f64>, ResampleError> {
    if data.dim() != mask.dim() {
        return Err(ShapeError(format!("mask is {:?} but data is {:?}", mask.dim(), data.dim())).into());
    }
    if power == 0 || power > 16 {
        return Err(ResampleError::Resolution(power));
    }

    let n = 1usize << power;
    let days = data.ncols();

    let columns = (0..days).into_par_iter()
        .map(|day| resample_day(data.column(day), mask.column(day), n, day))
        .collect::<Result<Vec<Vec<f64>>, ResampleError>>()?;

    let mut output = Array2::<f64>::zeros((n, days));
    for (day, column) in columns.into_iter().enumerate() {
        output.column_mut(day)
            .iter_mut()
            .zip(column)
            .for_each(|(o, v)| *o = v);
    }

    Ok(output)
}

/// Maps a resampled surface back onto the daytime positions given by the mask.
/// Each restored day is rescaled to carry the same energy as its resampled column,
/// positions outside the mask are zero.
///
/// # Arguments
///
/// * 'data' - resampled surface, 2^power x days
/// * 'mask' - daytime mask of the original power matrix
pub fn undo_batch_process(data: &Array2<f64>, mask: &Array2<bool>) -> Result<Array2<f64>, ResampleError> {
    if data.ncols() != mask.ncols() {
        return Err(ShapeError(format!("{} resampled days for a mask with {} days", data.ncols(), mask.ncols())).into());
    }

    let mut output = Array2::<f64>::zeros(mask.dim());

    for (day, mut out_col) in output.columns_mut().into_iter().enumerate() {
        let msk = mask.column(day);
        let n_pts = msk.iter().filter(|m| **m).count();
        if n_pts == 0 {
            continue;
        }

        let column = data.column(day).to_vec();
        let energy: f64 = column.iter().sum();
        let mut restored = resample_uniform(&column, n_pts)?;
        let total: f64 = restored.iter().sum();
        if total > 0.0 {
            restored.iter_mut().for_each(|v| *v *= energy / total);
        }

        out_col.iter_mut()
            .zip(msk.iter())
            .filter(|(_, m)| **m)
            .zip(restored)
            .for_each(|((o, _), v)| *o = v);
    }

    Ok(output)
}

/// Resamples one day
///
/// # Arguments
///
/// * 'column' - the day's power samples
/// * 'mask' - the day's daytime mask
/// * 'n' - number of output points
/// * 'day' - column index, used in error messages
fn resample_day(column: ArrayView1<f64>, mask: ArrayView1<bool>, n: usize, day: usize) -> Result<Vec<f64>, ResampleError> {
    let values = column.iter()
        .zip(mask.iter())
        .filter(|(_, m)| **m)
        .map(|(v, _)| *v)
        .collect::<Vec<f64>>();

    if values.len() < 2 {
        return Err(ShapeError(format!("day {} has {} daytime samples, at least 2 are needed", day, values.len())).into());
    }

    let energy: f64 = values.iter().sum();
    let resampled = resample_uniform(&values, n)?;
    let total: f64 = resampled.iter().sum();

    if total > 0.0 && energy > 0.0 {
        Ok(resampled.into_iter().map(|v| v * energy / total).collect())
    } else {
        Ok(vec![0.0; n])
    }
}

/// Error depicting errors that occur while resampling power data
///
#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("{0}")]
    InputShape(#[from] ShapeError),
    #[error("resolution exponent {0} is outside 1..=16")]
    Resolution(u32),
    #[error("InterpolationError: {0}")]
    Interpolation(#[from] InterpolationError),
}
