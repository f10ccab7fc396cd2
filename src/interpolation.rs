use crate::errors::InterpolationError;

/// Struct for making a piecewise linear interpolation that extrapolates
/// outside the control points along the first and last segments
///
pub struct LinearInterpolator {
    m_x: Vec<f64>,
    m_y: Vec<f64>,
}

impl LinearInterpolator {
    /// Returns a new instance with control points sorted on x
    ///
    /// # Arguments
    ///
    /// * 'x' - control point abscissae, in any order
    /// * 'y' - control point values
    pub fn new(x: &[f64], y: &[f64]) -> Result<LinearInterpolator, InterpolationError> {
        if x.len() != y.len() {
            return Err(InterpolationError::UnequalLengths(x.len(), y.len()));
        }
        if x.len() < 2 {
            return Err(InterpolationError::IllegalLength(x.len()));
        }

        let mut points = x.iter()
            .zip(y.iter())
            .map(|(&x, &y)| (x, y))
            .collect::<Vec<(f64, f64)>>();
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(InterpolationError::ControlPoint);
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        if points.windows(2).any(|w| w[1].0 - w[0].0 <= 0.0) {
            return Err(InterpolationError::ControlPoint);
        }

        let (m_x, m_y): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();

        Ok(LinearInterpolator { m_x, m_y })
    }

    /// Interpolates a y for the given point, extrapolating linearly beyond the ends
    ///
    /// # Arguments
    ///
    /// * 'point' - x to get an interpolated y for
    pub fn interpolate(&self, point: f64) -> f64 {
        let n = self.m_x.len();

        // Index of the segment start; the end segments also serve extrapolation
        let i = match self.m_x.partition_point(|&x| x <= point) {
            0 => 0,
            p if p >= n => n - 2,
            p => p - 1,
        };

        let (x0, x1) = (self.m_x[i], self.m_x[i + 1]);
        let (y0, y1) = (self.m_y[i], self.m_y[i + 1]);

        y0 + (point - x0) * (y1 - y0) / (x1 - x0)
    }
}

/// Linearly resamples values sitting on an even grid over [0, 1] onto another
/// even grid over [0, 1] with `n_out` points
///
/// # Arguments
///
/// * 'values' - samples on `linspace(0, 1, values.len())`, at least two
/// * 'n_out' - number of output points
pub fn resample_uniform(values: &[f64], n_out: usize) -> Result<Vec<f64>, InterpolationError> {
    let n_in = values.len();
    if n_in < 2 {
        return Err(InterpolationError::IllegalLength(n_in));
    }

    let last = (n_in - 1) as f64;
    let step = if n_out > 1 { 1.0 / (n_out - 1) as f64 } else { 0.0 };

    let resampled = (0..n_out)
        .map(|i| {
            let pos = i as f64 * step * last;
            let k = (pos.floor() as usize).min(n_in - 2);
            let frac = pos - k as f64;
            values[k] + frac * (values[k + 1] - values[k])
        })
        .collect::<Vec<f64>>();

    Ok(resampled)
}
