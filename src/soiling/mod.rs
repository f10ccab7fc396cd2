use log::{debug, info, warn};
use crate::config::{LogSoilingParameters, SoilingParameters, SolverParameters};
use crate::errors::ShapeError;

pub mod errors;
pub mod models;
pub mod strategies;

pub use errors::SoilingError;
pub use models::{DecompositionWarning, Scale, SoilingDecomposition};
use strategies::{seasonal_estimable, DecompositionStrategy, LogIndexStrategy, RawIndexStrategy, PERIOD};

/// Components of the last iteration of a reweighted decomposition
#[derive(Debug, Clone)]
pub struct Components {
    pub soiling: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub degradation: Vec<f64>,
    pub residual: Vec<f64>,
    /// Weights used in the last iteration
    pub weights: Vec<f64>,
}

/// Returns new L1 weights from the second differences of a soiling trend, `1 / (eps + scale * |d2|)`
///
/// # Arguments
///
/// * 'soiling' - soiling trend from the previous iteration
/// * 'eps' - keeps weights finite where the trend is straight
/// * 'scale' - scale of the second differences
pub fn reweight(soiling: &[f64], eps: f64, scale: f64) -> Vec<f64> {
    soiling.windows(3)
        .map(|w| 1.0 / (eps + scale * (w[2] - 2.0 * w[1] + w[0]).abs()))
        .collect()
}

/// Flags the first differences of a soiling trend that are flat within a threshold
///
/// # Arguments
///
/// * 'soiling' - soiling trend from the previous iteration
/// * 'threshold' - largest magnitude counted as flat
pub fn flat_segments(soiling: &[f64], threshold: f64) -> Vec<bool> {
    soiling.windows(2)
        .map(|w| (w[1] - w[0]).abs() <= threshold)
        .collect()
}

/// Runs a fixed number of reweighted solves of a decomposition strategy and returns the components
/// of the last one. Every iteration gets its own snapshot of weights and frozen differences
/// computed from the previous iteration's soiling trend.
///
/// # Arguments
///
/// * 'strategy' - the decomposition to solve
/// * 'solver' - conic solver settings
pub fn decompose<S: DecompositionStrategy>(strategy: &S, solver: &SolverParameters) -> Result<Components, SoilingError> {
    let n = strategy.days();
    let schedule = strategy.reweighting();
    if n < 3 {
        return Err(SoilingError::InputShape(format!("at least 3 days are needed, got {}", n)));
    }
    if schedule.iterations == 0 {
        return Err(SoilingError::InputShape("at least one iteration is needed".into()));
    }

    let mut weights = vec![1.0; n - 2];
    let mut frozen = vec![false; n - 1];
    let mut last: Option<Components> = None;

    for iteration in 0..schedule.iterations {
        let (problem, vars) = strategy.build(&weights, &frozen);
        debug!("{} iteration {}: {:?}, {} differences frozen",
            strategy.name(), iteration, problem.size(), frozen.iter().filter(|f| **f).count());

        let solution = problem.solve(solver)
            .map_err(|e| SoilingError::OptimizationFailed { iteration, status: e.status })?;
        debug!("{} iteration {} objective {:.6}", strategy.name(), iteration, solution.objective);

        let soiling = solution.value(vars.soiling);
        let mut seasonal = solution.value(vars.seasonal);
        seasonal.truncate(n);

        let next_weights = reweight(&soiling, schedule.eps, schedule.scale);
        if let Some(threshold) = schedule.freeze_threshold {
            frozen = flat_segments(&soiling, threshold);
        }

        last = Some(Components {
            soiling,
            seasonal,
            degradation: solution.value(vars.degradation),
            residual: solution.value(vars.residual),
            weights: std::mem::replace(&mut weights, next_weights),
        });
    }

    last.ok_or_else(|| SoilingError::InputShape("no iteration was run".into()))
}

/// Checks an optional mask against the series length
fn check_mask(name: &str, mask: Option<&[bool]>, n: usize) -> Result<(), ShapeError> {
    match mask {
        Some(m) if m.len() != n => Err(ShapeError(format!("{} has {} values for {} days", name, m.len(), n))),
        _ => Ok(()),
    }
}

/// Logs and returns the insufficient data warning for short series
fn seasonal_warning(n: usize) -> Option<DecompositionWarning> {
    if seasonal_estimable(n) {
        return None;
    }
    let required = (0.75 * PERIOD as f64).ceil() as usize;
    warn!("only {} days, {} needed for a seasonal estimate, seasonal term held at zero", n, required);
    Some(DecompositionWarning::InsufficientData { days: n, required })
}

/// Separates a raw daily performance index into soiling, seasonal, degradation and residual parts
///
/// # Arguments
///
/// * 'observed' - daily performance index, NaN where missing
/// * 'index_set' - days to fit, all non-missing days if None
/// * 'params' - parameters of the raw index decomposition
/// * 'solver' - conic solver settings
pub fn soiling_separation(
    observed: &[f64],
    index_set: Option<&[bool]>,
    params: &SoilingParameters,
    solver: &SolverParameters) -> Result<SoilingDecomposition, SoilingError>
{
    let n = observed.len();
    check_mask("index set", index_set, n)?;

    let index_set = observed.iter()
        .enumerate()
        .map(|(i, v)| !v.is_nan() && index_set.is_none_or(|m| m[i]))
        .collect::<Vec<bool>>();
    if !index_set.iter().any(|k| *k) {
        return Err(SoilingError::InputShape("no days to fit".into()));
    }

    info!("soiling separation on {} days, {} in index set", n, index_set.iter().filter(|k| **k).count());
    let warnings = seasonal_warning(n).into_iter().collect::<Vec<DecompositionWarning>>();

    let strategy = RawIndexStrategy::new(observed, index_set, params);
    let components = decompose(&strategy, solver)?;

    Ok(SoilingDecomposition {
        soiling: components.soiling,
        seasonal: components.seasonal,
        degradation: components.degradation,
        residual: components.residual,
        scale: Scale::Raw,
        weights: components.weights,
        warnings,
    })
}

/// Separates a daily performance index in the log10 domain into soiling, seasonal, degradation
/// and residual parts. All returned components are log10 values.
///
/// # Arguments
///
/// * 'observed' - daily performance index, NaN where missing
/// * 'known_set' - days to fit, all non-missing days if None
/// * 'weights' - residual weight per day, all ones if None
/// * 'params' - parameters of the log index decomposition
/// * 'solver' - conic solver settings
pub fn soiling_separation_log(
    observed: &[f64],
    known_set: Option<&[bool]>,
    weights: Option<&[f64]>,
    params: &LogSoilingParameters,
    solver: &SolverParameters) -> Result<SoilingDecomposition, SoilingError>
{
    let n = observed.len();
    check_mask("known set", known_set, n)?;

    let ones = vec![1.0; n];
    let day_weights = match weights {
        Some(w) if w.len() != n =>
            return Err(SoilingError::InputShape(format!("{} weights for {} days", w.len(), n))),
        Some(w) => w,
        None => ones.as_slice(),
    };

    let mut known = known_set.map_or_else(|| observed.iter().map(|v| !v.is_nan()).collect(), |k| k.to_vec());
    let data = observed.iter().map(|v| v.log10()).collect::<Vec<f64>>();

    let mut warnings = Vec::new();
    let mut unusable = 0;
    for (k, d) in known.iter_mut().zip(data.iter()) {
        if *k && !d.is_finite() {
            *k = false;
            unusable += 1;
        }
    }
    if unusable > 0 {
        warn!("{} known values can't be log transformed and are left out", unusable);
        warnings.push(DecompositionWarning::DroppedObservations { count: unusable });
    }
    if !known.iter().any(|k| *k) {
        return Err(SoilingError::InputShape("no days to fit".into()));
    }

    info!("log soiling separation on {} days, {} known", n, known.iter().filter(|k| **k).count());
    warnings.extend(seasonal_warning(n));

    let strategy = LogIndexStrategy::new(data, known, day_weights, params);
    let components = decompose(&strategy, solver)?;

    Ok(SoilingDecomposition {
        soiling: components.soiling,
        seasonal: components.seasonal,
        degradation: components.degradation,
        residual: components.residual,
        scale: Scale::Log10,
        weights: components.weights,
        warnings,
    })
}
