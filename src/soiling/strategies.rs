use crate::config::{LogSoilingParameters, SoilingParameters};
use crate::solver::expressions::{diff, diff_1d};
use crate::solver::{ConvexProblem, Terms, Variable};

/// Length of the seasonal period in days
pub const PERIOD: usize = 365;

/// Reweighting schedule of an iteratively reweighted decomposition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reweighting {
    pub iterations: usize,
    pub eps: f64,
    pub scale: f64,
    /// First differences at or below this magnitude are held flat in the next iteration
    pub freeze_threshold: Option<f64>,
}

/// Problem variables shared by all decompositions
#[derive(Debug, Clone, Copy)]
pub struct ComponentVariables {
    pub soiling: Variable,
    /// May be longer than the series, only the first n values belong to it
    pub seasonal: Variable,
    pub degradation: Variable,
    pub residual: Variable,
}

/// A convex decomposition of a daily series into soiling, seasonal, degradation and residual parts,
/// solved repeatedly with an L1 penalty on the soiling trend's second differences that is
/// reweighted between solves.
pub trait DecompositionStrategy {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Number of days in the series
    fn days(&self) -> usize;

    fn reweighting(&self) -> Reweighting;

    /// Builds the problem for one iteration
    ///
    /// # Arguments
    ///
    /// * 'weights' - L1 weights on the soiling trend's second differences, n - 2 values
    /// * 'frozen' - first differences of the soiling trend held at zero, n - 1 flags
    fn build(&self, weights: &[f64], frozen: &[bool]) -> (ConvexProblem, ComponentVariables);
}

/// Returns true if the series is long enough to estimate a seasonal term
///
/// # Arguments
///
/// * 'days' - series length
pub fn seasonal_estimable(days: usize) -> bool {
    days as f64 >= 0.75 * PERIOD as f64
}

/// Holds the seasonal term periodic with zero mean over its first period,
/// or at zero altogether when it can't be estimated
///
/// # Arguments
///
/// * 'problem' - problem to add constraints to
/// * 'seasonal' - the seasonal variable
/// * 'estimable' - false to force the term to zero
fn seasonal_constraints(problem: &mut ConvexProblem, seasonal: Variable, estimable: bool) {
    let len = seasonal.len();
    if !estimable {
        (0..len).for_each(|t| problem.equal(vec![(seasonal.at(t), 1.0)], 0.0));
        return;
    }

    for t in 0..len.saturating_sub(PERIOD) {
        problem.equal(vec![(seasonal.at(t + PERIOD), 1.0), (seasonal.at(t), -1.0)], 0.0);
    }
    let first_period = (0..len.min(PERIOD)).map(|t| (seasonal.at(t), 1.0)).collect::<Terms>();
    problem.equal(first_period, 0.0);
}

/// Holds the flagged first differences of a variable at zero
fn freeze_flat(problem: &mut ConvexProblem, var: Variable, frozen: &[bool]) {
    diff_1d(var, 1).into_iter()
        .zip(frozen.iter())
        .filter(|(_, f)| **f)
        .for_each(|(row, _)| problem.equal(row, 0.0));
}

/// Decomposition of a raw performance index.
///
/// * residual: quantile loss
/// * soiling: capped from above, rewarded for staying high
/// * seasonal: 2-norm of second differences
/// * degradation: optional, linear from zero
pub struct RawIndexStrategy<'a> {
    observed: &'a [f64],
    index_set: Vec<bool>,
    params: &'a SoilingParameters,
    seasonal: bool,
}

impl<'a> RawIndexStrategy<'a> {
    /// Returns a new RawIndexStrategy
    ///
    /// # Arguments
    ///
    /// * 'observed' - performance index, NaN where missing
    /// * 'index_set' - days that take part in the fit, already cleared of missing values
    /// * 'params' - strategy parameters
    pub fn new(observed: &'a [f64], index_set: Vec<bool>, params: &'a SoilingParameters) -> RawIndexStrategy<'a> {
        RawIndexStrategy {
            observed,
            index_set,
            params,
            seasonal: seasonal_estimable(observed.len()),
        }
    }
}

impl DecompositionStrategy for RawIndexStrategy<'_> {
    fn name(&self) -> &'static str {
        "raw index"
    }

    fn days(&self) -> usize {
        self.observed.len()
    }

    fn reweighting(&self) -> Reweighting {
        Reweighting {
            iterations: self.params.iterations,
            eps: self.params.eps,
            scale: self.params.reweight_scale,
            freeze_threshold: self.params.freeze_threshold,
        }
    }

    fn build(&self, weights: &[f64], frozen: &[bool]) -> (ConvexProblem, ComponentVariables) {
        let n = self.observed.len();
        let p = self.params;
        let mut problem = ConvexProblem::new();

        let soiling = problem.variable(n);
        let seasonal = problem.variable(n.max(PERIOD + 2));
        let degradation = problem.variable(n);
        let residual = problem.variable(n);

        for (i, y) in self.observed.iter().enumerate().filter(|(i, _)| self.index_set[*i]) {
            problem.equal(vec![
                (soiling.at(i), 1.0),
                (seasonal.at(i), 1.0),
                (degradation.at(i), 1.0),
                (residual.at(i), 1.0),
            ], *y);
        }

        seasonal_constraints(&mut problem, seasonal, self.seasonal);
        (0..n).for_each(|i| problem.less_equal(vec![(soiling.at(i), 1.0)], p.soiling_max));

        if p.degradation_term {
            diff_1d(degradation, 2).into_iter().for_each(|row| problem.equal(row, 0.0));
            problem.equal(vec![(degradation.at(0), 1.0)], 0.0);
        } else {
            (0..n).for_each(|i| problem.equal(vec![(degradation.at(i), 1.0)], 0.0));
        }
        freeze_flat(&mut problem, soiling, frozen);

        let residual_rows = residual.indices().into_iter().map(|i| vec![(i, 1.0)]).collect::<Vec<Terms>>();
        problem.pinball(1.0, p.tau, residual_rows);
        if self.seasonal {
            // a zero seasonal term would leave this cone at its apex
            problem.norm2(p.c3, diff(&seasonal.indices()[..n], 2));
        }
        problem.norm1(p.c1, diff_1d(soiling, 2), Some(weights));
        // c2 * sum(1 - s), the constant drops out
        (0..n).for_each(|i| problem.add_linear(soiling.at(i), -p.c2));

        (problem, ComponentVariables { soiling, seasonal, degradation, residual })
    }
}

/// Decomposition of a log10 performance index.
///
/// * residual: weighted 2-norm
/// * soiling: non-positive and sparse
/// * seasonal: squared second differences
/// * degradation: linear from zero
///
/// L1 weights are recomputed from the soiling trend, the term they penalize, not from the residual.
pub struct LogIndexStrategy<'a> {
    data: Vec<f64>,
    known_set: Vec<bool>,
    day_weights: &'a [f64],
    params: &'a LogSoilingParameters,
    seasonal: bool,
}

impl<'a> LogIndexStrategy<'a> {
    /// Returns a new LogIndexStrategy
    ///
    /// # Arguments
    ///
    /// * 'data' - log10 of the performance index, only read where known
    /// * 'known_set' - days that take part in the fit
    /// * 'day_weights' - residual weight per day
    /// * 'params' - strategy parameters
    pub fn new(
        data: Vec<f64>,
        known_set: Vec<bool>,
        day_weights: &'a [f64],
        params: &'a LogSoilingParameters) -> LogIndexStrategy<'a>
    {
        let seasonal = seasonal_estimable(data.len());
        LogIndexStrategy { data, known_set, day_weights, params, seasonal }
    }
}

impl DecompositionStrategy for LogIndexStrategy<'_> {
    fn name(&self) -> &'static str {
        "log index"
    }

    fn days(&self) -> usize {
        self.data.len()
    }

    fn reweighting(&self) -> Reweighting {
        Reweighting {
            iterations: self.params.iterations,
            eps: self.params.eps,
            scale: self.params.reweight_scale,
            freeze_threshold: self.params.freeze_threshold,
        }
    }

    fn build(&self, weights: &[f64], frozen: &[bool]) -> (ConvexProblem, ComponentVariables) {
        let n = self.data.len();
        let p = self.params;
        let mut problem = ConvexProblem::new();

        let residual = problem.variable(n);
        let seasonal = problem.variable(n);
        let soiling = problem.variable(n);
        let degradation = problem.variable(n);

        for (i, y) in self.data.iter().enumerate().filter(|(i, _)| self.known_set[*i]) {
            problem.equal(vec![
                (residual.at(i), 1.0),
                (seasonal.at(i), 1.0),
                (soiling.at(i), 1.0),
                (degradation.at(i), 1.0),
            ], *y);
        }

        seasonal_constraints(&mut problem, seasonal, self.seasonal);
        (0..n).for_each(|i| problem.less_equal(vec![(soiling.at(i), 1.0)], 0.0));
        diff_1d(degradation, 2).into_iter().for_each(|row| problem.equal(row, 0.0));
        problem.equal(vec![(degradation.at(0), 1.0)], 0.0);
        freeze_flat(&mut problem, soiling, frozen);

        let weighted_residual = self.day_weights.iter()
            .enumerate()
            .map(|(i, w)| vec![(residual.at(i), *w)])
            .collect::<Vec<Terms>>();
        problem.norm2(1.0, weighted_residual);
        problem.sum_squares(p.lambda1, diff_1d(seasonal, 2));
        problem.norm1(p.lambda2, diff_1d(soiling, 2), Some(weights));
        problem.norm1(p.lambda3, soiling.indices().into_iter().map(|i| vec![(i, 1.0)]).collect(), None);

        (problem, ComponentVariables { soiling, seasonal, degradation, residual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasonal_needs_three_quarters_of_a_year() {
        assert!(!seasonal_estimable(273));
        assert!(seasonal_estimable(274));
        assert!(seasonal_estimable(730));
    }

    #[test]
    fn raw_seasonal_variable_covers_a_full_period() {
        let params = SoilingParameters::default();
        let observed = vec![1.0; 100];
        let strategy = RawIndexStrategy::new(&observed, vec![true; 100], &params);
        let (_, vars) = strategy.build(&[1.0; 98], &[false; 99]);
        assert_eq!(vars.seasonal.len(), 367);
        assert_eq!(vars.soiling.len(), 100);
    }

    #[test]
    fn short_raw_series_holds_seasonal_at_zero_only() {
        let params = SoilingParameters::default();
        let observed = vec![1.0; 100];
        let strategy = RawIndexStrategy::new(&observed, vec![true; 100], &params);
        let (problem, _) = strategy.build(&[1.0; 98], &[false; 99]);
        // no seasonal smoothness cone, no periodic or zero-mean rows next to the zero rows
        assert_eq!(problem.size().cones, 0);
        // balance 100, seasonal 367, degradation 100, pinball 100, L1 has no equalities
        assert_eq!(problem.size().equalities, 100 + 367 + 100 + 100);
    }

    #[test]
    fn frozen_differences_add_equalities() {
        let params = SoilingParameters::default();
        let observed = vec![1.0; 400];
        let strategy = RawIndexStrategy::new(&observed, vec![true; 400], &params);
        let (free, _) = strategy.build(&[1.0; 398], &[false; 399]);
        let mut frozen = vec![false; 399];
        frozen[10] = true;
        frozen[11] = true;
        let (held, _) = strategy.build(&[1.0; 398], &frozen);
        assert_eq!(held.size().equalities, free.size().equalities + 2);
    }

    #[test]
    fn log_strategy_skips_unknown_days() {
        let params = LogSoilingParameters::default();
        let day_weights = vec![1.0; 10];
        let mut known = vec![true; 10];
        known[4] = false;
        let all = LogIndexStrategy::new(vec![0.0; 10], vec![true; 10], &day_weights, &params);
        let some = LogIndexStrategy::new(vec![0.0; 10], known, &day_weights, &params);
        let (a, _) = all.build(&[1.0; 8], &[false; 9]);
        let (b, _) = some.build(&[1.0; 8], &[false; 9]);
        assert_eq!(a.size().equalities, b.size().equalities + 1);
        assert_eq!(a.size().cones, 1);
    }
}
