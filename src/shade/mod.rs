use std::collections::BTreeMap;
use log::{debug, error, info};
use ndarray::{Array2, Axis};
use crate::config::{ShadeParameters, SolverParameters};
use crate::declination::{aggregate_by_declination, delta_cooper, DeclinationSurface};
use crate::interpolation::LinearInterpolator;
use crate::models::{PowerData, RunStatus};
use crate::resampling::batch_process;
use crate::solver::expressions::diff_2d;
use crate::solver::{ConvexProblem, Terms, Variable};

pub mod errors;
pub mod models;

pub use errors::ShadeError;
pub use models::{ShadeComponents, YearlyEnergy};

/// Days in the canonical year used for yearly energy reconstruction
const DAYS_IN_YEAR: u32 = 365;

/// Separates shade losses from clear sky power in a PV plant's history.
///
/// The analysis owns its input data and keeps the outcome of the last run. Results are only
/// available after a successful run, a failed run leaves no partial results behind and the
/// next call to `run` tries again.
pub struct ShadeAnalysis {
    data: PowerData,
    params: ShadeParameters,
    solver: SolverParameters,
    status: RunStatus,
    data_normalized: Option<Array2<f64>>,
    data_transformed: Option<DeclinationSurface>,
    components: Option<ShadeComponents>,
    yearly_energy: Option<YearlyEnergy>,
}

impl ShadeAnalysis {
    /// Returns a new ShadeAnalysis that has not been run
    ///
    /// # Arguments
    ///
    /// * 'data' - preprocessed power data
    /// * 'params' - shade separation parameters
    /// * 'solver' - conic solver settings
    pub fn new(data: PowerData, params: ShadeParameters, solver: SolverParameters) -> ShadeAnalysis {
        ShadeAnalysis {
            data,
            params,
            solver,
            status: RunStatus::NotRun,
            data_normalized: None,
            data_transformed: None,
            components: None,
            yearly_energy: None,
        }
    }

    /// Separates shade from clear sky power. Does nothing if a previous run succeeded.
    pub fn run(&mut self) -> Result<(), ShadeError> {
        if self.status == RunStatus::Succeeded {
            debug!("shade analysis already run, keeping results");
            return Ok(());
        }

        self.status = RunStatus::Running;
        self.data_normalized = None;
        self.data_transformed = None;
        self.components = None;
        self.yearly_energy = None;

        info!("running shade analysis on {} days, power {}", self.data.num_days(), self.params.power);
        match self.separate() {
            Ok((normalized, transformed, components)) => {
                self.data_normalized = Some(normalized);
                self.data_transformed = Some(transformed);
                self.components = Some(components);
                self.status = RunStatus::Succeeded;
                info!("shade analysis done");
                Ok(())
            },
            Err(e) => {
                error!("shade analysis failed: {}", e);
                self.status = RunStatus::Failed(e.to_string());
                Err(e)
            },
        }
    }

    fn separate(&self) -> Result<(Array2<f64>, DeclinationSurface, ShadeComponents), ShadeError> {
        let normalized = batch_process(&self.data.filled_data_matrix, &self.data.daytime, self.params.power)?;
        let transformed = aggregate_by_declination(
            &normalized,
            &self.data.days_of_year(),
            &self.data.clear_days,
            self.params.declination_bucket)?;
        debug!("aggregated {} clear days into {} declination buckets",
            self.data.clear_days.iter().filter(|c| **c).count(), transformed.keys.len());

        let components = separate_shade(&transformed.surface, &self.params, &self.solver)?;

        Ok((normalized, transformed, components))
    }

    /// Reconstructs daily shade loss and clear sky energy over a 365 day year from the separated
    /// components. Runs the analysis first if needed.
    pub fn analyze_yearly_energy(&mut self) -> Result<&YearlyEnergy, ShadeError> {
        self.run()?;

        if self.yearly_energy.is_none() {
            let (Some(transformed), Some(components)) = (&self.data_transformed, &self.components) else {
                return Err(ShadeError::InputShape("shade components missing after run".into()));
            };
            let yearly = yearly_energy(&transformed.keys, components, &self.data)?;
            self.yearly_energy = Some(yearly);
        }

        self.yearly_energy.as_ref()
            .ok_or_else(|| ShadeError::InputShape("yearly energy missing".into()))
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn has_run(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn data(&self) -> &PowerData {
        &self.data
    }

    /// Resampled power matrix, 2^power x days
    pub fn data_normalized(&self) -> Option<&Array2<f64>> {
        self.data_normalized.as_ref()
    }

    /// Declination-aggregated surface with its bucket keys
    pub fn data_transformed(&self) -> Option<&DeclinationSurface> {
        self.data_transformed.as_ref()
    }

    pub fn residual_component(&self) -> Option<&Array2<f64>> {
        self.components.as_ref().map(|c| &c.residual)
    }

    pub fn clear_sky_component(&self) -> Option<&Array2<f64>> {
        self.components.as_ref().map(|c| &c.clear_sky)
    }

    pub fn shade_component(&self) -> Option<&Array2<f64>> {
        self.components.as_ref().map(|c| &c.shade)
    }

    pub fn yearly_energy(&self) -> Option<&YearlyEnergy> {
        self.yearly_energy.as_ref()
    }
}

/// Variables of the shade separation problem, each a row-major matrix shaped like the surface
struct ShadeVariables {
    residual: Variable,
    clear_sky: Variable,
    shade: Variable,
}

/// Builds the shade separation problem for a declination-aggregated surface.
///
/// The surface is split as `surface = residual + clear_sky - shade` where
/// * the residual takes an asymmetric quantile loss
/// * clear sky is non-negative and zero at sunrise and sunset, with non-positive fourth
///   differences over the day and non-positive second differences over declination
/// * shade is non-negative, and its total mass is penalized
///
/// # Arguments
///
/// * 'surface' - aggregated surface, buckets x time-of-day points
/// * 'params' - shade separation parameters
fn make_shade_problem(surface: &Array2<f64>, params: &ShadeParameters) -> (ConvexProblem, ShadeVariables) {
    let (m, n) = surface.dim();
    let shape = (m, n);
    let mut problem = ConvexProblem::new();

    let residual = problem.variable(m * n);
    let clear_sky = problem.variable(m * n);
    let shade = problem.variable(m * n);

    for (k, y) in surface.iter().enumerate() {
        problem.equal(vec![(residual.at(k), 1.0), (clear_sky.at(k), 1.0), (shade.at(k), -1.0)], *y);
    }

    problem.non_negative(clear_sky);
    problem.non_negative(shade);
    for r in 0..m {
        problem.equal(vec![(clear_sky.at(r * n), 1.0)], 0.0);
        problem.equal(vec![(clear_sky.at(r * n + n - 1), 1.0)], 0.0);
    }
    for row in diff_2d(clear_sky, shape, 4, Axis(1)) {
        problem.less_equal(row, 0.0);
    }
    for row in diff_2d(clear_sky, shape, 2, Axis(0)) {
        problem.less_equal(row, 0.0);
    }

    let residual_rows = residual.indices().into_iter().map(|i| vec![(i, 1.0)]).collect::<Vec<Terms>>();
    problem.pinball(params.residual_weight, params.tau, residual_rows);

    let mut clear_sky_curvature = diff_2d(clear_sky, shape, 2, Axis(0));
    clear_sky_curvature.extend(diff_2d(clear_sky, shape, 2, Axis(1)));
    problem.sum_squares(params.clear_sky_smoothness, clear_sky_curvature);

    let mut shade_curvature = diff_2d(shade, shape, 2, Axis(0));
    shade_curvature.extend(diff_2d(shade, shape, 2, Axis(1)));
    problem.sum_squares(params.shade_smoothness, shade_curvature);

    (0..shade.len()).for_each(|i| problem.add_linear(shade.at(i), params.shade_mass));

    (problem, ShadeVariables { residual, clear_sky, shade })
}

/// Separates an aggregated surface into residual, clear sky and shade components
///
/// # Arguments
///
/// * 'surface' - aggregated surface, buckets x time-of-day points
/// * 'params' - shade separation parameters
/// * 'solver' - conic solver settings
pub fn separate_shade(
    surface: &Array2<f64>,
    params: &ShadeParameters,
    solver: &SolverParameters) -> Result<ShadeComponents, ShadeError>
{
    let (m, n) = surface.dim();
    if m == 0 || n < 2 {
        return Err(ShadeError::InputShape(format!("surface {:?} is too small to separate", (m, n))));
    }
    if surface.iter().any(|v| !v.is_finite()) {
        return Err(ShadeError::InputShape("surface holds non-finite values".into()));
    }

    let (problem, vars) = make_shade_problem(surface, params);
    debug!("shade problem size: {:?}", problem.size());

    let solution = problem.solve(solver)?;
    info!("shade problem solved with status {}, objective {:.4}", solution.status, solution.objective);

    let reshape = |var: Variable| Array2::from_shape_vec((m, n), solution.value(var))
        .map_err(|e| ShadeError::InputShape(e.to_string()));

    Ok(ShadeComponents {
        residual: reshape(vars.residual)?,
        clear_sky: reshape(vars.clear_sky)?,
        shade: reshape(vars.shade)?,
    })
}

/// Reconstructs daily energy over the days 1..=365 by interpolating the per-bucket energy of the
/// separated components at each day's declination.
///
/// # Arguments
///
/// * 'keys' - bucket declinations, one per surface row
/// * 'components' - separated components
/// * 'data' - the power data the components were derived from
pub fn yearly_energy(keys: &[f64], components: &ShadeComponents, data: &PowerData) -> Result<YearlyEnergy, ShadeError> {
    if keys.len() != components.shade.nrows() || keys.len() != components.clear_sky.nrows() {
        return Err(ShadeError::InputShape(format!(
            "{} declination keys for {} surface rows", keys.len(), components.shade.nrows())));
    }

    let scale = data.data_sampling / 60.0;
    let shade_energy = components.shade.sum_axis(Axis(1)).iter().map(|v| v * scale).collect::<Vec<f64>>();
    let clear_energy = components.clear_sky.sum_axis(Axis(1)).iter().map(|v| v * scale).collect::<Vec<f64>>();

    let shade_loss = LinearInterpolator::new(keys, &shade_energy)?;
    let clear = LinearInterpolator::new(keys, &clear_energy)?;

    let deltas = (1..=DAYS_IN_YEAR).map(|d| delta_cooper(d as f64)).collect::<Vec<f64>>();
    let daily_shade_loss = deltas.iter().map(|d| shade_loss.interpolate(*d)).collect::<Vec<f64>>();
    let daily_clear_energy = deltas.iter().map(|d| clear.interpolate(*d)).collect::<Vec<f64>>();
    let daily_modeled_energy = daily_clear_energy.iter()
        .zip(daily_shade_loss.iter())
        .map(|(c, s)| c - s)
        .collect::<Vec<f64>>();

    let mut groups: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for (day, doy) in data.days_of_year().into_iter().enumerate().filter(|(d, _)| data.clear_days[*d]) {
        let energy: f64 = data.filled_data_matrix.column(day).sum();
        let entry = groups.entry(doy).or_insert((0.0, 0));
        entry.0 += energy;
        entry.1 += 1;
    }
    let avg_energy = groups.into_iter()
        .map(|(doy, (sum, count))| (doy, sum / count as f64 * scale))
        .collect::<Vec<(u32, f64)>>();

    Ok(YearlyEnergy {
        daily_shade_loss,
        daily_clear_energy,
        daily_modeled_energy,
        avg_energy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bell_surface(m: usize, n: usize) -> Array2<f64> {
        Array2::from_shape_fn((m, n), |(_, c)| {
            let t = c as f64 / (n - 1) as f64;
            4.0 * t * (1.0 - t)
        })
    }

    fn power_data(days: usize) -> PowerData {
        let rows = 24;
        let matrix = Array2::from_shape_fn((rows, days), |(r, _)| {
            if (6..18).contains(&r) { ((r - 5) as f64 * std::f64::consts::PI / 13.0).sin() } else { 0.0 }
        });
        let daytime = Array2::from_shape_fn((rows, days), |(r, _)| (6..18).contains(&r));
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        PowerData::new(matrix, daytime, vec![true; days], start.iter_days().take(days).collect(), None).unwrap()
    }

    #[test]
    fn problem_has_one_balance_row_per_cell() {
        let surface = bell_surface(3, 8);
        let (problem, vars) = make_shade_problem(&surface, &ShadeParameters::default());
        assert_eq!(vars.residual.len(), 24);
        assert_eq!(vars.shade.at(0), 48);
        // balance rows, two boundary rows per bucket, squared-term rows and pinball rows
        assert!(problem.size().equalities >= 24 + 6 + 24);
    }

    #[test]
    fn components_satisfy_the_decomposition() {
        let mut surface = bell_surface(5, 16);
        for r in 2..4 {
            for c in 9..13 {
                surface[[r, c]] *= 0.6;
            }
        }
        let comps = separate_shade(&surface, &ShadeParameters::default(), &SolverParameters::default()).unwrap();

        for ((y, (res, cs)), sh) in surface.iter()
            .zip(comps.residual.iter().zip(comps.clear_sky.iter()))
            .zip(comps.shade.iter())
        {
            assert!((y - (res + cs - sh)).abs() < 1e-5);
            assert!(*cs >= -1e-6);
            assert!(*sh >= -1e-6);
        }
        for r in 0..5 {
            assert!(comps.clear_sky[[r, 0]].abs() < 1e-6);
            assert!(comps.clear_sky[[r, 15]].abs() < 1e-6);
        }
    }

    #[test]
    fn rejects_degenerate_surface() {
        let surface = Array2::<f64>::zeros((3, 1));
        let err = separate_shade(&surface, &ShadeParameters::default(), &SolverParameters::default()).unwrap_err();
        assert!(matches!(err, ShadeError::InputShape(_)));
    }

    #[test]
    fn failed_solve_leaves_no_results() {
        let solver = SolverParameters { max_iter: 1, ..SolverParameters::default() };
        let params = ShadeParameters { power: 4, ..ShadeParameters::default() };
        let mut analysis = ShadeAnalysis::new(power_data(365), params, solver);
        assert_eq!(*analysis.status(), RunStatus::NotRun);

        let err = analysis.run().unwrap_err();
        assert!(matches!(err, ShadeError::OptimizationFailed { .. }));
        assert!(matches!(analysis.status(), RunStatus::Failed(_)));
        assert!(!analysis.has_run());
        assert!(analysis.shade_component().is_none());
        assert!(analysis.data_transformed().is_none());
    }

    #[test]
    fn missing_daytime_fails_before_solving() {
        let mut data = power_data(10);
        data.daytime.column_mut(3).fill(false);
        let mut analysis = ShadeAnalysis::new(data, ShadeParameters::default(), SolverParameters::default());
        let err = analysis.run().unwrap_err();
        assert!(matches!(err, ShadeError::InputShape(_)));
        assert!(analysis.status().to_string().starts_with("Failed"));
    }

    #[test]
    fn yearly_energy_interpolates_per_bucket_energy() {
        let data = power_data(2);
        let keys = vec![20.0, -20.0];
        let components = ShadeComponents {
            residual: Array2::zeros((2, 4)),
            clear_sky: Array2::from_shape_vec((2, 4), vec![1.0, 2.0, 2.0, 1.0, 0.5, 1.0, 1.0, 0.5]).unwrap(),
            shade: Array2::from_shape_vec((2, 4), vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.0]).unwrap(),
        };
        let yearly = yearly_energy(&keys, &components, &data).unwrap();

        assert_eq!(yearly.daily_clear_energy.len(), 365);
        // Hourly data, so bucket energies are the plain row sums: clear 6 and 3, shade 0 and 1
        let summer = yearly.daily_clear_energy[171];
        assert!(summer > 6.0, "{}", summer);
        let equinox = yearly.daily_clear_energy[79];
        assert!((equinox - 4.5).abs() < 0.2, "{}", equinox);
        assert!((yearly.daily_shade_loss[79] - 0.5).abs() < 0.05);
        for ((m, c), s) in yearly.daily_modeled_energy.iter()
            .zip(yearly.daily_clear_energy.iter())
            .zip(yearly.daily_shade_loss.iter())
        {
            assert!((m - (c - s)).abs() < 1e-12);
        }

        assert_eq!(yearly.avg_energy.len(), 2);
        assert_eq!(yearly.avg_energy[0].0, 1);
        let day_energy: f64 = data.filled_data_matrix.column(0).sum();
        assert!((yearly.avg_energy[0].1 - day_energy).abs() < 1e-12);
    }
}
