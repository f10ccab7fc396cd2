use ndarray::Array2;
use serde::Serialize;

/// The three parts of a declination-indexed surface, `surface = residual + clear_sky - shade`
#[derive(Serialize, Clone, Debug)]
pub struct ShadeComponents {
    pub residual: Array2<f64>,
    pub clear_sky: Array2<f64>,
    pub shade: Array2<f64>,
}

/// Modeled and empirical daily energy over a canonical 365 day year
#[derive(Serialize, Clone, Debug)]
pub struct YearlyEnergy {
    /// Shade loss per day of year, index 0 is January 1st
    pub daily_shade_loss: Vec<f64>,
    /// Unshaded energy per day of year
    pub daily_clear_energy: Vec<f64>,
    /// Clear energy less shade loss
    pub daily_modeled_energy: Vec<f64>,
    /// Mean measured energy of clear days, as (day of year, energy)
    pub avg_energy: Vec<(u32, f64)>,
}
