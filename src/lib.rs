//! Decomposition of PV power signals.
//!
//! Separates shade losses from clear sky power by aggregating clear days on solar declination,
//! and separates soiling, seasonal and degradation trends from a daily performance index.

pub mod config;
pub mod declination;
pub mod errors;
pub mod initialization;
pub mod interpolation;
pub mod logging;
pub mod models;
pub mod resampling;
pub mod shade;
pub mod soiling;
pub mod solver;

pub use config::Config;
pub use models::{PowerData, RunStatus};
pub use shade::{ShadeAnalysis, ShadeError};
pub use soiling::{soiling_separation, soiling_separation_log, SoilingDecomposition, SoilingError};
