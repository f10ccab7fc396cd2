use std::fs;
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct General {
    pub log_path: String,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
}

impl Default for General {
    fn default() -> Self {
        General {
            log_path: "pv_decomposition.log".into(),
            log_level: LevelFilter::Info,
            log_to_stdout: false,
        }
    }
}

/// Settings handed to the conic solver on every solve
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct SolverParameters {
    pub max_iter: u32,
    /// Seconds per solve, the only deadline the solver offers
    pub time_limit: f64,
    pub tol_gap_abs: f64,
    pub tol_gap_rel: f64,
    pub tol_feas: f64,
    pub verbose: bool,
}

impl Default for SolverParameters {
    fn default() -> Self {
        SolverParameters {
            max_iter: 200,
            time_limit: f64::INFINITY,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
            tol_feas: 1e-8,
            verbose: false,
        }
    }
}

/// Shade separation parameters
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ShadeParameters {
    /// Resampled day length is 2^power
    pub power: u32,
    /// Quantile of the residual loss
    pub tau: f64,
    pub residual_weight: f64,
    pub clear_sky_smoothness: f64,
    pub shade_smoothness: f64,
    pub shade_mass: f64,
    /// Declination bucket width in degrees
    pub declination_bucket: f64,
}

impl Default for ShadeParameters {
    fn default() -> Self {
        ShadeParameters {
            power: 8,
            tau: 0.85,
            residual_weight: 20.0,
            clear_sky_smoothness: 10.0,
            shade_smoothness: 100.0,
            shade_mass: 0.8,
            declination_bucket: 1.0,
        }
    }
}

/// Parameters for soiling separation on a raw performance index
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct SoilingParameters {
    /// Quantile of the residual loss
    pub tau: f64,
    /// Piecewise-linear weight on the soiling trend
    pub c1: f64,
    /// Sparseness weight on the soiling trend
    pub c2: f64,
    /// Smoothness weight on the seasonal term
    pub c3: f64,
    pub iterations: usize,
    pub soiling_max: f64,
    pub degradation_term: bool,
    pub eps: f64,
    pub reweight_scale: f64,
    /// First differences at or below this magnitude are frozen flat in the next iteration
    pub freeze_threshold: Option<f64>,
}

impl Default for SoilingParameters {
    fn default() -> Self {
        SoilingParameters {
            tau: 0.85,
            c1: 2.0,
            c2: 1e-2,
            c3: 100.0,
            iterations: 5,
            soiling_max: 1.0,
            degradation_term: false,
            eps: 0.01,
            reweight_scale: 100.0,
            freeze_threshold: Some(5e-5),
        }
    }
}

/// Parameters for soiling separation on a log10 performance index
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct LogSoilingParameters {
    pub iterations: usize,
    /// Smoothness weight on the seasonal term
    pub lambda1: f64,
    /// Piecewise-linear weight on the soiling trend
    pub lambda2: f64,
    /// Sparseness weight on the soiling trend
    pub lambda3: f64,
    pub eps: f64,
    pub reweight_scale: f64,
    pub freeze_threshold: Option<f64>,
}

impl Default for LogSoilingParameters {
    fn default() -> Self {
        LogSoilingParameters {
            iterations: 5,
            lambda1: 500.0,
            lambda2: 0.1,
            lambda3: 1e-5,
            eps: 1e-5,
            reweight_scale: 1.0,
            freeze_threshold: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub general: General,
    pub solver: SolverParameters,
    pub shade: ShadeParameters,
    pub soiling: SoilingParameters,
    pub soiling_log: LogSoilingParameters,
}

/// A configuration value that is out of range
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidField {
    /// Dotted field path, e.g. `shade.tau`
    pub field: String,
    pub message: String,
}

impl Config {
    /// Parses configuration from a TOML string
    ///
    /// # Arguments
    ///
    /// * 'toml' - configuration text
    pub fn from_toml_str(toml: &str) -> Result<Config, LoadConfigurationError> {
        toml::from_str(toml).map_err(|e| LoadConfigurationError::Parse(e.to_string()))
    }

    /// Validates all fields and returns the ones out of range, empty if all is fine
    pub fn validate(&self) -> Vec<InvalidField> {
        let mut invalid = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                invalid.push(InvalidField { field: field.into(), message: message.into() });
            }
        };

        check(self.solver.max_iter > 0, "solver.max_iter", "must be > 0");
        check(self.solver.time_limit > 0.0, "solver.time_limit", "must be > 0");

        let s = &self.shade;
        check((3..=12).contains(&s.power), "shade.power", "must be in 3..=12");
        check(s.tau > 0.0 && s.tau < 1.0, "shade.tau", "must be in (0, 1)");
        check(s.declination_bucket > 0.0, "shade.declination_bucket", "must be > 0");
        check(s.residual_weight >= 0.0 && s.clear_sky_smoothness >= 0.0 && s.shade_smoothness >= 0.0 && s.shade_mass >= 0.0,
              "shade", "weights must be >= 0");

        let so = &self.soiling;
        check(so.tau > 0.0 && so.tau < 1.0, "soiling.tau", "must be in (0, 1)");
        check(so.iterations > 0, "soiling.iterations", "must be > 0");
        check(so.eps > 0.0, "soiling.eps", "must be > 0");
        check(so.c1 >= 0.0 && so.c2 >= 0.0 && so.c3 >= 0.0, "soiling", "weights must be >= 0");

        let sl = &self.soiling_log;
        check(sl.iterations > 0, "soiling_log.iterations", "must be > 0");
        check(sl.eps > 0.0, "soiling_log.eps", "must be > 0");
        check(sl.lambda1 >= 0.0 && sl.lambda2 >= 0.0 && sl.lambda3 >= 0.0, "soiling_log", "weights must be >= 0");

        invalid
    }
}

/// Loads the configuration file and returns a struct with all configuration items
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn load_config(config_path: &str) -> Result<Config, LoadConfigurationError> {
    let toml = fs::read_to_string(config_path)?;
    let config = Config::from_toml_str(&toml)?;

    let invalid = config.validate();
    if !invalid.is_empty() {
        let fields = invalid.iter()
            .map(|f| format!("{}: {}", f.field, f.message))
            .collect::<Vec<String>>()
            .join(", ");
        return Err(LoadConfigurationError::Invalid(fields));
    }

    Ok(config)
}

/// Error depicting errors that occur while loading the configuration
///
#[derive(Debug, Error)]
pub enum LoadConfigurationError {
    #[error("FileError: {0}")]
    File(#[from] std::io::Error),
    #[error("ParseError: {0}")]
    Parse(String),
    #[error("InvalidConfiguration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(r#"
[shade]
power = 6

[soiling]
degradation_term = true
freeze_threshold = 1e-4
"#).unwrap();
        assert_eq!(config.shade.power, 6);
        assert!((config.shade.tau - 0.85).abs() < 1e-12);
        assert!(config.soiling.degradation_term);
        assert_eq!(config.soiling.freeze_threshold, Some(1e-4));
        assert_eq!(config.soiling_log.freeze_threshold, None);
        assert_eq!(config.solver.max_iter, 200);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::from_toml_str("[shade]\nbogus = 1\n").is_err());
    }

    #[test]
    fn validation_flags_bad_quantile() {
        let mut config = Config::default();
        config.soiling.tau = 1.5;
        config.shade.power = 0;
        let invalid = config.validate();
        assert!(invalid.iter().any(|f| f.field == "soiling.tau"));
        assert!(invalid.iter().any(|f| f.field == "shade.power"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[general]\nlog_level = \"debug\"\nlog_to_stdout = true\n\n[solver]\nmax_iter = 50").unwrap();
        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.general.log_level, LevelFilter::Debug);
        assert_eq!(config.solver.max_iter, 50);
    }

    #[test]
    fn invalid_file_values_fail_loading() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[soiling]\niterations = 0").unwrap();
        let err = load_config(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LoadConfigurationError::Invalid(_)));
    }
}
