use log::info;
use thiserror::Error;
use crate::config::{load_config, Config, LoadConfigurationError};
use crate::logging::{setup_logger, LoggerError};

/// Loads configuration, sets up logging and returns the configuration
///
/// # Arguments
///
/// * 'config_path' - path to the TOML configuration file
pub fn init(config_path: &str) -> Result<Config, InitializationError> {

    // Load configuration
    let config = load_config(config_path)?;

    // Setup logging
    let _ = setup_logger(&config.general.log_path, config.general.log_level, config.general.log_to_stdout)?;

    // Print version
    info!("pv decomposition version: {}", env!("CARGO_PKG_VERSION"));

    Ok(config)
}

/// Error depicting errors that occur while initializing
///
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("ConfigurationError: {0}")]
    ConfigurationError(#[from] LoadConfigurationError),
    #[error("SetupLoggerError: {0}")]
    SetupLoggerError(#[from] LoggerError),
}
