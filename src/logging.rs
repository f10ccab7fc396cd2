use log::{LevelFilter, SetLoggerError};
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;
use thiserror::Error;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

/// Sets up the global logger with a file appender and optionally a stdout appender
///
/// # Arguments
///
/// * 'log_path' - path to the log file, created if missing
/// * 'level' - maximum level to log
/// * 'log_to_stdout' - whether to also log to stdout
pub fn setup_logger(log_path: &str, level: LevelFilter, log_to_stdout: bool) -> Result<Handle, LoggerError> {
    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(log_path)?;

    let mut builder = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file)));
    let mut root = Root::builder().appender("file");

    if log_to_stdout {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build();
        builder = builder.appender(Appender::builder().build("stdout", Box::new(stdout)));
        root = root.appender("stdout");
    }

    let config = builder.build(root.build(level))
        .map_err(|e| LoggerError::Config(e.to_string()))?;

    Ok(log4rs::init_config(config)?)
}

/// Error depicting errors that occur while setting up the logger
///
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("LogFileError: {0}")]
    LogFile(#[from] std::io::Error),
    #[error("ConfigError: {0}")]
    Config(String),
    #[error("SetLoggerError: {0}")]
    SetLogger(#[from] SetLoggerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritable_log_path_fails_before_install() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // a regular file can't be a directory
        let path = file.path().join("pv.log");
        let err = setup_logger(path.to_str().unwrap(), LevelFilter::Info, false).unwrap_err();
        assert!(matches!(err, LoggerError::LogFile(_)));
    }
}
