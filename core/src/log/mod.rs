//! Logger and logging macros
//!
//! The macros forward to the `log` crate so that every crate of the workspace can
//! log through `tangle_core::{trace, debug, info, warn, error}`.

use consts::{CONSOLE_APPENDER, DEFAULT_LOGGER_ENV, ERR_LOG_FILE_APPENDER, ERR_LOG_FILE_NAME, LOG_FILE_APPENDER, LOG_FILE_NAME};
use log::LevelFilter;
use log4rs::config::{Config, Root};
use std::{path::Path, sync::OnceLock};

mod appender;
pub mod consts;
mod logger;

use appender::AppenderSpec;
pub use logger::LogError;
use logger::FilterBuilder;

#[doc(hidden)]
pub use log as __log;

static LOGGER_HANDLE: OnceLock<log4rs::Handle> = OnceLock::new();

/// Builds the logger configuration: a colored console output plus, when `log_dir` is
/// provided, a rolling `tangled.log` file and a rolling `tangled_err.log` file
/// holding warnings and errors only.
///
/// `filters` has the `RUST_LOG` syntax and is applied over the content of `RUST_LOG`.
fn build_config(log_dir: Option<&Path>, filters: &str) -> Result<Config, LogError> {
    let mut filter = FilterBuilder::new();
    filter.parse_env(DEFAULT_LOGGER_ENV).parse_expression(filters);

    let mut appenders = vec![AppenderSpec::console(CONSOLE_APPENDER, None)];
    if let Some(log_dir) = log_dir {
        appenders.push(AppenderSpec::rolling_file(LOG_FILE_APPENDER, None, log_dir, LOG_FILE_NAME)?);
        appenders.push(AppenderSpec::rolling_file(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), log_dir, ERR_LOG_FILE_NAME)?);
    }
    let names = appenders.iter().map(|appender| appender.name).collect::<Vec<_>>();

    Config::builder()
        .appenders(appenders.into_iter().map(AppenderSpec::into_appender))
        .loggers(filter.loggers())
        .build(Root::builder().appenders(names).build(filter.root_level()))
        .map_err(|err| LogError::Config(err.to_string()))
}

/// Initializes the global logger. Calling it again reconfigures the running logger.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let config = build_config(log_dir.map(Path::new), filters)?;
    match LOGGER_HANDLE.get() {
        Some(handle) => handle.set_config(config),
        None => {
            let handle = log4rs::init_config(config).map_err(|err| LogError::Config(err.to_string()))?;
            let _ = LOGGER_HANDLE.set(handle);
        }
    }
    Ok(())
}

/// Console-only logger for tests, ignoring the case where a logger is already set
pub fn try_init_logger(filters: &str) {
    if LOGGER_HANDLE.get().is_none() {
        let _ = init_logger(None, filters);
    }
}

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => ( $crate::log::__log::trace!($($t)*) )
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => ( $crate::log::__log::debug!($($t)*) )
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => ( $crate::log::__log::info!($($t)*) )
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => ( $crate::log::__log::warn!($($t)*) )
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => ( $crate::log::__log::error!($($t)*) )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_appenders_are_created_in_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_config(Some(dir.path()), "info").unwrap();
        let names = config.appenders().iter().map(|a| a.name().to_owned()).collect::<Vec<_>>();
        assert_eq!(names, vec![CONSOLE_APPENDER, LOG_FILE_APPENDER, ERR_LOG_FILE_APPENDER]);
        assert!(dir.path().join(LOG_FILE_NAME).exists());
        assert!(dir.path().join(ERR_LOG_FILE_NAME).exists());
    }

    #[test]
    fn test_console_only_without_log_dir() {
        let config = build_config(None, "debug").unwrap();
        assert_eq!(config.appenders().len(), 1);
    }
}
