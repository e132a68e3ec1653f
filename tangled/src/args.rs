use clap::{Arg, Command, arg};
use serde::{Deserialize, Deserializer};
use std::{ffi::OsString, fs};
use tangle_database::prelude::StorageProfile;
use tangle_storagemanager::manager::DEFAULT_DB_PARALLELISM;
use thiserror::Error;
use toml::from_str;

/// Discard ratio of the full garbage collection run at startup
pub const DEFAULT_STARTUP_GC_DISCARD_RATIO: f64 = 0.01;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Args {
    // NOTE: it is best if property names match config file fields
    pub appdir: Option<String>,
    pub logdir: Option<String>,
    #[serde(rename = "nologfiles")]
    pub no_log_files: bool,
    #[serde(rename = "loglevel")]
    pub log_level: String,
    pub db_path: Option<String>,
    #[serde(deserialize_with = "deserialize_profile")]
    pub db_profile: StorageProfile,
    pub db_debug_log: bool,
    pub db_parallelism: usize,
    /// Seconds between periodic garbage collection passes, 0 disables them
    pub db_gc_interval: u64,
    pub startup_gc_discard_ratio: f64,
    pub reset_db: bool,
    pub yes: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            appdir: None,
            logdir: None,
            no_log_files: false,
            log_level: "INFO".into(),
            db_path: None,
            db_profile: StorageProfile::Default,
            db_debug_log: false,
            db_parallelism: DEFAULT_DB_PARALLELISM,
            db_gc_interval: 0,
            startup_gc_discard_ratio: DEFAULT_STARTUP_GC_DISCARD_RATIO,
            reset_db: false,
            yes: false,
        }
    }
}

fn deserialize_profile<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StorageProfile, D::Error> {
    String::deserialize(deserializer)?.parse().map_err(serde::de::Error::custom)
}

#[derive(Debug, Error, PartialEq)]
pub enum ArgsError {
    #[error("Mixing --logdir and --nologfiles is forbidden")]
    MixedLogDirAndNoLogFiles,

    #[error("Discard ratio {0} is out of the (0, 1] range")]
    InvalidDiscardRatio(f64),

    #[error("Database parallelism must be at least 1")]
    ZeroParallelism,
}

pub fn validate_args(args: &Args) -> Result<(), ArgsError> {
    if args.logdir.is_some() && args.no_log_files {
        return Err(ArgsError::MixedLogDirAndNoLogFiles);
    }
    if !(args.startup_gc_discard_ratio > 0.0 && args.startup_gc_discard_ratio <= 1.0) {
        return Err(ArgsError::InvalidDiscardRatio(args.startup_gc_discard_ratio));
    }
    if args.db_parallelism == 0 {
        return Err(ArgsError::ZeroParallelism);
    }
    Ok(())
}

pub fn cli() -> Command {
    let defaults: Args = Default::default();

    Command::new("tangled")
        .about(format!("{} v{}", env!("CARGO_PKG_DESCRIPTION"), env!("CARGO_PKG_VERSION")))
        .version(env!("CARGO_PKG_VERSION"))
        .arg(arg!(-C --configfile <CONFIG_FILE> "Path of config file."))
        .arg(arg!(-b --appdir <DATA_DIR> "Directory to store data."))
        .arg(arg!(--logdir <LOG_DIR> "Directory to log output."))
        .arg(arg!(--nologfiles "Disable logging to files."))
        .arg(
            Arg::new("log_level")
                .short('d')
                .long("loglevel")
                .env("TANGLED_LOG_LEVEL")
                .value_name("LEVEL")
                .default_value("info")
                .require_equals(true)
                .help("Logging level for all subsystems {off, error, warn, info, debug, trace}\n-- You may also specify <subsystem>=<level>,<subsystem2>=<level>,... to set the log level for individual subsystems.".to_string()),
        )
        .arg(arg!(--"db-path" <DB_PATH> "Directory of the database (default: <appdir>/mainnet/database)."))
        .arg(
            Arg::new("db-profile")
                .long("db-profile")
                .env("TANGLED_DB_PROFILE")
                .value_name("PROFILE")
                .require_equals(true)
                .value_parser(StorageProfile::NAMES)
                .help(format!("Storage engine tuning profile (default: {}).", defaults.db_profile)),
        )
        .arg(arg!(--"db-debug-log" "Raise the internal log level of the storage engine to debug."))
        .arg(
            Arg::new("db-parallelism")
                .long("db-parallelism")
                .env("TANGLED_DB_PARALLELISM")
                .value_name("THREADS")
                .require_equals(true)
                .value_parser(clap::value_parser!(usize))
                .help(format!("Background threads of the storage engine (default: {}).", defaults.db_parallelism)),
        )
        .arg(
            Arg::new("db-gc-interval")
                .long("db-gc-interval")
                .value_name("SECONDS")
                .require_equals(true)
                .value_parser(clap::value_parser!(u64))
                .help("Seconds between periodic database garbage collection passes, 0 disables them (default: 0)."),
        )
        .arg(
            Arg::new("startup-gc-discard-ratio")
                .long("startup-gc-discard-ratio")
                .value_name("RATIO")
                .require_equals(true)
                .value_parser(clap::value_parser!(f64))
                .help(format!(
                    "Discard ratio of the full database garbage collection run at startup (default: {}).",
                    defaults.startup_gc_discard_ratio
                )),
        )
        .arg(arg!(--"reset-db" "Reset database before starting node."))
        .arg(arg!(-y --yes "Answer yes to all interactive console questions"))
}

pub fn parse_args() -> Args {
    match Args::parse(std::env::args_os()) {
        Ok(args) => args,
        Err(err) => {
            println!("{err}");
            std::process::exit(1);
        }
    }
}

impl Args {
    pub fn parse<I, T>(itr: I) -> Result<Args, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let m: clap::ArgMatches = cli().try_get_matches_from(itr)?;
        let mut defaults: Args = Default::default();

        if let Some(config_file) = m.get_one::<String>("configfile") {
            let config_str = fs::read_to_string(config_file)?;
            defaults = from_str(&config_str).map_err(|toml_error| {
                clap::Error::raw(
                    clap::error::ErrorKind::ValueValidation,
                    format!("failed parsing config file, reason: {}", toml_error.message()),
                )
            })?;
        }

        let db_profile = match m.get_one::<String>("db-profile") {
            Some(name) => name.parse().map_err(|err| clap::Error::raw(clap::error::ErrorKind::InvalidValue, format!("{err}\n")))?,
            None => defaults.db_profile,
        };

        let args = Args {
            appdir: m.get_one::<String>("appdir").cloned().or(defaults.appdir),
            logdir: m.get_one::<String>("logdir").cloned().or(defaults.logdir),
            no_log_files: arg_match_unwrap_or::<bool>(&m, "nologfiles", defaults.no_log_files),
            log_level: arg_match_unwrap_or::<String>(&m, "log_level", defaults.log_level),
            db_path: m.get_one::<String>("db-path").cloned().or(defaults.db_path),
            db_profile,
            db_debug_log: arg_match_unwrap_or::<bool>(&m, "db-debug-log", defaults.db_debug_log),
            db_parallelism: arg_match_unwrap_or::<usize>(&m, "db-parallelism", defaults.db_parallelism),
            db_gc_interval: arg_match_unwrap_or::<u64>(&m, "db-gc-interval", defaults.db_gc_interval),
            startup_gc_discard_ratio: arg_match_unwrap_or::<f64>(&m, "startup-gc-discard-ratio", defaults.startup_gc_discard_ratio),
            reset_db: arg_match_unwrap_or::<bool>(&m, "reset-db", defaults.reset_db),
            yes: arg_match_unwrap_or::<bool>(&m, "yes", defaults.yes),
        };

        Ok(args)
    }
}

use clap::parser::ValueSource::DefaultValue;
fn arg_match_unwrap_or<T: Clone + Send + Sync + 'static>(m: &clap::ArgMatches, arg_id: &str, default: T) -> T {
    m.get_one::<T>(arg_id).cloned().filter(|_| m.value_source(arg_id) != Some(DefaultValue)).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let args = Args::parse(["tangled"]).unwrap();
        assert_eq!(args.db_profile, StorageProfile::Default);
        assert_eq!(args.db_gc_interval, 0);
        assert_eq!(args.startup_gc_discard_ratio, DEFAULT_STARTUP_GC_DISCARD_RATIO);
        assert!(!args.reset_db);
        assert_eq!(validate_args(&args), Ok(()));
    }

    #[test]
    fn test_command_line_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "db-profile = \"high\"\ndb-gc-interval = 600\nloglevel = \"debug\"\nyes = true").unwrap();
        let path = file.path().to_str().unwrap().to_owned();

        let args = Args::parse(["tangled", "-C", path.as_str(), "--db-gc-interval=60", "--db-profile=light"]).unwrap();
        assert_eq!(args.db_profile, StorageProfile::Light);
        assert_eq!(args.db_gc_interval, 60);
        assert_eq!(args.log_level, "debug");
        assert!(args.yes);
    }

    #[test]
    fn test_unknown_config_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "db-flavour = \"spicy\"").unwrap();
        let path = file.path().to_str().unwrap().to_owned();
        assert!(Args::parse(["tangled", "-C", path.as_str()]).is_err());
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        assert!(Args::parse(["tangled", "--db-profile=huge"]).is_err());
    }

    #[test]
    fn test_validation() {
        let args = Args { logdir: Some("/tmp/logs".into()), no_log_files: true, ..Default::default() };
        assert_eq!(validate_args(&args), Err(ArgsError::MixedLogDirAndNoLogFiles));

        let args = Args { startup_gc_discard_ratio: 0.0, ..Default::default() };
        assert_eq!(validate_args(&args), Err(ArgsError::InvalidDiscardRatio(0.0)));

        let args = Args { startup_gc_discard_ratio: 1.5, ..Default::default() };
        assert_eq!(validate_args(&args), Err(ArgsError::InvalidDiscardRatio(1.5)));

        let args = Args { db_parallelism: 0, ..Default::default() };
        assert_eq!(validate_args(&args), Err(ArgsError::ZeroParallelism));
    }
}
