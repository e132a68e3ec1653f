use super::{
    consts::{LOG_ARCHIVE_SUFFIX, LOG_FILE_BASE_ROLLS, LOG_FILE_MAX_ROLLS, LOG_FILE_MAX_SIZE, LOG_LINE_PATTERN, LOG_LINE_PATTERN_COLORED},
    logger::LogError,
};
use log::LevelFilter;
use log4rs::{
    append::{
        Append,
        console::ConsoleAppender,
        rolling_file::{
            RollingFileAppender,
            policy::compound::{CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger},
        },
    },
    config::Appender,
    encode::pattern::PatternEncoder,
    filter::{Filter, threshold::ThresholdFilter},
};
use std::path::Path;

/// A named log sink with an optional minimal level
pub(super) struct AppenderSpec {
    pub name: &'static str,
    threshold: Option<LevelFilter>,
    append: Box<dyn Append>,
}

impl AppenderSpec {
    pub fn console(name: &'static str, threshold: Option<LevelFilter>) -> Self {
        let console = ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN_COLORED))).build();
        Self { name, threshold, append: Box::new(console) }
    }

    /// A size-triggered rolling file located in `log_dir`, older files being gzipped
    pub fn rolling_file(name: &'static str, threshold: Option<LevelFilter>, log_dir: &Path, file_name: &str) -> Result<Self, LogError> {
        let file_path = log_dir.join(file_name);
        let archive_pattern = log_dir.join(format!("{}{}", file_name, LOG_ARCHIVE_SUFFIX));
        let archive_pattern =
            archive_pattern.to_str().ok_or_else(|| LogError::InvalidLogDir(log_dir.display().to_string()))?.to_owned();

        let roller = FixedWindowRoller::builder()
            .base(LOG_FILE_BASE_ROLLS)
            .build(&archive_pattern, LOG_FILE_MAX_ROLLS)
            .map_err(|err| LogError::Appender(name, err.to_string()))?;
        let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(LOG_FILE_MAX_SIZE)), Box::new(roller));
        let file = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN)))
            .build(file_path, Box::new(policy))
            .map_err(|err| LogError::Appender(name, err.to_string()))?;

        Ok(Self { name, threshold, append: Box::new(file) })
    }

    pub fn into_appender(self) -> Appender {
        Appender::builder()
            .filters(self.threshold.map(|level| Box::new(ThresholdFilter::new(level)) as Box<dyn Filter>))
            .build(self.name, self.append)
    }
}
