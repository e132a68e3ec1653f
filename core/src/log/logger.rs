use log::LevelFilter;
use log4rs::config::Logger;
use std::{collections::BTreeMap, env};
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum LogError {
    #[error("invalid log directory {0}")]
    InvalidLogDir(String),

    #[error("cannot build the {0} appender: {1}")]
    Appender(&'static str, String),

    #[error("log configuration error: {0}")]
    Config(String),
}

/// Collects the root level and the per-target levels out of filter expressions
/// such as `info,tangle_consensus=debug`.
///
/// Expressions are applied in order, a later one overriding the levels set by an
/// earlier one.
#[derive(Default)]
pub(super) struct FilterBuilder {
    root_level: Option<LevelFilter>,
    targets: BTreeMap<String, LevelFilter>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_env(&mut self, env: &str) -> &mut Self {
        self.parse_expression(&env::var(env).unwrap_or_default())
    }

    pub fn parse_expression(&mut self, expression: &str) -> &mut Self {
        for directive in expression.split(',').map(str::trim).filter(|x| !x.is_empty()) {
            let mut parts = directive.split('=').map(str::trim);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(single), None, None) => match single.parse::<LevelFilter>() {
                    Ok(level) => {
                        self.root_level = Some(level);
                    }
                    Err(_) => {
                        self.targets.insert(single.to_owned(), LevelFilter::max());
                    }
                },
                (Some(target), Some(""), None) => {
                    self.targets.insert(target.to_owned(), LevelFilter::max());
                }
                (Some(target), Some(level), None) => match level.parse::<LevelFilter>() {
                    Ok(level) => {
                        self.targets.insert(target.to_owned(), level);
                    }
                    Err(_) => println!("Ignoring invalid logging directive '{}'", directive),
                },
                _ => println!("Ignoring invalid logging directive '{}'", directive),
            }
        }
        self
    }

    pub fn root_level(&self) -> LevelFilter {
        self.root_level.unwrap_or(LevelFilter::Info)
    }

    pub fn loggers(&self) -> impl Iterator<Item = Logger> + '_ {
        // Target loggers inherit the appenders of the root logger
        self.targets.iter().map(|(target, level)| Logger::builder().build(target.clone(), *level))
    }

    #[cfg(test)]
    fn target_level(&self, target: &str) -> Option<LevelFilter> {
        self.targets.get(target).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_expressions() {
        let mut builder = FilterBuilder::new();
        builder.parse_expression("warn, tangle_consensus=debug ,tangle_database");
        assert_eq!(builder.root_level(), LevelFilter::Warn);
        assert_eq!(builder.target_level("tangle_consensus"), Some(LevelFilter::Debug));
        assert_eq!(builder.target_level("tangle_database"), Some(LevelFilter::Trace));

        // A later expression overrides an earlier one
        builder.parse_expression("trace,tangle_consensus=off");
        assert_eq!(builder.root_level(), LevelFilter::Trace);
        assert_eq!(builder.target_level("tangle_consensus"), Some(LevelFilter::Off));
    }

    #[test]
    fn test_invalid_directives_are_skipped() {
        let mut builder = FilterBuilder::new();
        builder.parse_expression("tangle_notify=loud,a=b=c,,");
        assert_eq!(builder.root_level(), LevelFilter::Info);
        assert_eq!(builder.target_level("tangle_notify"), None);
        assert_eq!(builder.loggers().count(), 0);
    }
}
