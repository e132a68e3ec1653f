use std::{fmt::Display, str::FromStr};
use thiserror::Error;

const MB: usize = 1024 * 1024;

/// Storage tuning profile, trading memory for write throughput
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageProfile {
    Light,
    #[default]
    Default,
    High,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown storage profile '{0}', expected one of: light, default, high")]
pub struct ParseProfileError(pub String);

impl StorageProfile {
    pub const NAMES: [&'static str; 3] = ["light", "default", "high"];

    /// Memory budget shared by the block cache and the write buffers
    pub fn mem_budget(self) -> usize {
        match self {
            StorageProfile::Light => 64 * MB,
            StorageProfile::Default => 256 * MB,
            StorageProfile::High => 1024 * MB,
        }
    }

    pub fn write_buffer_size(self) -> usize {
        match self {
            StorageProfile::Light => 8 * MB,
            StorageProfile::Default => 32 * MB,
            StorageProfile::High => 64 * MB,
        }
    }

    pub fn max_write_buffers(self) -> i32 {
        match self {
            StorageProfile::Light => 4,
            StorageProfile::Default => 8,
            StorageProfile::High => 16,
        }
    }
}

impl FromStr for StorageProfile {
    type Err = ParseProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(StorageProfile::Light),
            "default" => Ok(StorageProfile::Default),
            "high" => Ok(StorageProfile::High),
            _ => Err(ParseProfileError(s.to_owned())),
        }
    }
}

impl Display for StorageProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StorageProfile::Light => "light",
            StorageProfile::Default => "default",
            StorageProfile::High => "high",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_names() {
        for name in StorageProfile::NAMES {
            assert_eq!(name.parse::<StorageProfile>().unwrap().to_string(), name);
        }
        assert_eq!(" HIGH ".parse::<StorageProfile>(), Ok(StorageProfile::High));
        assert_eq!("turbo".parse::<StorageProfile>(), Err(ParseProfileError("turbo".to_owned())));
    }

    #[test]
    fn test_profiles_are_ordered_by_memory() {
        assert!(StorageProfile::Light.mem_budget() < StorageProfile::Default.mem_budget());
        assert!(StorageProfile::Default.mem_budget() < StorageProfile::High.mem_budget());
        assert_eq!(StorageProfile::Light.write_buffer_size(), 8 * MB);
        assert_eq!(StorageProfile::High.write_buffer_size(), 64 * MB);
    }
}
