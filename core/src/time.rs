use std::time::Duration;

/// Truncates a duration to whole milliseconds, for log output
#[inline]
pub fn truncate_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}
