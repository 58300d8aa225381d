//! Common utilities and helpers

use std::time::Duration;

pub mod logging;
pub mod time;

/// Utility functions for admark
pub struct Utils;

impl Utils {
    /// Format duration for display
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        let milliseconds = duration.subsec_millis();

        if hours > 0 {
            format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }

    /// Percentage of `current` in `total`, 0 for an unknown total
    pub fn calculate_progress(current: u64, total: u64) -> f32 {
        if total == 0 {
            0.0
        } else {
            ((current as f64 / total as f64) * 100.0).min(100.0) as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(Utils::format_duration(Duration::from_millis(61_250)), "01:01.250");
        assert_eq!(Utils::format_duration(Duration::from_secs(3725)), "01:02:05.000");
    }

    #[test]
    fn test_calculate_progress() {
        assert_eq!(Utils::calculate_progress(5, 0), 0.0);
        assert_eq!(Utils::calculate_progress(50, 200), 25.0);
        assert_eq!(Utils::calculate_progress(300, 200), 100.0);
    }
}
