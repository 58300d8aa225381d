//! Timestamp parsing and formatting utilities

use crate::domain::model::FrameRate;
use crate::error::{AdmarkError, AdmarkResult};

/// Format a frame position as `H:MM:SS.FF`, where `FF` counts frames within
/// the second
pub fn frame_to_timestamp(frame: i32, fps: FrameRate) -> String {
    let frame = frame.max(0) as f64;
    let total_secs = (frame / fps.value()).floor();
    let frames = (frame - total_secs * fps.value()).round() as i64;
    let total_secs = total_secs as i64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, frames)
}

/// Parser for timestamps in marks files and on the command line
pub struct TimeParser;

impl TimeParser {
    /// Create a new time parser
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }

    /// Parse `H:MM:SS.FF`, `H:MM:SS`, `MM:SS` or plain seconds into a frame
    /// position
    pub fn parse_frame(&self, time_str: &str, fps: FrameRate) -> AdmarkResult<i32> {
        let time_str = time_str.trim();
        let invalid = || AdmarkError::InvalidTimeFormat {
            time: time_str.to_string(),
        };

        if let Ok(seconds) = time_str.parse::<f64>() {
            if seconds < 0.0 {
                return Err(invalid());
            }
            return Ok(fps.frames(seconds));
        }

        let (clock, frames) = match time_str.split_once('.') {
            Some((clock, frames)) => (clock, frames.parse::<i32>().map_err(|_| invalid())?),
            None => (time_str, 0),
        };

        let parts = clock
            .split(':')
            .map(|p| p.parse::<u32>().map_err(|_| invalid()))
            .collect::<AdmarkResult<Vec<u32>>>()?;
        let (hours, minutes, seconds) = match parts.as_slice() {
            [h, m, s] => (*h, *m, *s),
            [m, s] => (0, *m, *s),
            _ => return Err(invalid()),
        };
        if minutes >= 60 || seconds >= 60 || frames < 0 || frames as f64 >= fps.value().ceil() {
            return Err(invalid());
        }

        let total_secs = hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds as f64;
        Ok((total_secs * fps.value()).round() as i32 + frames)
    }
}

impl Default for TimeParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FPS: FrameRate = FrameRate(25.0);

    #[test]
    fn test_frame_to_timestamp() {
        assert_eq!(frame_to_timestamp(0, FPS), "0:00:00.00");
        assert_eq!(frame_to_timestamp(3000, FPS), "0:02:00.00");
        assert_eq!(frame_to_timestamp(3012, FPS), "0:02:00.12");
        assert_eq!(frame_to_timestamp(90_000 + 1, FPS), "1:00:00.01");
    }

    #[test]
    fn test_parse_frame_formats() {
        let parser = TimeParser::new();
        assert_eq!(parser.parse_frame("0:02:00.12", FPS).unwrap(), 3012);
        assert_eq!(parser.parse_frame("1:00:00", FPS).unwrap(), 90_000);
        assert_eq!(parser.parse_frame("02:00", FPS).unwrap(), 3000);
        assert_eq!(parser.parse_frame("4.5", FPS).unwrap(), 112);
    }

    #[test]
    fn test_parse_frame_invalid() {
        let parser = TimeParser::new();
        assert!(parser.parse_frame("abc", FPS).is_err());
        assert!(parser.parse_frame("0:61:00", FPS).is_err());
        assert!(parser.parse_frame("0:01:00.30", FPS).is_err());
        assert!(parser.parse_frame("-3", FPS).is_err());
        assert!(matches!(
            parser.parse_frame("1:2:3:4", FPS),
            Err(AdmarkError::InvalidTimeFormat { .. })
        ));
    }

    #[test]
    fn test_round_trip_of_marks_file_timestamp() {
        let parser = TimeParser::new();
        let text = frame_to_timestamp(123_457, FPS);
        assert_eq!(parser.parse_frame(&text, FPS).unwrap(), 123_457);
    }
}
