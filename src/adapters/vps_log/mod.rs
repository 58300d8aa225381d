// VPS log adapter - Reads broadcaster VPS events of a recording

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::*;

/// Name of the VPS event log inside a recording directory
pub const VPS_FILE: &str = "markad.vps";

const KINDS: [VpsKind; 4] = [
    VpsKind::PauseStart,
    VpsKind::PauseStop,
    VpsKind::Start,
    VpsKind::Stop,
];

/// Read the VPS log of a recording directory. A missing log yields no events.
pub fn load(dir: &Path, recording_start: Option<DateTime<Utc>>) -> Result<Vec<VpsEvent>, DomainError> {
    let path = dir.join(VPS_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No VPS log at {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    let events = parse(&content, recording_start);
    debug!("Read {} VPS events from {}", events.len(), path.display());
    Ok(events)
}

/// Parse VPS log lines. Unreadable lines are skipped with a warning.
pub fn parse(content: &str, recording_start: Option<DateTime<Utc>>) -> Vec<VpsEvent> {
    let mut events = Vec::new();
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match parse_line(line, recording_start) {
            Some(event) => events.push(event),
            None => warn!("Ignoring VPS log line '{}'", line),
        }
    }
    events
}

fn parse_line(line: &str, recording_start: Option<DateTime<Utc>>) -> Option<VpsEvent> {
    // PAUSE_START: before START: so the prefix match is unambiguous
    let (kind, value) = KINDS
        .iter()
        .find_map(|kind| line.strip_prefix(kind.tag()).map(|rest| (*kind, rest.trim())))?;

    let offset_secs = match value.parse::<i32>() {
        Ok(secs) => secs,
        Err(_) => {
            let at = DateTime::parse_from_rfc3339(value).ok()?.with_timezone(&Utc);
            let start = recording_start?;
            i32::try_from((at - start).num_seconds()).ok()?
        }
    };
    if offset_secs < 0 {
        return None;
    }
    Some(VpsEvent { kind, offset_secs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_offsets() {
        let events = parse("START: 120\nPAUSE_START: 1800\nPAUSE_STOP: 2100\nSTOP: 5400\n", None);
        assert_eq!(
            events,
            vec![
                VpsEvent { kind: VpsKind::Start, offset_secs: 120 },
                VpsEvent { kind: VpsKind::PauseStart, offset_secs: 1800 },
                VpsEvent { kind: VpsKind::PauseStop, offset_secs: 2100 },
                VpsEvent { kind: VpsKind::Stop, offset_secs: 5400 },
            ]
        );
    }

    #[test]
    fn test_parse_timestamps_against_recording_start() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 20, 13, 0).unwrap();
        let events = parse("START: 2024-03-01T20:15:00Z\nSTOP: 2024-03-01T21:45:30+00:00", Some(start));
        assert_eq!(events[0].offset_secs, 120);
        assert_eq!(events[1].offset_secs, 5550);

        // without a recording start timestamps cannot be resolved
        assert!(parse("START: 2024-03-01T20:15:00Z", None).is_empty());
    }

    #[test]
    fn test_parse_skips_garbage() {
        let events = parse("STARTED: 5\nSTOP: soon\nSTOP: -5\nSTOP: 300", None);
        assert_eq!(events, vec![VpsEvent { kind: VpsKind::Stop, offset_secs: 300 }]);
    }

    #[test]
    fn test_missing_log_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load(dir.path(), None).unwrap().is_empty());
        fs::write(dir.path().join(VPS_FILE), "START: 60\n").unwrap();
        assert_eq!(load(dir.path(), None).unwrap().len(), 1);
    }
}
