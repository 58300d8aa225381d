// Marks file adapter - Persists mark sequences as text in the recording directory

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::marks::MarkStore;
use crate::domain::model::*;
use crate::ports::MarkRepository;
use crate::utils::time::{frame_to_timestamp, TimeParser};

/// Name of the marks file inside a recording directory
pub const MARKS_FILE: &str = "marks";
/// Name of the backup copy
pub const MARKS_BACKUP: &str = "marks.bak";

/// Marks file repository.
///
/// One line per mark: `H:MM:SS.FF (position) TYPE comment`. Lines without
/// the position take it from the timestamp.
pub struct MarksFileAdapter {
    path: PathBuf,
    backup_path: PathBuf,
    fps: FrameRate,
}

impl MarksFileAdapter {
    /// Repository for the marks file of a recording directory
    pub fn new(dir: &Path, fps: FrameRate) -> Self {
        Self {
            path: dir.join(MARKS_FILE),
            backup_path: dir.join(MARKS_BACKUP),
            fps,
        }
    }

    /// Repository for an explicit marks file
    pub fn with_path(path: &Path, fps: FrameRate) -> Self {
        let backup_path = path.with_extension("bak");
        Self {
            path: path.to_path_buf(),
            backup_path,
            fps,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render a mark sequence in marks file format
    pub fn render(marks: &MarkStore, fps: FrameRate) -> String {
        let mut content = String::new();
        for mark in marks.iter() {
            content.push_str(&format_line(mark, fps));
            content.push('\n');
        }
        content
    }

    /// Parse marks file content
    pub fn parse(content: &str, fps: FrameRate) -> Result<MarkStore, DomainError> {
        let parser = TimeParser::new();
        let mut marks = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mark = parse_line(line, fps, &parser)
                .map_err(|e| DomainError::InvalidFormat(format!("line {}: {}", index + 1, e)))?;
            marks.push(mark);
        }
        Ok(MarkStore::from_marks(marks))
    }
}

fn format_line(mark: &Mark, fps: FrameRate) -> String {
    let mut line = format!(
        "{} ({}) {}",
        frame_to_timestamp(mark.position, fps),
        mark.position,
        mark.mark_type.code()
    );
    if let Some(comment) = mark.comment.as_deref().filter(|c| !c.is_empty()) {
        line.push(' ');
        line.push_str(comment);
    }
    line
}

fn parse_line(line: &str, fps: FrameRate, parser: &TimeParser) -> Result<Mark, String> {
    let (timestamp, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();

    let (position, rest) = match rest.strip_prefix('(') {
        Some(after) => {
            let (number, rest) = after
                .split_once(')')
                .ok_or_else(|| format!("unclosed position in '{}'", line))?;
            let position = number
                .trim()
                .parse::<i32>()
                .map_err(|_| format!("invalid position '{}'", number))?;
            (position, rest.trim_start())
        }
        None => {
            let position = parser.parse_frame(timestamp, fps).map_err(|e| e.to_string())?;
            (position, rest)
        }
    };

    let (code, comment) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if code.is_empty() {
        return Err(format!("missing mark type in '{}'", line));
    }
    let mark_type: MarkType = code.parse().map_err(|e: DomainError| e.to_string())?;
    let comment = comment.trim();
    let comment = (!comment.is_empty()).then(|| comment.to_string());
    Ok(Mark::new(mark_type, position, comment, mark_type.is_start()))
}

impl MarkRepository for MarksFileAdapter {
    fn save(&self, marks: &MarkStore, fps: FrameRate) -> Result<(), DomainError> {
        let content = Self::render(marks, fps);
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Saved {} marks to {}", marks.len(), self.path.display());
        Ok(())
    }

    fn backup(&self) -> Result<(), DomainError> {
        if !self.path.exists() {
            debug!("No marks file to back up at {}", self.path.display());
            return Ok(());
        }
        fs::copy(&self.path, &self.backup_path)?;
        info!("Backed up marks file to {}", self.backup_path.display());
        Ok(())
    }

    fn load(&self) -> Result<MarkStore, DomainError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No marks file at {}", self.path.display());
                return Ok(MarkStore::new());
            }
            Err(e) => return Err(e.into()),
        };
        let marks = Self::parse(&content, self.fps)?;
        debug!("Loaded {} marks from {}", marks.len(), self.path.display());
        Ok(marks)
    }
}
