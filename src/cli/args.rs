//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;
use clap_num::number_range;

use crate::domain::model::PassSelection;

/// Parse `--astopoffs`, seconds added to the assumed stop
fn astopoffs(s: &str) -> Result<i32, String> {
    number_range(s, 0, 240)
}

/// Parse `--threads`
fn thread_count(s: &str) -> Result<usize, String> {
    number_range(s, 1, 64)
}

/// Arguments for the mark command
#[derive(Args, Debug, Clone)]
pub struct MarkArgs {
    /// Recording directory
    pub recording: PathBuf,

    /// Marks file to write (default: <recording>/marks)
    #[arg(long)]
    pub marks: Option<PathBuf>,

    /// Frame index to decode from (default: <recording>/frames.json)
    #[arg(long)]
    pub frames: Option<PathBuf>,

    /// Seconds added to the assumed end of the broadcast (0-240)
    #[arg(long, value_parser = astopoffs)]
    pub astopoffs: Option<i32>,

    /// Decoder threads (1-64)
    #[arg(long, value_parser = thread_count)]
    pub threads: Option<usize>,

    /// Only run mark detection
    #[arg(long, conflicts_with = "refine_only")]
    pub detect_only: bool,

    /// Only refine the marks of an earlier run
    #[arg(long)]
    pub refine_only: bool,

    /// Ignore VPS events
    #[arg(long)]
    pub no_vps: bool,

    /// Copy the marks file to marks.bak before changing it
    #[arg(long)]
    pub backup: bool,

    /// Decode every frame instead of keyframes only
    #[arg(long)]
    pub full_decode: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl MarkArgs {
    /// Passes requested on the command line, if any flag narrowed them
    pub fn passes(&self) -> Option<PassSelection> {
        if self.detect_only {
            Some(PassSelection::detect_only())
        } else if self.refine_only {
            Some(PassSelection::refine_only())
        } else {
            None
        }
    }
}

/// Arguments for the inspect command
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Recording directory
    pub recording: PathBuf,

    /// Marks file to read (default: <recording>/marks)
    #[arg(long)]
    pub marks: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the verify command
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Recording directory
    pub recording: PathBuf,

    /// Marks file to read (default: <recording>/marks)
    #[arg(long)]
    pub marks: Option<PathBuf>,

    /// Align cuts for full decoding
    #[arg(long)]
    pub full_decode: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
