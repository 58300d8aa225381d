//! CLI module for admark
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub mod args;
pub mod commands;

pub use args::{InspectArgs, MarkArgs, VerifyArgs};

use crate::utils::logging::LogFormat;

/// admark - advertisement marks for recorded TV broadcasts
///
/// Detects where the broadcast starts, stops and is interrupted by
/// advertising, and refines those marks for frame-accurate cutting.
#[derive(Parser, Debug)]
#[command(name = "admark")]
#[command(about = "Advertisement mark detection for recorded TV broadcasts")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormatArg>,

    /// Configuration file (default: ./admark.toml, then the user config)
    #[arg(long, global = true, env = "ADMARK_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect and refine the marks of a recording
    Mark(MarkArgs),
    /// List the marks of a recording
    Inspect(InspectArgs),
    /// Check the marks of a recording and show the resulting cuts
    Verify(VerifyArgs),
}

/// Log format selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_mark_command() {
        let cli = Cli::try_parse_from([
            "admark", "-vv", "mark", "/rec", "--astopoffs", "60", "--detect-only", "--backup",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Mark(args) => {
                assert_eq!(args.recording, PathBuf::from("/rec"));
                assert_eq!(args.astopoffs, Some(60));
                assert!(args.backup);
                assert_eq!(args.passes(), Some(crate::domain::model::PassSelection::detect_only()));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_conflicting_pass_flags() {
        let result = Cli::try_parse_from(["admark", "mark", "/rec", "--detect-only", "--refine-only"]);
        assert!(result.is_err());
        assert!(Cli::try_parse_from(["admark", "mark", "/rec", "--astopoffs", "300"]).is_err());
    }
}
