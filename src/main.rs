//! admark CLI
//!
//! Marks the broadcast parts of a recorded TV program.
//!
//! # Usage
//!
//! ```bash
//! admark mark /video/recording --astopoffs 60
//! admark inspect /video/recording --json
//! admark verify /video/recording
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use admark::cli::{commands, Cli, Commands};
use admark::config_initialization::initialize_configuration_hierarchy;
use admark::utils::logging::LoggingSystem;

/// Main entry point for the admark CLI application
fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    let config = initialize_configuration_hierarchy(&cli)?;

    // Initialize logging
    let logging = LoggingSystem::new(config.logging.clone());
    logging.initialize()?;
    logging.log_system_info();
    debug!("Engine configuration: {:?}", config.admark);

    // Execute the requested command
    match cli.command {
        Commands::Mark(args) => {
            info!("Executing mark command");
            commands::mark(args, &config)?;
        }
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            commands::inspect(args, &config)?;
        }
        Commands::Verify(args) => {
            info!("Executing verify command");
            commands::verify(args, &config)?;
        }
    }

    Ok(())
}
