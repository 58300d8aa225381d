//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::adapters::toml_config::{ConfigFile, TomlConfigAdapter};
use crate::cli::{Cli, Commands};
use crate::utils::logging::{LogFormat, LogLevel};

/// Resolve the configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<ConfigFile> {
    // Step 1 and 2: defaults, overlaid by the config file
    let adapter = match &cli.config {
        Some(path) => TomlConfigAdapter::with_path(path),
        None => TomlConfigAdapter::new(),
    };
    let mut config = adapter.load().context("Failed to load configuration file")?;

    // Step 3: environment variables
    let env_overrides = load_environment_variables(&mut config, |key| std::env::var(key).ok())?;
    if env_overrides > 0 {
        debug!("Applied {} environment variable overrides", env_overrides);
    }

    // Step 4: command line
    let cli_overrides = apply_cli_configuration_overrides(&mut config, cli);
    if cli_overrides > 0 {
        debug!("Applied {} CLI configuration overrides", cli_overrides);
    }

    config
        .admark
        .tuning
        .validate()
        .context("Invalid engine thresholds")?;
    Ok(config)
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("Invalid value '{}' for {}: {}", value, key, e))
}

fn parse_env_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!("Invalid boolean '{}' for {}", value, key)),
    }
}

/// Apply `ADMARK_*` variables read through `lookup`; returns the number applied
pub fn load_environment_variables<F>(config: &mut ConfigFile, lookup: F) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_overrides = 0;
    let mut found = |key: &str| {
        let value = lookup(key);
        if let Some(value) = &value {
            info!("Found environment override: {} = {}", key, value);
            env_overrides += 1;
        }
        value
    };

    if let Some(value) = found("ADMARK_LOG_LEVEL") {
        config.logging.level = value.parse::<LogLevel>()?;
    }
    if let Some(value) = found("ADMARK_LOG_FORMAT") {
        config.logging.format = match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            "json" => LogFormat::Json,
            other => anyhow::bail!("Invalid log format '{}' for ADMARK_LOG_FORMAT", other),
        };
    }
    if let Some(value) = found("ADMARK_THREADS") {
        config.admark.threads = parse_env("ADMARK_THREADS", &value)?;
    }
    if let Some(value) = found("ADMARK_ASTOPOFFS") {
        config.admark.tuning.astopoffs_secs = parse_env("ADMARK_ASTOPOFFS", &value)?;
    }
    if let Some(value) = found("ADMARK_USE_VPS") {
        config.admark.use_vps = parse_env_bool("ADMARK_USE_VPS", &value)?;
    }
    if let Some(value) = found("ADMARK_BACKUP") {
        config.admark.backup_marks = parse_env_bool("ADMARK_BACKUP", &value)?;
    }
    if let Some(value) = found("ADMARK_FULL_DECODE") {
        config.admark.full_decode = parse_env_bool("ADMARK_FULL_DECODE", &value)?;
    }

    Ok(env_overrides)
}

/// Apply command line overrides; returns the number applied
pub fn apply_cli_configuration_overrides(config: &mut ConfigFile, cli: &Cli) -> usize {
    let mut cli_overrides = 0;

    if cli.verbose > 0 {
        config.logging = config.logging.clone().with_verbosity(cli.verbose);
        cli_overrides += 1;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
        cli_overrides += 1;
    }

    match &cli.command {
        Commands::Mark(args) => {
            if let Some(astopoffs) = args.astopoffs {
                info!("CLI override: astopoffs = {}s", astopoffs);
                config.admark.tuning.astopoffs_secs = astopoffs;
                cli_overrides += 1;
            }
            if let Some(threads) = args.threads {
                info!("CLI override: threads = {}", threads);
                config.admark.threads = threads;
                cli_overrides += 1;
            }
            if let Some(passes) = args.passes() {
                info!("CLI override: passes = {:?}", passes);
                config.admark.passes = passes;
                cli_overrides += 1;
            }
            if args.no_vps {
                config.admark.use_vps = false;
                cli_overrides += 1;
            }
            if args.backup {
                config.admark.backup_marks = true;
                cli_overrides += 1;
            }
            if args.full_decode {
                config.admark.full_decode = true;
                cli_overrides += 1;
            }
        }
        Commands::Verify(args) => {
            if args.full_decode {
                config.admark.full_decode = true;
                cli_overrides += 1;
            }
        }
        Commands::Inspect(_) => {}
    }

    cli_overrides
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_environment_overrides() {
        let vars = env(&[
            ("ADMARK_LOG_LEVEL", "debug"),
            ("ADMARK_THREADS", "3"),
            ("ADMARK_USE_VPS", "no"),
            ("ADMARK_ASTOPOFFS", "30"),
        ]);
        let mut config = ConfigFile::default();
        let applied = load_environment_variables(&mut config, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(applied, 4);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.admark.threads, 3);
        assert!(!config.admark.use_vps);
        assert_eq!(config.admark.tuning.astopoffs_secs, 30);
    }

    #[test]
    fn test_invalid_environment_value() {
        let vars = env(&[("ADMARK_BACKUP", "maybe")]);
        let mut config = ConfigFile::default();
        assert!(load_environment_variables(&mut config, |k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn test_cli_wins_over_environment() {
        let vars = env(&[("ADMARK_ASTOPOFFS", "30")]);
        let mut config = ConfigFile::default();
        load_environment_variables(&mut config, |k| vars.get(k).cloned()).unwrap();

        let cli = Cli::try_parse_from(["admark", "-v", "mark", "/rec", "--astopoffs", "90", "--refine-only"]).unwrap();
        let applied = apply_cli_configuration_overrides(&mut config, &cli);
        assert_eq!(applied, 3);
        assert_eq!(config.admark.tuning.astopoffs_secs, 90);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(!config.admark.passes.detect);
    }
}
