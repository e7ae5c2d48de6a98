//! This module contains all CLI-specific code.

use clap::{ArgAction, Parser};
use stablescan_indexer::{config::Config, errors::ConfigError};
use std::path::PathBuf;

/// The indexer binary CLI application arguments.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Verbosity level (0-4)
    #[arg(long, short, help = "Verbosity level (0-4)", action = ArgAction::Count)]
    pub v: u8,
    /// Path to the configuration file.
    #[clap(long, short, env = "APP_CONFIG_PATH", default_value = "config.json")]
    pub config: PathBuf,
}

impl Cli {
    /// Loads the configuration file and applies environment overrides.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        Config::load(&self.config)
    }
}
