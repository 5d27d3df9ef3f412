//! CLI Commands
//!
//! Argument definitions for the `token-sniper` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Token Sniper - real-time detection of new Solana token launches
#[derive(Parser, Debug)]
#[command(
    name = "token-sniper",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Real-time Solana token launch sniper",
    long_about = "Watches a transaction stream for new token mints and liquidity pools, \
                  enriches each candidate with market and safety data, and reports the \
                  ones that pass the configured filters."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the sniper pipeline
    Run(RunCmd),

    /// Load and validate a configuration file
    Validate(ValidateCmd),
}

/// Start the pipeline
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Validate configuration and wiring, then exit without connecting
    #[arg(long)]
    pub dry_run: bool,
}

/// Validate configuration
#[derive(Parser, Debug)]
pub struct ValidateCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,
}

impl CliApp {
    /// Log filter directive: `--debug` wins over `--verbose`, which wins over
    /// the configured level.
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            configured
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let app = CliApp::try_parse_from(["token-sniper", "run", "--config", "sniper.toml", "--dry-run"])
            .unwrap();
        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("sniper.toml"));
                assert!(cmd.dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_validate_default_path() {
        let app = CliApp::try_parse_from(["token-sniper", "validate"]).unwrap();
        match app.command {
            Command::Validate(cmd) => assert_eq!(cmd.config, PathBuf::from("config.toml")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_level_precedence() {
        let app = CliApp::try_parse_from(["token-sniper", "run"]).unwrap();
        assert_eq!(app.log_level("warn"), "warn");

        let app = CliApp::try_parse_from(["token-sniper", "-v", "run"]).unwrap();
        assert_eq!(app.log_level("warn"), "info");

        let app = CliApp::try_parse_from(["token-sniper", "run", "-v", "--debug"]).unwrap();
        assert_eq!(app.log_level("warn"), "debug");
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(CliApp::try_parse_from(["token-sniper"]).is_err());
    }
}
