//! Command-line interface handling for the versus server.
//!
//! This module provides command-line argument parsing and CLI interface management
//! using the `clap` crate for robust argument handling.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// This structure holds all the command-line options that can be used to
/// override configuration file settings or provide runtime parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for bind address
    pub bind_address: Option<String>,
    /// Optional override for the handshake version token
    pub protocol_version: Option<String>,
    /// Optional fixed seed for reproducible sessions
    pub rng_seed: Option<u64>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    /// Parses the process arguments.
    pub fn parse() -> Self {
        Self::parse_from(std::env::args_os())
    }

    /// Parses an explicit argument list, exiting on invalid input like
    /// [`parse`](Self::parse) does.
    pub fn parse_from<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::from_matches(&command().get_matches_from(args))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            bind_address: matches.get_one::<String>("bind").cloned(),
            protocol_version: matches.get_one::<String>("protocol-version").cloned(),
            rng_seed: matches.get_one::<u64>("seed").copied(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

/// Builds the `clap` command definition.
fn command() -> Command {
    Command::new("versus")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Two-player matchmaking and relay server for versus puzzle games")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .value_parser(value_parser!(PathBuf))
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .value_name("ADDRESS")
                .help("Bind address (e.g., 0.0.0.0:49569)"),
        )
        .arg(
            Arg::new("protocol-version")
                .long("protocol-version")
                .value_name("VERSION")
                .help("Three-character version token clients must send"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed every session deterministically from this value")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["versus"]);
        assert_eq!(args.config_path, PathBuf::from("config.toml"));
        assert_eq!(args.bind_address, None);
        assert_eq!(args.protocol_version, None);
        assert_eq!(args.rng_seed, None);
        assert_eq!(args.log_level, None);
        assert!(!args.json_logs);
    }

    #[test]
    fn test_all_overrides() {
        let args = CliArgs::parse_from([
            "versus",
            "--config",
            "custom.toml",
            "-b",
            "127.0.0.1:9000",
            "--protocol-version",
            "004",
            "--seed",
            "12",
            "-l",
            "debug",
            "--json-logs",
        ]);
        assert_eq!(args.config_path, PathBuf::from("custom.toml"));
        assert_eq!(args.bind_address.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(args.protocol_version.as_deref(), Some("004"));
        assert_eq!(args.rng_seed, Some(12));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
    }

    #[test]
    fn test_command_definition() {
        command().debug_assert();
    }
}
