// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `probe`: Discover, connect securely and read (default)
//! - `discover`: List servers and endpoints at a URL
//! - `serve`: Run the simulated server
//! - `validate`: Validate the configuration file
//! - `version`: Show version information

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use uaprobe_client::types::TimestampsToReturn;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "uaprobe.yaml";

// =============================================================================
// Main CLI Structure
// =============================================================================

/// uaprobe - OPC UA discovery and secure read probe
///
/// Finds a server's endpoints, opens a secured session on the most
/// preferred secure endpoint and reads a batch of node values.
#[derive(Parser, Debug)]
#[command(
    name = "uaprobe",
    author = "Sylvex <contact@sylvex.io>",
    version = uaprobe_client::VERSION,
    about = "OPC UA discovery and secure read probe",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path (default: uaprobe.yaml if present)
    #[arg(short, long, env = "UAPROBE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        default_value = "info",
        env = "UAPROBE_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json, compact)
    #[arg(long, default_value = "text", env = "UAPROBE_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the uaprobe CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the full probe
    ///
    /// Discovers endpoints, selects the last secure endpoint matching the
    /// URL scheme, opens a session and reads the configured nodes in one
    /// request. This is the default command.
    Probe(ProbeArgs),

    /// List servers and endpoints advertised at a URL
    Discover(DiscoverArgs),

    /// Run the simulated server on TCP and WebSocket listeners
    ///
    /// Serves two nodes (`ns=1;s=Node1`, `ns=1;s=Node2`) behind a None and
    /// a SignAndEncrypt endpoint per binding until Ctrl-C.
    Serve(ServeArgs),

    /// Validate the configuration file
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `probe` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ProbeArgs {
    /// Discovery URL (overrides probe.url)
    pub url: Option<String>,

    /// Node id to read; repeat to read several, in order
    #[arg(short, long = "node", value_name = "NODE_ID")]
    pub nodes: Vec<String>,

    /// Timestamps to request
    #[arg(short, long)]
    pub timestamps: Option<TimestampsArg>,

    /// Client certificate (DER or PEM)
    #[arg(long, value_name = "PATH")]
    pub certificate: Option<PathBuf>,
}

/// Arguments for the `discover` command.
#[derive(Args, Debug, Clone)]
pub struct DiscoverArgs {
    /// Discovery URL
    pub url: String,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Binary TCP listen address
    #[arg(long, default_value = "127.0.0.1:48040")]
    pub tcp: SocketAddr,

    /// WebSocket listen address
    #[arg(long, default_value = "127.0.0.1:48043")]
    pub ws: SocketAddr,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

/// Timestamps selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TimestampsArg {
    /// Source timestamp only
    Source,
    /// Server timestamp only
    Server,
    /// Both timestamps
    Both,
    /// No timestamps
    Neither,
}

impl From<TimestampsArg> for TimestampsToReturn {
    fn from(arg: TimestampsArg) -> Self {
        match arg {
            TimestampsArg::Source => Self::Source,
            TimestampsArg::Server => Self::Server,
            TimestampsArg::Both => Self::Both,
            TimestampsArg::Neither => Self::Neither,
        }
    }
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Probe` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Probe(ProbeArgs::default()))
    }

    /// Check if verbose logging is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// Get the effective log level based on flags.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }

    /// Returns the config path and whether it was given explicitly.
    pub fn config_path(&self) -> (&Path, bool) {
        match &self.config {
            Some(path) => (path.as_path(), true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
