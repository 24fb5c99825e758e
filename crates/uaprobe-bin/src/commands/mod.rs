// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `probe`: Run discovery, selection, session bootstrap and the read
//! - `discover`: List servers and endpoints
//! - `serve`: Run the simulated server
//! - `validate`: Validate configuration file
//! - `version`: Show version information

mod discover;
mod probe;
mod serve;
mod validate;
mod version;

pub use discover::discover;
pub use probe::probe;
pub use serve::serve;
pub use validate::validate;
pub use version::version;

use tracing::debug;
use uaprobe_config::{ConfigFormat, ConfigLoader, ProbeConfig};

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Probe(args) => probe::probe(&cli, args).await,
        Commands::Discover(args) => discover::discover(&cli, args).await,
        Commands::Serve(args) => serve::serve(&cli, args).await,
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Version => version::version(&cli),
    }
}

/// Loads the configuration for a command.
///
/// An explicit `--config` must exist. Without one, `uaprobe.yaml` is used
/// when present and defaults plus `UAPROBE_*` overrides otherwise.
pub(crate) fn load_settings(cli: &Cli) -> BinResult<ProbeConfig> {
    let (path, explicit) = cli.config_path();
    let loader = ConfigLoader::new();

    if explicit || path.exists() {
        return Ok(loader.load(path)?);
    }

    debug!(path = %path.display(), "No config file, using defaults");
    Ok(loader.load_from_str("{}", ConfigFormat::Json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_explicit_config_must_exist() {
        let cli = Cli::parse_from(["uaprobe", "-c", "/nonexistent/uaprobe.yaml", "validate"]);
        let err = load_settings(&cli).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_explicit_config_loaded() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(b"[probe]\nnodes = [\"ns=3;s=Pump\"]\n").unwrap();

        let cli = Cli::parse_from([
            "uaprobe",
            "-c",
            file.path().to_str().unwrap(),
            "validate",
        ]);
        let config = load_settings(&cli).unwrap();
        assert_eq!(config.probe.nodes, vec!["ns=3;s=Pump"]);
    }
}
