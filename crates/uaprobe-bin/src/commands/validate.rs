// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use uaprobe_config::ProbeConfig;

use super::load_settings;
use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let (config_path, _) = cli.config_path();
    let config = load_settings(cli)
        .map_err(|e| e.with_context("Configuration validation failed"))?;
    let warnings = collect_warnings(&config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Application: {}", config.client.application_name);
            println!(
                "  URL: {}",
                config.probe.url.as_deref().unwrap_or("(not set)")
            );
            println!("  Nodes: {}", config.probe.nodes.join(", "));
            println!("  Timestamps: {:?}", config.probe.timestamps);
            println!(
                "  Request timeout: {}",
                humantime::format_duration(config.client.request_timeout)
            );

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!("{}", render_json(&config)?);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "application_name": config.client.application_name,
                    "url": config.probe.url,
                    "node_count": config.probe.nodes.len(),
                },
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            println!("{}", render_json(&output)?);
        }
    }

    Ok(())
}

fn collect_warnings(config: &ProbeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.probe.url.is_none() {
        warnings.push("probe.url is not set; the URL must be given on the command line".to_string());
    }
    match &config.client.certificate_path {
        None => warnings.push("No client certificate configured; a self-issued one will be used".to_string()),
        Some(path) if !path.exists() => {
            warnings.push(format!("Certificate file does not exist: {}", path.display()))
        }
        Some(_) => {}
    }

    warnings
}

fn render_json<T: serde::Serialize>(value: &T) -> BinResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| BinError::runtime(format!("failed to render JSON: {}", e)))
}
