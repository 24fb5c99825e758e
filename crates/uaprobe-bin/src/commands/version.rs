// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use uaprobe_client::transport::{TCP_PROFILE_URI, WS_PROFILE_URI};

use crate::cli::Cli;
use crate::error::BinResult;

/// Executes the `version` command to display version information.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("uaprobe - OPC UA discovery and secure read probe");
    println!();
    println!("Version Information:");
    println!("  uaprobe-bin:    {}", env!("CARGO_PKG_VERSION"));
    println!("  uaprobe-client: {}", uaprobe_client::VERSION);
    println!("  uaprobe-config: {}", uaprobe_config::VERSION);
    println!();
    println!("Build Information:");
    println!("  Rust Edition: 2021");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!();
    println!("Transport Profiles:");
    println!("  opc.tcp: {}", TCP_PROFILE_URI);
    println!("  opc.ws:  {}", WS_PROFILE_URI);
    println!();
    println!("Features:");
    println!(
        "  WSS:          {}",
        if cfg!(feature = "wss") { "enabled" } else { "disabled" }
    );
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
