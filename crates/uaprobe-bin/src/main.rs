// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! uaprobe - OPC UA discovery and secure read probe
//!
//! Main binary entry point.

use uaprobe_bin::error::report_error_and_exit;
use uaprobe_bin::{commands, init_logging, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.effective_log_level(), cli.log_format);

    tracing::debug!(version = uaprobe_bin::VERSION, "Starting {}", uaprobe_bin::NAME);

    if let Err(error) = commands::execute(cli).await {
        report_error_and_exit(error);
    }
}
