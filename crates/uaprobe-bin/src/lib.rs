// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uaprobe-bin
//!
//! Command-line front end for the uaprobe client.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │            main.rs           │
//! └──────────────┬───────────────┘
//!                │
//!         ┌──────▼──────┐
//!         │    cli.rs   │
//!         └──────┬──────┘
//!                │
//!        ┌───────┴────────┐
//!        ▼                ▼
//!   ┌──────────┐    ┌──────────┐
//!   │ commands │    │ logging  │
//!   └────┬─────┘    └──────────┘
//!        │
//!   ┌────┴──────────────────────┐
//!   │ uaprobe-config            │
//!   │ uaprobe-client (workflow, │
//!   │   discovery, simulator)   │
//!   └───────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Probe a server (URL from the command line or probe.url)
//! uaprobe probe opc.tcp://localhost:48040 -n "ns=1;s=Node1" -n "ns=1;s=Node2"
//!
//! # List what a server advertises
//! uaprobe discover opc.ws://localhost:48043 -f json
//!
//! # Run the simulated server
//! uaprobe serve --tcp 127.0.0.1:48040 --ws 127.0.0.1:48043
//!
//! # Validate configuration
//! uaprobe -c probe.yaml validate
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
