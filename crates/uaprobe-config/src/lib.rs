// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uaprobe-config
//!
//! Configuration loading for the uaprobe client.
//!
//! ## Features
//!
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: `UAPROBE_*` variables win over file values
//! - **Placeholders**: `${VAR}` and `${VAR:default}` in file content
//! - **Validation**: node ids are parsed and the client section is checked
//!
//! ## Quick Start
//!
//! ```no_run
//! use uaprobe_config::loader::load_config;
//!
//! let config = load_config("uaprobe.yaml").unwrap();
//! let requests = config.probe.read_requests().unwrap();
//! println!("{} nodes to read", requests.len());
//! ```
//!
//! Values in config files can reference environment variables:
//!
//! ```yaml
//! probe:
//!   url: "opc.tcp://${PLC_HOST:localhost}:4840"
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    load_config, load_config_str, ConfigFormat, ConfigLoader, ConfigLoaderBuilder,
    DEFAULT_ENV_PREFIX,
};
pub use schema::{ProbeConfig, ProbeSettings, DEFAULT_NODES};

/// Commonly used items.
pub mod prelude {
    pub use crate::error::{ConfigError, ConfigResult};
    pub use crate::loader::{load_config, ConfigFormat, ConfigLoader};
    pub use crate::schema::{ProbeConfig, ProbeSettings};
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
