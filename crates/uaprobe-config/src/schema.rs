// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema for the probe.
//!
//! ```yaml
//! client:
//!   application_name: uaprobe
//!   certificate_path: certs/client.der
//!   request_timeout: 5s
//! probe:
//!   url: opc.tcp://localhost:48040
//!   nodes:
//!     - ns=1;s=Node1
//!     - ns=1;s=Node2
//!   timestamps: both
//! ```

use serde::{Deserialize, Serialize};
use uaprobe_client::types::{ClientConfig, NodeId, ReadValueId, TimestampsToReturn};

use crate::error::{ConfigError, ConfigResult};

/// Nodes read when the configuration names none.
pub const DEFAULT_NODES: [&str; 2] = ["ns=1;s=Node1", "ns=1;s=Node2"];

// =============================================================================
// ProbeConfig
// =============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Client identity, limits and timeouts.
    #[serde(default)]
    pub client: ClientConfig,

    /// What to probe.
    #[serde(default)]
    pub probe: ProbeSettings,
}

impl ProbeConfig {
    /// Validates both sections.
    pub fn validate(&self) -> ConfigResult<()> {
        self.client.validate()?;
        self.probe.validate()
    }
}

// =============================================================================
// ProbeSettings
// =============================================================================

/// Target URL and read requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Discovery URL. The command line may supply it instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Node ids in OPC UA string notation, read in this order.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Which timestamps to request.
    #[serde(default)]
    pub timestamps: TimestampsToReturn,
}

fn default_nodes() -> Vec<String> {
    DEFAULT_NODES.iter().map(|s| s.to_string()).collect()
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            url: None,
            nodes: default_nodes(),
            timestamps: TimestampsToReturn::default(),
        }
    }
}

impl ProbeSettings {
    /// Parses `nodes` into Value-attribute read requests, keeping order.
    pub fn read_requests(&self) -> ConfigResult<Vec<ReadValueId>> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                node.parse::<NodeId>()
                    .map(ReadValueId::value)
                    .map_err(|e| ConfigError::validation(format!("probe.nodes[{}]", i), e.to_string()))
            })
            .collect()
    }

    /// Validates the settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.nodes.is_empty() {
            return Err(ConfigError::validation(
                "probe.nodes",
                "at least one node is required",
            ));
        }
        if let Some(url) = &self.url {
            if url.trim().is_empty() {
                return Err(ConfigError::validation("probe.url", "must not be empty"));
            }
        }
        self.read_requests().map(|_| ())
    }
}
