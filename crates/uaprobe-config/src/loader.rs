// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading for uaprobe.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and pick the format from its extension
//! 2. Resolve `${VAR}` / `${VAR:default}` placeholders in the raw text
//! 3. Parse YAML, TOML or JSON into [`ProbeConfig`]
//! 4. Apply environment variable overrides
//! 5. Resolve the certificate path against the config file directory
//! 6. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! UAPROBE_URL=opc.tcp://plc-7:4840
//! UAPROBE_NODES=ns=1;s=Node1,ns=1;s=Node2
//! UAPROBE_TIMESTAMPS=server
//! UAPROBE_APPLICATION_NAME=line-probe
//! UAPROBE_CERTIFICATE_PATH=/etc/uaprobe/client.der
//! UAPROBE_REQUEST_TIMEOUT=3s
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use uaprobe_client::types::TimestampsToReturn;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::ProbeConfig;

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "UAPROBE";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader for uaprobe.
///
/// # Examples
///
/// ```no_run
/// use uaprobe_config::loader::ConfigLoader;
///
/// let config = ConfigLoader::new().load("uaprobe.yaml").unwrap();
/// println!("{:?}", config.probe.url);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Base directory for resolving relative paths.
    base_path: Option<PathBuf>,

    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve placeholders and apply overrides.
    resolve_env_vars: bool,

    /// Whether to resolve relative paths.
    resolve_paths: bool,
}

impl ConfigLoader {
    /// Creates a new configuration loader with default settings.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
            resolve_paths: true,
        }
    }

    /// Creates a builder for configuring the loader.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    /// Sets the base path for resolving relative paths.
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Enables or disables relative path resolution.
    pub fn with_path_resolution(mut self, enabled: bool) -> Self {
        self.resolve_paths = enabled;
        self
    }

    /// Loads configuration from a file.
    ///
    /// The format follows the extension: `.yaml`/`.yml`, `.toml` or `.json`.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<ProbeConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let base_path = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });

        let content = self.read_file(path)?;
        let format = ConfigFormat::from_path(path)?;
        let mut config = self.parse_content(&content, format, path)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }
        if self.resolve_paths {
            self.resolve_relative_paths(&mut config, &base_path);
        }

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!(
            url = ?config.probe.url,
            nodes = config.probe.nodes.len(),
            "Probe settings"
        );

        Ok(config)
    }

    /// Loads configuration from a string.
    ///
    /// Relative paths are resolved only when a base path was set.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<ProbeConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };
        let mut config: ProbeConfig = parse_str(&content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }
        if self.resolve_paths {
            if let Some(base_path) = &self.base_path {
                self.resolve_relative_paths(&mut config, base_path);
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::not_found(path));
        }

        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<ProbeConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        parse_str(&content, format).map_err(|e| e.with_path(path))
    }

    /// Resolves `${VAR_NAME}` and `${VAR_NAME:default}` placeholders.
    ///
    /// Unknown variables without a default are left in place.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' || chars.peek() != Some(&'{') {
                result.push(c);
                continue;
            }
            chars.next();

            let mut var_content = String::new();
            let mut found_close = false;
            for c in chars.by_ref() {
                if c == '}' {
                    found_close = true;
                    break;
                }
                var_content.push(c);
            }

            if !found_close {
                result.push_str("${");
                result.push_str(&var_content);
                continue;
            }

            let (var_name, default_value) = match var_content.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (var_content.as_str(), None),
            };

            match (env::var(var_name), default_value) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!("Environment variable '{}' not found", var_name);
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        }

        result
    }

    fn env_key(&self, suffix: &str) -> String {
        format!("{}_{}", self.env_prefix, suffix)
    }

    /// Applies `<PREFIX>_*` overrides.
    fn apply_env_overrides(&self, config: &mut ProbeConfig) -> ConfigResult<()> {
        if let Ok(value) = env::var(self.env_key("URL")) {
            config.probe.url = Some(value);
        }

        let key = self.env_key("NODES");
        if let Ok(value) = env::var(&key) {
            let nodes: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if nodes.is_empty() {
                return Err(ConfigError::env_override(key, "expected at least one node id"));
            }
            config.probe.nodes = nodes;
        }

        let key = self.env_key("TIMESTAMPS");
        if let Ok(value) = env::var(&key) {
            config.probe.timestamps = value
                .parse::<TimestampsToReturn>()
                .map_err(|e| ConfigError::env_override(key, e.to_string()))?;
        }

        if let Ok(value) = env::var(self.env_key("APPLICATION_NAME")) {
            config.client.application_name = value;
        }
        if let Ok(value) = env::var(self.env_key("CERTIFICATE_PATH")) {
            config.client.certificate_path = Some(PathBuf::from(value));
        }

        for (suffix, target) in [
            ("CONNECT_TIMEOUT", &mut config.client.connect_timeout),
            ("DISCOVERY_TIMEOUT", &mut config.client.discovery_timeout),
            ("REQUEST_TIMEOUT", &mut config.client.request_timeout),
        ] {
            let key = self.env_key(suffix);
            if let Ok(value) = env::var(&key) {
                *target = humantime::parse_duration(&value)
                    .map_err(|e| ConfigError::env_override(key, e.to_string()))?;
            }
        }

        Ok(())
    }

    fn resolve_relative_paths(&self, config: &mut ProbeConfig, base_path: &Path) {
        if let Some(ref mut cert_path) = config.client.certificate_path {
            if cert_path.is_relative() {
                *cert_path = base_path.join(&cert_path);
            }
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigLoaderBuilder
// =============================================================================

/// Builder for ConfigLoader.
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    base_path: Option<PathBuf>,
    env_prefix: Option<String>,
    resolve_env_vars: Option<bool>,
    resolve_paths: Option<bool>,
}

impl ConfigLoaderBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base path.
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn resolve_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = Some(enabled);
        self
    }

    /// Enables or disables path resolution.
    pub fn resolve_paths(mut self, enabled: bool) -> Self {
        self.resolve_paths = Some(enabled);
        self
    }

    /// Builds the ConfigLoader.
    pub fn build(self) -> ConfigLoader {
        let defaults = ConfigLoader::new();
        ConfigLoader {
            base_path: self.base_path,
            env_prefix: self.env_prefix.unwrap_or(defaults.env_prefix),
            resolve_env_vars: self.resolve_env_vars.unwrap_or(defaults.resolve_env_vars),
            resolve_paths: self.resolve_paths.unwrap_or(defaults.resolve_paths),
        }
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> ConfigResult<T> {
    match format {
        ConfigFormat::Yaml => yaml_parse(content),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::parse("toml", e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::parse("json", e.to_string()))
        }
    }
}

/// YAML goes through the `config` crate.
fn yaml_parse<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::parse("yaml", e.to_string()))
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
///
/// ```no_run
/// use uaprobe_config::loader::load_config;
///
/// let config = load_config("uaprobe.yaml").unwrap();
/// ```
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ProbeConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<ProbeConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use uaprobe_client::types::NodeId;

    const YAML: &str = r#"
client:
  application_name: line-probe
  certificate_path: certs/client.der
  request_timeout: 2s
probe:
  url: opc.tcp://plc-7:4840
  nodes:
    - ns=1;s=Node1
    - ns=2;i=17
  timestamps: server
"#;

    /// Loader with a prefix nothing else in the process sets.
    fn isolated(prefix: &str) -> ConfigLoader {
        ConfigLoader::new().with_env_prefix(prefix)
    }

    #[test]
    fn test_load_yaml() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = isolated("UAPROBE_TEST_YAML").load(file.path()).unwrap();
        assert_eq!(config.client.application_name, "line-probe");
        assert_eq!(config.client.request_timeout, Duration::from_secs(2));
        assert_eq!(config.probe.url.as_deref(), Some("opc.tcp://plc-7:4840"));
        assert_eq!(config.probe.timestamps, TimestampsToReturn::Server);

        let requests = config.probe.read_requests().unwrap();
        assert_eq!(requests[1].node_id, NodeId::numeric(2, 17));
    }

    #[test]
    fn test_relative_certificate_path_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.yaml");
        fs::write(&path, YAML).unwrap();

        let config = isolated("UAPROBE_TEST_PATHS").load(&path).unwrap();
        assert_eq!(
            config.client.certificate_path.unwrap(),
            dir.path().join("certs/client.der")
        );
    }

    #[test]
    fn test_load_toml_and_json() {
        let toml = r#"
[probe]
url = "opc.ws://host:48043"
nodes = ["ns=1;s=Node2"]
"#;
        let config = isolated("UAPROBE_TEST_TOML")
            .load_from_str(toml, ConfigFormat::Toml)
            .unwrap();
        assert_eq!(config.probe.nodes, vec!["ns=1;s=Node2"]);
        assert_eq!(config.client.application_name, "uaprobe");

        let json = r#"{"probe": {"timestamps": "neither"}}"#;
        let config = isolated("UAPROBE_TEST_JSON")
            .load_from_str(json, ConfigFormat::Json)
            .unwrap();
        assert_eq!(config.probe.timestamps, TimestampsToReturn::Neither);
        assert_eq!(config.probe.nodes.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new().load("/nonexistent/uaprobe.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_parse_error_carries_path() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = isolated("UAPROBE_TEST_BADJSON").load(file.path()).unwrap_err();
        match err {
            ConfigError::Parse { format, path, .. } => {
                assert_eq!(format, "json");
                assert_eq!(path.as_deref(), Some(file.path()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("probe.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("probe.TOML")).unwrap(),
            ConfigFormat::Toml
        );
        assert!(ConfigFormat::from_path(Path::new("probe.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("probe")).is_err());
        assert_eq!(ConfigFormat::Json.extension(), "json");
    }

    #[test]
    fn test_env_placeholder_resolution() {
        env::set_var("UAPROBE_TEST_PLACEHOLDER_HOST", "plc-9");
        let loader = ConfigLoader::new();

        let resolved = loader.resolve_env_placeholders(
            "url: opc.tcp://${UAPROBE_TEST_PLACEHOLDER_HOST}:${UAPROBE_TEST_UNSET_PORT:4840}",
        );
        assert_eq!(resolved, "url: opc.tcp://plc-9:4840");

        let kept = loader.resolve_env_placeholders("a: ${UAPROBE_TEST_UNSET_NAME} b: ${open");
        assert_eq!(kept, "a: ${UAPROBE_TEST_UNSET_NAME} b: ${open");
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("UAPROBE_TEST_OVR_URL", "opc.tcp://override:1");
        env::set_var("UAPROBE_TEST_OVR_NODES", "ns=1;s=A, ns=1;s=B");
        env::set_var("UAPROBE_TEST_OVR_REQUEST_TIMEOUT", "750ms");

        let config = isolated("UAPROBE_TEST_OVR")
            .load_from_str(YAML, ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(config.probe.url.as_deref(), Some("opc.tcp://override:1"));
        assert_eq!(config.probe.nodes, vec!["ns=1;s=A", "ns=1;s=B"]);
        assert_eq!(config.client.request_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_invalid_env_override() {
        env::set_var("UAPROBE_TEST_BADOVR_REQUEST_TIMEOUT", "soon");

        let err = isolated("UAPROBE_TEST_BADOVR")
            .load_from_str(YAML, ConfigFormat::Yaml)
            .unwrap_err();
        match err {
            ConfigError::EnvOverride { name, .. } => {
                assert_eq!(name, "UAPROBE_TEST_BADOVR_REQUEST_TIMEOUT")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_env_disabled() {
        env::set_var("UAPROBE_TEST_OFF_URL", "opc.tcp://ignored:1");

        let config = ConfigLoader::builder()
            .env_prefix("UAPROBE_TEST_OFF")
            .resolve_env_vars(false)
            .build()
            .load_from_str(YAML, ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(config.probe.url.as_deref(), Some("opc.tcp://plc-7:4840"));
    }

    #[test]
    fn test_validation_runs_after_overrides() {
        let yaml = "probe:\n  nodes:\n    - not-a-node\n";
        let err = isolated("UAPROBE_TEST_INVALID")
            .load_from_str(yaml, ConfigFormat::Yaml)
            .unwrap_err();
        assert_eq!(err.error_type(), "validation");
    }
}
