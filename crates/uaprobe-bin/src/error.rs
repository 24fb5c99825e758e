// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the uaprobe binary.

use thiserror::Error;
use uaprobe_client::{ErrorKind, ProbeError};
use uaprobe_config::ConfigError;

/// Result type alias for uaprobe-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the uaprobe binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Initialization error.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Runtime error.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Config loading error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The probe workflow failed.
    #[error("Probe failed [{}]: {0}", .0.kind())]
    Probe(#[from] ProbeError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        /// The context description.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Creates a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Creates an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Adds context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the workflow error kind, if this is a probe failure.
    pub fn probe_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Probe(e) => Some(e.kind()),
            Self::WithContext { source, .. } => source.probe_kind(),
            _ => None,
        }
    }

    /// Returns a user-facing message from the failing layer, if it has one.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Probe(e) => Some(e.user_message()),
            Self::Config(e) => Some(e.user_message()),
            Self::WithContext { source, .. } => source.user_message(),
            _ => None,
        }
    }

    /// Returns recovery hints from the failing layer.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Probe(e) => e.recovery_hints(),
            Self::WithContext { source, .. } => source.recovery_hints(),
            _ => Vec::new(),
        }
    }

    /// Returns the exit code for this error.
    ///
    /// Probe failures map each error kind to its own code from 10 upward.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Config(_) => 1,
            Self::Initialization(_) => 2,
            Self::Runtime(_) => 3,
            Self::Io(_) => 4,
            Self::Probe(e) => kind_exit_code(e.kind()),
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }
}

fn kind_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Configuration => 1,
        ErrorKind::Aborted => 3,
        ErrorKind::DiscoveryFailure => 10,
        ErrorKind::NoSecureEndpoint => 11,
        ErrorKind::UnsupportedTransport => 12,
        ErrorKind::ChannelEstablishmentFailure => 13,
        ErrorKind::SessionRejected => 14,
        ErrorKind::ReadFailure => 15,
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runtime(format!("{:#}", err))
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error with appropriate formatting.
pub fn report_error(error: &BinError) {
    eprint!("{}", render_report(error));
}

/// Renders the error, its causes, the user message and recovery hints.
pub fn render_report(error: &BinError) -> String {
    let mut out = format!("Error: {}\n", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        out.push_str(&format!("  Caused by: {}\n", cause));
        source = cause.source();
    }

    if let Some(message) = error.user_message() {
        out.push_str(&format!("\n{}\n", message));
    }

    let hints = error.recovery_hints();
    if !hints.is_empty() {
        out.push_str("\nHints:\n");
        for hint in hints {
            out.push_str(&format!("  - {}\n", hint));
        }
    }

    out
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = BinError::config("no server URL");
        assert_eq!(err.to_string(), "Configuration error: no server URL");
    }

    #[test]
    fn test_error_with_context() {
        let err = BinError::runtime("listener closed").with_context("serve");
        assert_eq!(err.to_string(), "serve: Runtime error: listener closed");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BinError::config("test").exit_code(), 1);
        assert_eq!(BinError::init("test").exit_code(), 2);
        assert_eq!(BinError::runtime("test").exit_code(), 3);
        assert_eq!(BinError::io("test").exit_code(), 4);
    }

    #[test]
    fn test_probe_error_kind() {
        let err = BinError::from(ProbeError::no_secure_endpoint("opc.tcp://h:1", 2));
        assert_eq!(err.probe_kind(), Some(ErrorKind::NoSecureEndpoint));
        assert_eq!(err.exit_code(), 11);
        assert!(err.to_string().starts_with("Probe failed [NoSecureEndpoint]"));

        let wrapped = err.with_context("probe");
        assert_eq!(wrapped.probe_kind(), Some(ErrorKind::NoSecureEndpoint));
        assert_eq!(wrapped.exit_code(), 11);
    }

    #[test]
    fn test_report_includes_message_and_hints() {
        let err = BinError::from(ProbeError::no_secure_endpoint("opc.tcp://h:1", 2))
            .with_context("probe");
        let report = render_report(&err);

        assert!(report.starts_with("Error: probe: Probe failed [NoSecureEndpoint]"));
        assert!(report.contains("  Caused by: Probe failed [NoSecureEndpoint]"));
        assert!(report.contains("보안 엔드포인트를 찾을 수 없습니다: opc.tcp://h:1"));
        assert!(report.contains("Hints:\n  - Check the security modes the server advertises\n"));
    }

    #[test]
    fn test_report_plain_error_has_no_hints() {
        let report = render_report(&BinError::runtime("listener closed"));
        assert_eq!(report, "Error: Runtime error: listener closed\n");
    }

    #[test]
    fn test_anyhow_context_is_kept() {
        use anyhow::Context;

        let result: anyhow::Result<()> =
            Err(std::io::Error::other("interrupted")).context("failed to wait for Ctrl-C");
        let err = BinError::from(result.unwrap_err());
        assert_eq!(
            err.to_string(),
            "Runtime error: failed to wait for Ctrl-C: interrupted"
        );
        assert_eq!(err.exit_code(), 3);
    }
}
