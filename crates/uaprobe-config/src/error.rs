// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration error types for uaprobe-config.

use std::path::PathBuf;

use thiserror::Error;
use uaprobe_client::ProbeError;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("File not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// File I/O error.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The content could not be parsed.
    #[error("Failed to parse {format} config{}: {message}", path_suffix(.path))]
    Parse {
        /// Format name.
        format: &'static str,
        /// File path, if loaded from a file.
        path: Option<PathBuf>,
        /// Error message.
        message: String,
    },

    /// The file extension does not map to a known format.
    #[error("Unsupported configuration format: {format}")]
    UnsupportedFormat {
        /// The unsupported extension.
        format: String,
    },

    /// A value failed validation.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// An environment override could not be applied.
    #[error("Invalid environment variable value for '{name}': {message}")]
    EnvOverride {
        /// The environment variable name.
        name: String,
        /// Error message.
        message: String,
    },

    /// The client section was rejected by the client library.
    #[error("Invalid client configuration: {0}")]
    Client(#[from] ProbeError),
}

impl ConfigError {
    /// Creates a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error without a path.
    pub fn parse(format: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            path: None,
            message: message.into(),
        }
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an environment override error.
    pub fn env_override(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EnvOverride {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Attaches the file path to a parse error.
    pub fn with_path(self, file: impl Into<PathBuf>) -> Self {
        match self {
            Self::Parse {
                format, message, ..
            } => Self::Parse {
                format,
                path: Some(file.into()),
                message,
            },
            other => other,
        }
    }

    /// Returns a user-friendly error message in Korean.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { path } => {
                format!("파일을 찾을 수 없습니다: {}", path.display())
            }
            Self::Io { path, .. } => {
                format!("설정 파일 읽기 실패: {}", path.display())
            }
            Self::Parse {
                format,
                path: Some(path),
                message,
            } => format!(
                "설정 파일 파싱 실패 ({}, {}): {}",
                path.display(),
                format,
                message
            ),
            Self::Parse {
                format, message, ..
            } => format!("설정 파싱 실패 ({}): {}", format, message),
            Self::UnsupportedFormat { format } => {
                format!("지원하지 않는 설정 형식: {}", format)
            }
            Self::Validation { field, message } => {
                format!("설정 검증 실패 ({}): {}", field, message)
            }
            Self::EnvOverride { name, message } => {
                format!("잘못된 환경 변수 값 ({}): {}", name, message)
            }
            Self::Client(e) => e.user_message(),
        }
    }

    /// Returns `true` if this error is related to file I/O.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::NotFound { .. })
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Io { .. } => "io",
            Self::Parse { .. } => "parse",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::Validation { .. } => "validation",
            Self::EnvOverride { .. } => "env_override",
            Self::Client(_) => "client",
        }
    }
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" '{}'", p.display()))
        .unwrap_or_default()
}

/// A Result type with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
