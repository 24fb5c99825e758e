// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the discovery, bootstrap and read workflow.
//!
//! Every stage of the workflow fails with exactly one [`ProbeError`] kind.
//! Lower layers ([`TransportError`], [`ChannelError`]) never escape on their
//! own: the stage that observed them wraps them, so the same socket failure
//! surfaces as a discovery failure during discovery and as a channel
//! establishment failure during bootstrap.
//!
//! # Error Categories
//!
//! ```text
//! ProbeError
//! ├── Discovery             - FindServers / GetEndpoints over the unsecured channel
//! ├── NoSecureEndpoint      - selection found no qualifying endpoint
//! ├── UnsupportedTransport  - no binding registered for scheme or profile
//! ├── ChannelEstablishment  - secured channel could not be opened
//! ├── SessionRejected       - server refused CreateSession / ActivateSession
//! ├── Read                  - the batched Read call failed
//! ├── Configuration         - local misconfiguration
//! └── Aborted               - worker task ended without a result
//! ```
//!
//! # Examples
//!
//! ```
//! use uaprobe_client::error::{ErrorKind, ProbeError};
//!
//! let error = ProbeError::no_secure_endpoint("opc.tcp://localhost:48040", 3);
//! assert_eq!(error.kind(), ErrorKind::NoSecureEndpoint);
//! assert_eq!(error.error_code().to_string(), "UA-0201");
//! ```

use std::fmt;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use crate::transport::MessageType;
use crate::types::{SecurityMode, StatusCode};

// =============================================================================
// ProbeError - Main Error Type
// =============================================================================

/// The main error type for the probe workflow.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Discovery could not produce a catalog.
    #[error("{0}")]
    Discovery(#[from] DiscoveryError),

    /// No endpoint matched the scheme with a security mode other than None.
    #[error("No secure endpoint for '{url}' among {candidates} candidate(s)")]
    NoSecureEndpoint {
        /// The URL the workflow was started with.
        url: String,
        /// Number of endpoints that were examined.
        candidates: usize,
    },

    /// No transport binding is registered for the scheme or profile.
    #[error("Unsupported transport '{scheme}'")]
    UnsupportedTransport {
        /// URL scheme (or transport profile) that failed to resolve.
        scheme: String,
    },

    /// The secured channel could not be established.
    #[error("Channel establishment failed for '{endpoint}': {source}")]
    ChannelEstablishment {
        /// Endpoint URL the channel was opened against.
        endpoint: String,
        /// Underlying channel error.
        #[source]
        source: ChannelError,
    },

    /// The server refused the session.
    #[error("{0}")]
    SessionRejected(#[from] SessionError),

    /// The batched read failed as a whole.
    #[error("{0}")]
    Read(#[from] ReadError),

    /// Local configuration is invalid.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The worker task ended without delivering a result.
    #[error("Workflow aborted: {reason}")]
    Aborted {
        /// Why the worker went away.
        reason: String,
    },
}

impl ProbeError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a discovery error.
    #[inline]
    pub fn discovery(error: DiscoveryError) -> Self {
        Self::Discovery(error)
    }

    /// Creates a no-secure-endpoint error.
    pub fn no_secure_endpoint(url: impl Into<String>, candidates: usize) -> Self {
        Self::NoSecureEndpoint {
            url: url.into(),
            candidates,
        }
    }

    /// Creates an unsupported transport error.
    pub fn unsupported_transport(scheme: impl Into<String>) -> Self {
        Self::UnsupportedTransport {
            scheme: scheme.into(),
        }
    }

    /// Creates a channel establishment error.
    pub fn channel_establishment(endpoint: impl Into<String>, source: ChannelError) -> Self {
        Self::ChannelEstablishment {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates a session rejected error.
    #[inline]
    pub fn session_rejected(error: SessionError) -> Self {
        Self::SessionRejected(error)
    }

    /// Creates a read error.
    #[inline]
    pub fn read(error: ReadError) -> Self {
        Self::Read(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Creates an aborted error.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns the flat error kind used by reports and workflow state.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Discovery(_) => ErrorKind::DiscoveryFailure,
            Self::NoSecureEndpoint { .. } => ErrorKind::NoSecureEndpoint,
            Self::UnsupportedTransport { .. } => ErrorKind::UnsupportedTransport,
            Self::ChannelEstablishment { .. } => ErrorKind::ChannelEstablishmentFailure,
            Self::SessionRejected(_) => ErrorKind::SessionRejected,
            Self::Read(_) => ErrorKind::ReadFailure,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Aborted { .. } => ErrorKind::Aborted,
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Discovery(e) => e.severity(),
            Self::NoSecureEndpoint { .. } => ErrorSeverity::Error,
            Self::UnsupportedTransport { .. } => ErrorSeverity::Error,
            Self::ChannelEstablishment { source, .. } => source.severity(),
            Self::SessionRejected(_) => ErrorSeverity::Error,
            Self::Read(e) => e.severity(),
            Self::Configuration(_) => ErrorSeverity::Critical,
            Self::Aborted { .. } => ErrorSeverity::Critical,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Discovery(_) => "discovery",
            Self::NoSecureEndpoint { .. } => "selection",
            Self::UnsupportedTransport { .. } => "dispatch",
            Self::ChannelEstablishment { .. } => "channel",
            Self::SessionRejected(_) => "session",
            Self::Read(_) => "read",
            Self::Configuration(_) => "configuration",
            Self::Aborted { .. } => "workflow",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Discovery(e) => e.error_code(),
            Self::NoSecureEndpoint { .. } => ErrorCode::new(2, 1),
            Self::UnsupportedTransport { .. } => ErrorCode::new(3, 1),
            Self::ChannelEstablishment { source, .. } => {
                ErrorCode::new(4, source.error_code().code)
            }
            Self::SessionRejected(e) => e.error_code(),
            Self::Read(e) => e.error_code(),
            Self::Configuration(e) => e.error_code(),
            Self::Aborted { .. } => ErrorCode::new(9, 1),
        }
    }

    /// Returns recovery hints for this error.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Discovery(e) => e.recovery_hints(),
            Self::NoSecureEndpoint { .. } => vec![
                "Check the security modes the server advertises",
                "Verify the URL scheme matches an advertised endpoint",
            ],
            Self::UnsupportedTransport { .. } => vec![
                "Use opc.tcp://, opc.ws:// or opc.wss://",
                "Register a channel factory for the scheme",
            ],
            Self::ChannelEstablishment { source, .. } => source.recovery_hints(),
            Self::SessionRejected(e) => e.recovery_hints(),
            Self::Read(e) => e.recovery_hints(),
            Self::Configuration(e) => e.recovery_hints(),
            Self::Aborted { .. } => vec!["Check the logs for a panic in the worker task"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Discovery(e) => e.user_message(),
            Self::NoSecureEndpoint { url, .. } => {
                format!("보안 엔드포인트를 찾을 수 없습니다: {}", url)
            }
            Self::UnsupportedTransport { scheme } => {
                format!("지원하지 않는 전송 방식: {}", scheme)
            }
            Self::ChannelEstablishment { endpoint, .. } => {
                format!("보안 채널을 열 수 없습니다: {}", endpoint)
            }
            Self::SessionRejected(e) => e.user_message(),
            Self::Read(e) => e.user_message(),
            Self::Configuration(e) => e.user_message(),
            Self::Aborted { .. } => "작업이 비정상적으로 종료되었습니다".to_string(),
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                kind = %self.kind(),
                category = self.category(),
                context = context,
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                kind = %self.kind(),
                category = self.category(),
                context = context,
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                kind = %self.kind(),
                category = self.category(),
                context = context,
                "{self}"
            ),
        }
    }
}

// =============================================================================
// ErrorKind
// =============================================================================

/// Flat error taxonomy reported to callers and sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Discovery calls failed.
    DiscoveryFailure,
    /// No qualifying endpoint.
    NoSecureEndpoint,
    /// No binding for the scheme.
    UnsupportedTransport,
    /// Secured channel could not be opened.
    ChannelEstablishmentFailure,
    /// Session refused by the server.
    SessionRejected,
    /// The read call failed.
    ReadFailure,
    /// Local misconfiguration.
    Configuration,
    /// Worker ended without a result.
    Aborted,
}

impl ErrorKind {
    /// Returns the kind name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DiscoveryFailure => "DiscoveryFailure",
            Self::NoSecureEndpoint => "NoSecureEndpoint",
            Self::UnsupportedTransport => "UnsupportedTransport",
            Self::ChannelEstablishmentFailure => "ChannelEstablishmentFailure",
            Self::SessionRejected => "SessionRejected",
            Self::ReadFailure => "ReadFailure",
            Self::Configuration => "Configuration",
            Self::Aborted => "Aborted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TransportError
// =============================================================================

/// Errors raised by a transport binding while moving frames.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint URL could not be turned into a socket target.
    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Connecting to the remote failed.
    #[error("Failed to connect to '{target}': {source}")]
    Connect {
        /// Host and port or WebSocket URL.
        target: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// I/O failure on an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// WebSocket protocol failure.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The peer closed the connection.
    #[error("Connection closed by peer")]
    Closed,

    /// Operation attempted while not connected.
    #[error("Transport is not connected")]
    NotConnected,

    /// A frame exceeded the negotiated size.
    #[error("Frame of {size} bytes exceeds limit of {max} bytes")]
    FrameTooLarge {
        /// Declared frame size.
        size: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// A frame header or body could not be decoded.
    #[error("Malformed frame: {reason}")]
    MalformedFrame {
        /// Description of the defect.
        reason: String,
    },
}

impl TransportError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a connect error.
    pub fn connect(target: impl Into<String>, source: io::Error) -> Self {
        Self::Connect {
            target: target.into(),
            source,
        }
    }

    /// Creates a malformed frame error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the connection can no longer be used.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidUrl { .. })
    }
}

// =============================================================================
// ChannelError
// =============================================================================

/// Errors raised by a secure channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Transport-level failure.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// The server answered the handshake or open request with an error.
    #[error("Server rejected the channel: {status} ({reason})")]
    Rejected {
        /// Status code sent by the server.
        status: StatusCode,
        /// Reason text sent by the server.
        reason: String,
    },

    /// A secured mode was requested without a client certificate.
    #[error("Security mode {mode} requires a client certificate")]
    MissingCertificate {
        /// The requested mode.
        mode: SecurityMode,
    },

    /// A response did not echo the request handle.
    #[error("Response handle {actual} does not match request handle {expected}")]
    HandleMismatch {
        /// Handle sent with the request.
        expected: u32,
        /// Handle carried by the response.
        actual: u32,
    },

    /// A frame of an unexpected type arrived.
    #[error("Expected {expected} message, received {actual}")]
    UnexpectedMessage {
        /// The awaited type.
        expected: MessageType,
        /// The received type.
        actual: MessageType,
    },

    /// A message body could not be encoded or decoded.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A message-context limit was exceeded.
    #[error("{what} of {size} exceeds limit of {max}")]
    LimitExceeded {
        /// What was measured.
        what: &'static str,
        /// Measured size.
        size: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// The server answered a service request with a fault.
    #[error("Service fault: {status}")]
    ServiceFault {
        /// Fault status code.
        status: StatusCode,
    },

    /// The server answered with a different service than requested.
    #[error("Unexpected response to {service}")]
    UnexpectedResponse {
        /// The service that was called.
        service: &'static str,
    },

    /// A request was issued before `open` succeeded.
    #[error("Channel is not open")]
    NotOpen,

    /// A previous failure left the channel unusable.
    #[error("Channel is faulted")]
    Faulted,

    /// An operation did not complete in time.
    #[error("{operation} timed out after {duration:?}")]
    TimedOut {
        /// What timed out.
        operation: &'static str,
        /// Configured limit.
        duration: Duration,
    },
}

impl ChannelError {
    /// Creates a rejected error.
    pub fn rejected(status: StatusCode, reason: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timed_out(operation: &'static str, duration: Duration) -> Self {
        Self::TimedOut {
            operation,
            duration,
        }
    }

    /// Creates an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding(message.into())
    }

    /// Returns `true` if the channel cannot carry further requests.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_fatal(),
            Self::ServiceFault { .. } | Self::LimitExceeded { .. } => false,
            _ => true,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TimedOut { .. } | Self::Transport(TransportError::Closed) => {
                ErrorSeverity::Warning
            }
            Self::MissingCertificate { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Transport(_) => ErrorCode::new(4, 1),
            Self::Rejected { .. } => ErrorCode::new(4, 2),
            Self::MissingCertificate { .. } => ErrorCode::new(4, 3),
            Self::HandleMismatch { .. } => ErrorCode::new(4, 4),
            Self::UnexpectedMessage { .. } => ErrorCode::new(4, 5),
            Self::Encoding(_) => ErrorCode::new(4, 6),
            Self::LimitExceeded { .. } => ErrorCode::new(4, 7),
            Self::ServiceFault { .. } => ErrorCode::new(4, 8),
            Self::NotOpen => ErrorCode::new(4, 9),
            Self::Faulted => ErrorCode::new(4, 10),
            Self::TimedOut { .. } => ErrorCode::new(4, 11),
            Self::UnexpectedResponse { .. } => ErrorCode::new(4, 12),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Transport(_) => vec![
                "Check if the server is running",
                "Verify host, port and firewall rules",
            ],
            Self::Rejected { .. } => vec![
                "Check the server log for the rejection reason",
                "Verify the security policy is supported",
            ],
            Self::MissingCertificate { .. } => {
                vec!["Set certificate_path in the client configuration"]
            }
            Self::TimedOut { .. } => vec![
                "Increase the connect or request timeout",
                "Check network latency to the server",
            ],
            Self::LimitExceeded { .. } => vec!["Raise the message limits in the configuration"],
            _ => vec!["Retry against a different server build or report the interop issue"],
        }
    }
}

// =============================================================================
// DiscoveryError
// =============================================================================

/// Discovery failures.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The unsecured discovery channel failed.
    #[error("Discovery against '{url}' failed: {source}")]
    Channel {
        /// The bare discovery URL.
        url: String,
        /// Underlying channel error.
        #[source]
        source: ChannelError,
    },

    /// The discovery exchange exceeded its time budget.
    #[error("Discovery against '{url}' timed out after {duration:?}")]
    TimedOut {
        /// The bare discovery URL.
        url: String,
        /// Configured limit.
        duration: Duration,
    },

    /// A discovery service returned an unexpected response body.
    #[error("Unexpected response to {service} from '{url}'")]
    UnexpectedResponse {
        /// The bare discovery URL.
        url: String,
        /// The service that was called.
        service: &'static str,
    },
}

impl DiscoveryError {
    /// Creates a channel error.
    pub fn channel(url: impl Into<String>, source: ChannelError) -> Self {
        Self::Channel {
            url: url.into(),
            source,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TimedOut { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Channel { .. } => ErrorCode::new(1, 1),
            Self::TimedOut { .. } => ErrorCode::new(1, 2),
            Self::UnexpectedResponse { .. } => ErrorCode::new(1, 3),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Channel { .. } => vec![
                "Check if the server is running",
                "Verify the discovery URL is correct",
            ],
            Self::TimedOut { .. } => vec!["Increase discovery_timeout"],
            Self::UnexpectedResponse { .. } => vec!["The server may not implement discovery"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Channel { url, .. } => format!("서버 검색에 실패했습니다: {}", url),
            Self::TimedOut { url, .. } => format!("서버 검색 시간 초과: {}", url),
            Self::UnexpectedResponse { url, .. } => {
                format!("서버 검색 응답이 올바르지 않습니다: {}", url)
            }
        }
    }
}

// =============================================================================
// SessionError
// =============================================================================

/// Session rejection by the server.
#[derive(Debug, Error)]
pub enum SessionError {
    /// CreateSession was refused.
    #[error("Server rejected CreateSession: {status}")]
    CreateRejected {
        /// Status returned by the server.
        status: StatusCode,
    },

    /// ActivateSession was refused.
    #[error("Server rejected ActivateSession: {status}")]
    ActivateRejected {
        /// Status returned by the server.
        status: StatusCode,
    },

    /// CreateSession succeeded without an authentication token.
    #[error("CreateSession response carried no authentication token")]
    MissingToken,
}

impl SessionError {
    /// Returns the status code the server reported, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::CreateRejected { status } | Self::ActivateRejected { status } => Some(*status),
            Self::MissingToken => None,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::CreateRejected { .. } => ErrorCode::new(5, 1),
            Self::ActivateRejected { .. } => ErrorCode::new(5, 2),
            Self::MissingToken => ErrorCode::new(5, 3),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        vec![
            "Check the server's session limits",
            "Verify the client certificate is trusted by the server",
        ]
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::CreateRejected { status } => format!("세션 생성이 거부되었습니다 ({})", status),
            Self::ActivateRejected { status } => {
                format!("세션 활성화가 거부되었습니다 ({})", status)
            }
            Self::MissingToken => "세션 인증 토큰이 없습니다".to_string(),
        }
    }
}

// =============================================================================
// ReadError
// =============================================================================

/// Failures of the batched read call as a whole.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The request list was empty.
    #[error("Nothing to read")]
    NothingToRead,

    /// The request list exceeds the configured array limit.
    #[error("{count} read operations exceed limit of {max}")]
    TooManyOperations {
        /// Requested operations.
        count: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// The server returned a different number of results than requested.
    #[error("Read returned {actual} results for {expected} requests")]
    ResultCountMismatch {
        /// Number of requests.
        expected: usize,
        /// Number of results.
        actual: usize,
    },

    /// The session was closed or its channel failed earlier.
    #[error("Session is no longer usable")]
    SessionInvalidated,

    /// The read request failed on the channel.
    #[error("Read failed: {0}")]
    Channel(#[from] ChannelError),

    /// The server answered with something other than a Read response.
    #[error("Unexpected response to Read")]
    UnexpectedResponse,
}

impl ReadError {
    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NothingToRead => ErrorSeverity::Warning,
            Self::Channel(e) => e.severity(),
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NothingToRead => ErrorCode::new(6, 1),
            Self::TooManyOperations { .. } => ErrorCode::new(6, 2),
            Self::ResultCountMismatch { .. } => ErrorCode::new(6, 3),
            Self::SessionInvalidated => ErrorCode::new(6, 4),
            Self::Channel(_) => ErrorCode::new(6, 5),
            Self::UnexpectedResponse => ErrorCode::new(6, 6),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::NothingToRead => vec!["Provide at least one node to read"],
            Self::TooManyOperations { .. } => {
                vec!["Split the request or raise max_array_length"]
            }
            Self::SessionInvalidated => vec!["Open a new session before reading"],
            _ => vec!["Check the server log", "Retry with a new session"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::NothingToRead => "읽을 노드가 없습니다".to_string(),
            Self::TooManyOperations { count, .. } => {
                format!("읽기 요청이 너무 많습니다: {}", count)
            }
            Self::ResultCountMismatch { expected, actual } => {
                format!("읽기 결과 개수 불일치 (요청 {}, 응답 {})", expected, actual)
            }
            Self::SessionInvalidated => "세션이 더 이상 유효하지 않습니다".to_string(),
            Self::Channel(_) | Self::UnexpectedResponse => "데이터 읽기에 실패했습니다".to_string(),
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Local configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// An endpoint URL could not be parsed.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A node id string could not be parsed.
    #[error("Invalid node id '{input}': {reason}")]
    InvalidNodeId {
        /// The input string.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A security mode string could not be parsed.
    #[error("Invalid security mode '{input}'")]
    InvalidSecurityMode {
        /// The input string.
        input: String,
    },

    /// A security policy string could not be parsed.
    #[error("Invalid security policy '{input}'")]
    InvalidSecurityPolicy {
        /// The input string.
        input: String,
    },

    /// A timestamps policy string could not be parsed.
    #[error("Invalid timestamps policy '{input}'")]
    InvalidTimestamps {
        /// The input string.
        input: String,
    },

    /// A required field is missing.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Field name.
        field: &'static str,
    },

    /// A value is out of its allowed range.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The client certificate could not be loaded.
    #[error("Failed to load certificate '{path}': {reason}")]
    Certificate {
        /// File path.
        path: String,
        /// Why loading failed.
        reason: String,
    },

    /// A workflow instance was run a second time.
    #[error("Workflow has already been started")]
    WorkflowAlreadyStarted,
}

impl ConfigurationError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid node id error.
    pub fn invalid_node_id(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    /// Creates a certificate error.
    pub fn certificate(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Certificate {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidUrl { .. } => ErrorCode::new(8, 1),
            Self::InvalidNodeId { .. } => ErrorCode::new(8, 2),
            Self::InvalidSecurityMode { .. } => ErrorCode::new(8, 3),
            Self::InvalidSecurityPolicy { .. } => ErrorCode::new(8, 4),
            Self::InvalidTimestamps { .. } => ErrorCode::new(8, 5),
            Self::MissingField { .. } => ErrorCode::new(8, 6),
            Self::InvalidValue { .. } => ErrorCode::new(8, 7),
            Self::Certificate { .. } => ErrorCode::new(8, 8),
            Self::WorkflowAlreadyStarted => ErrorCode::new(8, 9),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidUrl { .. } => vec!["Use format: opc.tcp://hostname:port/path"],
            Self::InvalidNodeId { .. } => vec!["Use format: ns=1;s=Name or ns=0;i=2258"],
            Self::Certificate { .. } => vec!["Provide a DER or PEM encoded certificate"],
            Self::WorkflowAlreadyStarted => vec!["Build a new workflow for each run"],
            _ => vec!["Check the configuration file"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidUrl { url, .. } => format!("잘못된 URL: {}", url),
            Self::InvalidNodeId { input, .. } => format!("잘못된 노드 ID: {}", input),
            Self::Certificate { path, .. } => format!("인증서를 불러올 수 없습니다: {}", path),
            Self::WorkflowAlreadyStarted => "이미 실행된 작업입니다".to_string(),
            other => format!("설정 오류: {}", other),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code for categorization.
///
/// Format: `UA-XXYY` where XX is category and YY is specific error.
///
/// Categories:
/// - 1: Discovery
/// - 2: Selection
/// - 3: Dispatch
/// - 4: Channel
/// - 5: Session
/// - 6: Read
/// - 8: Configuration
/// - 9: Workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category.
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A Result type with ProbeError.
pub type ProbeResult<T> = Result<T, ProbeError>;

// =============================================================================
// Tests
// =============================================================================
