// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Progress report of a workflow run.
//!
//! A run emits events in stage order; a failure emits one final
//! [`ReportEvent::Failure`] and nothing after it.
//!
//! ```text
//! [Connecting to EndpointUrl] opc.tcp://localhost:48040
//! [ApplicationDescription] TestServer|urn:test
//! [EndpointDescription] opc.tcp://localhost:48040|http://opcfoundation.org/UA-Profile/...
//! [Connecting to EndpointUrl] opc.tcp://localhost:48040 SignAndEncrypt
//! [DataValue] 42
//! ```

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::error::ErrorKind;
use crate::types::{DataValue, EndpointDescription, ServerDescription};

// =============================================================================
// ReportEvent
// =============================================================================

/// One observable step of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    /// The URL the run was started with.
    Target {
        /// Discovery URL.
        url: String,
    },
    /// A server returned by FindServers.
    Server(ServerDescription),
    /// An endpoint returned by GetEndpoints.
    Endpoint(EndpointDescription),
    /// The endpoint chosen for the session.
    Selected(EndpointDescription),
    /// A read result.
    Value(DataValue),
    /// The run failed.
    Failure {
        /// Error kind.
        kind: ErrorKind,
        /// Error message.
        message: String,
    },
}

impl ReportEvent {
    /// Returns `true` for the terminal failure event.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

impl fmt::Display for ReportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target { url } => write!(f, "[Connecting to EndpointUrl] {}", url),
            Self::Server(server) => write!(
                f,
                "[ApplicationDescription] {}|{}",
                server.application_name, server.application_uri
            ),
            Self::Endpoint(endpoint) => write!(
                f,
                "[EndpointDescription] {}|{}",
                endpoint.endpoint_url, endpoint.transport_profile_uri
            ),
            Self::Selected(endpoint) => write!(
                f,
                "[Connecting to EndpointUrl] {} {}",
                endpoint.endpoint_url, endpoint.security_mode
            ),
            Self::Value(value) => write!(f, "[DataValue] {}", value),
            Self::Failure { kind, message } => write!(f, "[Failure] {}: {}", kind, message),
        }
    }
}

// =============================================================================
// ReportSink Trait
// =============================================================================

/// Receives report events. Called from the worker task.
pub trait ReportSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: ReportEvent);
}

impl<S: ReportSink + ?Sized> ReportSink for Arc<S> {
    fn record(&self, event: ReportEvent) {
        (**self).record(event)
    }
}

// =============================================================================
// Implementations
// =============================================================================

/// Writes one line per event.
pub struct LineSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> LineSink<W> {
    /// Creates a sink over a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl LineSink<std::io::Stdout> {
    /// Sink writing to stdout.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ReportSink for LineSink<W> {
    fn record(&self, event: ReportEvent) {
        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "{}", event).and_then(|_| writer.flush()) {
            tracing::warn!(error = %e, "Failed to write report line");
        }
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().clone()
    }

    /// Returns the recorded events rendered as report lines.
    pub fn lines(&self) -> Vec<String> {
        self.events.lock().iter().map(ToString::to_string).collect()
    }

    /// Returns the recorded values.
    pub fn values(&self) -> Vec<DataValue> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Value(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ReportSink for MemorySink {
    fn record(&self, event: ReportEvent) {
        self.events.lock().push(event);
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn record(&self, event: ReportEvent) {
        if event.is_failure() {
            tracing::warn!(report = %event, "Workflow report");
        } else {
            tracing::info!(report = %event, "Workflow report");
        }
    }
}
