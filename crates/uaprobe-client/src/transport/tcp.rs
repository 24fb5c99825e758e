// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Binary TCP binding (`opc.tcp://`).

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

use crate::error::TransportError;

use super::frame::{Frame, FrameHeader, HEADER_SIZE};
use super::{MessageTransport, TransportState, DEFAULT_PORT};

// =============================================================================
// TcpTransport
// =============================================================================

/// Frame transport over a plain TCP stream.
///
/// Frames are read header first; the declared size is checked against the
/// negotiated limit before the body is read.
pub struct TcpTransport {
    endpoint_url: String,
    target: String,
    stream: Option<TcpStream>,
    state: TransportState,
    max_frame_size: usize,
}

impl TcpTransport {
    /// Creates a transport for an `opc.tcp://host[:port][/path]` URL.
    pub fn new(endpoint_url: impl Into<String>) -> Result<Self, TransportError> {
        let endpoint_url = endpoint_url.into();
        let target = socket_target(&endpoint_url)?;
        Ok(Self {
            endpoint_url,
            target,
            stream: None,
            state: TransportState::Disconnected,
            max_frame_size: 0,
        })
    }

    /// Returns the endpoint URL this transport was created for.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    fn stream(&mut self) -> Result<&mut TcpStream, TransportError> {
        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }

    fn fail<T>(&mut self, error: TransportError) -> Result<T, TransportError> {
        self.state = TransportState::Failed;
        self.stream = None;
        Err(error)
    }
}

/// Turns an endpoint URL into `host:port`.
pub(crate) fn socket_target(endpoint_url: &str) -> Result<String, TransportError> {
    let url = Url::parse(endpoint_url)
        .map_err(|e| TransportError::invalid_url(endpoint_url, e.to_string()))?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| TransportError::invalid_url(endpoint_url, "missing host"))?;
    let port = url.port().unwrap_or(DEFAULT_PORT);
    Ok(format!("{}:{}", host, port))
}

#[async_trait]
impl MessageTransport for TcpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.state.is_connected() {
            return Ok(());
        }

        self.state = TransportState::Connecting;
        let stream = match TcpStream::connect(&self.target).await {
            Ok(stream) => stream,
            Err(e) => {
                let target = self.target.clone();
                return self.fail(TransportError::connect(target, e));
            }
        };
        stream.set_nodelay(true).ok();

        self.stream = Some(stream);
        self.state = TransportState::Connected;

        tracing::debug!(target = %self.target, "TCP transport connected");
        Ok(())
    }

    async fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let encoded = frame.encode();
        let result = self.stream()?.write_all(&encoded).await;
        if let Err(e) = result {
            return self.fail(TransportError::Io(e));
        }

        tracing::trace!(
            message_type = %frame.message_type,
            size = encoded.len(),
            "TCP frame sent"
        );
        Ok(())
    }

    async fn receive(&mut self) -> Result<Frame, TransportError> {
        let max = self.max_frame_size;
        let stream = self.stream()?;

        let mut raw = [0u8; HEADER_SIZE];
        let read = stream.read_exact(&mut raw).await;
        if let Err(e) = read {
            return self.fail(map_read_error(e));
        }

        let header = match FrameHeader::parse(&raw, max) {
            Ok(header) => header,
            Err(e) => return self.fail(e),
        };

        let mut body = vec![0u8; header.body_len()];
        let read = self.stream()?.read_exact(&mut body).await;
        if let Err(e) = read {
            return self.fail(map_read_error(e));
        }

        tracing::trace!(
            message_type = %header.message_type,
            size = header.size,
            "TCP frame received"
        );
        Ok(Frame::new(header.message_type, body))
    }

    async fn shutdown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!(error = %e, target = %self.target, "TCP shutdown error");
            }
        }
        self.state = TransportState::Disconnected;
    }

    fn state(&self) -> TransportState {
        self.state
    }

    fn set_max_frame_size(&mut self, size: usize) {
        self.max_frame_size = size;
    }

    fn target(&self) -> &str {
        &self.target
    }
}

fn map_read_error(error: std::io::Error) -> TransportError {
    if error.kind() == std::io::ErrorKind::UnexpectedEof {
        TransportError::Closed
    } else {
        TransportError::Io(error)
    }
}

// =============================================================================
// Tests
// =============================================================================
