// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory binding that talks to a [`ServerFixture`] without sockets.

use std::collections::VecDeque;
use std::io;

use async_trait::async_trait;

use crate::channel::{ChannelSettings, SecureChannel, UaChannel};
use crate::dispatch::ChannelFactory;
use crate::error::{ChannelError, TransportError};
use crate::transport::{Frame, MessageTransport, TransportState};

use super::connection::ServerConnection;
use super::fixture::ServerFixture;

// =============================================================================
// LoopbackTransport
// =============================================================================

/// Frame transport whose peer is a [`ServerConnection`] in the same process.
///
/// Every frame is encoded and decoded on the way through so framing limits
/// apply the same way they do on a socket.
pub struct LoopbackTransport {
    fixture: ServerFixture,
    target: String,
    connection: Option<ServerConnection>,
    inbox: VecDeque<Frame>,
    state: TransportState,
    max_frame_size: usize,
}

impl LoopbackTransport {
    /// Creates a disconnected transport.
    pub fn new(fixture: ServerFixture, target: impl Into<String>) -> Self {
        Self {
            fixture,
            target: target.into(),
            connection: None,
            inbox: VecDeque::new(),
            state: TransportState::Disconnected,
            max_frame_size: 0,
        }
    }
}

#[async_trait]
impl MessageTransport for LoopbackTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.state.is_connected() {
            return Ok(());
        }
        if self.fixture.is_unreachable() {
            self.state = TransportState::Failed;
            return Err(TransportError::connect(
                self.target.clone(),
                io::Error::new(io::ErrorKind::ConnectionRefused, "loopback server unreachable"),
            ));
        }

        self.connection = Some(ServerConnection::new(self.fixture.clone()));
        self.state = TransportState::Connected;
        Ok(())
    }

    async fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let connection = self.connection.as_mut().ok_or(TransportError::NotConnected)?;
        let frame = Frame::decode(&frame.encode(), 0)?;

        let outcome = connection.handle(frame);
        self.inbox.extend(outcome.frames);
        if outcome.close {
            self.connection = None;
        }
        Ok(())
    }

    async fn receive(&mut self) -> Result<Frame, TransportError> {
        if let Some(frame) = self.inbox.pop_front() {
            let size = frame.encoded_len();
            if self.max_frame_size > 0 && size > self.max_frame_size {
                self.state = TransportState::Failed;
                return Err(TransportError::FrameTooLarge {
                    size,
                    max: self.max_frame_size,
                });
            }
            return Ok(frame);
        }

        if self.connection.is_none() {
            if self.state.is_connected() {
                self.state = TransportState::Failed;
                return Err(TransportError::Closed);
            }
            return Err(TransportError::NotConnected);
        }

        // The server has nothing to say; wait like an idle socket would.
        std::future::pending().await
    }

    async fn shutdown(&mut self) {
        self.connection = None;
        self.inbox.clear();
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

// =============================================================================
// LoopbackFactory
// =============================================================================

/// Channel factory that wires every channel to the same fixture.
#[derive(Debug, Clone)]
pub struct LoopbackFactory {
    fixture: ServerFixture,
    profile_uri: String,
}

impl LoopbackFactory {
    /// Creates a factory advertising `profile_uri`.
    pub fn new(fixture: ServerFixture, profile_uri: impl Into<String>) -> Self {
        Self {
            fixture,
            profile_uri: profile_uri.into(),
        }
    }

    /// Returns the fixture behind the factory.
    pub fn fixture(&self) -> &ServerFixture {
        &self.fixture
    }
}

impl ChannelFactory for LoopbackFactory {
    fn create(
        &self,
        endpoint_url: &str,
        settings: ChannelSettings,
    ) -> Result<Box<dyn SecureChannel>, ChannelError> {
        let transport = LoopbackTransport::new(self.fixture.clone(), endpoint_url);
        Ok(Box::new(UaChannel::new(
            transport,
            endpoint_url,
            self.profile_uri.clone(),
            settings,
        )))
    }

    fn profile_uri(&self) -> &str {
        &self.profile_uri
    }

    fn name(&self) -> &str {
        "loopback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HelloMessage, MessageType, PROTOCOL_VERSION};
    use std::time::Duration;

    fn hello() -> Frame {
        let hello = HelloMessage {
            protocol_version: PROTOCOL_VERSION,
            receive_buffer_size: 65_536,
            send_buffer_size: 65_536,
            max_message_size: 0,
            max_chunk_count: 0,
            endpoint_url: "scheme-a://h:1".into(),
        };
        Frame::new(MessageType::Hello, hello.encode())
    }

    #[tokio::test]
    async fn test_hello_round_trip() {
        let fixture = ServerFixture::builder().build();
        let mut transport = LoopbackTransport::new(fixture, "scheme-a://h:1");
        transport.connect().await.unwrap();
        assert!(transport.state().is_connected());

        transport.send(&hello()).await.unwrap();
        let reply = transport.receive().await.unwrap();
        assert_eq!(reply.message_type, MessageType::Acknowledge);
    }

    #[tokio::test]
    async fn test_unreachable() {
        let fixture = ServerFixture::builder().unreachable().build();
        let mut transport = LoopbackTransport::new(fixture, "scheme-a://h:1");
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(transport.state().is_failed());
    }

    #[tokio::test]
    async fn test_idle_receive_waits() {
        let fixture = ServerFixture::builder().build();
        let mut transport = LoopbackTransport::new(fixture, "scheme-a://h:1");
        transport.connect().await.unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(20), transport.receive()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_server_close_surfaces_as_closed() {
        let fixture = ServerFixture::builder().build();
        let mut transport = LoopbackTransport::new(fixture, "scheme-a://h:1");
        transport.connect().await.unwrap();

        // OPN before HEL is a protocol violation; the server answers ERR and hangs up.
        transport
            .send(&Frame::new(MessageType::OpenChannel, b"{}".to_vec()))
            .await
            .unwrap();
        assert_eq!(
            transport.receive().await.unwrap().message_type,
            MessageType::Error
        );
        assert!(matches!(
            transport.receive().await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_send_before_connect() {
        let fixture = ServerFixture::builder().build();
        let mut transport = LoopbackTransport::new(fixture, "scheme-a://h:1");
        assert!(matches!(
            transport.send(&hello()).await,
            Err(TransportError::NotConnected)
        ));
    }
}
