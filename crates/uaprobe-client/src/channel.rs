// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Secure channel over any frame transport.
//!
//! ```text
//!  Idle ──open──▶ Opening ──HEL/ACK, OPN──▶ Open ──close──▶ Closing ──▶ Closed
//!                    │                        │
//!                    └────── failure ─────────┴──▶ Faulted ──close──▶ Closed
//! ```
//!
//! [`UaChannel`] implements the channel once; the transport type parameter
//! is the only thing that differs between bindings.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::certificate::ClientCertificate;
use crate::codec::{
    CloseChannelRequest, MessageContext, OpenChannelRequest, OpenChannelResponse, RequestBody,
    RequestHeader, RequestMessage, ResponseBody, ResponseMessage,
};
use crate::error::ChannelError;
use crate::transport::{
    AcknowledgeMessage, ErrorMessage, Frame, HelloMessage, MessageTransport, MessageType,
    HEADER_SIZE, PROTOCOL_VERSION,
};
use crate::types::{ClientConfig, EndpointDescription, SecurityMode, SecurityPolicy, StatusCode};

/// Receive and send buffer size announced in HEL.
pub const BUFFER_SIZE: u32 = 65_536;

/// Requested secure channel token lifetime.
pub const REQUESTED_LIFETIME: Duration = Duration::from_secs(3600);

// =============================================================================
// Settings
// =============================================================================

/// Security parameters of a channel.
#[derive(Debug, Clone)]
pub struct ChannelSecurity {
    /// Message security mode.
    pub mode: SecurityMode,
    /// Security policy URI.
    pub policy_uri: String,
    /// Client certificate, required for every mode except None.
    pub certificate: Option<ClientCertificate>,
}

impl ChannelSecurity {
    /// Unsecured channel, as used for discovery.
    pub fn none() -> Self {
        Self {
            mode: SecurityMode::None,
            policy_uri: SecurityPolicy::None.uri().to_string(),
            certificate: None,
        }
    }

    /// Security taken from the selected endpoint.
    pub fn for_endpoint(
        endpoint: &EndpointDescription,
        certificate: Option<ClientCertificate>,
    ) -> Self {
        Self {
            mode: endpoint.security_mode,
            policy_uri: endpoint.security_policy_uri.clone(),
            certificate,
        }
    }
}

/// Channel timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTimeouts {
    /// Budget for connect, HEL/ACK and OPN together.
    pub connect: Duration,
    /// Budget for each service request.
    pub request: Duration,
}

impl ChannelTimeouts {
    /// Takes the timeouts from the client configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            connect: config.connect_timeout,
            request: config.request_timeout,
        }
    }
}

/// Everything a factory needs to build a channel.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Security parameters.
    pub security: ChannelSecurity,
    /// Serialization limits.
    pub context: MessageContext,
    /// Timeouts.
    pub timeouts: ChannelTimeouts,
}

impl ChannelSettings {
    /// Settings for an unsecured discovery channel.
    pub fn discovery(config: &ClientConfig) -> Self {
        Self {
            security: ChannelSecurity::none(),
            context: MessageContext::from_config(config),
            timeouts: ChannelTimeouts::from_config(config),
        }
    }

    /// Settings for a secured session channel.
    pub fn secured(
        config: &ClientConfig,
        endpoint: &EndpointDescription,
        certificate: Option<ClientCertificate>,
    ) -> Self {
        Self {
            security: ChannelSecurity::for_endpoint(endpoint, certificate),
            context: MessageContext::from_config(config),
            timeouts: ChannelTimeouts::from_config(config),
        }
    }
}

// =============================================================================
// ChannelState
// =============================================================================

/// Lifecycle of a secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelState {
    /// Created, not opened.
    #[default]
    Idle,
    /// Handshake in progress.
    Opening,
    /// Ready for requests.
    Open,
    /// Close in progress.
    Closing,
    /// Closed.
    Closed,
    /// Failed; only `close` is meaningful.
    Faulted,
}

impl ChannelState {
    /// Returns `true` if requests can be sent.
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "Idle",
            Self::Opening => "Opening",
            Self::Open => "Open",
            Self::Closing => "Closing",
            Self::Closed => "Closed",
            Self::Faulted => "Faulted",
        };
        f.write_str(s)
    }
}

// =============================================================================
// SecureChannel Trait
// =============================================================================

/// Binding-independent channel interface.
#[async_trait]
pub trait SecureChannel: Send + Sync {
    /// Connects and establishes the channel.
    async fn open(&mut self) -> Result<(), ChannelError>;

    /// Sends one service request and awaits its response.
    async fn request(&mut self, body: RequestBody) -> Result<ResponseBody, ChannelError>;

    /// Closes the channel. Idempotent.
    async fn close(&mut self);

    /// Returns the lifecycle state.
    fn state(&self) -> ChannelState;

    /// Returns the endpoint URL.
    fn endpoint_url(&self) -> &str;

    /// Returns the transport profile URI.
    fn transport_profile(&self) -> &str;

    /// Sets the session token attached to later requests.
    fn set_authentication_token(&mut self, token: Option<String>);

    /// Returns the message context in effect.
    fn context(&self) -> &MessageContext;
}

// =============================================================================
// UaChannel
// =============================================================================

/// Secure channel over a [`MessageTransport`].
pub struct UaChannel<T: MessageTransport> {
    transport: T,
    endpoint_url: String,
    profile_uri: String,
    settings: ChannelSettings,
    state: ChannelState,
    channel_id: u32,
    token_id: u32,
    next_handle: u32,
    authentication_token: Option<String>,
}

impl<T: MessageTransport> UaChannel<T> {
    /// Creates an idle channel.
    pub fn new(
        transport: T,
        endpoint_url: impl Into<String>,
        profile_uri: impl Into<String>,
        settings: ChannelSettings,
    ) -> Self {
        Self {
            transport,
            endpoint_url: endpoint_url.into(),
            profile_uri: profile_uri.into(),
            settings,
            state: ChannelState::Idle,
            channel_id: 0,
            token_id: 0,
            next_handle: 1,
            authentication_token: None,
        }
    }

    /// Returns the channel id assigned by the server.
    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    /// Returns the security token id assigned by the server.
    pub fn token_id(&self) -> u32 {
        self.token_id
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn next_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1).max(1);
        handle
    }

    async fn fault(&mut self) {
        self.state = ChannelState::Faulted;
        self.transport.shutdown().await;
    }

    async fn handshake(&mut self) -> Result<(), ChannelError> {
        self.transport.connect().await?;

        let hello = HelloMessage {
            protocol_version: PROTOCOL_VERSION,
            receive_buffer_size: BUFFER_SIZE,
            send_buffer_size: BUFFER_SIZE,
            max_message_size: self.settings.context.max_message_size() as u32,
            max_chunk_count: self.settings.context.limits().max_chunk_count as u32,
            endpoint_url: self.endpoint_url.clone(),
        };
        self.transport
            .set_max_frame_size(self.settings.context.max_message_size() + HEADER_SIZE);
        self.transport
            .send(&Frame::new(MessageType::Hello, hello.encode()))
            .await?;

        let reply = self.transport.receive().await?;
        match reply.message_type {
            MessageType::Acknowledge => {
                let ack = AcknowledgeMessage::decode(&reply.body)?;
                self.settings
                    .context
                    .negotiate(ack.max_message_size as usize);
                self.transport
                    .set_max_frame_size(self.settings.context.max_message_size() + HEADER_SIZE);
                tracing::debug!(
                    endpoint = %self.endpoint_url,
                    max_message_size = self.settings.context.max_message_size(),
                    "Connection acknowledged"
                );
            }
            MessageType::Error => return Err(rejection(&reply.body)?),
            actual => {
                return Err(ChannelError::UnexpectedMessage {
                    expected: MessageType::Acknowledge,
                    actual,
                })
            }
        }

        let request_handle = self.next_handle();
        let request = OpenChannelRequest {
            request_handle,
            security_mode: self.settings.security.mode,
            security_policy_uri: self.settings.security.policy_uri.clone(),
            client_certificate: self
                .settings
                .security
                .certificate
                .as_ref()
                .map(ClientCertificate::to_base64),
            requested_lifetime_ms: REQUESTED_LIFETIME.as_millis() as u64,
        };
        let body = self.settings.context.encode(&request)?;
        self.transport
            .send(&Frame::new(MessageType::OpenChannel, body))
            .await?;

        let reply = self.transport.receive().await?;
        match reply.message_type {
            MessageType::OpenChannel => {}
            MessageType::Error => return Err(rejection(&reply.body)?),
            actual => {
                return Err(ChannelError::UnexpectedMessage {
                    expected: MessageType::OpenChannel,
                    actual,
                })
            }
        }

        let response: OpenChannelResponse = self.settings.context.decode(&reply.body)?;
        if response.request_handle != request_handle {
            return Err(ChannelError::HandleMismatch {
                expected: request_handle,
                actual: response.request_handle,
            });
        }
        if response.service_result.is_bad() {
            return Err(ChannelError::rejected(
                response.service_result,
                "OpenSecureChannel refused",
            ));
        }

        self.channel_id = response.channel_id;
        self.token_id = response.token_id;
        Ok(())
    }

    async fn exchange(&mut self, body: RequestBody) -> Result<ResponseBody, ChannelError> {
        let request_handle = self.next_handle();
        let message = RequestMessage {
            header: RequestHeader {
                request_handle,
                authentication_token: self.authentication_token.clone(),
                timestamp: Utc::now(),
                timeout_hint_ms: self.settings.timeouts.request.as_millis() as u64,
            },
            body,
        };
        let bytes = self.settings.context.encode(&message)?;
        self.transport
            .send(&Frame::new(MessageType::Message, bytes))
            .await?;

        let reply = self.transport.receive().await?;
        match reply.message_type {
            MessageType::Message => {}
            MessageType::Error => return Err(rejection(&reply.body)?),
            actual => {
                return Err(ChannelError::UnexpectedMessage {
                    expected: MessageType::Message,
                    actual,
                })
            }
        }

        let response: ResponseMessage = self.settings.context.decode(&reply.body)?;
        if response.header.request_handle != request_handle {
            return Err(ChannelError::HandleMismatch {
                expected: request_handle,
                actual: response.header.request_handle,
            });
        }

        let status = response.header.service_result;
        if matches!(response.body, ResponseBody::ServiceFault {}) || status.is_bad() {
            let status = if status.is_bad() {
                status
            } else {
                StatusCode::BAD_UNEXPECTED_ERROR
            };
            return Err(ChannelError::ServiceFault { status });
        }

        Ok(response.body)
    }
}

fn rejection(body: &[u8]) -> Result<ChannelError, ChannelError> {
    let error = ErrorMessage::decode(body)?;
    Ok(ChannelError::rejected(error.error, error.reason))
}

#[async_trait]
impl<T: MessageTransport> SecureChannel for UaChannel<T> {
    async fn open(&mut self) -> Result<(), ChannelError> {
        match self.state {
            ChannelState::Idle => {}
            ChannelState::Open => return Ok(()),
            ChannelState::Faulted => return Err(ChannelError::Faulted),
            _ => return Err(ChannelError::NotOpen),
        }

        let mode = self.settings.security.mode;
        if !mode.is_none() && self.settings.security.certificate.is_none() {
            self.state = ChannelState::Faulted;
            return Err(ChannelError::MissingCertificate { mode });
        }

        self.state = ChannelState::Opening;
        let limit = self.settings.timeouts.connect;
        let result = match tokio::time::timeout(limit, self.handshake()).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::timed_out("open", limit)),
        };

        match result {
            Ok(()) => {
                self.state = ChannelState::Open;
                tracing::info!(
                    endpoint = %self.endpoint_url,
                    target = %self.transport.target(),
                    mode = %mode,
                    channel_id = self.channel_id,
                    "Secure channel open"
                );
                Ok(())
            }
            Err(e) => {
                tracing::debug!(endpoint = %self.endpoint_url, error = %e, "Channel open failed");
                self.fault().await;
                Err(e)
            }
        }
    }

    async fn request(&mut self, body: RequestBody) -> Result<ResponseBody, ChannelError> {
        match self.state {
            ChannelState::Open => {}
            ChannelState::Faulted => return Err(ChannelError::Faulted),
            _ => return Err(ChannelError::NotOpen),
        }

        let service = body.service_name();
        let limit = self.settings.timeouts.request;
        tracing::debug!(service, endpoint = %self.endpoint_url, "Sending request");

        let result = match tokio::time::timeout(limit, self.exchange(body)).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::timed_out("request", limit)),
        };

        if let Err(e) = &result {
            if e.is_fatal() {
                tracing::debug!(service, error = %e, "Channel faulted");
                self.fault().await;
            }
        }
        result
    }

    async fn close(&mut self) {
        match self.state {
            ChannelState::Closed => return,
            ChannelState::Open => {
                self.state = ChannelState::Closing;
                let request = CloseChannelRequest {
                    channel_id: self.channel_id,
                };
                match self.settings.context.encode(&request) {
                    Ok(body) => {
                        let frame = Frame::new(MessageType::CloseChannel, body);
                        if let Err(e) = self.transport.send(&frame).await {
                            tracing::debug!(error = %e, "CloseSecureChannel not delivered");
                        }
                    }
                    Err(e) => tracing::debug!(error = %e, "CloseSecureChannel not encoded"),
                }
            }
            _ => {}
        }

        self.transport.shutdown().await;
        self.state = ChannelState::Closed;
        tracing::debug!(endpoint = %self.endpoint_url, "Secure channel closed");
    }

    fn state(&self) -> ChannelState {
        self.state
    }

    fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    fn transport_profile(&self) -> &str {
        &self.profile_uri
    }

    fn set_authentication_token(&mut self, token: Option<String>) {
        self.authentication_token = token;
    }

    fn context(&self) -> &MessageContext {
        &self.settings.context
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::codec::ResponseHeader;
    use crate::error::TransportError;
    use crate::transport::{TransportState, TCP_PROFILE_URI};

    /// Transport that replays scripted replies and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: VecDeque<Frame>,
        sent: Vec<Frame>,
        state: TransportState,
        shutdowns: usize,
    }

    impl ScriptedTransport {
        fn reply(mut self, frame: Frame) -> Self {
            self.replies.push_back(frame);
            self
        }
    }

    #[async_trait]
    impl MessageTransport for ScriptedTransport {
        async fn connect(&mut self) -> Result<(), TransportError> {
            self.state = TransportState::Connected;
            Ok(())
        }

        async fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
            self.sent.push(frame.clone());
            Ok(())
        }

        async fn receive(&mut self) -> Result<Frame, TransportError> {
            self.replies.pop_front().ok_or(TransportError::Closed)
        }

        async fn shutdown(&mut self) {
            self.shutdowns += 1;
            self.state = TransportState::Disconnected;
        }

        fn state(&self) -> TransportState {
            self.state
        }

        fn set_max_frame_size(&mut self, _size: usize) {}

        fn target(&self) -> &str {
            "scripted"
        }
    }

    fn ack(max_message_size: u32) -> Frame {
        let ack = AcknowledgeMessage {
            protocol_version: 0,
            receive_buffer_size: BUFFER_SIZE,
            send_buffer_size: BUFFER_SIZE,
            max_message_size,
            max_chunk_count: 0,
        };
        Frame::new(MessageType::Acknowledge, ack.encode())
    }

    fn opened(handle: u32) -> Frame {
        let response = OpenChannelResponse {
            request_handle: handle,
            service_result: StatusCode::GOOD,
            channel_id: 7,
            token_id: 1,
            revised_lifetime_ms: 60_000,
        };
        Frame::new(
            MessageType::OpenChannel,
            serde_json::to_vec(&response).unwrap(),
        )
    }

    fn response(handle: u32, status: StatusCode, body: ResponseBody) -> Frame {
        let message = ResponseMessage {
            header: ResponseHeader::new(handle, status),
            body,
        };
        Frame::new(MessageType::Message, serde_json::to_vec(&message).unwrap())
    }

    fn channel(transport: ScriptedTransport, security: ChannelSecurity) -> UaChannel<ScriptedTransport> {
        let settings = ChannelSettings {
            security,
            context: MessageContext::default(),
            timeouts: ChannelTimeouts {
                connect: Duration::from_secs(1),
                request: Duration::from_secs(1),
            },
        };
        UaChannel::new(transport, "opc.tcp://h:1", TCP_PROFILE_URI, settings)
    }

    #[tokio::test]
    async fn test_open_request_close() {
        let transport = ScriptedTransport::default()
            .reply(ack(1024))
            .reply(opened(1))
            .reply(response(2, StatusCode::GOOD, ResponseBody::ActivateSession {}));
        let mut ch = channel(transport, ChannelSecurity::none());

        ch.open().await.unwrap();
        assert_eq!(ch.state(), ChannelState::Open);
        assert_eq!(ch.channel_id(), 7);
        assert_eq!(ch.context().max_message_size(), 1024);

        let body = ch
            .request(RequestBody::ActivateSession {
                user_identity: Default::default(),
            })
            .await
            .unwrap();
        assert_eq!(body, ResponseBody::ActivateSession {});

        ch.close().await;
        ch.close().await;
        assert_eq!(ch.state(), ChannelState::Closed);

        let types: Vec<_> = ch.transport().sent.iter().map(|f| f.message_type).collect();
        assert_eq!(
            types,
            vec![
                MessageType::Hello,
                MessageType::OpenChannel,
                MessageType::Message,
                MessageType::CloseChannel
            ]
        );
        assert_eq!(ch.transport().shutdowns, 1);
    }

    #[tokio::test]
    async fn test_secured_open_without_certificate() {
        let security = ChannelSecurity {
            mode: SecurityMode::SignAndEncrypt,
            policy_uri: SecurityPolicy::Basic256Sha256.uri().to_string(),
            certificate: None,
        };
        let mut ch = channel(ScriptedTransport::default(), security);

        let err = ch.open().await.unwrap_err();
        assert!(matches!(err, ChannelError::MissingCertificate { .. }));
        assert!(ch.transport().sent.is_empty());
        assert_eq!(ch.state(), ChannelState::Faulted);
    }

    #[tokio::test]
    async fn test_error_reply_rejects_open() {
        let err_frame =
            ErrorMessage::new(StatusCode::BAD_TCP_ENDPOINT_URL_INVALID, "unknown endpoint")
                .into_frame();
        let transport = ScriptedTransport::default().reply(err_frame);
        let mut ch = channel(transport, ChannelSecurity::none());

        let err = ch.open().await.unwrap_err();
        match err {
            ChannelError::Rejected { status, reason } => {
                assert_eq!(status, StatusCode::BAD_TCP_ENDPOINT_URL_INVALID);
                assert_eq!(reason, "unknown endpoint");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ch.state(), ChannelState::Faulted);
    }

    #[tokio::test]
    async fn test_service_fault_keeps_channel_open() {
        let transport = ScriptedTransport::default()
            .reply(ack(0))
            .reply(opened(1))
            .reply(response(
                2,
                StatusCode::BAD_SESSION_ID_INVALID,
                ResponseBody::ServiceFault {},
            ));
        let mut ch = channel(transport, ChannelSecurity::none());
        ch.open().await.unwrap();

        let err = ch
            .request(RequestBody::CloseSession {
                delete_subscriptions: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChannelError::ServiceFault { status } if status == StatusCode::BAD_SESSION_ID_INVALID
        ));
        assert_eq!(ch.state(), ChannelState::Open);
    }

    #[tokio::test]
    async fn test_handle_mismatch_faults_channel() {
        let transport = ScriptedTransport::default()
            .reply(ack(0))
            .reply(opened(1))
            .reply(response(99, StatusCode::GOOD, ResponseBody::CloseSession {}));
        let mut ch = channel(transport, ChannelSecurity::none());
        ch.open().await.unwrap();

        let err = ch
            .request(RequestBody::CloseSession {
                delete_subscriptions: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChannelError::HandleMismatch {
                expected: 2,
                actual: 99
            }
        ));
        assert_eq!(ch.state(), ChannelState::Faulted);

        let err = ch
            .request(RequestBody::CloseSession {
                delete_subscriptions: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Faulted));
    }

    #[tokio::test]
    async fn test_oversized_acknowledge_fails_fast() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        use crate::transport::TcpTransport;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut hello = [0u8; 1024];
            let _ = socket.read(&mut hello).await.unwrap();

            let mut header = b"ACKF".to_vec();
            header.extend_from_slice(&(1u32 << 30).to_le_bytes());
            socket.write_all(&header).await.unwrap();

            // Hold the socket until the client hangs up.
            let _ = socket.read(&mut hello).await;
        });

        let url = format!("opc.tcp://{}", addr);
        let transport = TcpTransport::new(url.clone()).unwrap();
        let settings = ChannelSettings {
            security: ChannelSecurity::none(),
            context: MessageContext::default(),
            timeouts: ChannelTimeouts {
                connect: Duration::from_secs(30),
                request: Duration::from_secs(1),
            },
        };
        let mut ch = UaChannel::new(transport, url, TCP_PROFILE_URI, settings);

        let err = tokio::time::timeout(Duration::from_secs(5), ch.open())
            .await
            .expect("open must not wait for the connect timeout")
            .unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Transport(TransportError::FrameTooLarge { size, max })
                if size == 1 << 30 && max == MessageContext::default().max_message_size() + HEADER_SIZE
        ));
        assert_eq!(ch.state(), ChannelState::Faulted);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_before_open() {
        let mut ch = channel(ScriptedTransport::default(), ChannelSecurity::none());
        let err = ch
            .request(RequestBody::CloseSession {
                delete_subscriptions: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotOpen));
    }
}
