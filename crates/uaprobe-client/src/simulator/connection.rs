// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-connection server state machine shared by every binding.

use serde::Serialize;

use crate::codec::{
    CloseChannelRequest, OpenChannelRequest, OpenChannelResponse, RequestBody, RequestMessage,
    ResponseBody, ResponseHeader, ResponseMessage,
};
use crate::transport::{
    AcknowledgeMessage, ErrorMessage, Frame, HelloMessage, MessageType, PROTOCOL_VERSION,
};
use crate::types::{StatusCode, TimestampsToReturn};

use super::fixture::ServerFixture;

/// Largest message the simulated server accepts.
pub const SERVER_MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

const SERVER_BUFFER_SIZE: u32 = 65_536;

// =============================================================================
// Outcome
// =============================================================================

/// Frames to send back after handling one inbound frame.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Replies, in send order.
    pub frames: Vec<Frame>,
    /// Whether the connection ends after sending the replies.
    pub close: bool,
}

impl Outcome {
    fn reply(frame: Frame) -> Self {
        Self {
            frames: vec![frame],
            close: false,
        }
    }

    fn silent() -> Self {
        Self::default()
    }

    fn abort(status: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            frames: vec![ErrorMessage::new(status, reason).into_frame()],
            close: true,
        }
    }

    fn closed() -> Self {
        Self {
            frames: Vec::new(),
            close: true,
        }
    }
}

// =============================================================================
// ServerConnection
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitHello,
    AwaitOpen,
    Open,
    Closed,
}

/// Server side of one connection.
///
/// Dropping the connection releases its channel and every session created
/// on it.
#[derive(Debug)]
pub struct ServerConnection {
    fixture: ServerFixture,
    phase: Phase,
    channel_id: u32,
    sessions: Vec<String>,
}

impl ServerConnection {
    /// Creates a connection waiting for HEL.
    pub fn new(fixture: ServerFixture) -> Self {
        Self {
            fixture,
            phase: Phase::AwaitHello,
            channel_id: 0,
            sessions: Vec::new(),
        }
    }

    /// Returns `true` once a channel has been opened and not yet closed.
    pub fn is_open(&self) -> bool {
        self.phase == Phase::Open
    }

    /// Handles one inbound frame.
    pub fn handle(&mut self, frame: Frame) -> Outcome {
        match (self.phase, frame.message_type) {
            (Phase::AwaitHello, MessageType::Hello) => self.on_hello(&frame.body),
            (Phase::AwaitOpen, MessageType::OpenChannel) => self.on_open(&frame.body),
            (Phase::Open, MessageType::Message) => self.on_message(&frame.body),
            (Phase::Open, MessageType::CloseChannel) => self.on_close(&frame.body),
            (Phase::Closed, _) => Outcome::closed(),
            (phase, actual) => {
                tracing::debug!(phase = ?phase, message_type = %actual, "Unexpected frame");
                self.release();
                Outcome::abort(
                    StatusCode::BAD_TCP_MESSAGE_TYPE_INVALID,
                    format!("unexpected {} frame", actual),
                )
            }
        }
    }

    fn on_hello(&mut self, body: &[u8]) -> Outcome {
        let hello = match HelloMessage::decode(body) {
            Ok(hello) => hello,
            Err(e) => return self.fail(StatusCode::BAD_DECODING_ERROR, e.to_string()),
        };
        if hello.endpoint_url.is_empty() {
            return self.fail(StatusCode::BAD_TCP_ENDPOINT_URL_INVALID, "empty endpoint URL");
        }

        let max_message_size = match hello.max_message_size {
            0 => SERVER_MAX_MESSAGE_SIZE,
            requested => requested.min(SERVER_MAX_MESSAGE_SIZE),
        };
        let ack = AcknowledgeMessage {
            protocol_version: PROTOCOL_VERSION.min(hello.protocol_version),
            receive_buffer_size: SERVER_BUFFER_SIZE,
            send_buffer_size: SERVER_BUFFER_SIZE,
            max_message_size,
            max_chunk_count: hello.max_chunk_count,
        };

        tracing::debug!(endpoint = %hello.endpoint_url, "Hello accepted");
        self.phase = Phase::AwaitOpen;
        Outcome::reply(Frame::new(MessageType::Acknowledge, ack.encode()))
    }

    fn on_open(&mut self, body: &[u8]) -> Outcome {
        let request: OpenChannelRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => return self.fail(StatusCode::BAD_DECODING_ERROR, e.to_string()),
        };

        let secured = !request.security_mode.is_none();
        if secured {
            if request.client_certificate.as_deref().map_or(true, str::is_empty) {
                return self.fail(
                    StatusCode::BAD_SECURITY_CHECKS_FAILED,
                    "client certificate required",
                );
            }
            if let Some(status) = self.fixture.channel_rejection() {
                return self.fail(status, "secure channel refused");
            }
            if !self
                .fixture
                .offers(request.security_mode, &request.security_policy_uri)
            {
                return self.fail(
                    StatusCode::BAD_SECURITY_MODE_REJECTED,
                    format!(
                        "no endpoint offers {} with {}",
                        request.security_mode, request.security_policy_uri
                    ),
                );
            }
        }

        self.channel_id = self.fixture.next_id();
        self.phase = Phase::Open;
        self.fixture.record_channel_opened();
        tracing::debug!(
            channel_id = self.channel_id,
            mode = %request.security_mode,
            "Secure channel opened"
        );

        encoded(
            MessageType::OpenChannel,
            &OpenChannelResponse {
                request_handle: request.request_handle,
                service_result: StatusCode::GOOD,
                channel_id: self.channel_id,
                token_id: 1,
                revised_lifetime_ms: request.requested_lifetime_ms,
            },
        )
    }

    fn on_close(&mut self, body: &[u8]) -> Outcome {
        match serde_json::from_slice::<CloseChannelRequest>(body) {
            Ok(request) if request.channel_id != self.channel_id => {
                tracing::debug!(
                    expected = self.channel_id,
                    actual = request.channel_id,
                    "CLO for unknown channel"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "Undecodable CLO"),
        }
        self.release();
        Outcome::closed()
    }

    fn on_message(&mut self, body: &[u8]) -> Outcome {
        let request: RequestMessage = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => return self.fail(StatusCode::BAD_DECODING_ERROR, e.to_string()),
        };
        let handle = request.header.request_handle;
        let token = request.header.authentication_token.unwrap_or_default();

        tracing::trace!(service = request.body.service_name(), handle, "Service request");

        match request.body {
            RequestBody::FindServers { .. } => {
                self.fixture.record_discovery_call();
                if self.fixture.stalls_discovery() {
                    return Outcome::silent();
                }
                respond(
                    handle,
                    ResponseBody::FindServers {
                        servers: self.fixture.servers().to_vec(),
                    },
                )
            }
            RequestBody::GetEndpoints { .. } => respond(
                handle,
                ResponseBody::GetEndpoints {
                    endpoints: self.fixture.endpoints().to_vec(),
                },
            ),
            RequestBody::CreateSession {
                requested_session_timeout_ms,
                ..
            } => {
                if let Some(status) = self.fixture.session_rejection() {
                    return fault(handle, status);
                }
                let (session_id, token) = self.fixture.create_session();
                self.sessions.push(token.clone());
                respond(
                    handle,
                    ResponseBody::CreateSession {
                        session_id,
                        authentication_token: Some(token),
                        revised_session_timeout_ms: requested_session_timeout_ms,
                        server_endpoints: self.fixture.endpoints().to_vec(),
                    },
                )
            }
            RequestBody::ActivateSession { .. } => {
                if !self.owns(&token) || !self.fixture.activate_session(&token) {
                    return fault(handle, StatusCode::BAD_SESSION_ID_INVALID);
                }
                respond(handle, ResponseBody::ActivateSession {})
            }
            RequestBody::CloseSession { .. } => {
                if !self.owns(&token) || !self.fixture.remove_session(&token) {
                    return fault(handle, StatusCode::BAD_SESSION_ID_INVALID);
                }
                self.sessions.retain(|t| t != &token);
                respond(handle, ResponseBody::CloseSession {})
            }
            RequestBody::Read {
                timestamps_to_return,
                nodes_to_read,
                ..
            } => {
                self.fixture.record_read_call();
                if !self.owns(&token) {
                    return fault(handle, StatusCode::BAD_SESSION_ID_INVALID);
                }
                if !self.fixture.is_session_active(&token) {
                    return fault(handle, StatusCode::BAD_SESSION_NOT_ACTIVATED);
                }
                if nodes_to_read.is_empty() {
                    return fault(handle, StatusCode::BAD_NOTHING_TO_DO);
                }
                if self.fixture.stalls_reads() {
                    return Outcome::silent();
                }
                self.read(handle, timestamps_to_return, &nodes_to_read)
            }
        }
    }

    fn read(
        &self,
        handle: u32,
        timestamps: TimestampsToReturn,
        nodes: &[crate::types::ReadValueId],
    ) -> Outcome {
        let mut results: Vec<_> = nodes
            .iter()
            .map(|node| self.fixture.read_attribute(node, timestamps))
            .collect();
        if self.fixture.drops_last_result() {
            results.pop();
        }
        respond(
            handle,
            ResponseBody::Read {
                results,
                diagnostic_infos: Vec::new(),
            },
        )
    }

    fn owns(&self, token: &str) -> bool {
        !token.is_empty() && self.sessions.iter().any(|t| t == token)
    }

    fn fail(&mut self, status: StatusCode, reason: impl Into<String>) -> Outcome {
        let reason = reason.into();
        tracing::debug!(status = %status, reason = %reason, "Connection refused");
        self.release();
        Outcome::abort(status, reason)
    }

    fn release(&mut self) {
        for token in self.sessions.drain(..) {
            self.fixture.remove_session(&token);
        }
        if self.phase == Phase::Open {
            self.fixture.record_channel_closed();
            tracing::debug!(channel_id = self.channel_id, "Secure channel closed");
        }
        self.phase = Phase::Closed;
    }
}

impl Drop for ServerConnection {
    fn drop(&mut self) {
        self.release();
    }
}

fn respond(handle: u32, body: ResponseBody) -> Outcome {
    encoded(
        MessageType::Message,
        &ResponseMessage {
            header: ResponseHeader::new(handle, StatusCode::GOOD),
            body,
        },
    )
}

fn fault(handle: u32, status: StatusCode) -> Outcome {
    encoded(
        MessageType::Message,
        &ResponseMessage {
            header: ResponseHeader::new(handle, status),
            body: ResponseBody::ServiceFault {},
        },
    )
}

fn encoded<T: Serialize>(message_type: MessageType, value: &T) -> Outcome {
    match serde_json::to_vec(value) {
        Ok(body) => Outcome::reply(Frame::new(message_type, body)),
        Err(e) => Outcome::abort(StatusCode::BAD_ENCODING_LIMITS_EXCEEDED, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{RequestHeader, UserIdentity};
    use crate::types::{NodeId, ReadValueId, SecurityMode, SecurityPolicy, Variant};
    use chrono::Utc;

    fn hello() -> Frame {
        let hello = HelloMessage {
            protocol_version: PROTOCOL_VERSION,
            receive_buffer_size: 65_536,
            send_buffer_size: 65_536,
            max_message_size: 0,
            max_chunk_count: 0,
            endpoint_url: "opc.tcp://h:1".into(),
        };
        Frame::new(MessageType::Hello, hello.encode())
    }

    fn open(mode: SecurityMode, certificate: Option<&str>) -> Frame {
        let policy = if mode.is_none() {
            SecurityPolicy::None
        } else {
            SecurityPolicy::Basic256Sha256
        };
        let request = OpenChannelRequest {
            request_handle: 1,
            security_mode: mode,
            security_policy_uri: policy.uri().to_string(),
            client_certificate: certificate.map(str::to_string),
            requested_lifetime_ms: 60_000,
        };
        Frame::new(MessageType::OpenChannel, serde_json::to_vec(&request).unwrap())
    }

    fn message(handle: u32, token: Option<&str>, body: RequestBody) -> Frame {
        let request = RequestMessage {
            header: RequestHeader {
                request_handle: handle,
                authentication_token: token.map(str::to_string),
                timestamp: Utc::now(),
                timeout_hint_ms: 1000,
            },
            body,
        };
        Frame::new(MessageType::Message, serde_json::to_vec(&request).unwrap())
    }

    fn response(outcome: &Outcome) -> ResponseMessage {
        assert_eq!(outcome.frames.len(), 1);
        assert_eq!(outcome.frames[0].message_type, MessageType::Message);
        serde_json::from_slice(&outcome.frames[0].body).unwrap()
    }

    fn create_session(handle: u32) -> RequestBody {
        RequestBody::CreateSession {
            client_description: crate::types::ServerDescription::new("probe", "urn:probe"),
            endpoint_url: "opc.tcp://h:1".into(),
            session_name: "s".into(),
            client_certificate: None,
            requested_session_timeout_ms: 60_000 + u64::from(handle),
            max_response_message_size: 0,
        }
    }

    #[test]
    fn test_hello_then_open() {
        let fixture = ServerFixture::demo("opc.tcp://h:1", "opc.ws://h:2");
        let mut conn = ServerConnection::new(fixture.clone());

        let outcome = conn.handle(hello());
        assert_eq!(outcome.frames[0].message_type, MessageType::Acknowledge);
        let ack = AcknowledgeMessage::decode(&outcome.frames[0].body).unwrap();
        assert_eq!(ack.max_message_size, SERVER_MAX_MESSAGE_SIZE);

        let outcome = conn.handle(open(SecurityMode::None, None));
        let opened: OpenChannelResponse = serde_json::from_slice(&outcome.frames[0].body).unwrap();
        assert_eq!(opened.request_handle, 1);
        assert!(conn.is_open());
        assert_eq!(fixture.active_channels(), 1);

        drop(conn);
        assert_eq!(fixture.active_channels(), 0);
    }

    #[test]
    fn test_message_before_hello() {
        let fixture = ServerFixture::demo("opc.tcp://h:1", "opc.ws://h:2");
        let mut conn = ServerConnection::new(fixture);

        let outcome = conn.handle(open(SecurityMode::None, None));
        assert!(outcome.close);
        assert_eq!(outcome.frames[0].message_type, MessageType::Error);
        let error = ErrorMessage::decode(&outcome.frames[0].body).unwrap();
        assert_eq!(error.error, StatusCode::BAD_TCP_MESSAGE_TYPE_INVALID);
    }

    #[test]
    fn test_secured_open_requires_certificate() {
        let fixture = ServerFixture::demo("opc.tcp://h:1", "opc.ws://h:2");
        let mut conn = ServerConnection::new(fixture.clone());
        conn.handle(hello());

        let outcome = conn.handle(open(SecurityMode::SignAndEncrypt, None));
        assert!(outcome.close);
        let error = ErrorMessage::decode(&outcome.frames[0].body).unwrap();
        assert_eq!(error.error, StatusCode::BAD_SECURITY_CHECKS_FAILED);
        assert_eq!(fixture.channels_opened(), 0);
    }

    #[test]
    fn test_unoffered_mode_rejected() {
        let fixture = ServerFixture::demo("opc.tcp://h:1", "opc.ws://h:2");
        let mut conn = ServerConnection::new(fixture);
        conn.handle(hello());

        let outcome = conn.handle(open(SecurityMode::Sign, Some("AQI=")));
        let error = ErrorMessage::decode(&outcome.frames[0].body).unwrap();
        assert_eq!(error.error, StatusCode::BAD_SECURITY_MODE_REJECTED);
    }

    #[test]
    fn test_session_and_read() {
        let fixture = ServerFixture::demo("opc.tcp://h:1", "opc.ws://h:2");
        let mut conn = ServerConnection::new(fixture.clone());
        conn.handle(hello());
        conn.handle(open(SecurityMode::SignAndEncrypt, Some("AQI=")));

        let created = response(&conn.handle(message(2, None, create_session(0))));
        assert_eq!(created.header.request_handle, 2);
        let token = match created.body {
            ResponseBody::CreateSession {
                authentication_token,
                revised_session_timeout_ms,
                ..
            } => {
                assert_eq!(revised_session_timeout_ms, 60_000);
                authentication_token.unwrap()
            }
            other => panic!("unexpected {:?}", other),
        };

        let read = RequestBody::Read {
            max_age: 0.0,
            timestamps_to_return: TimestampsToReturn::Neither,
            nodes_to_read: vec![ReadValueId::value(NodeId::string(1, "Node1"))],
        };

        // Not yet activated.
        let refused = response(&conn.handle(message(3, Some(&token), read.clone())));
        assert_eq!(refused.header.service_result, StatusCode::BAD_SESSION_NOT_ACTIVATED);

        let activate = RequestBody::ActivateSession {
            user_identity: UserIdentity::Anonymous,
        };
        let activated = response(&conn.handle(message(4, Some(&token), activate)));
        assert_eq!(activated.body, ResponseBody::ActivateSession {});

        let values = response(&conn.handle(message(5, Some(&token), read)));
        assert_eq!(values.header.request_handle, 5);
        match values.body {
            ResponseBody::Read { results, .. } => {
                assert_eq!(results[0].value, Variant::Int32(42));
                assert!(results[0].server_timestamp.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(fixture.read_calls(), 2);

        let closed = response(&conn.handle(message(
            6,
            Some(&token),
            RequestBody::CloseSession {
                delete_subscriptions: true,
            },
        )));
        assert_eq!(closed.body, ResponseBody::CloseSession {});
        assert_eq!(fixture.active_sessions(), 0);
    }

    #[test]
    fn test_unknown_token_faults() {
        let fixture = ServerFixture::demo("opc.tcp://h:1", "opc.ws://h:2");
        let mut conn = ServerConnection::new(fixture);
        conn.handle(hello());
        conn.handle(open(SecurityMode::None, None));

        let activate = RequestBody::ActivateSession {
            user_identity: UserIdentity::Anonymous,
        };
        let refused = response(&conn.handle(message(2, Some("bogus"), activate)));
        assert_eq!(refused.header.service_result, StatusCode::BAD_SESSION_ID_INVALID);
        assert_eq!(refused.body, ResponseBody::ServiceFault {});
    }

    #[test]
    fn test_dropping_connection_releases_sessions() {
        let fixture = ServerFixture::demo("opc.tcp://h:1", "opc.ws://h:2");
        let mut conn = ServerConnection::new(fixture.clone());
        conn.handle(hello());
        conn.handle(open(SecurityMode::None, None));
        conn.handle(message(2, None, create_session(0)));
        assert_eq!(fixture.active_sessions(), 1);

        drop(conn);
        assert_eq!(fixture.active_sessions(), 0);
        assert_eq!(fixture.channels_closed(), 1);
    }
}
