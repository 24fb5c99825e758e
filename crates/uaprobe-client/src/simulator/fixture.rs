// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server-side state shared by every connection of a simulated server.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};

use crate::transport::{TCP_PROFILE_URI, WS_PROFILE_URI};
use crate::types::{
    AttributeId, DataValue, EndpointDescription, NodeId, ReadValueId, SecurityMode,
    SecurityPolicy, ServerDescription, StatusCode, TimestampsToReturn, Variant,
};

// =============================================================================
// Counters
// =============================================================================

#[derive(Debug, Default)]
struct Counters {
    discovery_calls: AtomicUsize,
    read_calls: AtomicUsize,
    sessions_created: AtomicUsize,
    channels_opened: AtomicUsize,
    channels_closed: AtomicUsize,
}

// =============================================================================
// ServerFixture
// =============================================================================

struct FixtureInner {
    servers: Vec<ServerDescription>,
    endpoints: Vec<EndpointDescription>,
    address_space: RwLock<HashMap<NodeId, DataValue>>,
    reject_sessions: Option<StatusCode>,
    reject_channels: Option<StatusCode>,
    drop_last_result: bool,
    stall_reads: bool,
    stall_discovery: bool,
    unreachable: bool,
    counters: Counters,
    pending_sessions: Mutex<HashMap<String, String>>,
    active_sessions: Mutex<HashSet<String>>,
    next_id: AtomicU32,
}

/// Servers, endpoints, address space and behaviour switches of a
/// simulated server. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ServerFixture {
    inner: Arc<FixtureInner>,
}

impl ServerFixture {
    /// Creates a new fixture builder.
    pub fn builder() -> ServerFixtureBuilder {
        ServerFixtureBuilder::default()
    }

    /// The sample server: one `TestServer` application, an unsecured and a
    /// `SignAndEncrypt` endpoint per URL, and `ns=1;s=Node1` / `ns=1;s=Node2`.
    pub fn demo(tcp_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        let tcp_url = tcp_url.into();
        let ws_url = ws_url.into();
        let server = ServerDescription::new("TestServer", "urn:test")
            .with_discovery_url(tcp_url.clone())
            .with_discovery_url(ws_url.clone());

        let mut builder = Self::builder().server(server.clone());
        for (url, profile) in [(&tcp_url, TCP_PROFILE_URI), (&ws_url, WS_PROFILE_URI)] {
            builder = builder
                .endpoint(
                    EndpointDescription::new(url.as_str(), SecurityMode::None, profile)
                        .with_server(server.clone()),
                )
                .endpoint(
                    EndpointDescription::new(url.as_str(), SecurityMode::SignAndEncrypt, profile)
                        .with_security_policy(SecurityPolicy::Basic256Sha256)
                        .with_security_level(100)
                        .with_server(server.clone()),
                );
        }

        builder
            .value(NodeId::string(1, "Node1"), 42i32)
            .value(NodeId::string(1, "Node2"), "Hello from Node2")
            .build()
    }

    /// Servers returned by FindServers.
    pub fn servers(&self) -> &[ServerDescription] {
        &self.inner.servers
    }

    /// Endpoints returned by GetEndpoints.
    pub fn endpoints(&self) -> &[EndpointDescription] {
        &self.inner.endpoints
    }

    /// Stores a value in the address space.
    pub fn set_value(&self, node: NodeId, value: DataValue) {
        self.inner.address_space.write().insert(node, value);
    }

    /// Reads one attribute the way the server answers a Read entry.
    pub fn read_attribute(&self, request: &ReadValueId, timestamps: TimestampsToReturn) -> DataValue {
        let space = self.inner.address_space.read();
        let Some(stored) = space.get(&request.node_id) else {
            return DataValue::bad(StatusCode::BAD_NODE_ID_UNKNOWN);
        };

        let mut value = match request.attribute_id {
            AttributeId::Value => stored.clone(),
            AttributeId::NodeId => DataValue::new(Variant::String(request.node_id.to_string())),
            _ => return DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID),
        };

        let now = Utc::now();
        value.source_timestamp = if timestamps.includes_source() {
            Some(value.source_timestamp.unwrap_or(now))
        } else {
            None
        };
        value.server_timestamp = if timestamps.includes_server() {
            Some(now)
        } else {
            None
        };
        value
    }

    /// Returns `true` if some endpoint offers the mode and policy.
    pub fn offers(&self, mode: SecurityMode, policy_uri: &str) -> bool {
        mode.is_none()
            || self
                .inner
                .endpoints
                .iter()
                .any(|e| e.security_mode == mode && e.security_policy_uri == policy_uri)
    }

    pub(crate) fn next_id(&self) -> u32 {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst)
    }

    // =========================================================================
    // Behaviour switches
    // =========================================================================

    /// Status returned to CreateSession, if sessions are refused.
    pub fn session_rejection(&self) -> Option<StatusCode> {
        self.inner.reject_sessions
    }

    /// Status returned to a secured OPN, if secured channels are refused.
    pub fn channel_rejection(&self) -> Option<StatusCode> {
        self.inner.reject_channels
    }

    /// Whether Read answers one result short.
    pub fn drops_last_result(&self) -> bool {
        self.inner.drop_last_result
    }

    /// Whether Read requests go unanswered.
    pub fn stalls_reads(&self) -> bool {
        self.inner.stall_reads
    }

    /// Whether FindServers goes unanswered.
    pub fn stalls_discovery(&self) -> bool {
        self.inner.stall_discovery
    }

    /// Whether in-memory connections are refused.
    pub fn is_unreachable(&self) -> bool {
        self.inner.unreachable
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub(crate) fn create_session(&self) -> (String, String) {
        let id = format!("ns=1;i={}", self.next_id());
        let token = uuid::Uuid::new_v4().to_string();
        self.inner
            .pending_sessions
            .lock()
            .insert(token.clone(), id.clone());
        self.inner.counters.sessions_created.fetch_add(1, Ordering::SeqCst);
        (id, token)
    }

    pub(crate) fn activate_session(&self, token: &str) -> bool {
        if self.inner.pending_sessions.lock().remove(token).is_some() {
            self.inner.active_sessions.lock().insert(token.to_string());
            return true;
        }
        self.is_session_active(token)
    }

    pub(crate) fn is_session_active(&self, token: &str) -> bool {
        self.inner.active_sessions.lock().contains(token)
    }

    pub(crate) fn remove_session(&self, token: &str) -> bool {
        let pending = self.inner.pending_sessions.lock().remove(token).is_some();
        let active = self.inner.active_sessions.lock().remove(token);
        pending || active
    }

    // =========================================================================
    // Counters
    // =========================================================================

    pub(crate) fn record_discovery_call(&self) {
        self.inner.counters.discovery_calls.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_read_call(&self) {
        self.inner.counters.read_calls.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_channel_opened(&self) {
        self.inner.counters.channels_opened.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_channel_closed(&self) {
        self.inner.counters.channels_closed.fetch_add(1, Ordering::SeqCst);
    }

    /// FindServers calls received.
    pub fn discovery_calls(&self) -> usize {
        self.inner.counters.discovery_calls.load(Ordering::SeqCst)
    }

    /// Read calls received.
    pub fn read_calls(&self) -> usize {
        self.inner.counters.read_calls.load(Ordering::SeqCst)
    }

    /// Sessions created.
    pub fn sessions_created(&self) -> usize {
        self.inner.counters.sessions_created.load(Ordering::SeqCst)
    }

    /// Sessions created and not yet closed.
    pub fn active_sessions(&self) -> usize {
        self.inner.pending_sessions.lock().len() + self.inner.active_sessions.lock().len()
    }

    /// Secure channels opened.
    pub fn channels_opened(&self) -> usize {
        self.inner.counters.channels_opened.load(Ordering::SeqCst)
    }

    /// Secure channels closed or dropped.
    pub fn channels_closed(&self) -> usize {
        self.inner.counters.channels_closed.load(Ordering::SeqCst)
    }

    /// Secure channels currently open.
    pub fn active_channels(&self) -> usize {
        self.channels_opened().saturating_sub(self.channels_closed())
    }
}

impl fmt::Debug for ServerFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerFixture")
            .field("servers", &self.inner.servers.len())
            .field("endpoints", &self.inner.endpoints.len())
            .field("nodes", &self.inner.address_space.read().len())
            .field("active_channels", &self.active_channels())
            .finish()
    }
}

// =============================================================================
// ServerFixtureBuilder
// =============================================================================

/// Builder for [`ServerFixture`].
#[derive(Debug, Default)]
pub struct ServerFixtureBuilder {
    servers: Vec<ServerDescription>,
    endpoints: Vec<EndpointDescription>,
    values: HashMap<NodeId, DataValue>,
    reject_sessions: Option<StatusCode>,
    reject_channels: Option<StatusCode>,
    drop_last_result: bool,
    stall_reads: bool,
    stall_discovery: bool,
    unreachable: bool,
}

impl ServerFixtureBuilder {
    /// Adds a server application.
    pub fn server(mut self, server: ServerDescription) -> Self {
        self.servers.push(server);
        self
    }

    /// Adds an endpoint. Order is preserved in GetEndpoints.
    pub fn endpoint(mut self, endpoint: EndpointDescription) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Adds a good value without timestamps.
    pub fn value(mut self, node: NodeId, value: impl Into<Variant>) -> Self {
        self.values.insert(node, DataValue::new(value));
        self
    }

    /// Adds a full data value.
    pub fn data_value(mut self, node: NodeId, value: DataValue) -> Self {
        self.values.insert(node, value);
        self
    }

    /// Refuses CreateSession with the status.
    pub fn reject_sessions(mut self, status: StatusCode) -> Self {
        self.reject_sessions = Some(status);
        self
    }

    /// Refuses secured OPN with the status. Unsecured channels still open.
    pub fn reject_channels(mut self, status: StatusCode) -> Self {
        self.reject_channels = Some(status);
        self
    }

    /// Answers Read with one result fewer than requested.
    pub fn drop_last_result(mut self) -> Self {
        self.drop_last_result = true;
        self
    }

    /// Leaves Read requests unanswered.
    pub fn stall_reads(mut self) -> Self {
        self.stall_reads = true;
        self
    }

    /// Leaves FindServers requests unanswered.
    pub fn stall_discovery(mut self) -> Self {
        self.stall_discovery = true;
        self
    }

    /// Refuses in-memory connections.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Builds the fixture.
    pub fn build(self) -> ServerFixture {
        ServerFixture {
            inner: Arc::new(FixtureInner {
                servers: self.servers,
                endpoints: self.endpoints,
                address_space: RwLock::new(self.values),
                reject_sessions: self.reject_sessions,
                reject_channels: self.reject_channels,
                drop_last_result: self.drop_last_result,
                stall_reads: self.stall_reads,
                stall_discovery: self.stall_discovery,
                unreachable: self.unreachable,
                counters: Counters::default(),
                pending_sessions: Mutex::new(HashMap::new()),
                active_sessions: Mutex::new(HashSet::new()),
                next_id: AtomicU32::new(1),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_layout() {
        let fixture = ServerFixture::demo("opc.tcp://127.0.0.1:48040", "opc.ws://127.0.0.1:48043");
        assert_eq!(fixture.servers()[0].application_name, "TestServer");
        assert_eq!(fixture.endpoints().len(), 4);
        assert_eq!(fixture.endpoints()[1].security_mode, SecurityMode::SignAndEncrypt);
        assert_eq!(fixture.endpoints()[3].transport_profile_uri, WS_PROFILE_URI);
        assert!(fixture.offers(
            SecurityMode::SignAndEncrypt,
            SecurityPolicy::Basic256Sha256.uri()
        ));
        assert!(!fixture.offers(SecurityMode::Sign, SecurityPolicy::Basic256Sha256.uri()));
    }

    #[test]
    fn test_read_attribute() {
        let fixture = ServerFixture::demo("opc.tcp://h:1", "opc.ws://h:2");
        let node1 = ReadValueId::value(NodeId::string(1, "Node1"));

        let value = fixture.read_attribute(&node1, TimestampsToReturn::Both);
        assert_eq!(value.value, Variant::Int32(42));
        assert!(value.source_timestamp.is_some());
        assert!(value.server_timestamp.is_some());

        let value = fixture.read_attribute(&node1, TimestampsToReturn::Server);
        assert!(value.source_timestamp.is_none());

        let missing = ReadValueId::value(NodeId::string(1, "Nope"));
        assert_eq!(
            fixture.read_attribute(&missing, TimestampsToReturn::Both).status,
            StatusCode::BAD_NODE_ID_UNKNOWN
        );

        let node_id = ReadValueId::new(NodeId::string(1, "Node1"), AttributeId::NodeId);
        assert_eq!(
            fixture.read_attribute(&node_id, TimestampsToReturn::Neither).value,
            Variant::String("ns=1;s=Node1".into())
        );
    }

    #[test]
    fn test_session_lifecycle() {
        let fixture = ServerFixture::builder().build();
        let (id, token) = fixture.create_session();
        assert!(id.starts_with("ns=1;i="));
        assert_eq!(fixture.active_sessions(), 1);
        assert!(!fixture.is_session_active(&token));
        assert!(fixture.activate_session(&token));
        assert!(fixture.is_session_active(&token));
        assert!(fixture.remove_session(&token));
        assert_eq!(fixture.active_sessions(), 0);
        assert!(!fixture.activate_session(&token));
    }
}
