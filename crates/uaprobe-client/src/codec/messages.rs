// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Service message bodies carried in `OPN`, `CLO` and `MSG` frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    DataValue, DiagnosticInfo, EndpointDescription, ReadValueId, SecurityMode, ServerDescription,
    StatusCode, TimestampsToReturn,
};

// =============================================================================
// Secure channel
// =============================================================================

/// Body of an `OPN` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenChannelRequest {
    /// Request handle echoed in the response.
    pub request_handle: u32,
    /// Requested message security mode.
    pub security_mode: SecurityMode,
    /// Requested security policy URI.
    pub security_policy_uri: String,
    /// Base64 DER client certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<String>,
    /// Requested token lifetime.
    pub requested_lifetime_ms: u64,
}

/// Body of an `OPN` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenChannelResponse {
    /// Echoed request handle.
    pub request_handle: u32,
    /// Result of the open request.
    pub service_result: StatusCode,
    /// Secure channel id.
    pub channel_id: u32,
    /// Security token id.
    pub token_id: u32,
    /// Lifetime granted by the server.
    pub revised_lifetime_ms: u64,
}

/// Body of a `CLO` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseChannelRequest {
    /// Channel being closed.
    pub channel_id: u32,
}

// =============================================================================
// Service envelopes
// =============================================================================

/// Header of every service request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestHeader {
    /// Request handle echoed in the response.
    pub request_handle: u32,
    /// Session authentication token, once a session exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_token: Option<String>,
    /// Time the request was sent.
    pub timestamp: DateTime<Utc>,
    /// How long the client will wait.
    pub timeout_hint_ms: u64,
}

/// Header of every service response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Echoed request handle.
    pub request_handle: u32,
    /// Overall result of the service call.
    pub service_result: StatusCode,
    /// Time the response was sent.
    pub timestamp: DateTime<Utc>,
}

impl ResponseHeader {
    /// Creates a header for the given handle.
    pub fn new(request_handle: u32, service_result: StatusCode) -> Self {
        Self {
            request_handle,
            service_result,
            timestamp: Utc::now(),
        }
    }
}

/// A service request as sent in a `MSG` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    /// Request header.
    pub header: RequestHeader,
    /// Service body.
    pub body: RequestBody,
}

/// A service response as received in a `MSG` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Response header.
    pub header: ResponseHeader,
    /// Service body.
    pub body: ResponseBody,
}

// =============================================================================
// Service bodies
// =============================================================================

/// Identity presented with ActivateSession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserIdentity {
    /// Anonymous identity.
    #[default]
    Anonymous,
}

/// Service request bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum RequestBody {
    /// Lists the servers known at the URL.
    FindServers {
        /// URL the client used.
        endpoint_url: String,
        /// Optional filter.
        #[serde(default)]
        server_uris: Vec<String>,
    },
    /// Lists the endpoints of the server at the URL.
    GetEndpoints {
        /// URL the client used.
        endpoint_url: String,
        /// Optional transport profile filter.
        #[serde(default)]
        profile_uris: Vec<String>,
    },
    /// Creates a session.
    CreateSession {
        /// Client application description.
        client_description: ServerDescription,
        /// Endpoint the session is created on.
        endpoint_url: String,
        /// Human-readable session name.
        session_name: String,
        /// Base64 DER client certificate.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_certificate: Option<String>,
        /// Requested session timeout.
        requested_session_timeout_ms: u64,
        /// Largest response the client accepts.
        max_response_message_size: u64,
    },
    /// Activates the session.
    ActivateSession {
        /// Identity token.
        user_identity: UserIdentity,
    },
    /// Closes the session.
    CloseSession {
        /// Whether to delete subscriptions.
        delete_subscriptions: bool,
    },
    /// Reads attributes.
    Read {
        /// Maximum acceptable value age in milliseconds.
        max_age: f64,
        /// Which timestamps to return.
        timestamps_to_return: TimestampsToReturn,
        /// Values to read, in order.
        nodes_to_read: Vec<ReadValueId>,
    },
}

impl RequestBody {
    /// Returns the service name.
    pub fn service_name(&self) -> &'static str {
        match self {
            Self::FindServers { .. } => "FindServers",
            Self::GetEndpoints { .. } => "GetEndpoints",
            Self::CreateSession { .. } => "CreateSession",
            Self::ActivateSession { .. } => "ActivateSession",
            Self::CloseSession { .. } => "CloseSession",
            Self::Read { .. } => "Read",
        }
    }
}

/// Service response bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum ResponseBody {
    /// FindServers result.
    FindServers {
        /// Servers in the order returned.
        servers: Vec<ServerDescription>,
    },
    /// GetEndpoints result.
    GetEndpoints {
        /// Endpoints in the order returned.
        endpoints: Vec<EndpointDescription>,
    },
    /// CreateSession result.
    CreateSession {
        /// Session id.
        session_id: String,
        /// Token used on every later request.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        authentication_token: Option<String>,
        /// Timeout granted by the server.
        revised_session_timeout_ms: u64,
        /// Endpoints the server offers, if echoed.
        #[serde(default)]
        server_endpoints: Vec<EndpointDescription>,
    },
    /// ActivateSession result.
    ActivateSession {},
    /// CloseSession result.
    CloseSession {},
    /// Read result.
    Read {
        /// One result per requested value, same order.
        results: Vec<DataValue>,
        /// Optional diagnostics.
        #[serde(default)]
        diagnostic_infos: Vec<DiagnosticInfo>,
    },
    /// The service failed; the status is in the response header.
    ServiceFault {},
}

impl ResponseBody {
    /// Returns the service name.
    pub fn service_name(&self) -> &'static str {
        match self {
            Self::FindServers { .. } => "FindServers",
            Self::GetEndpoints { .. } => "GetEndpoints",
            Self::CreateSession { .. } => "CreateSession",
            Self::ActivateSession {} => "ActivateSession",
            Self::CloseSession {} => "CloseSession",
            Self::Read { .. } => "Read",
            Self::ServiceFault {} => "ServiceFault",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeId;

    #[test]
    fn test_request_body_tagging() {
        let body = RequestBody::Read {
            max_age: 0.0,
            timestamps_to_return: TimestampsToReturn::Both,
            nodes_to_read: vec![ReadValueId::value(NodeId::string(1, "Node1"))],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["service"], "read");
        assert_eq!(json["nodes_to_read"][0]["node_id"], "ns=1;s=Node1");
        assert_eq!(body.service_name(), "Read");
    }

    #[test]
    fn test_service_fault_parses() {
        let body: ResponseBody = serde_json::from_str(r#"{"service":"service_fault"}"#).unwrap();
        assert_eq!(body, ResponseBody::ServiceFault {});
    }
}
