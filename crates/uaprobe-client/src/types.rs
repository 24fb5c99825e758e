// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Data model shared by every stage of the workflow.
//!
//! - **NodeId / ReadValueId**: what to read, in OPC UA string notation
//! - **ServerDescription / EndpointDescription**: discovery results
//! - **SecurityMode / SecurityPolicy**: endpoint security
//! - **Variant / StatusCode / DataValue**: read results
//! - **ClientConfig**: client identity, certificate reference, limits, timeouts
//!
//! # Examples
//!
//! ```
//! use uaprobe_client::types::{AttributeId, NodeId, ReadValueId};
//!
//! let node: NodeId = "ns=1;s=Node1".parse().unwrap();
//! let request = ReadValueId::new(node, AttributeId::Value);
//! assert_eq!(request.to_string(), "ns=1;s=Node1@Value");
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigurationError, ProbeError, ProbeResult};

// =============================================================================
// NodeId
// =============================================================================

/// OPC UA Node Identifier.
///
/// Serialized in the OPC UA string notation (`ns=1;s=Node1`), which is also
/// what the configuration file and the command line accept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// Creates a numeric node ID.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// Returns the OPC UA string form, omitting `ns=0;`.
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = ProbeError;

    /// Parses a NodeId from OPC UA string format.
    ///
    /// Supported formats:
    /// - `ns=2;i=1001` (numeric)
    /// - `ns=2;s=MyNode` (string)
    /// - `ns=2;g=550e8400-e29b-41d4-a716-446655440000` (GUID)
    /// - `ns=2;b=SGVsbG8=` (opaque, base64 encoded)
    /// - `i=1001` (numeric, namespace 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: String| {
            ProbeError::configuration(ConfigurationError::invalid_node_id(s, reason))
        };

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns, id) = rest
                    .split_once(';')
                    .ok_or_else(|| invalid("Missing identifier after namespace".into()))?;
                let ns: u16 = ns
                    .parse()
                    .map_err(|_| invalid("Invalid namespace index".into()))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            let value: u32 = id
                .parse()
                .map_err(|_| invalid("Invalid numeric identifier".into()))?;
            NodeIdentifier::Numeric(value)
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            if id.is_empty() {
                return Err(invalid("Empty string identifier".into()));
            }
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            let uuid = Uuid::parse_str(id).map_err(|e| invalid(format!("Invalid GUID: {}", e)))?;
            NodeIdentifier::Guid(uuid)
        } else if let Some(id) = identifier_part.strip_prefix("b=") {
            let bytes = BASE64
                .decode(id)
                .map_err(|e| invalid(format!("Invalid base64: {}", e)))?;
            NodeIdentifier::Opaque(bytes)
        } else {
            return Err(invalid(
                "Unknown identifier type. Expected i=, s=, g=, or b=".into(),
            ));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

impl TryFrom<String> for NodeId {
    type Error = ProbeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(node: NodeId) -> Self {
        node.to_opc_string()
    }
}

/// OPC UA node identifier types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),
    /// String identifier.
    String(String),
    /// GUID identifier.
    Guid(Uuid),
    /// Opaque identifier.
    Opaque(Vec<u8>),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

// =============================================================================
// AttributeId
// =============================================================================

/// OPC UA attribute IDs. Serialized as the numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u32", into = "u32")]
pub enum AttributeId {
    /// Node ID attribute.
    NodeId,
    /// Node class attribute.
    NodeClass,
    /// Browse name attribute.
    BrowseName,
    /// Display name attribute.
    DisplayName,
    /// Description attribute.
    Description,
    /// Value attribute.
    #[default]
    Value,
    /// Data type attribute.
    DataType,
    /// Value rank attribute.
    ValueRank,
    /// Access level attribute.
    AccessLevel,
    /// User access level attribute.
    UserAccessLevel,
}

impl AttributeId {
    /// Returns the OPC UA numeric value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::NodeId => 1,
            Self::NodeClass => 2,
            Self::BrowseName => 3,
            Self::DisplayName => 4,
            Self::Description => 5,
            Self::Value => 13,
            Self::DataType => 14,
            Self::ValueRank => 15,
            Self::AccessLevel => 17,
            Self::UserAccessLevel => 18,
        }
    }

    /// Creates from the OPC UA numeric value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::NodeId),
            2 => Some(Self::NodeClass),
            3 => Some(Self::BrowseName),
            4 => Some(Self::DisplayName),
            5 => Some(Self::Description),
            13 => Some(Self::Value),
            14 => Some(Self::DataType),
            15 => Some(Self::ValueRank),
            17 => Some(Self::AccessLevel),
            18 => Some(Self::UserAccessLevel),
            _ => None,
        }
    }

    /// Returns the display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NodeId => "NodeId",
            Self::NodeClass => "NodeClass",
            Self::BrowseName => "BrowseName",
            Self::DisplayName => "DisplayName",
            Self::Description => "Description",
            Self::Value => "Value",
            Self::DataType => "DataType",
            Self::ValueRank => "ValueRank",
            Self::AccessLevel => "AccessLevel",
            Self::UserAccessLevel => "UserAccessLevel",
        }
    }
}

impl TryFrom<u32> for AttributeId {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or_else(|| format!("unknown attribute id {}", value))
    }
}

impl From<AttributeId> for u32 {
    fn from(attribute: AttributeId) -> Self {
        attribute.value()
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ReadValueId
// =============================================================================

/// One entry of a batched read: a node and the attribute to read from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadValueId {
    /// Node to read.
    pub node_id: NodeId,
    /// Attribute to read.
    pub attribute_id: AttributeId,
}

impl ReadValueId {
    /// Creates a read entry.
    pub fn new(node_id: NodeId, attribute_id: AttributeId) -> Self {
        Self {
            node_id,
            attribute_id,
        }
    }

    /// Creates a read entry for the Value attribute.
    pub fn value(node_id: NodeId) -> Self {
        Self::new(node_id, AttributeId::Value)
    }
}

impl fmt::Display for ReadValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.node_id, self.attribute_id)
    }
}

// =============================================================================
// TimestampsToReturn
// =============================================================================

/// Which timestamps the server attaches to each returned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampsToReturn {
    /// Source timestamp only.
    Source,
    /// Server timestamp only.
    Server,
    /// Both timestamps.
    #[default]
    Both,
    /// No timestamps.
    Neither,
}

impl TimestampsToReturn {
    /// Returns `true` if the source timestamp is requested.
    pub const fn includes_source(&self) -> bool {
        matches!(self, Self::Source | Self::Both)
    }

    /// Returns `true` if the server timestamp is requested.
    pub const fn includes_server(&self) -> bool {
        matches!(self, Self::Server | Self::Both)
    }
}

impl FromStr for TimestampsToReturn {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "source" => Ok(Self::Source),
            "server" => Ok(Self::Server),
            "both" => Ok(Self::Both),
            "neither" | "none" => Ok(Self::Neither),
            _ => Err(ProbeError::configuration(
                ConfigurationError::InvalidTimestamps { input: s.into() },
            )),
        }
    }
}

// =============================================================================
// SecurityMode
// =============================================================================

/// OPC UA message security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// No security.
    #[default]
    None,

    /// Messages are signed but not encrypted.
    Sign,

    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

impl SecurityMode {
    /// Returns the OPC UA security mode value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Sign => 2,
            Self::SignAndEncrypt => 3,
        }
    }

    /// Creates from OPC UA security mode value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::None),
            2 => Some(Self::Sign),
            3 => Some(Self::SignAndEncrypt),
            _ => Option::None,
        }
    }

    /// Returns `true` if this mode provides no security.
    #[inline]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Sign => "Sign",
            Self::SignAndEncrypt => "SignAndEncrypt",
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SecurityMode {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "none" | "nosecurity" => Ok(Self::None),
            "sign" | "signed" => Ok(Self::Sign),
            "signandencrypt" | "signencrypt" | "encrypted" => Ok(Self::SignAndEncrypt),
            _ => Err(ProbeError::configuration(
                ConfigurationError::InvalidSecurityMode { input: s.into() },
            )),
        }
    }
}

// =============================================================================
// SecurityPolicy
// =============================================================================

/// OPC UA security policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPolicy {
    /// No security policy.
    #[default]
    None,
    /// Basic128Rsa15 (deprecated).
    Basic128Rsa15,
    /// Basic256 (deprecated).
    Basic256,
    /// Basic256Sha256.
    Basic256Sha256,
    /// Aes128Sha256RsaOaep.
    Aes128Sha256RsaOaep,
    /// Aes256Sha256RsaPss.
    Aes256Sha256RsaPss,
}

impl SecurityPolicy {
    /// Returns the OPC UA policy URI.
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::None => "http://opcfoundation.org/UA/SecurityPolicy#None",
            Self::Basic128Rsa15 => "http://opcfoundation.org/UA/SecurityPolicy#Basic128Rsa15",
            Self::Basic256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256",
            Self::Basic256Sha256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
            Self::Aes128Sha256RsaOaep => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes128_Sha256_RsaOaep"
            }
            Self::Aes256Sha256RsaPss => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes256_Sha256_RsaPss"
            }
        }
    }

    /// Returns the short name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Basic128Rsa15 => "Basic128Rsa15",
            Self::Basic256 => "Basic256",
            Self::Basic256Sha256 => "Basic256Sha256",
            Self::Aes128Sha256RsaOaep => "Aes128Sha256RsaOaep",
            Self::Aes256Sha256RsaPss => "Aes256Sha256RsaPss",
        }
    }

    /// Creates from URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            s if s.ends_with("#None") => Some(Self::None),
            s if s.ends_with("#Basic128Rsa15") => Some(Self::Basic128Rsa15),
            s if s.ends_with("#Basic256") => Some(Self::Basic256),
            s if s.ends_with("#Basic256Sha256") => Some(Self::Basic256Sha256),
            s if s.contains("Aes128_Sha256_RsaOaep") => Some(Self::Aes128Sha256RsaOaep),
            s if s.contains("Aes256_Sha256_RsaPss") => Some(Self::Aes256Sha256RsaPss),
            _ => Option::None,
        }
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SecurityPolicy {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(policy) = Self::from_uri(s) {
            return Ok(policy);
        }

        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "none" => Ok(Self::None),
            "basic128rsa15" => Ok(Self::Basic128Rsa15),
            "basic256" => Ok(Self::Basic256),
            "basic256sha256" => Ok(Self::Basic256Sha256),
            "aes128sha256rsaoaep" | "aes128" => Ok(Self::Aes128Sha256RsaOaep),
            "aes256sha256rsapss" | "aes256" => Ok(Self::Aes256Sha256RsaPss),
            _ => Err(ProbeError::configuration(
                ConfigurationError::InvalidSecurityPolicy { input: s.into() },
            )),
        }
    }
}

// =============================================================================
// ServerDescription
// =============================================================================

/// A server application returned by FindServers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescription {
    /// Human-readable application name.
    pub application_name: String,
    /// Globally unique application URI.
    pub application_uri: String,
    /// Product URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_uri: Option<String>,
    /// URLs of the server's discovery endpoints.
    #[serde(default)]
    pub discovery_urls: Vec<String>,
}

impl ServerDescription {
    /// Creates a description from name and URI.
    pub fn new(application_name: impl Into<String>, application_uri: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            application_uri: application_uri.into(),
            product_uri: None,
            discovery_urls: Vec::new(),
        }
    }

    /// Adds a discovery URL.
    pub fn with_discovery_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_urls.push(url.into());
        self
    }
}

// =============================================================================
// EndpointDescription
// =============================================================================

/// A connection target returned by GetEndpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescription {
    /// URL the endpoint is reachable at.
    pub endpoint_url: String,
    /// Message security mode.
    pub security_mode: SecurityMode,
    /// Security policy URI.
    pub security_policy_uri: String,
    /// Transport profile URI identifying the wire binding.
    pub transport_profile_uri: String,
    /// Relative security ranking assigned by the server.
    #[serde(default)]
    pub security_level: u8,
    /// The server offering this endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerDescription>,
}

impl EndpointDescription {
    /// Creates an endpoint.
    ///
    /// The policy defaults to `None` for an unsecured endpoint and to
    /// `Basic256Sha256` otherwise.
    pub fn new(
        endpoint_url: impl Into<String>,
        security_mode: SecurityMode,
        transport_profile_uri: impl Into<String>,
    ) -> Self {
        let policy = if security_mode.is_none() {
            SecurityPolicy::None
        } else {
            SecurityPolicy::Basic256Sha256
        };
        Self {
            endpoint_url: endpoint_url.into(),
            security_mode,
            security_policy_uri: policy.uri().to_string(),
            transport_profile_uri: transport_profile_uri.into(),
            security_level: 0,
            server: None,
        }
    }

    /// Sets the security policy.
    pub fn with_security_policy(mut self, policy: SecurityPolicy) -> Self {
        self.security_policy_uri = policy.uri().to_string();
        self
    }

    /// Sets the security level.
    pub fn with_security_level(mut self, level: u8) -> Self {
        self.security_level = level;
        self
    }

    /// Sets the owning server.
    pub fn with_server(mut self, server: ServerDescription) -> Self {
        self.server = Some(server);
        self
    }

    /// Returns the parsed security policy, if the URI is known.
    pub fn security_policy(&self) -> Option<SecurityPolicy> {
        SecurityPolicy::from_uri(&self.security_policy_uri)
    }
}

impl fmt::Display for EndpointDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.endpoint_url, self.security_mode)
    }
}

// =============================================================================
// StatusCode
// =============================================================================

/// OPC UA status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Good.
    pub const GOOD: Self = Self(0);
    /// Uncertain.
    pub const UNCERTAIN: Self = Self(0x4000_0000);
    /// Generic Bad.
    pub const BAD: Self = Self(0x8000_0000);
    /// BadUnexpectedError.
    pub const BAD_UNEXPECTED_ERROR: Self = Self(0x8001_0000);
    /// BadInternalError.
    pub const BAD_INTERNAL_ERROR: Self = Self(0x8002_0000);
    /// BadCommunicationError.
    pub const BAD_COMMUNICATION_ERROR: Self = Self(0x8005_0000);
    /// BadDecodingError.
    pub const BAD_DECODING_ERROR: Self = Self(0x8007_0000);
    /// BadEncodingLimitsExceeded.
    pub const BAD_ENCODING_LIMITS_EXCEEDED: Self = Self(0x8008_0000);
    /// BadTimeout.
    pub const BAD_TIMEOUT: Self = Self(0x800A_0000);
    /// BadServiceUnsupported.
    pub const BAD_SERVICE_UNSUPPORTED: Self = Self(0x800B_0000);
    /// BadNothingToDo.
    pub const BAD_NOTHING_TO_DO: Self = Self(0x800F_0000);
    /// BadTooManyOperations.
    pub const BAD_TOO_MANY_OPERATIONS: Self = Self(0x8010_0000);
    /// BadCertificateInvalid.
    pub const BAD_CERTIFICATE_INVALID: Self = Self(0x8012_0000);
    /// BadSecurityChecksFailed.
    pub const BAD_SECURITY_CHECKS_FAILED: Self = Self(0x8013_0000);
    /// BadIdentityTokenRejected.
    pub const BAD_IDENTITY_TOKEN_REJECTED: Self = Self(0x8021_0000);
    /// BadSecureChannelIdInvalid.
    pub const BAD_SECURE_CHANNEL_ID_INVALID: Self = Self(0x8022_0000);
    /// BadSessionIdInvalid.
    pub const BAD_SESSION_ID_INVALID: Self = Self(0x8025_0000);
    /// BadSessionClosed.
    pub const BAD_SESSION_CLOSED: Self = Self(0x8026_0000);
    /// BadSessionNotActivated.
    pub const BAD_SESSION_NOT_ACTIVATED: Self = Self(0x8027_0000);
    /// BadNodeIdUnknown.
    pub const BAD_NODE_ID_UNKNOWN: Self = Self(0x8034_0000);
    /// BadAttributeIdInvalid.
    pub const BAD_ATTRIBUTE_ID_INVALID: Self = Self(0x8035_0000);
    /// BadNotReadable.
    pub const BAD_NOT_READABLE: Self = Self(0x803A_0000);
    /// BadSecurityModeRejected.
    pub const BAD_SECURITY_MODE_REJECTED: Self = Self(0x8054_0000);
    /// BadSecurityPolicyRejected.
    pub const BAD_SECURITY_POLICY_REJECTED: Self = Self(0x8055_0000);
    /// BadTooManySessions.
    pub const BAD_TOO_MANY_SESSIONS: Self = Self(0x8056_0000);
    /// BadTcpMessageTypeInvalid.
    pub const BAD_TCP_MESSAGE_TYPE_INVALID: Self = Self(0x807E_0000);
    /// BadTcpEndpointUrlInvalid.
    pub const BAD_TCP_ENDPOINT_URL_INVALID: Self = Self(0x8083_0000);

    /// Returns `true` if the severity bits are Good.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` if the severity bits are Uncertain.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` if the severity bits are Bad.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the symbolic name for well-known codes.
    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::GOOD => "Good",
            Self::UNCERTAIN => "Uncertain",
            Self::BAD => "Bad",
            Self::BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            Self::BAD_INTERNAL_ERROR => "BadInternalError",
            Self::BAD_COMMUNICATION_ERROR => "BadCommunicationError",
            Self::BAD_DECODING_ERROR => "BadDecodingError",
            Self::BAD_ENCODING_LIMITS_EXCEEDED => "BadEncodingLimitsExceeded",
            Self::BAD_TIMEOUT => "BadTimeout",
            Self::BAD_SERVICE_UNSUPPORTED => "BadServiceUnsupported",
            Self::BAD_NOTHING_TO_DO => "BadNothingToDo",
            Self::BAD_TOO_MANY_OPERATIONS => "BadTooManyOperations",
            Self::BAD_CERTIFICATE_INVALID => "BadCertificateInvalid",
            Self::BAD_SECURITY_CHECKS_FAILED => "BadSecurityChecksFailed",
            Self::BAD_IDENTITY_TOKEN_REJECTED => "BadIdentityTokenRejected",
            Self::BAD_SECURE_CHANNEL_ID_INVALID => "BadSecureChannelIdInvalid",
            Self::BAD_SESSION_ID_INVALID => "BadSessionIdInvalid",
            Self::BAD_SESSION_CLOSED => "BadSessionClosed",
            Self::BAD_SESSION_NOT_ACTIVATED => "BadSessionNotActivated",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_ATTRIBUTE_ID_INVALID => "BadAttributeIdInvalid",
            Self::BAD_NOT_READABLE => "BadNotReadable",
            Self::BAD_SECURITY_MODE_REJECTED => "BadSecurityModeRejected",
            Self::BAD_SECURITY_POLICY_REJECTED => "BadSecurityPolicyRejected",
            Self::BAD_TOO_MANY_SESSIONS => "BadTooManySessions",
            Self::BAD_TCP_MESSAGE_TYPE_INVALID => "BadTcpMessageTypeInvalid",
            Self::BAD_TCP_ENDPOINT_URL_INVALID => "BadTcpEndpointUrlInvalid",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

// =============================================================================
// Variant
// =============================================================================

/// A dynamically typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "body")]
pub enum Variant {
    /// No value.
    #[default]
    Null,
    /// Boolean.
    Boolean(bool),
    /// Signed 8-bit integer.
    SByte(i8),
    /// Unsigned 8-bit integer.
    Byte(u8),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Unsigned 16-bit integer.
    UInt16(u16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// GUID.
    Guid(Uuid),
    /// Raw bytes.
    ByteString(Vec<u8>),
    /// Array of values.
    Array(Vec<Variant>),
}

impl Variant {
    /// Returns the type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean(_) => "Boolean",
            Self::SByte(_) => "SByte",
            Self::Byte(_) => "Byte",
            Self::Int16(_) => "Int16",
            Self::UInt16(_) => "UInt16",
            Self::Int32(_) => "Int32",
            Self::UInt32(_) => "UInt32",
            Self::Int64(_) => "Int64",
            Self::UInt64(_) => "UInt64",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
            Self::Guid(_) => "Guid",
            Self::ByteString(_) => "ByteString",
            Self::Array(_) => "Array",
        }
    }

    /// Returns `true` if this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the value as f64 if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::SByte(v) => Some(v as f64),
            Self::Byte(v) => Some(v as f64),
            Self::Int16(v) => Some(v as f64),
            Self::UInt16(v) => Some(v as f64),
            Self::Int32(v) => Some(v as f64),
            Self::UInt32(v) => Some(v as f64),
            Self::Int64(v) => Some(v as f64),
            Self::UInt64(v) => Some(v as f64),
            Self::Float(v) => Some(v as f64),
            Self::Double(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::SByte(v) => write!(f, "{}", v),
            Self::Byte(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Guid(v) => write!(f, "{}", v),
            Self::ByteString(v) => write!(f, "0x{}", hex::encode(v)),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<u32> for Variant {
    fn from(v: u32) -> Self {
        Self::UInt32(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

// =============================================================================
// DataValue
// =============================================================================

/// One read result: value, status and optional timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DataValue {
    /// The value.
    #[serde(default)]
    pub value: Variant,
    /// Per-value status.
    #[serde(default)]
    pub status: StatusCode,
    /// Timestamp assigned by the data source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Timestamp assigned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    /// Creates a good value without timestamps.
    pub fn new(value: impl Into<Variant>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    /// Creates a value-less result carrying a status.
    pub fn bad(status: StatusCode) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Sets the source timestamp.
    pub fn with_source_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.source_timestamp = Some(timestamp);
        self
    }

    /// Sets the server timestamp.
    pub fn with_server_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.server_timestamp = Some(timestamp);
        self
    }

    /// Returns `true` if the status is Good.
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status.is_good() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{} [{}]", self.value, self.status)
        }
    }
}

/// Diagnostic information attached to a service response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiagnosticInfo {
    /// Additional text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    /// Inner status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_status: Option<StatusCode>,
}

// =============================================================================
// MessageLimits
// =============================================================================

/// Serialization limits applied by the message context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLimits {
    /// Largest encoded message in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Maximum chunks per message (0 = unlimited).
    #[serde(default)]
    pub max_chunk_count: usize,
    /// Maximum array length, including the number of read operations.
    #[serde(default = "default_max_array_length")]
    pub max_array_length: usize,
    /// Maximum string length in bytes.
    #[serde(default = "default_max_string_length")]
    pub max_string_length: usize,
}

fn default_max_message_size() -> usize {
    4 * 1024 * 1024
}

fn default_max_array_length() -> usize {
    65_535
}

fn default_max_string_length() -> usize {
    65_535
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            max_chunk_count: 0,
            max_array_length: default_max_array_length(),
            max_string_length: default_max_string_length(),
        }
    }
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Client configuration consumed read-only by the workflow.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use uaprobe_client::types::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .application_name("probe")
///     .request_timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert_eq!(config.application_uri(), "urn:uaprobe:probe");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Application name.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Application URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_uri: Option<String>,

    /// Product URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_uri: Option<String>,

    /// Session name sent with CreateSession.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,

    /// Path to the client certificate (DER or PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_path: Option<PathBuf>,

    /// Message-context limits.
    #[serde(default)]
    pub limits: MessageLimits,

    /// Transport connect and channel open timeout.
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Budget for the whole discovery exchange.
    #[serde(default = "default_discovery_timeout", with = "humantime_serde")]
    pub discovery_timeout: Duration,

    /// Timeout for each service request.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Requested session timeout.
    #[serde(default = "default_session_timeout", with = "humantime_serde")]
    pub session_timeout: Duration,
}

fn default_application_name() -> String {
    "uaprobe".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_discovery_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(60)
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Validates this configuration.
    pub fn validate(&self) -> ProbeResult<()> {
        if self.application_name.trim().is_empty() {
            return Err(ProbeError::configuration(ConfigurationError::MissingField {
                field: "application_name",
            }));
        }

        let timeouts = [
            ("connect_timeout", self.connect_timeout),
            ("discovery_timeout", self.discovery_timeout),
            ("request_timeout", self.request_timeout),
            ("session_timeout", self.session_timeout),
        ];
        for (field, value) in timeouts {
            if value.is_zero() {
                return Err(ProbeError::configuration(ConfigurationError::invalid_value(
                    field,
                    "must be greater than 0",
                )));
            }
        }

        if self.limits.max_message_size == 0 {
            return Err(ProbeError::configuration(ConfigurationError::invalid_value(
                "max_message_size",
                "must be greater than 0",
            )));
        }
        if self.limits.max_array_length == 0 {
            return Err(ProbeError::configuration(ConfigurationError::invalid_value(
                "max_array_length",
                "must be greater than 0",
            )));
        }

        Ok(())
    }

    /// Returns the effective application URI.
    pub fn application_uri(&self) -> String {
        self.application_uri
            .clone()
            .unwrap_or_else(|| format!("urn:uaprobe:{}", self.application_name))
    }

    /// Returns the effective session name.
    pub fn session_name(&self) -> String {
        self.session_name
            .clone()
            .unwrap_or_else(|| format!("{} session", self.application_name))
    }

    /// Returns the client's application description.
    pub fn application_description(&self) -> ServerDescription {
        ServerDescription {
            application_name: self.application_name.clone(),
            application_uri: self.application_uri(),
            product_uri: self.product_uri.clone(),
            discovery_urls: Vec::new(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            application_name: default_application_name(),
            application_uri: None,
            product_uri: None,
            session_name: None,
            certificate_path: None,
            limits: MessageLimits::default(),
            connect_timeout: default_connect_timeout(),
            discovery_timeout: default_discovery_timeout(),
            request_timeout: default_request_timeout(),
            session_timeout: default_session_timeout(),
        }
    }
}

// =============================================================================
// ClientConfigBuilder
// =============================================================================

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    application_name: Option<String>,
    application_uri: Option<String>,
    product_uri: Option<String>,
    session_name: Option<String>,
    certificate_path: Option<PathBuf>,
    limits: Option<MessageLimits>,
    connect_timeout: Option<Duration>,
    discovery_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    session_timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Sets the application URI.
    pub fn application_uri(mut self, uri: impl Into<String>) -> Self {
        self.application_uri = Some(uri.into());
        self
    }

    /// Sets the product URI.
    pub fn product_uri(mut self, uri: impl Into<String>) -> Self {
        self.product_uri = Some(uri.into());
        self
    }

    /// Sets the session name.
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }

    /// Sets the certificate path.
    pub fn certificate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate_path = Some(path.into());
        self
    }

    /// Sets the message limits.
    pub fn limits(mut self, limits: MessageLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the discovery timeout.
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = Some(timeout);
        self
    }

    /// Sets the request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the session timeout.
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ProbeResult<ClientConfig> {
        let config = ClientConfig {
            application_name: self
                .application_name
                .unwrap_or_else(default_application_name),
            application_uri: self.application_uri,
            product_uri: self.product_uri,
            session_name: self.session_name,
            certificate_path: self.certificate_path,
            limits: self.limits.unwrap_or_default(),
            connect_timeout: self.connect_timeout.unwrap_or_else(default_connect_timeout),
            discovery_timeout: self
                .discovery_timeout
                .unwrap_or_else(default_discovery_timeout),
            request_timeout: self.request_timeout.unwrap_or_else(default_request_timeout),
            session_timeout: self.session_timeout.unwrap_or_else(default_session_timeout),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// humantime_serde helper
// =============================================================================

/// Serde adapter for `Duration` as humantime strings (`"10s"`, `"1m 30s"`).
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Serializes a duration.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        humantime::format_duration(*duration)
            .to_string()
            .serialize(serializer)
    }

    /// Deserializes a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_parse_formats() {
        let node: NodeId = "ns=1;s=Node1".parse().unwrap();
        assert_eq!(node, NodeId::string(1, "Node1"));

        let node: NodeId = "i=2258".parse().unwrap();
        assert_eq!(node, NodeId::numeric(0, 2258));
        assert_eq!(node.to_string(), "i=2258");

        let node: NodeId = "ns=2;g=550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert!(matches!(node.identifier, NodeIdentifier::Guid(_)));

        let node: NodeId = "ns=3;b=AQID".parse().unwrap();
        assert_eq!(node, NodeId::opaque(3, vec![1, 2, 3]));
        assert_eq!(node.to_string(), "ns=3;b=AQID");
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=1".parse::<NodeId>().is_err());
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("ns=1;q=1".parse::<NodeId>().is_err());
        assert!("ns=1;s=".parse::<NodeId>().is_err());
        assert!("i=abc".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_id_serializes_as_string() {
        let json = serde_json::to_string(&NodeId::string(1, "Node1")).unwrap();
        assert_eq!(json, "\"ns=1;s=Node1\"");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, NodeId::string(1, "Node1"));
    }

    #[test]
    fn test_attribute_id_numeric_serde() {
        let json = serde_json::to_string(&AttributeId::Value).unwrap();
        assert_eq!(json, "13");
        assert!(serde_json::from_str::<AttributeId>("99").is_err());
    }

    #[test]
    fn test_security_mode() {
        assert_eq!("SignAndEncrypt".parse::<SecurityMode>().unwrap(), SecurityMode::SignAndEncrypt);
        assert_eq!("sign-and-encrypt".parse::<SecurityMode>().unwrap(), SecurityMode::SignAndEncrypt);
        assert_eq!(SecurityMode::from_value(2), Some(SecurityMode::Sign));
        assert!(SecurityMode::None.is_none());
        assert!("bogus".parse::<SecurityMode>().is_err());
    }

    #[test]
    fn test_security_policy_uri() {
        let policy = SecurityPolicy::from_uri(SecurityPolicy::Basic256Sha256.uri());
        assert_eq!(policy, Some(SecurityPolicy::Basic256Sha256));
        assert_eq!(
            SecurityPolicy::from_uri(SecurityPolicy::Basic256.uri()),
            Some(SecurityPolicy::Basic256)
        );
    }

    #[test]
    fn test_endpoint_default_policy() {
        let secure = EndpointDescription::new("opc.tcp://h:1", SecurityMode::Sign, "p");
        assert_eq!(secure.security_policy(), Some(SecurityPolicy::Basic256Sha256));

        let open = EndpointDescription::new("opc.tcp://h:1", SecurityMode::None, "p");
        assert_eq!(open.security_policy(), Some(SecurityPolicy::None));
    }

    #[test]
    fn test_status_code_severity() {
        assert!(StatusCode::GOOD.is_good());
        assert!(StatusCode::UNCERTAIN.is_uncertain());
        assert!(!StatusCode::UNCERTAIN.is_bad());
        assert!(StatusCode::BAD_NODE_ID_UNKNOWN.is_bad());
        assert_eq!(StatusCode::BAD_NODE_ID_UNKNOWN.to_string(), "BadNodeIdUnknown");
        assert_eq!(StatusCode(0x8123_0000).to_string(), "0x81230000");
    }

    #[test]
    fn test_data_value_display() {
        assert_eq!(DataValue::new(42i32).to_string(), "42");
        assert_eq!(
            DataValue::bad(StatusCode::BAD_NODE_ID_UNKNOWN).to_string(),
            "null [BadNodeIdUnknown]"
        );
        let array = Variant::Array(vec![Variant::from(1i32), Variant::from("a")]);
        assert_eq!(array.to_string(), "[1, a]");
    }

    #[test]
    fn test_variant_serde() {
        let value = DataValue::new(1.5f64).with_source_timestamp(Utc::now());
        let json = serde_json::to_string(&value).unwrap();
        let back: DataValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_timestamps_parse() {
        assert_eq!("Both".parse::<TimestampsToReturn>().unwrap(), TimestampsToReturn::Both);
        assert!(TimestampsToReturn::Source.includes_source());
        assert!(!TimestampsToReturn::Source.includes_server());
        assert!("always".parse::<TimestampsToReturn>().is_err());
    }

    #[test]
    fn test_config_builder_defaults() {
        let config = ClientConfig::builder().build().unwrap();
        assert_eq!(config.application_name, "uaprobe");
        assert_eq!(config.application_uri(), "urn:uaprobe:uaprobe");
        assert_eq!(config.session_name(), "uaprobe session");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_validation() {
        assert!(ClientConfig::builder()
            .request_timeout(Duration::ZERO)
            .build()
            .is_err());

        let limits = MessageLimits {
            max_array_length: 0,
            ..Default::default()
        };
        assert!(ClientConfig::builder().limits(limits).build().is_err());
    }

    #[test]
    fn test_config_serde_durations() {
        let json = r#"{"application_name":"x","request_timeout":"2s"}"#;
        let config: ClientConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }
}
