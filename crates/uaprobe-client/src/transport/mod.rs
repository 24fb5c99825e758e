// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Wire bindings that move UA-SC frames.
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │                 UaChannel<T>                   │
//! │      (HEL/ACK, OPN, MSG, CLO over frames)      │
//! └───────────────────────┬────────────────────────┘
//!                         │ MessageTransport
//!              ┌──────────┴──────────┐
//!              ▼                     ▼
//!       ┌─────────────┐      ┌────────────────┐
//!       │TcpTransport │      │WebSocketTransport│
//!       │  opc.tcp    │      │ opc.ws / opc.wss │
//!       └─────────────┘      └────────────────┘
//! ```
//!
//! A binding only knows how to deliver whole frames. Everything above it is
//! identical for every binding.

mod frame;
mod tcp;
mod websocket;

use std::fmt;

use async_trait::async_trait;

pub use frame::{
    AcknowledgeMessage, ErrorMessage, Frame, FrameHeader, HelloMessage, MessageType, HEADER_SIZE,
    PROTOCOL_VERSION,
};
pub use tcp::TcpTransport;
pub use websocket::{WebSocketTransport, WS_SUBPROTOCOL};

use crate::error::TransportError;

/// Transport profile URI of the binary TCP binding.
pub const TCP_PROFILE_URI: &str =
    "http://opcfoundation.org/UA-Profile/Transport/uatcp-uasc-uabinary";

/// Transport profile URI of the WebSocket binding.
pub const WS_PROFILE_URI: &str =
    "http://opcfoundation.org/UA-Profile/Transport/wss-uasc-uabinary";

/// Default port when an endpoint URL omits one.
pub const DEFAULT_PORT: u16 = 4840;

// =============================================================================
// TransportState
// =============================================================================

/// Connection state of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportState {
    /// Not connected.
    #[default]
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected and ready.
    Connected,
    /// Connection failed.
    Failed,
}

impl TransportState {
    /// Returns `true` if connected.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if failed.
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// MessageTransport Trait
// =============================================================================

/// A binding that delivers whole UA-SC frames.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Establishes the underlying connection.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Sends one frame.
    async fn send(&mut self, frame: &Frame) -> Result<(), TransportError>;

    /// Receives the next frame.
    async fn receive(&mut self) -> Result<Frame, TransportError>;

    /// Closes the connection. Never fails.
    async fn shutdown(&mut self);

    /// Returns the connection state.
    fn state(&self) -> TransportState;

    /// Caps the size of received frames.
    fn set_max_frame_size(&mut self, size: usize);

    /// Returns the remote target description for logs.
    fn target(&self) -> &str;
}
