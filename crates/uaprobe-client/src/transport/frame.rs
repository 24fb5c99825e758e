// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! UA-SC framing.
//!
//! Every frame starts with an 8-byte header:
//!
//! ```text
//! ┌──────────────┬────────────┬──────────────────────┐
//! │ type (3 B)   │ chunk (1 B)│ size u32 LE (4 B)    │
//! │ HEL/ACK/ERR  │    'F'     │ header + body length │
//! │ OPN/CLO/MSG  │            │                      │
//! └──────────────┴────────────┴──────────────────────┘
//! ```
//!
//! HEL, ACK and ERR bodies use the fixed binary layout of the connection
//! protocol. OPN, CLO and MSG bodies are produced by the message context.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::TransportError;
use crate::types::StatusCode;

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Connection protocol version sent in HEL and ACK.
pub const PROTOCOL_VERSION: u32 = 0;

const FINAL_CHUNK: u8 = b'F';

// =============================================================================
// MessageType
// =============================================================================

/// The frame message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Client hello.
    Hello,
    /// Server acknowledge.
    Acknowledge,
    /// Connection-level error.
    Error,
    /// Open secure channel.
    OpenChannel,
    /// Close secure channel.
    CloseChannel,
    /// Service message.
    Message,
}

impl MessageType {
    /// Returns the three-byte wire code.
    pub const fn code(&self) -> &'static [u8; 3] {
        match self {
            Self::Hello => b"HEL",
            Self::Acknowledge => b"ACK",
            Self::Error => b"ERR",
            Self::OpenChannel => b"OPN",
            Self::CloseChannel => b"CLO",
            Self::Message => b"MSG",
        }
    }

    /// Parses a wire code.
    pub fn from_code(code: &[u8]) -> Option<Self> {
        match code {
            b"HEL" => Some(Self::Hello),
            b"ACK" => Some(Self::Acknowledge),
            b"ERR" => Some(Self::Error),
            b"OPN" => Some(Self::OpenChannel),
            b"CLO" => Some(Self::CloseChannel),
            b"MSG" => Some(Self::Message),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(std::str::from_utf8(self.code()).unwrap_or("???"))
    }
}

// =============================================================================
// FrameHeader
// =============================================================================

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Message type.
    pub message_type: MessageType,
    /// Total frame size including the header.
    pub size: usize,
}

impl FrameHeader {
    /// Parses and validates a header against `max_size`.
    pub fn parse(bytes: &[u8; HEADER_SIZE], max_size: usize) -> Result<Self, TransportError> {
        let message_type = MessageType::from_code(&bytes[..3]).ok_or_else(|| {
            TransportError::malformed(format!(
                "unknown message type {:?}",
                String::from_utf8_lossy(&bytes[..3])
            ))
        })?;

        if bytes[3] != FINAL_CHUNK {
            return Err(TransportError::malformed(format!(
                "unsupported chunk type '{}'",
                bytes[3] as char
            )));
        }

        let size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        if size < HEADER_SIZE {
            return Err(TransportError::malformed(format!(
                "frame size {} is smaller than the header",
                size
            )));
        }
        if max_size > 0 && size > max_size {
            return Err(TransportError::FrameTooLarge {
                size,
                max: max_size,
            });
        }

        Ok(Self { message_type, size })
    }

    /// Returns the body length.
    pub fn body_len(&self) -> usize {
        self.size - HEADER_SIZE
    }
}

// =============================================================================
// Frame
// =============================================================================

/// A complete single-chunk frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type.
    pub message_type: MessageType,
    /// Frame body.
    pub body: Bytes,
}

impl Frame {
    /// Creates a frame.
    pub fn new(message_type: MessageType, body: impl Into<Bytes>) -> Self {
        Self {
            message_type,
            body: body.into(),
        }
    }

    /// Returns the encoded length.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }

    /// Encodes header and body.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_slice(self.message_type.code());
        buf.put_u8(FINAL_CHUNK);
        buf.put_u32_le(self.encoded_len() as u32);
        buf.put_slice(&self.body);
        buf.freeze()
    }

    /// Decodes a frame that arrived as one contiguous buffer.
    pub fn decode(data: &[u8], max_size: usize) -> Result<Self, TransportError> {
        if data.len() < HEADER_SIZE {
            return Err(TransportError::malformed(format!(
                "{} bytes is shorter than a frame header",
                data.len()
            )));
        }

        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&data[..HEADER_SIZE]);
        let header = FrameHeader::parse(&raw, max_size)?;

        if header.size != data.len() {
            return Err(TransportError::malformed(format!(
                "header declares {} bytes, message carries {}",
                header.size,
                data.len()
            )));
        }

        Ok(Self::new(
            header.message_type,
            Bytes::copy_from_slice(&data[HEADER_SIZE..]),
        ))
    }
}

// =============================================================================
// Connection protocol bodies
// =============================================================================

/// HEL body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloMessage {
    /// Protocol version.
    pub protocol_version: u32,
    /// Largest chunk the client can receive.
    pub receive_buffer_size: u32,
    /// Largest chunk the client will send.
    pub send_buffer_size: u32,
    /// Largest message the client can receive (0 = no limit).
    pub max_message_size: u32,
    /// Maximum chunks per message (0 = no limit).
    pub max_chunk_count: u32,
    /// Endpoint the client wants to reach.
    pub endpoint_url: String,
}

impl HelloMessage {
    /// Encodes the body.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(24 + self.endpoint_url.len());
        buf.put_u32_le(self.protocol_version);
        buf.put_u32_le(self.receive_buffer_size);
        buf.put_u32_le(self.send_buffer_size);
        buf.put_u32_le(self.max_message_size);
        buf.put_u32_le(self.max_chunk_count);
        put_string(&mut buf, &self.endpoint_url);
        buf.freeze()
    }

    /// Decodes the body.
    pub fn decode(mut buf: &[u8]) -> Result<Self, TransportError> {
        Ok(Self {
            protocol_version: get_u32(&mut buf)?,
            receive_buffer_size: get_u32(&mut buf)?,
            send_buffer_size: get_u32(&mut buf)?,
            max_message_size: get_u32(&mut buf)?,
            max_chunk_count: get_u32(&mut buf)?,
            endpoint_url: get_string(&mut buf)?,
        })
    }
}

/// ACK body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcknowledgeMessage {
    /// Protocol version.
    pub protocol_version: u32,
    /// Largest chunk the server can receive.
    pub receive_buffer_size: u32,
    /// Largest chunk the server will send.
    pub send_buffer_size: u32,
    /// Largest message the server can receive (0 = no limit).
    pub max_message_size: u32,
    /// Maximum chunks per message (0 = no limit).
    pub max_chunk_count: u32,
}

impl AcknowledgeMessage {
    /// Encodes the body.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(20);
        buf.put_u32_le(self.protocol_version);
        buf.put_u32_le(self.receive_buffer_size);
        buf.put_u32_le(self.send_buffer_size);
        buf.put_u32_le(self.max_message_size);
        buf.put_u32_le(self.max_chunk_count);
        buf.freeze()
    }

    /// Decodes the body.
    pub fn decode(mut buf: &[u8]) -> Result<Self, TransportError> {
        Ok(Self {
            protocol_version: get_u32(&mut buf)?,
            receive_buffer_size: get_u32(&mut buf)?,
            send_buffer_size: get_u32(&mut buf)?,
            max_message_size: get_u32(&mut buf)?,
            max_chunk_count: get_u32(&mut buf)?,
        })
    }
}

/// ERR body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    /// Error status.
    pub error: StatusCode,
    /// Reason text.
    pub reason: String,
}

impl ErrorMessage {
    /// Creates an error body.
    pub fn new(error: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            error,
            reason: reason.into(),
        }
    }

    /// Encodes the body.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(8 + self.reason.len());
        buf.put_u32_le(self.error.0);
        put_string(&mut buf, &self.reason);
        buf.freeze()
    }

    /// Decodes the body.
    pub fn decode(mut buf: &[u8]) -> Result<Self, TransportError> {
        Ok(Self {
            error: StatusCode(get_u32(&mut buf)?),
            reason: get_string(&mut buf)?,
        })
    }

    /// Wraps the body into an ERR frame.
    pub fn into_frame(self) -> Frame {
        Frame::new(MessageType::Error, self.encode())
    }
}

fn put_string(buf: &mut BytesMut, value: &str) {
    buf.put_i32_le(value.len() as i32);
    buf.put_slice(value.as_bytes());
}

fn get_u32(buf: &mut &[u8]) -> Result<u32, TransportError> {
    if buf.remaining() < 4 {
        return Err(TransportError::malformed("truncated u32"));
    }
    Ok(buf.get_u32_le())
}

fn get_string(buf: &mut &[u8]) -> Result<String, TransportError> {
    if buf.remaining() < 4 {
        return Err(TransportError::malformed("truncated string length"));
    }
    let len = buf.get_i32_le();
    if len < 0 {
        return Ok(String::new());
    }
    let len = len as usize;
    if buf.remaining() < len {
        return Err(TransportError::malformed("truncated string"));
    }
    let value = String::from_utf8(buf[..len].to_vec())
        .map_err(|_| TransportError::malformed("string is not UTF-8"))?;
    buf.advance(len);
    Ok(value)
}

// =============================================================================
// Tests
// =============================================================================
