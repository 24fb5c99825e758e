// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Message context: body serialization under negotiated limits.
//!
//! Service bodies are JSON documents. The context owns the limits from
//! [`ClientConfig`] and the message size agreed during the HEL/ACK exchange,
//! and every encode or decode is checked against them.

pub mod messages;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ChannelError;
use crate::types::{ClientConfig, MessageLimits};

pub use messages::{
    CloseChannelRequest, OpenChannelRequest, OpenChannelResponse, RequestBody, RequestHeader,
    RequestMessage, ResponseBody, ResponseHeader, ResponseMessage, UserIdentity,
};

// =============================================================================
// MessageContext
// =============================================================================

/// Serialization limits in effect on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContext {
    limits: MessageLimits,
    max_message_size: usize,
}

impl MessageContext {
    /// Creates a context from explicit limits.
    pub fn new(limits: MessageLimits) -> Self {
        Self {
            max_message_size: limits.max_message_size,
            limits,
        }
    }

    /// Creates a context from the client configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.limits)
    }

    /// Returns the configured limits.
    pub fn limits(&self) -> &MessageLimits {
        &self.limits
    }

    /// Returns the message size currently in effect.
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Adopts the smaller of the local and the remote maximum.
    ///
    /// A remote value of 0 means the peer imposes no limit.
    pub fn negotiate(&mut self, remote_max: usize) {
        if remote_max > 0 && remote_max < self.max_message_size {
            tracing::debug!(
                local = self.max_message_size,
                remote = remote_max,
                "Adopting smaller remote message size"
            );
            self.max_message_size = remote_max;
        }
    }

    /// Serializes a body and checks the result against the message size.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ChannelError> {
        let bytes = serde_json::to_vec(value).map_err(|e| ChannelError::encoding(e.to_string()))?;
        self.check_size(bytes.len())?;
        Ok(bytes)
    }

    /// Checks the size of a received body and deserializes it.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ChannelError> {
        self.check_size(bytes.len())?;
        serde_json::from_slice(bytes).map_err(|e| ChannelError::encoding(e.to_string()))
    }

    /// Checks an array length against the array limit.
    pub fn check_array(&self, what: &'static str, len: usize) -> Result<(), ChannelError> {
        if len > self.limits.max_array_length {
            return Err(ChannelError::LimitExceeded {
                what,
                size: len,
                max: self.limits.max_array_length,
            });
        }
        Ok(())
    }

    /// Checks a string length against the string limit.
    pub fn check_string(&self, what: &'static str, value: &str) -> Result<(), ChannelError> {
        if value.len() > self.limits.max_string_length {
            return Err(ChannelError::LimitExceeded {
                what,
                size: value.len(),
                max: self.limits.max_string_length,
            });
        }
        Ok(())
    }

    fn check_size(&self, size: usize) -> Result<(), ChannelError> {
        if size > self.max_message_size {
            return Err(ChannelError::LimitExceeded {
                what: "message",
                size,
                max: self.max_message_size,
            });
        }
        Ok(())
    }
}

impl Default for MessageContext {
    fn default() -> Self {
        Self::new(MessageLimits::default())
    }
}
