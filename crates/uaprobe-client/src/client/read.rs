// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Batched attribute read.

use crate::codec::{RequestBody, ResponseBody};
use crate::error::{ChannelError, ProbeResult, ReadError};
use crate::types::{DataValue, DiagnosticInfo, ReadValueId, TimestampsToReturn};

use super::session::Session;

/// Values returned by one Read call, positionally matching the requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOutcome {
    /// One value per request, same order.
    pub values: Vec<DataValue>,
    /// Diagnostics, if the server sent any.
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

/// Issues a single batched Read on an active session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttributeReader {
    max_age: f64,
}

impl AttributeReader {
    /// Creates a reader that asks for fresh values (`max_age = 0`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the acceptable value age in milliseconds.
    pub fn with_max_age(mut self, max_age: f64) -> Self {
        self.max_age = max_age.max(0.0);
        self
    }

    /// Reads every entry in one request.
    ///
    /// Per-value failures come back as bad status codes inside the
    /// [`DataValue`]s; only failures of the call as a whole are errors.
    pub async fn read(
        &self,
        session: &Session,
        timestamps: TimestampsToReturn,
        requests: &[ReadValueId],
    ) -> ProbeResult<ReadOutcome> {
        if requests.is_empty() {
            return Err(ReadError::NothingToRead.into());
        }
        if !session.is_usable() {
            return Err(ReadError::SessionInvalidated.into());
        }
        if let Err(ChannelError::LimitExceeded { size, max, .. }) = session
            .context()
            .check_array("nodes_to_read", requests.len())
        {
            return Err(ReadError::TooManyOperations { count: size, max }.into());
        }

        tracing::info!(
            session_id = %session.id(),
            count = requests.len(),
            timestamps = ?timestamps,
            "Reading attributes"
        );

        let response = session
            .call(RequestBody::Read {
                max_age: self.max_age,
                timestamps_to_return: timestamps,
                nodes_to_read: requests.to_vec(),
            })
            .await
            .map_err(ReadError::Channel)?;

        let (values, diagnostic_infos) = match response {
            ResponseBody::Read {
                results,
                diagnostic_infos,
            } => (results, diagnostic_infos),
            _ => return Err(ReadError::UnexpectedResponse.into()),
        };

        if values.len() != requests.len() {
            return Err(ReadError::ResultCountMismatch {
                expected: requests.len(),
                actual: values.len(),
            }
            .into());
        }

        for (request, value) in requests.iter().zip(&values) {
            tracing::debug!(node = %request, value = %value, "Read result");
        }

        Ok(ReadOutcome {
            values,
            diagnostic_infos,
        })
    }
}
