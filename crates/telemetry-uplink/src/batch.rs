// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::BatchError;

/// Length of the canonical textual routing key, and of the fixed slot it
/// occupies at the head of every persisted file.
pub const ROUTING_KEY_LEN: usize = 36;

/// One unit of delivery: an already-serialized telemetry payload plus the
/// account/instrumentation identifier it belongs to and the ingestion URL it
/// is bound for. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    payload: Vec<u8>,
    routing_key: String,
    endpoint: String,
}

impl Batch {
    /// The routing key must be exactly [`ROUTING_KEY_LEN`] bytes so both the
    /// wire path and the disk path see the same invariant.
    pub fn new(
        payload: Vec<u8>,
        routing_key: String,
        endpoint: String,
    ) -> Result<Self, BatchError> {
        if routing_key.len() != ROUTING_KEY_LEN {
            return Err(BatchError::RoutingKeyLength(routing_key.len()));
        }
        Ok(Batch {
            payload,
            routing_key,
            endpoint,
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Host portion of the endpoint URL, used to key diagnostics counters.
    pub fn endpoint_host(&self) -> &str {
        let rest = self
            .endpoint
            .split_once("://")
            .map_or(self.endpoint.as_str(), |(_, rest)| rest);
        rest.split(['/', ':']).next().unwrap_or(rest)
    }
}
