// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Errors raised by the network transport. Every variant is transient from
/// the delivery layer's point of view and classifies as store-and-retry.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport failure: {0}")]
    Other(String),
}

/// Errors raised by the on-disk persisted file store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file exists but its contents cannot be turned back into a batch.
    /// Such files are logged and skipped, never retried.
    #[error("corrupt persisted file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised when constructing a [`crate::Batch`].
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The routing key must be the 36-byte canonical textual form, since the
    /// persisted file format reserves a fixed 36-byte slot for it.
    #[error("routing key must be 36 bytes, got {0}")]
    RoutingKeyLength(usize),
}

/// Returned by [`crate::FileIndex::add`] when the index is at its configured
/// capacity. The incoming batch is dropped (reject-new policy).
#[derive(Debug, thiserror::Error)]
#[error("persisted file index is at capacity ({capacity})")]
pub struct IndexFull {
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let error = TransportError::Timeout("deadline elapsed".to_string());
        assert_eq!(error.to_string(), "request timed out: deadline elapsed");
    }

    #[test]
    fn test_store_error_display() {
        let error = StoreError::Corrupt {
            path: PathBuf::from("/tmp/123-abc.trn"),
            reason: "file shorter than routing key prefix".to_string(),
        };
        assert!(error.to_string().contains("123-abc.trn"));
        assert!(error.to_string().contains("routing key prefix"));
    }

    #[test]
    fn test_index_full_display() {
        let error = IndexFull { capacity: 50 };
        assert_eq!(
            error.to_string(),
            "persisted file index is at capacity (50)"
        );
    }

    #[test]
    fn test_batch_error_display() {
        let error = BatchError::RoutingKeyLength(12);
        assert_eq!(error.to_string(), "routing key must be 36 bytes, got 12");
    }
}
