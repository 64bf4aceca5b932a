// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery pipeline: network send, verdict classification, and the
//! store-to-disk failure path.
//!
//! `send` never returns an error for ordinary delivery failures; every path
//! resolves to a [`SendOutcome`] and a [`DiagnosticsSink`] report. The same
//! path serves live batches and batches replayed from disk.

use std::sync::Arc;

use tracing::{debug, error};

use crate::batch::Batch;
use crate::classify::{classify_outcome, Verdict};
use crate::diagnostics::{CounterKind, DiagnosticsSink};
use crate::index::FileIndex;
use crate::store::PersistedFileStore;
use crate::transport::Transport;

/// Terminal outcome of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The ingestion endpoint accepted the batch.
    Delivered,
    /// Non-retryable failure; the batch was dropped on purpose.
    Discarded,
    /// Storeable failure; the batch is on disk awaiting rehydration.
    Persisted,
    /// Storeable failure, but the index was at capacity (or the disk write
    /// failed); the batch was dropped to bound local disk growth.
    DroppedAtCapacity,
}

pub struct DeliveryPipeline<T: Transport> {
    transport: Arc<T>,
    store: Arc<PersistedFileStore>,
    index: Arc<FileIndex>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl<T: Transport> DeliveryPipeline<T> {
    pub fn new(
        transport: Arc<T>,
        store: Arc<PersistedFileStore>,
        index: Arc<FileIndex>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        DeliveryPipeline {
            transport,
            store,
            index,
            diagnostics,
        }
    }

    pub async fn send(&self, batch: &Batch) -> SendOutcome {
        let outcome = self
            .transport
            .send(batch.endpoint(), batch.payload())
            .await;
        let verdict = classify_outcome(&outcome);
        let transport_error = outcome.as_ref().err();
        let host = batch.endpoint_host();
        let key = batch.routing_key();

        match &verdict {
            Verdict::Success => {
                self.diagnostics
                    .on_outcome(&verdict, "successfully sent telemetry batch", None);
                self.diagnostics.on_counter(CounterKind::Success, host, key);
                SendOutcome::Delivered
            }
            Verdict::DropNonRetryable { message } => {
                self.diagnostics.on_outcome(&verdict, message, None);
                self.diagnostics.on_counter(CounterKind::Failure, host, key);
                SendOutcome::Discarded
            }
            Verdict::DropRedirectExhausted => {
                self.diagnostics
                    .on_outcome(&verdict, "too many redirects", None);
                self.diagnostics.on_counter(CounterKind::Failure, host, key);
                SendOutcome::Discarded
            }
            Verdict::RetryableStoreToDisk { message } => {
                self.diagnostics
                    .on_outcome(&verdict, message, transport_error);
                let kind = if transport_error.is_some() {
                    CounterKind::Exception
                } else {
                    CounterKind::Retry
                };
                self.diagnostics.on_counter(kind, host, key);
                self.persist(batch, host, key)
            }
            Verdict::CredentialIssue { message } => {
                self.diagnostics.on_outcome(&verdict, message, None);
                self.diagnostics.on_counter(CounterKind::Retry, host, key);
                self.persist(batch, host, key)
            }
            Verdict::QuotaExceeded { message } => {
                self.diagnostics.on_outcome(&verdict, message, None);
                self.diagnostics
                    .on_counter(CounterKind::Throttle, host, key);
                self.persist(batch, host, key)
            }
        }
    }

    /// Route a storeable failure to disk. `FileIndex::add` is the commit
    /// point: a file whose add is rejected is deleted again, so disk and
    /// index cannot diverge. Filesystem errors degrade to a dropped batch,
    /// never a panic.
    fn persist(&self, batch: &Batch, host: &str, key: &str) -> SendOutcome {
        let handle = match self.store.write(batch) {
            Ok(handle) => handle,
            Err(e) => {
                error!("UPLINK | could not persist failed batch, dropping it: {e}");
                self.diagnostics.on_counter(CounterKind::Failure, host, key);
                return SendOutcome::DroppedAtCapacity;
            }
        };
        match self.index.add(handle.clone()) {
            Ok(()) => {
                debug!("UPLINK | batch persisted for retry, index size {}", self.index.len());
                SendOutcome::Persisted
            }
            Err(full) => {
                if let Err(e) = self.store.delete(&handle) {
                    error!("UPLINK | failed to remove over-capacity file: {e}");
                }
                error!("UPLINK | {full}; dropping incoming batch");
                self.diagnostics.on_counter(CounterKind::Failure, host, key);
                SendOutcome::DroppedAtCapacity
            }
        }
    }
}
