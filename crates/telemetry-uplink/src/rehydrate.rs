// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Replay of persisted batches back into the live delivery path.
//!
//! One scheduler task wakes on a fixed interval and replays the oldest
//! surviving file. The file is deleted from disk before the resend, so a
//! crash mid-resend loses at most the one in-flight batch instead of
//! duplicating it on every restart. A renewed storeable failure goes back
//! through the normal pipeline path and lands on disk as a new file with a
//! new timestamp, which re-ages retried batches and keeps FIFO meaningful.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::index::FileIndex;
use crate::pipeline::{DeliveryPipeline, SendOutcome};
use crate::store::PersistedFileStore;
use crate::transport::Transport;

pub struct RehydrationScheduler<T: Transport> {
    pipeline: Arc<DeliveryPipeline<T>>,
    store: Arc<PersistedFileStore>,
    index: Arc<FileIndex>,
    interval: Duration,
    cancel: CancellationToken,
}

impl<T: Transport> RehydrationScheduler<T> {
    pub fn new(
        pipeline: Arc<DeliveryPipeline<T>>,
        store: Arc<PersistedFileStore>,
        index: Arc<FileIndex>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        RehydrationScheduler {
            pipeline,
            store,
            index,
            interval,
            cancel,
        }
    }

    /// Drive the replay loop until cancelled. An in-progress cycle always
    /// finishes before the loop exits.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    debug!("UPLINK | rehydration scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.replay_oldest().await;
                }
            }
        }
    }

    /// One cycle: take the oldest indexed file, read it, delete it, resend
    /// it. Returns `None` when the index is empty or the file was corrupt
    /// (corrupt files are logged and dropped, never resent).
    pub async fn replay_oldest(&self) -> Option<SendOutcome> {
        let handle = self.index.take_oldest()?;

        let batch = match self.store.read(&handle) {
            Ok(batch) => batch,
            Err(e) => {
                error!("UPLINK | skipping unreadable persisted file: {e}");
                if let Err(e) = self.store.delete(&handle) {
                    error!("UPLINK | failed to remove unreadable file: {e}");
                }
                return None;
            }
        };

        // Delete before resend; the batch lives on only in memory from here.
        if let Err(e) = self.store.delete(&handle) {
            error!("UPLINK | failed to delete persisted file before resend: {e}");
        }

        debug!(
            "UPLINK | rehydrating batch persisted at {} ms",
            handle.timestamp_ms()
        );
        Some(self.pipeline.send(&batch).await)
    }
}
