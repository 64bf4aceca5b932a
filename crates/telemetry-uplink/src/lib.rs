// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Durable delivery layer for a telemetry-export pipeline.
//!
//! Batches of already-serialized telemetry are shipped to a remote ingestion
//! endpoint. Failures that are worth retrying are spilled to local disk in
//! their exact wire form and replayed later, oldest first, until the sink
//! accepts them or they age out of the retention window.
//!
//! # Architecture
//!
//! ```text
//!   producer ──> DeliveryPipeline::send ──> Transport (HTTP POST)
//!                       │                          │
//!                       v                          v
//!                 classify verdict <──── status code / transport error
//!                       │
//!          ┌────────────┼──────────────┐
//!          v            v              v
//!      Delivered    Discarded    PersistedFileStore::write
//!                                      │
//!                                      v
//!                                 FileIndex::add
//!
//!   RehydrationScheduler ──> FileIndex::take_oldest ──> read + delete
//!                                      │
//!                                      v
//!                            DeliveryPipeline::send (replay)
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batch;
pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod rehydrate;
pub mod store;
pub mod transport;

pub use batch::Batch;
pub use classify::{classify_outcome, Verdict};
pub use config::Config;
pub use diagnostics::{CounterKind, DiagnosticsSink, TracingDiagnostics};
pub use error::{BatchError, StoreError, TransportError};
pub use index::FileIndex;
pub use pipeline::{DeliveryPipeline, SendOutcome};
pub use rehydrate::RehydrationScheduler;
pub use store::{PersistedFileHandle, PersistedFileStore};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
