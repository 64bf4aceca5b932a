// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reporting seam for classified delivery outcomes.
//!
//! The pipeline reports every terminal outcome here instead of raising
//! errors to its callers. An external stats component consumes the counter
//! callbacks; the built-in [`TracingDiagnostics`] just logs.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, warn};

use crate::classify::Verdict;
use crate::error::TransportError;

/// Tally kinds emitted per delivery attempt, keyed by destination host and
/// routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Success,
    Failure,
    Retry,
    Throttle,
    Exception,
}

pub trait DiagnosticsSink: Send + Sync {
    /// One classified outcome with its human-readable message and, for
    /// transport-level failures, the underlying error.
    fn on_outcome(&self, verdict: &Verdict, message: &str, error: Option<&TransportError>);

    /// Counter update for an external stats aggregator.
    fn on_counter(&self, kind: CounterKind, host: &str, routing_key: &str);
}

/// Default sink: structured logs via `tracing`.
///
/// Connection failures get a one-time friendlier hint. The once-flag is
/// instance state with a defined lifecycle (constructed with the sink,
/// reset only through [`TracingDiagnostics::reset_friendly_hint`]), not a
/// process-wide static.
#[derive(Debug, Default)]
pub struct TracingDiagnostics {
    friendly_hint_logged: AtomicBool,
}

impl TracingDiagnostics {
    pub fn new() -> Self {
        TracingDiagnostics::default()
    }

    /// Test hook: allow the one-time connection hint to fire again.
    pub fn reset_friendly_hint(&self) {
        self.friendly_hint_logged.store(false, Ordering::SeqCst);
    }
}

impl DiagnosticsSink for TracingDiagnostics {
    fn on_outcome(&self, verdict: &Verdict, message: &str, error: Option<&TransportError>) {
        if let Some(TransportError::Connect(_)) = error {
            if !self.friendly_hint_logged.swap(true, Ordering::SeqCst) {
                warn!(
                    "UPLINK | unable to reach the ingestion endpoint; check network \
                     connectivity, firewall rules and TLS interception (this hint is \
                     logged once)"
                );
            }
        }
        match verdict {
            Verdict::Success => debug!("UPLINK | {message}"),
            Verdict::CredentialIssue { .. }
            | Verdict::RetryableStoreToDisk { .. }
            | Verdict::QuotaExceeded { .. } => warn!("UPLINK | {message}"),
            Verdict::DropNonRetryable { .. } | Verdict::DropRedirectExhausted => {
                error!("UPLINK | {message}");
            }
        }
    }

    fn on_counter(&self, kind: CounterKind, host: &str, routing_key: &str) {
        debug!("UPLINK | counter {kind:?} host={host} routing_key={routing_key}");
    }
}
