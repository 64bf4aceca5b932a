// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Classification of delivery outcomes.
//!
//! This is the single authoritative retry policy: every status-handling
//! decision in the pipeline routes through [`classify_outcome`], nothing
//! else inspects status codes. The classifier is a pure function with no
//! side effects.

use crate::error::TransportError;
use crate::transport::TransportResponse;

/// Verdict for one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// 200: the ingestion endpoint accepted the batch.
    Success,
    /// 206/400 or any unlisted status: the payload itself is at fault and
    /// retrying cannot help. The batch is dropped.
    DropNonRetryable { message: String },
    /// 307/308 seen after the transport's redirect limit. Dropped.
    DropRedirectExhausted,
    /// 401/403: credentials missing or invalid. Storeable, since credentials
    /// may become valid again.
    CredentialIssue { message: String },
    /// 408/429/500/503 or a transport-level failure. Storeable.
    RetryableStoreToDisk { message: String },
    /// 402/439: ingestion-side quota throttling. Storeable.
    QuotaExceeded { message: String },
}

impl Verdict {
    /// Whether this outcome is worth persisting to disk and retrying later.
    pub fn is_storeable(&self) -> bool {
        matches!(
            self,
            Verdict::CredentialIssue { .. }
                | Verdict::RetryableStoreToDisk { .. }
                | Verdict::QuotaExceeded { .. }
        )
    }
}

/// Map a transport outcome to a verdict.
pub fn classify_outcome(outcome: &Result<TransportResponse, TransportError>) -> Verdict {
    match outcome {
        Ok(response) => classify_response(response),
        Err(e) => Verdict::RetryableStoreToDisk {
            message: format!("{e} (telemetry will be stored to disk and retried later)"),
        },
    }
}

fn classify_response(response: &TransportResponse) -> Verdict {
    let status = response.status;
    match status {
        200 => Verdict::Success,
        // Partial acceptance, or the ingestion service rejected the payload
        // as malformed. The body carries the first reported error.
        206 | 400 => Verdict::DropNonRetryable {
            message: ingestion_error_message(&response.body, status),
        },
        307 | 308 => Verdict::DropRedirectExhausted,
        401 | 403 => Verdict::CredentialIssue {
            message: credential_message(status, &response.body),
        },
        408 | 429 | 500 | 503 => Verdict::RetryableStoreToDisk {
            message: format!(
                "received response code {status} (telemetry will be stored to disk and retried later)"
            ),
        },
        402 | 439 => Verdict::QuotaExceeded {
            message: format!(
                "received response code {status} (daily quota exceeded and throttled over extended time)"
            ),
        },
        _ => Verdict::DropNonRetryable {
            message: format!("received unexpected response code: {status}"),
        },
    }
}

/// First reported error from the response body, plus a count of the rest.
/// Falls back to a generic message when the body is not parseable.
fn ingestion_error_message(body: &str, status: u16) -> String {
    match first_body_error(body) {
        Some((first, more)) if more > 0 => format!("{first} (and {more} more)"),
        Some((first, _)) => first,
        None => format!("received response code: {status}"),
    }
}

fn credential_message(status: u16, body: &str) -> String {
    let action = if status == 401 {
        "authentication credentials are missing"
    } else {
        "authentication credentials may be incorrect or expired"
    };
    let suffix = "(telemetry will be stored to disk and retried later)";
    match first_body_error(body) {
        Some((first, _)) => format!("{first}: {action} {suffix}"),
        None => format!("received response code {status}: {action} {suffix}"),
    }
}

/// Returns the first `errors[i].message` from an ingestion response body and
/// how many further errors were reported.
fn first_body_error(body: &str) -> Option<(String, usize)> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let errors = value.get("errors")?.as_array()?;
    let first = errors.first()?.get("message")?.as_str()?.to_string();
    Some((first, errors.len().saturating_sub(1)))
}
