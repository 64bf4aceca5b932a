// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Transport seam between the delivery pipeline and the network.
//!
//! The pipeline only consumes the [`Transport`] contract; it never builds
//! HTTP clients, TLS, or auth headers itself. [`ReqwestTransport`] is the
//! production implementation.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::TransportError;

/// How many 307/308 hops the transport follows before handing the redirect
/// status back to the classifier.
const MAX_REDIRECTS: usize = 10;

/// Outcome of a network send: the final status code and response body.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Network collaborator consumed by the pipeline.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, payload: &[u8]) -> Result<TransportResponse, TransportError>;
}

/// Production transport: reqwest with a gzip request body and manual
/// redirect following, so an exhausted redirect chain surfaces as the final
/// 307/308 response rather than a client error.
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(config: &Config) -> Self {
        let client = build_client(config.https_proxy.as_deref()).unwrap_or_else(|e| {
            error!("UPLINK | unable to apply proxy configuration: {e}, no proxy will be used");
            reqwest::Client::new()
        });
        ReqwestTransport {
            client,
            timeout: config.request_timeout,
        }
    }
}

fn build_client(proxy: Option<&str>) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
    if let Some(proxy_url) = proxy {
        builder = builder.proxy(reqwest::Proxy::https(proxy_url)?);
    }
    builder.build()
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, url: &str, payload: &[u8]) -> Result<TransportResponse, TransportError> {
        let body = gzip(payload).map_err(|e| TransportError::Other(e.to_string()))?;

        let mut url = url.to_string();
        let mut hops = 0;
        loop {
            let response = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .header("Content-Type", "application/json")
                .header("Content-Encoding", "gzip")
                .body(body.clone())
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status().as_u16();
            if (status == 307 || status == 308) && hops < MAX_REDIRECTS {
                if let Some(location) = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                {
                    debug!("UPLINK | following redirect {status} to {location}");
                    url = location.to_string();
                    hops += 1;
                    continue;
                }
            }

            let body = response.text().await.unwrap_or_default();
            return Ok(TransportResponse { status, body });
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

fn gzip(payload: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload)?;
    encoder.finish()
}
