// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MAX_PERSISTED_FILES: usize = 1000;
const DEFAULT_RETENTION_SECS: u64 = 48 * 60 * 60;
const DEFAULT_REHYDRATION_INTERVAL_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration surface consumed by the delivery layer.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory that holds persisted `.trn` files.
    pub storage_dir: PathBuf,
    /// Maximum number of files the index accepts; new arrivals beyond this
    /// are dropped with a capacity-exceeded diagnostic.
    pub max_persisted_files: usize,
    /// Maximum age a persisted file may reach before being discarded unread.
    pub retention: Duration,
    /// How often the rehydration scheduler wakes to replay one file.
    pub rehydration_interval: Duration,
    /// Per-request network timeout.
    pub request_timeout: Duration,
    pub https_proxy: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_dir: env::temp_dir().join("telemetry-uplink"),
            max_persisted_files: DEFAULT_MAX_PERSISTED_FILES,
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            rehydration_interval: Duration::from_secs(DEFAULT_REHYDRATION_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            https_proxy: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            storage_dir: env::var("UPLINK_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            max_persisted_files: env::var("UPLINK_MAX_PERSISTED_FILES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_PERSISTED_FILES),
            retention: env::var("UPLINK_RETENTION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.retention),
            rehydration_interval: env::var("UPLINK_REHYDRATION_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.rehydration_interval),
            request_timeout: env::var("UPLINK_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            https_proxy: env::var("UPLINK_PROXY_HTTPS")
                .or_else(|_| env::var("HTTPS_PROXY"))
                .ok(),
        }
    }
}
