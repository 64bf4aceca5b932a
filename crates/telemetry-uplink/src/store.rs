// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! On-disk store for batches that could not be delivered.
//!
//! Each `.trn` file holds exactly one batch: a fixed 36-byte routing-key
//! prefix followed by the gzip form of the payload. The filename encodes the
//! creation time (`{epoch_millis}-{suffix}.trn`); that prefix is load-bearing
//! for both replay ordering and expiry, and [`PersistedFileHandle::parse`] is
//! the only place it is interpreted.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::batch::{Batch, ROUTING_KEY_LEN};
use crate::error::StoreError;

/// Extension given to every persisted batch file.
pub const PERSISTED_FILE_EXT: &str = "trn";

/// Handle to one persisted file: its path plus the creation timestamp
/// derived from the filename prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedFileHandle {
    path: PathBuf,
    timestamp_ms: u64,
}

impl PersistedFileHandle {
    /// Derive a handle from a `.trn` path. Returns `None` when the filename
    /// does not carry a parseable `{epoch_millis}-` prefix; such files are
    /// treated as expired and skipped.
    pub fn parse(path: PathBuf) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        let (millis, _suffix) = stem.split_once('-')?;
        let timestamp_ms = millis.parse::<u64>().ok()?;
        Some(PersistedFileHandle { path, timestamp_ms })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creation time encoded in the filename, in epoch milliseconds.
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

/// Directory of persisted batch files. Exclusively owns the physical files;
/// no other component touches the directory.
///
/// Disk operations are fast local synchronous I/O, matching how small these
/// files are expected to be. All operations are safe under concurrent use:
/// writers never collide (unique filenames) and deletes are idempotent.
pub struct PersistedFileStore {
    dir: PathBuf,
    /// Endpoint that batches read back from this directory are replayed to.
    /// The on-disk format has no URL slot; one store serves one endpoint.
    endpoint: String,
    retention: Duration,
}

impl PersistedFileStore {
    pub fn new(dir: PathBuf, endpoint: String, retention: Duration) -> Result<Self, StoreError> {
        fs::create_dir_all(&dir)?;
        Ok(PersistedFileStore {
            dir,
            endpoint,
            retention,
        })
    }

    /// Persist a failed batch. The content is written to a `.tmp` sibling
    /// and renamed into place so a crash mid-write never leaves a file that
    /// parses as a valid `.trn`.
    pub fn write(&self, batch: &Batch) -> Result<PersistedFileHandle, StoreError> {
        let timestamp_ms = now_millis();
        let name = format!(
            "{timestamp_ms}-{}.{PERSISTED_FILE_EXT}",
            uuid::Uuid::new_v4().simple()
        );
        let path = self.dir.join(&name);
        let tmp_path = self.dir.join(format!("{name}.tmp"));

        let mut content = Vec::with_capacity(ROUTING_KEY_LEN + batch.payload().len() / 2);
        content.extend_from_slice(batch.routing_key().as_bytes());
        let mut encoder = GzEncoder::new(content, Compression::default());
        encoder.write_all(batch.payload())?;
        let content = encoder.finish()?;

        fs::write(&tmp_path, &content)?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!("STORE | persisted failed batch to {}", path.display());
        Ok(PersistedFileHandle { path, timestamp_ms })
    }

    /// Read a persisted file back into a batch bound to this store's
    /// endpoint. Corrupt files surface as [`StoreError::Corrupt`].
    pub fn read(&self, handle: &PersistedFileHandle) -> Result<Batch, StoreError> {
        let content = fs::read(&handle.path)?;
        if content.len() < ROUTING_KEY_LEN {
            return Err(StoreError::Corrupt {
                path: handle.path.clone(),
                reason: format!(
                    "file shorter than the {ROUTING_KEY_LEN}-byte routing key prefix"
                ),
            });
        }
        let (key_bytes, compressed) = content.split_at(ROUTING_KEY_LEN);
        let routing_key =
            std::str::from_utf8(key_bytes).map_err(|_| StoreError::Corrupt {
                path: handle.path.clone(),
                reason: "routing key prefix is not valid UTF-8".to_string(),
            })?;

        let mut payload = Vec::new();
        GzDecoder::new(compressed)
            .read_to_end(&mut payload)
            .map_err(|e| StoreError::Corrupt {
                path: handle.path.clone(),
                reason: format!("gzip decompression failed: {e}"),
            })?;

        Batch::new(payload, routing_key.to_string(), self.endpoint.clone()).map_err(|e| {
            StoreError::Corrupt {
                path: handle.path.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Remove a persisted file. Idempotent: deleting a missing file is fine.
    pub fn delete(&self, handle: &PersistedFileHandle) -> Result<(), StoreError> {
        match fs::remove_file(&handle.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Scan the directory once and return handles for every live `.trn`
    /// file, oldest first, excluding anything older than the retention
    /// window. Files whose names fail to parse are treated as expired.
    pub fn list_existing(&self) -> Result<Vec<PersistedFileHandle>, StoreError> {
        let cutoff_ms = now_millis().saturating_sub(self.retention.as_millis() as u64);
        let mut handles = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PERSISTED_FILE_EXT) {
                continue;
            }
            let Some(handle) = PersistedFileHandle::parse(path.clone()) else {
                debug!("STORE | unexpected .trn file name: {}", path.display());
                continue;
            };
            if handle.timestamp_ms < cutoff_ms {
                debug!("STORE | skipping expired file {}", path.display());
                continue;
            }
            handles.push(handle);
        }
        // Oldest first: replaying the oldest surviving batch bounds staleness.
        handles.sort_by_key(|h| h.timestamp_ms);
        Ok(handles)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
