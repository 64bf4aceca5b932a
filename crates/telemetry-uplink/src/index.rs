// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory FIFO index of the filenames currently believed to be on disk.
//!
//! The index is a cache over [`crate::PersistedFileStore`], not a second
//! source of truth: on process restart it is rebuilt from a directory scan,
//! so the two stay consistent by construction. Producers add on delivery
//! failure; the rehydration consumer takes the oldest entry. A coarse mutex
//! around a `VecDeque` covers the required "concurrent add, single-winner
//! take" contract.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::IndexFull;
use crate::store::PersistedFileHandle;

pub struct FileIndex {
    entries: Mutex<VecDeque<PersistedFileHandle>>,
    capacity: usize,
}

#[allow(clippy::expect_used)]
impl FileIndex {
    /// Build the index from the store's startup scan. Entries beyond
    /// `capacity` are kept: the bound applies to new arrivals only.
    pub fn new(existing: Vec<PersistedFileHandle>, capacity: usize) -> Self {
        FileIndex {
            entries: Mutex::new(existing.into()),
            capacity,
        }
    }

    /// Append a handle, preserving arrival order. The capacity check and the
    /// push happen under one lock acquisition, so concurrent adds cannot
    /// overshoot the bound.
    pub fn add(&self, handle: PersistedFileHandle) -> Result<(), IndexFull> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        if entries.len() >= self.capacity {
            return Err(IndexFull {
                capacity: self.capacity,
            });
        }
        entries.push_back(handle);
        Ok(())
    }

    /// Remove and return the oldest entry, or `None` without blocking.
    pub fn take_oldest(&self) -> Option<PersistedFileHandle> {
        self.entries.lock().expect("lock poisoned").pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
