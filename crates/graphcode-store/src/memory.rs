// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory artifact store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{artifact_hash, check_name, ArtifactReceipt, ArtifactStore, StoreError};

/// In-memory artifact store.
///
/// Keeps artifacts in a name-ordered map and counts writes so callers can
/// assert how often persistence happened.
#[derive(Default)]
pub struct MemoryTier {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    artifacts: BTreeMap<String, Arc<[u8]>>,
    writes: usize,
}

impl MemoryTier {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Inner holds no invariants a panicking writer could break.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of artifacts currently stored.
    pub fn len(&self) -> usize {
        self.lock().artifacts.len()
    }

    /// Returns `true` if no artifacts are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().artifacts.is_empty()
    }

    /// Total number of `put` calls that stored bytes (overwrites included).
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Stored names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.lock().artifacts.keys().cloned().collect()
    }
}

impl ArtifactStore for MemoryTier {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<ArtifactReceipt, StoreError> {
        check_name(name)?;
        let hash = artifact_hash(bytes);
        let mut inner = self.lock();
        inner.artifacts.insert(name.to_owned(), Arc::from(bytes));
        inner.writes += 1;
        Ok(ArtifactReceipt {
            name: name.to_owned(),
            hash,
            len: bytes.len(),
        })
    }

    fn get(&self, name: &str) -> Result<Option<Arc<[u8]>>, StoreError> {
        check_name(name)?;
        Ok(self.lock().artifacts.get(name).cloned())
    }

    fn has(&self, name: &str) -> Result<bool, StoreError> {
        check_name(name)?;
        Ok(self.lock().artifacts.contains_key(name))
    }
}
