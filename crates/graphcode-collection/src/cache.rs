// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-record graph code cache with single-flight generation and persistence.
//!
//! The slot map holds either a published graph code or an in-flight
//! generation. The first caller for a record installs the in-flight slot and
//! runs extraction with no lock held; later callers for the same record block
//! on that slot and receive the leader's outcome, success or failure. A
//! failed generation leaves no slot behind, so the next call retries.
//!
//! A record that leaves its collection is retired: its slot becomes a
//! tombstone that is never replaced by a published graph code, so a query
//! still holding the departed record cannot resurrect it in the cache.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use graphcode::{GraphCode, GraphCodeError};
use graphcode_store::{artifact_hash, ArtifactHash, ArtifactStore, StoreError};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::error::CacheError;
use crate::extract::FeatureExtractor;
use crate::record::{MediaRecord, RecordId};

type Outcome = Result<Arc<GraphCode>, CacheError>;

#[derive(Default)]
struct InFlight {
    outcome: Mutex<Option<Outcome>>,
    done: Condvar,
}

impl InFlight {
    fn finish(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        self.done.notify_all();
    }

    fn wait(&self) -> Outcome {
        let mut guard = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            guard = self.done.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

enum Slot {
    Ready(Arc<GraphCode>),
    Pending(Arc<InFlight>),
    Retired,
}

/// Memoizes one graph code per media record and persists each generated
/// graph code as `<file name><suffix>` through an [`ArtifactStore`].
pub struct GraphCodeCache {
    extractor: Arc<dyn FeatureExtractor>,
    store: Arc<dyn ArtifactStore>,
    suffix: String,
    slots: Mutex<FxHashMap<RecordId, Slot>>,
}

/// Releases an in-flight slot if the leader unwinds before publishing.
struct LeaderGuard<'a> {
    cache: &'a GraphCodeCache,
    id: RecordId,
    flight: Arc<InFlight>,
    armed: bool,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(record = %self.id, "graph code generation abandoned");
            self.cache.settle(self.id, &self.flight, Err(CacheError::Abandoned(self.id)));
        }
    }
}

impl GraphCodeCache {
    /// Create a cache writing artifacts named `<file name><suffix>`.
    pub fn new(
        extractor: Arc<dyn FeatureExtractor>,
        store: Arc<dyn ArtifactStore>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            store,
            suffix: suffix.into(),
            slots: Mutex::new(FxHashMap::default()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, FxHashMap<RecordId, Slot>> {
        // Every critical section leaves the map consistent.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Artifact name for `record`: its file name (or display name when the
    /// file reference has none) followed by the configured suffix.
    pub fn artifact_name(&self, record: &MediaRecord) -> String {
        let base = record
            .file()
            .file_name()
            .map_or_else(|| record.name().to_owned(), |n| n.to_string_lossy().into_owned());
        format!("{base}{}", self.suffix)
    }

    /// Return the cached graph code for `record`, generating and persisting
    /// it first if needed. Repeated calls return the same `Arc`.
    pub fn get_or_generate(&self, record: &MediaRecord) -> Result<Arc<GraphCode>, CacheError> {
        let id = record.id();
        let flight = {
            let mut slots = self.slots();
            match slots.get(&id) {
                Some(Slot::Ready(gc)) => {
                    debug!(record = %id, "graph code cache hit");
                    return Ok(Arc::clone(gc));
                }
                Some(Slot::Pending(flight)) => {
                    let flight = Arc::clone(flight);
                    drop(slots);
                    debug!(record = %id, "waiting on in-flight generation");
                    return flight.wait();
                }
                Some(Slot::Retired) => return Err(CacheError::Retired(id)),
                None => {
                    let flight = Arc::new(InFlight::default());
                    slots.insert(id, Slot::Pending(Arc::clone(&flight)));
                    flight
                }
            }
        };

        let mut guard = LeaderGuard {
            cache: self,
            id,
            flight,
            armed: true,
        };
        let outcome = self.generate(record);
        guard.armed = false;
        self.settle(id, &guard.flight, outcome.clone());
        outcome
    }

    /// Publish (or drop) the leader's outcome and wake waiters. A slot that
    /// was invalidated or retired meanwhile is left alone.
    fn settle(&self, id: RecordId, flight: &Arc<InFlight>, outcome: Outcome) {
        {
            let mut slots = self.slots();
            let current =
                matches!(slots.get(&id), Some(Slot::Pending(f)) if Arc::ptr_eq(f, flight));
            if current {
                match &outcome {
                    Ok(gc) => {
                        slots.insert(id, Slot::Ready(Arc::clone(gc)));
                    }
                    Err(_) => {
                        slots.remove(&id);
                    }
                }
            }
        }
        flight.finish(outcome);
    }

    fn generate(&self, record: &MediaRecord) -> Outcome {
        let id = record.id();
        let name = self.artifact_name(record);
        debug!(record = %id, artifact = %name, "generating graph code");

        let encode = |err: GraphCodeError| CacheError::Encode {
            record: id,
            source: Arc::new(err),
        };
        let persist = |err: StoreError| CacheError::Persist {
            name: name.clone(),
            source: Arc::new(err),
        };

        let gc = self.extractor.extract(record)?;
        let hash = ArtifactHash(gc.content_hash().map_err(encode)?);
        let existing = self.store.get(&name).map_err(persist)?;
        if existing.is_some_and(|bytes| artifact_hash(&bytes) == hash) {
            debug!(record = %id, artifact = %name, %hash, "artifact unchanged, not rewritten");
            return Ok(Arc::new(gc));
        }
        let bytes = gc.to_canonical_bytes().map_err(encode)?;
        let receipt = self.store.put(&name, &bytes).map_err(persist)?;
        info!(
            record = %id,
            artifact = %receipt.name,
            hash = %receipt.hash,
            bytes = receipt.len,
            terms = gc.len(),
            edges = gc.edge_count(),
            "persisted graph code"
        );
        Ok(Arc::new(gc))
    }

    /// Cached graph code for `id`, without generating.
    pub fn get(&self, id: RecordId) -> Option<Arc<GraphCode>> {
        let slots = self.slots();
        match slots.get(&id) {
            Some(Slot::Ready(gc)) => Some(Arc::clone(gc)),
            _ => None,
        }
    }

    /// Drop the cached (or in-flight) graph code for `id`. Persisted
    /// artifacts are left in place and retired records stay retired.
    /// Returns `true` if anything was dropped.
    pub fn invalidate(&self, id: RecordId) -> bool {
        let mut slots = self.slots();
        if matches!(slots.get(&id), None | Some(Slot::Retired)) {
            return false;
        }
        slots.remove(&id);
        drop(slots);
        debug!(record = %id, "graph code invalidated");
        true
    }

    /// Drop the graph code for `id` and refuse to generate or publish one
    /// until [`revive`](Self::revive). An in-flight generation still answers
    /// its waiters but is not published.
    pub fn retire(&self, id: RecordId) {
        self.slots().insert(id, Slot::Retired);
        debug!(record = %id, "record retired");
    }

    /// Lift a retirement so `id` can be generated again.
    pub fn revive(&self, id: RecordId) {
        let mut slots = self.slots();
        if matches!(slots.get(&id), Some(Slot::Retired)) {
            slots.remove(&id);
        }
    }

    /// Returns `true` if `id` is retired.
    pub fn is_retired(&self, id: RecordId) -> bool {
        let slots = self.slots();
        matches!(slots.get(&id), Some(Slot::Retired))
    }

    /// Drop every cached graph code. Retirements are kept.
    pub fn clear(&self) {
        self.slots().retain(|_, slot| matches!(slot, Slot::Retired));
    }

    /// Number of published graph codes.
    pub fn len(&self) -> usize {
        self.slots()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    /// Returns `true` if no graph code is published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
