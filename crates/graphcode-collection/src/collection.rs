// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named media collections and similarity queries.
//!
//! # Ranking
//!
//! A query scores every member against the query graph code, filters through
//! a [`QueryPolicy`], then sorts once, descending by
//! [`Similarity::rank_key`]. The sort is stable: equal keys keep insertion
//! order, so repeated queries over unchanged members return the same order.
//!
//! # Failure Policy
//!
//! A member whose graph code cannot be generated does not fail the query. It
//! is logged at `warn` and reported in [`QueryResults::skipped`]. Members
//! replaced or removed while the query runs are dropped from its results.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use graphcode::{compare, GraphCode, Similarity};
use tracing::{debug, warn};

use crate::cache::GraphCodeCache;
use crate::error::{CacheError, CollectionError, RecordKey};
use crate::record::{MediaRecord, RecordId};

/// Ranking mode. All modes share comparison and ordering; they differ only
/// in the [`QueryPolicy`] filtering applied on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryKind {
    /// Plain similarity ranking over every member.
    #[default]
    Similarity,
    /// Recommendation ranking.
    Recommended,
}

/// A member together with the transient score of the last query.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    /// The member.
    pub record: Arc<MediaRecord>,
    /// Its similarity to the query.
    pub similarity: Similarity,
}

/// A member left out of a ranking because its graph code failed.
#[derive(Debug, Clone)]
pub struct SkippedRecord {
    /// The member.
    pub record: Arc<MediaRecord>,
    /// Why generation failed.
    pub error: CacheError,
}

/// Outcome of a query.
#[derive(Debug, Clone, Default)]
pub struct QueryResults {
    /// Admitted members, best first.
    pub ranked: Vec<ScoredRecord>,
    /// Members whose graph code could not be generated.
    pub skipped: Vec<SkippedRecord>,
}

impl QueryResults {
    /// Ranked records without scores.
    pub fn records(&self) -> Vec<Arc<MediaRecord>> {
        self.ranked.iter().map(|s| Arc::clone(&s.record)).collect()
    }

    /// Number of ranked records.
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    /// Returns `true` when nothing was ranked.
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Filtering layered on top of the shared ranking.
pub trait QueryPolicy {
    /// Whether `candidate` appears in the results of a `kind` query.
    fn admit(&self, kind: QueryKind, candidate: &ScoredRecord) -> bool;
}

/// `Similarity` admits everything; `Recommended` drops members sharing
/// nothing with the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl QueryPolicy for DefaultPolicy {
    fn admit(&self, kind: QueryKind, candidate: &ScoredRecord) -> bool {
        match kind {
            QueryKind::Similarity => true,
            QueryKind::Recommended => !candidate.similarity.is_zero(),
        }
    }
}

/// Ordered set of media records plus their graph code cache.
pub struct Collection {
    name: String,
    members: RwLock<Vec<Arc<MediaRecord>>>,
    cache: GraphCodeCache,
    workers: usize,
    parallel_threshold: usize,
}

impl Collection {
    /// Create an empty collection scoring on the calling thread.
    pub fn new(name: impl Into<String>, cache: GraphCodeCache) -> Self {
        Self {
            name: name.into(),
            members: RwLock::new(Vec::new()),
            cache,
            workers: 1,
            parallel_threshold: usize::MAX,
        }
    }

    /// Builder: score with up to `workers` threads once the membership
    /// reaches `threshold` (at least one member).
    pub fn with_parallelism(mut self, workers: usize, threshold: usize) -> Self {
        self.workers = workers.max(1);
        self.parallel_threshold = threshold.max(1);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<MediaRecord>>> {
        self.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<MediaRecord>>> {
        self.members.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The collection's graph code cache.
    pub fn cache(&self) -> &GraphCodeCache {
        &self.cache
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` when the collection has no members.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of the members in insertion order.
    pub fn members(&self) -> Vec<Arc<MediaRecord>> {
        self.read().clone()
    }

    /// Append a record. Its graph code is generated lazily.
    pub fn add(&self, record: impl Into<Arc<MediaRecord>>) -> Arc<MediaRecord> {
        let record = record.into();
        debug!(
            collection = %self.name,
            record = %record.id(),
            file = %record.file().display(),
            "member added"
        );
        let mut members = self.write();
        self.cache.revive(record.id());
        members.push(Arc::clone(&record));
        record
    }

    /// Member whose file reference equals `file`.
    pub fn find_by_file(&self, file: &Path) -> Result<Arc<MediaRecord>, CollectionError> {
        self.read()
            .iter()
            .find(|r| r.file() == file)
            .cloned()
            .ok_or_else(|| CollectionError::RecordNotFound(RecordKey::File(file.to_path_buf())))
    }

    /// Member with identity `id`.
    pub fn find_by_id(&self, id: RecordId) -> Result<Arc<MediaRecord>, CollectionError> {
        self.read()
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or(CollectionError::RecordNotFound(RecordKey::Id(id)))
    }

    /// Swap the member for `file` with `record`, keeping its position, and
    /// drop the old member's cached graph code. Returns the old member.
    pub fn replace(
        &self,
        record: impl Into<Arc<MediaRecord>>,
        file: &Path,
    ) -> Result<Arc<MediaRecord>, CollectionError> {
        let record = record.into();
        let old = {
            let mut members = self.write();
            let slot = members
                .iter_mut()
                .find(|r| r.file() == file)
                .ok_or_else(|| {
                    CollectionError::RecordNotFound(RecordKey::File(file.to_path_buf()))
                })?;
            let old = std::mem::replace(slot, Arc::clone(&record));
            // Retire under the write lock so no query snapshot can pair the
            // new member with the old graph code or re-cache the old one.
            if old.id() == record.id() {
                self.cache.invalidate(old.id());
            } else {
                self.cache.retire(old.id());
                self.cache.revive(record.id());
            }
            old
        };
        debug!(collection = %self.name, old = %old.id(), new = %record.id(), "member replaced");
        Ok(old)
    }

    /// Remove the member `id` and its cached graph code.
    pub fn remove(&self, id: RecordId) -> Result<Arc<MediaRecord>, CollectionError> {
        let mut members = self.write();
        let pos = members
            .iter()
            .position(|r| r.id() == id)
            .ok_or(CollectionError::RecordNotFound(RecordKey::Id(id)))?;
        let old = members.remove(pos);
        self.cache.retire(id);
        Ok(old)
    }

    /// Graph code for `record`, generated on first access.
    pub fn graph_code(&self, record: &MediaRecord) -> Result<Arc<GraphCode>, CacheError> {
        self.cache.get_or_generate(record)
    }

    /// Graph codes of every member, in member order.
    pub fn graph_codes(&self) -> Result<Vec<Arc<GraphCode>>, CacheError> {
        self.members()
            .iter()
            .map(|r| self.cache.get_or_generate(r))
            .collect()
    }

    /// Rank every member against `query` using [`DefaultPolicy`].
    pub fn query(&self, query: &GraphCode, kind: QueryKind) -> QueryResults {
        self.query_with(query, kind, &DefaultPolicy)
    }

    /// Rank every member against `query`, filtering through `policy`.
    pub fn query_with(
        &self,
        query: &GraphCode,
        kind: QueryKind,
        policy: &dyn QueryPolicy,
    ) -> QueryResults {
        let members = self.members();
        let scored = self.score_all(query, &members);

        let mut results = QueryResults::default();
        for outcome in scored {
            match outcome {
                Ok(candidate) => {
                    if policy.admit(kind, &candidate) {
                        results.ranked.push(candidate);
                    }
                }
                Err(SkippedRecord {
                    record,
                    error: CacheError::Retired(_),
                }) => {
                    debug!(
                        collection = %self.name,
                        record = %record.id(),
                        "member left during query"
                    );
                }
                Err(skipped) => {
                    warn!(
                        collection = %self.name,
                        record = %skipped.record.id(),
                        error = %skipped.error,
                        "skipping member without graph code"
                    );
                    results.skipped.push(skipped);
                }
            }
        }
        results
            .ranked
            .sort_by(|a, b| b.similarity.rank_key().total_cmp(&a.similarity.rank_key()));
        debug!(
            collection = %self.name,
            ?kind,
            ranked = results.ranked.len(),
            skipped = results.skipped.len(),
            "query complete"
        );
        results
    }

    fn score(
        &self,
        query: &GraphCode,
        record: &Arc<MediaRecord>,
    ) -> Result<ScoredRecord, SkippedRecord> {
        match self.cache.get_or_generate(record) {
            Ok(gc) => Ok(ScoredRecord {
                record: Arc::clone(record),
                similarity: compare(query, &gc),
            }),
            Err(error) => Err(SkippedRecord {
                record: Arc::clone(record),
                error,
            }),
        }
    }

    /// Scores in member order. Large memberships are split into contiguous
    /// chunks, one per scoped worker; chunks are rejoined in order.
    fn score_all(
        &self,
        query: &GraphCode,
        members: &[Arc<MediaRecord>],
    ) -> Vec<Result<ScoredRecord, SkippedRecord>> {
        if self.workers <= 1 || members.is_empty() || members.len() < self.parallel_threshold {
            return members.iter().map(|r| self.score(query, r)).collect();
        }
        let chunk = members.len().div_ceil(self.workers).max(1);
        std::thread::scope(|s| {
            let handles: Vec<_> = members
                .chunks(chunk)
                .map(|part| {
                    s.spawn(move || part.iter().map(|r| self.score(query, r)).collect::<Vec<_>>())
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(part) => part,
                    Err(e) => std::panic::resume_unwind(e),
                })
                .collect()
        })
    }
}
