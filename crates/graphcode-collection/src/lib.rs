// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph code collections: media records, cached graph codes and ranking.
//!
//! Data flow: a [`MediaRecord`] joins a [`Collection`]; on first access the
//! collection's [`GraphCodeCache`] asks the [`FeatureExtractor`] for the
//! record's graph code, persists it through an artifact store and memoizes
//! it. A query compares the query graph code with every member's graph code
//! via [`graphcode::compare`] and returns members best first.
//!
//! Collections are handed out by a [`CollectionRegistry`] owned by the
//! embedding application: one default collection plus one per session key.
#![forbid(unsafe_code)]

mod cache;
mod collection;
mod error;
mod extract;
mod record;
mod registry;

pub use cache::GraphCodeCache;
pub use collection::{
    Collection, DefaultPolicy, QueryKind, QueryPolicy, QueryResults, ScoredRecord, SkippedRecord,
};
pub use error::{CacheError, CollectionError, RecordKey};
pub use extract::{
    ExtractionError, FeatureExtractor, FeatureGraphExtractor, CHILD_EDGE, RELATION_EDGE,
    SYNONYM_EDGE,
};
pub use record::{FeatureGraph, FeatureNode, FeatureRelation, MediaRecord, RecordId};
pub use registry::{CollectionRegistry, Engine, DEFAULT_COLLECTION};
