// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types for caches and collections.

use std::path::PathBuf;
use std::sync::Arc;

use graphcode::GraphCodeError;
use graphcode_store::StoreError;

use crate::extract::ExtractionError;
use crate::record::RecordId;

/// Graph code generation failure.
///
/// `Clone` so every caller waiting on one generation receives the same error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// The feature extractor failed; nothing was cached or persisted.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// The generated graph code could not be encoded.
    #[error("encoding graph code for {record}: {source}")]
    Encode {
        /// Record being generated.
        record: RecordId,
        /// Codec error.
        #[source]
        source: Arc<GraphCodeError>,
    },
    /// Writing the artifact failed; nothing was cached.
    #[error("persisting artifact {name}: {source}")]
    Persist {
        /// Artifact name.
        name: String,
        /// Store error.
        #[source]
        source: Arc<StoreError>,
    },
    /// The generating thread panicked before publishing a result.
    #[error("graph code generation for {0} was abandoned")]
    Abandoned(RecordId),
    /// The record has left its collection; no graph code is generated for it.
    #[error("record {0} is retired")]
    Retired(RecordId),
}

/// Key a collection lookup was made with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    /// Lookup by identity.
    Id(RecordId),
    /// Lookup by originating file.
    File(PathBuf),
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

/// Collection operation failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CollectionError {
    /// No member matches the lookup key.
    #[error("no record for {0}")]
    RecordNotFound(RecordKey),
    /// Graph code generation failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}
