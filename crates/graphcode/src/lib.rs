// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph codes: compact graph descriptors of a media item's semantic features.
//!
//! A [`GraphCode`] holds an ordered vocabulary of normalized terms (the nodes)
//! and a sparse square matrix of typed, directed edges between them. Graph
//! codes may own nested child graph codes (e.g. sub-regions of an image); the
//! children travel with the canonical serialization but never take part in
//! similarity scoring.
//!
//! # Normalization
//!
//! Every term is lower-cased before it is stored or looked up (see
//! [`normalize_term`]). Term equality is therefore a reliable key, and edges
//! between two different graph codes are always compared by resolving the
//! term pair in each graph, never by index identity.
//!
//! # Canonical form
//!
//! [`GraphCode::to_canonical_json`] is deterministic: vocabulary in insertion
//! order, edges sorted by `(from, to)`, zero edges never emitted, children in
//! insertion order. [`GraphCode::content_hash`] is BLAKE3 over those bytes.
#![forbid(unsafe_code)]

mod code;
pub mod metric;
mod wire;

pub use code::GraphCode;
pub use metric::{compare, Similarity};

/// Integer edge classification. `0` is reserved for "no edge".
pub type EdgeType = u32;

/// Edge type value meaning "no edge".
pub const NO_EDGE: EdgeType = 0;

/// Blake3 hash of a graph code's canonical form (32 bytes).
pub type Hash32 = [u8; 32];

/// Errors raised by graph code construction, lookup and decoding.
#[derive(Debug, thiserror::Error)]
pub enum GraphCodeError {
    /// A term used for an edge lookup is not part of the vocabulary.
    #[error("term not found in vocabulary: {term:?}")]
    TermNotFound {
        /// The normalized term that failed to resolve.
        term: String,
    },
    /// Edges from a node to itself are not representable.
    #[error("self edge on node index {index}")]
    SelfEdge {
        /// Offending node index.
        index: usize,
    },
    /// Edge endpoint outside the vocabulary.
    #[error("node index {index} out of range for vocabulary of {len}")]
    IndexOutOfRange {
        /// Offending node index.
        index: usize,
        /// Current vocabulary length.
        len: usize,
    },
    /// A decoded edge entry violates the edge invariants.
    #[error("invalid edge {from}->{to} (type {kind})")]
    InvalidEdge {
        /// Source index.
        from: usize,
        /// Destination index.
        to: usize,
        /// Edge type value.
        kind: EdgeType,
    },
    /// Canonical JSON encode/decode failure.
    #[error("graph code json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Normalize a vocabulary term (Unicode lower-case).
pub fn normalize_term(term: &str) -> String {
    term.to_lowercase()
}
