// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph code storage: term arena, first-occurrence index map, sparse edges.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::{normalize_term, EdgeType, GraphCodeError, Hash32, NO_EDGE};

/// Vocabulary plus typed directed edges, with an owned tree of children.
///
/// Nodes are addressed by their vocabulary index. Duplicate terms are kept as
/// separate nodes; term-based lookups resolve to the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphCode {
    vocabulary: Vec<String>,
    first_index: FxHashMap<String, usize>,
    edges: BTreeMap<(usize, usize), EdgeType>,
    children: Vec<GraphCode>,
}

impl GraphCode {
    /// Create an empty graph code.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph code from a list of terms (no edges).
    pub fn with_vocabulary<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut gc = Self::new();
        for term in terms {
            gc.add_term(term.as_ref());
        }
        gc
    }

    /// Replace the vocabulary. All edges are dropped since their indices no
    /// longer refer to the same terms; children are kept.
    pub fn set_vocabulary<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.vocabulary.clear();
        self.first_index.clear();
        self.edges.clear();
        for term in terms {
            self.add_term(term.as_ref());
        }
    }

    /// Normalize and append a term, returning its node index.
    ///
    /// Duplicates are not merged: each call creates a new node.
    pub fn add_term(&mut self, term: &str) -> usize {
        let term = normalize_term(term);
        let index = self.vocabulary.len();
        self.first_index.entry(term.clone()).or_insert(index);
        self.vocabulary.push(term);
        index
    }

    /// Ordered, normalized vocabulary.
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Returns `true` when the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    /// First index of `term` (normalized before lookup).
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.first_index.get(&normalize_term(term)).copied()
    }

    /// Returns `true` if `term` (normalized) is in the vocabulary.
    pub fn contains_term(&self, term: &str) -> bool {
        self.index_of(term).is_some()
    }

    /// Write a typed edge `from -> to`. Type [`NO_EDGE`] clears the edge.
    pub fn set_edge(
        &mut self,
        from: usize,
        to: usize,
        kind: EdgeType,
    ) -> Result<(), GraphCodeError> {
        if from == to {
            return Err(GraphCodeError::SelfEdge { index: from });
        }
        let len = self.vocabulary.len();
        for index in [from, to] {
            if index >= len {
                return Err(GraphCodeError::IndexOutOfRange { index, len });
            }
        }
        if kind == NO_EDGE {
            self.edges.remove(&(from, to));
        } else {
            self.edges.insert((from, to), kind);
        }
        Ok(())
    }

    /// Write a typed edge between two terms, appending either term when it
    /// is not in the vocabulary yet. Existing terms resolve by first
    /// occurrence.
    pub fn set_edge_for_terms(
        &mut self,
        from: &str,
        to: &str,
        kind: EdgeType,
    ) -> Result<(), GraphCodeError> {
        let from = self.resolve_or_append(from);
        let to = self.resolve_or_append(to);
        self.set_edge(from, to, kind)
    }

    /// Edge type stored for `from -> to`, or [`NO_EDGE`].
    pub fn edge(&self, from: usize, to: usize) -> EdgeType {
        self.edges.get(&(from, to)).copied().unwrap_or(NO_EDGE)
    }

    /// Edge type between two terms.
    ///
    /// Fails with [`GraphCodeError::TermNotFound`] when either term is absent.
    /// An existing term pair without an edge yields `Ok(NO_EDGE)`.
    pub fn edge_for_terms(&self, from: &str, to: &str) -> Result<EdgeType, GraphCodeError> {
        let resolve = |term: &str| {
            self.index_of(term).ok_or_else(|| GraphCodeError::TermNotFound {
                term: normalize_term(term),
            })
        };
        let from = resolve(from)?;
        let to = resolve(to)?;
        Ok(self.edge(from, to))
    }

    /// Term lookup for already-normalized terms; `None` if either is absent.
    pub(crate) fn edge_for_normalized(&self, from: &str, to: &str) -> Option<EdgeType> {
        let from = *self.first_index.get(from)?;
        let to = *self.first_index.get(to)?;
        Some(self.edge(from, to))
    }

    /// Number of non-zero edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Non-zero edges as `(from, to, type)` in `(from, to)` order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, EdgeType)> + '_ {
        self.edges.iter().map(|(&(from, to), &kind)| (from, to, kind))
    }

    /// Append a child graph code.
    pub fn add_child(&mut self, child: GraphCode) {
        self.children.push(child);
    }

    /// Child graph codes in insertion order.
    pub fn children(&self) -> &[GraphCode] {
        &self.children
    }

    /// Canonical JSON text (see crate docs).
    pub fn to_canonical_json(&self) -> Result<String, GraphCodeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Canonical JSON bytes.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, GraphCodeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a graph code from its JSON form, validating every edge.
    pub fn from_json(text: &str) -> Result<Self, GraphCodeError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode a graph code from JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, GraphCodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Blake3 hash of the canonical form.
    pub fn content_hash(&self) -> Result<Hash32, GraphCodeError> {
        let bytes = self.to_canonical_bytes()?;
        Ok(*blake3::hash(&bytes).as_bytes())
    }

    fn resolve_or_append(&mut self, term: &str) -> usize {
        match self.index_of(term) {
            Some(index) => index,
            None => self.add_term(term),
        }
    }
}
