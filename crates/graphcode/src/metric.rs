// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph code similarity metric.
//!
//! [`compare`] scores a candidate against a query on three independent axes:
//!
//! - **node**: share of query terms found in the candidate vocabulary,
//! - **edge**: share of query edges that also exist (any type) in the
//!   candidate,
//! - **edge type**: share of the *matched* edges whose type is identical.
//!
//! Only the top-level vocabulary and edges take part; children are ignored.
//! Edges are compared by resolving the query's term pair inside the
//! candidate, so index layouts of the two graphs never need to agree.

use serde::Serialize;

use crate::{GraphCode, NO_EDGE};

/// Weight of the edge score in [`Similarity::rank_key`].
pub const EDGE_WEIGHT: f64 = 100_000.0;
/// Weight of the node score in [`Similarity::rank_key`].
pub const NODE_WEIGHT: f64 = 100.0;

/// Result of comparing a candidate graph code against a query.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Similarity {
    /// Fraction of query terms present in the candidate.
    pub node: f32,
    /// Fraction of query edges present in the candidate.
    pub edge: f32,
    /// Fraction of matched edges that also match in type.
    pub edge_type: f32,
}

impl Similarity {
    /// All three scores zero.
    pub const ZERO: Self = Self {
        node: 0.0,
        edge: 0.0,
        edge_type: 0.0,
    };

    /// Composite descending sort key: edge score dominates, then node score,
    /// then edge type score.
    pub fn rank_key(&self) -> f64 {
        f64::from(self.edge) * EDGE_WEIGHT
            + f64::from(self.node) * NODE_WEIGHT
            + f64::from(self.edge_type)
    }

    /// Scores as `[node, edge, edge_type]`.
    pub fn as_array(&self) -> [f32; 3] {
        [self.node, self.edge, self.edge_type]
    }

    /// Returns `true` if every score is zero. Scores are never negative.
    pub fn is_zero(&self) -> bool {
        !self.as_array().iter().any(|s| *s > 0.0)
    }
}

/// Compare `candidate` against `query`.
///
/// An empty query vocabulary yields [`Similarity::ZERO`]. Zero denominators
/// yield `0`, never NaN. A query edge whose terms cannot be resolved in the
/// candidate counts as unmatched.
pub fn compare(query: &GraphCode, candidate: &GraphCode) -> Similarity {
    let vocabulary = query.vocabulary();
    if vocabulary.is_empty() {
        return Similarity::ZERO;
    }

    // Every occurrence counts; duplicates in the candidate could push the
    // count past the vocabulary size, hence the cap.
    let shared = vocabulary
        .iter()
        .filter(|term| !term.trim().is_empty())
        .map(|term| occurrences(candidate, term))
        .sum::<usize>()
        .min(vocabulary.len());

    let mut query_edges = 0usize;
    let mut matched = 0usize;
    let mut type_matches = 0usize;
    for (from, to, kind) in query.edges() {
        query_edges += 1;
        let Some(found) = candidate.edge_for_normalized(&vocabulary[from], &vocabulary[to]) else {
            continue;
        };
        if found != NO_EDGE {
            matched += 1;
        }
        if found == kind {
            type_matches += 1;
        }
    }

    Similarity {
        node: ratio(shared, vocabulary.len()),
        edge: ratio(matched, query_edges),
        edge_type: ratio(type_matches, matched),
    }
}

fn occurrences(gc: &GraphCode, term: &str) -> usize {
    gc.vocabulary().iter().filter(|t| t.as_str() == term).count()
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        return 0.0;
    }
    let value = numerator as f32 / denominator as f32;
    if value.is_nan() {
        0.0
    } else {
        value
    }
}
