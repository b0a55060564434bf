// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Feature extraction port: media record in, graph code out.

use graphcode::{EdgeType, GraphCode, GraphCodeError};

use crate::record::{FeatureNode, MediaRecord};

/// Edge type written from a feature to each of its sub-features.
pub const CHILD_EDGE: EdgeType = 1;
/// Edge type for synonymous features.
pub const SYNONYM_EDGE: EdgeType = 2;
/// Edge type for generic semantic relationships.
pub const RELATION_EDGE: EdgeType = 3;

/// Failure reported by a feature extractor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    /// The extractor cannot handle this kind of media.
    #[error("unsupported media: {file}")]
    Unsupported {
        /// Offending file reference.
        file: String,
    },
    /// Extraction ran but failed.
    #[error("extraction failed for {file}: {reason}")]
    Failed {
        /// Offending file reference.
        file: String,
        /// Human-readable cause.
        reason: String,
    },
}

impl ExtractionError {
    /// Convenience constructor for [`ExtractionError::Failed`].
    pub fn failed(record: &MediaRecord, reason: impl std::fmt::Display) -> Self {
        Self::Failed {
            file: record.file().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Builds the graph code for a media record.
///
/// Invoked by the cache at most once per record (per cached lifetime).
pub trait FeatureExtractor: Send + Sync {
    /// Extract a graph code from `record`.
    fn extract(&self, record: &MediaRecord) -> Result<GraphCode, ExtractionError>;
}

impl<F> FeatureExtractor for F
where
    F: Fn(&MediaRecord) -> Result<GraphCode, ExtractionError> + Send + Sync,
{
    fn extract(&self, record: &MediaRecord) -> Result<GraphCode, ExtractionError> {
        self(record)
    }
}

/// Turns a record's [`FeatureGraph`](crate::FeatureGraph) into a graph code.
///
/// - every feature name becomes one term (repeated names share a node),
/// - a feature links to each sub-feature with [`CHILD_EDGE`],
/// - relations become edges of their own type,
/// - every top-level feature with sub-features also yields a child graph
///   code covering that subtree.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureGraphExtractor;

impl FeatureGraphExtractor {
    fn add_subtree(gc: &mut GraphCode, node: &FeatureNode) -> Result<usize, GraphCodeError> {
        let parent = gc.index_of(&node.name).unwrap_or_else(|| gc.add_term(&node.name));
        for child in &node.children {
            let child_index = Self::add_subtree(gc, child)?;
            if child_index != parent {
                gc.set_edge(parent, child_index, CHILD_EDGE)?;
            }
        }
        Ok(parent)
    }

    fn build(record: &MediaRecord) -> Result<GraphCode, GraphCodeError> {
        let features = record.features();
        let mut gc = GraphCode::new();
        for node in &features.nodes {
            Self::add_subtree(&mut gc, node)?;
        }
        for relation in &features.relations {
            gc.set_edge_for_terms(&relation.from, &relation.to, relation.kind)?;
        }
        for node in features.nodes.iter().filter(|n| !n.children.is_empty()) {
            let mut child = GraphCode::new();
            Self::add_subtree(&mut child, node)?;
            gc.add_child(child);
        }
        Ok(gc)
    }
}

impl FeatureExtractor for FeatureGraphExtractor {
    fn extract(&self, record: &MediaRecord) -> Result<GraphCode, ExtractionError> {
        Self::build(record).map_err(|err| ExtractionError::failed(record, err))
    }
}
