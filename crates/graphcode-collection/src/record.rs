// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Media records and their upstream feature description.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use graphcode::EdgeType;

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique media record identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(u64);

impl RecordId {
    /// Allocate a fresh identifier.
    pub fn next() -> Self {
        Self(NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rec-{}", self.0)
    }
}

/// One named feature detected in a media item, with nested sub-features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureNode {
    /// Feature label; becomes a vocabulary term.
    pub name: String,
    /// Sub-features (e.g. objects inside a detected region).
    pub children: Vec<FeatureNode>,
}

impl FeatureNode {
    /// Leaf feature.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Builder: append a sub-feature.
    pub fn with_child(mut self, child: FeatureNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Typed relationship between two features, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRelation {
    /// Source feature name.
    pub from: String,
    /// Target feature name.
    pub to: String,
    /// Edge type written into the graph code.
    pub kind: EdgeType,
}

/// Features of a media item as delivered by upstream analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureGraph {
    /// Top-level features in detection order.
    pub nodes: Vec<FeatureNode>,
    /// Relationships between features.
    pub relations: Vec<FeatureRelation>,
}

impl FeatureGraph {
    /// Empty feature graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a top-level feature.
    pub fn with_node(mut self, node: FeatureNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Builder: append a relationship.
    pub fn with_relation(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        kind: EdgeType,
    ) -> Self {
        self.relations.push(FeatureRelation {
            from: from.into(),
            to: to.into(),
            kind,
        });
        self
    }

    /// Returns `true` when no features were detected.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relations.is_empty()
    }
}

/// A media item known to a collection.
///
/// Identity is the [`RecordId`]; two records for the same file are distinct
/// records (see [`Collection::replace`](crate::Collection::replace)).
#[derive(Debug, Clone)]
pub struct MediaRecord {
    id: RecordId,
    file: PathBuf,
    name: String,
    features: FeatureGraph,
}

impl MediaRecord {
    /// New record for `file`; the display name defaults to its file name.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let name = file
            .file_name()
            .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self {
            id: RecordId::next(),
            file,
            name,
            features: FeatureGraph::default(),
        }
    }

    /// Builder: override the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: attach upstream features.
    pub fn with_features(mut self, features: FeatureGraph) -> Self {
        self.features = features;
        self
    }

    /// Stable identity.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Originating file reference.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upstream features.
    pub fn features(&self) -> &FeatureGraph {
        &self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_name_defaults_to_file_name() {
        let a = MediaRecord::new("photos/beach.jpg");
        let b = MediaRecord::new("photos/beach.jpg");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.name(), "beach.jpg");
        assert_eq!(a.file(), Path::new("photos/beach.jpg"));
        assert!(a.features().is_empty());
        assert_eq!(a.with_name("Beach").name(), "Beach");
    }

    #[test]
    fn id_display() {
        let id = RecordId::next();
        assert_eq!(id.to_string(), format!("rec-{}", id.as_u64()));
    }
}
