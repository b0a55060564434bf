// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serialized shape of a graph code.
//!
//! ```json
//! {"dictionary":["dog","ball"],"edges":[{"from":0,"to":1,"type":3}],"collectionElements":[]}
//! ```
//!
//! `edges` is omitted when there are none, so an empty graph code encodes as
//! `{"dictionary":[],"collectionElements":[]}`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{EdgeType, GraphCode, GraphCodeError, NO_EDGE};

#[derive(Serialize, Deserialize)]
struct WireGraphCode {
    dictionary: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    edges: Vec<WireEdge>,
    #[serde(rename = "collectionElements", default)]
    collection_elements: Vec<WireGraphCode>,
}

#[derive(Serialize, Deserialize)]
struct WireEdge {
    from: usize,
    to: usize,
    #[serde(rename = "type")]
    kind: EdgeType,
}

impl From<&GraphCode> for WireGraphCode {
    fn from(gc: &GraphCode) -> Self {
        Self {
            dictionary: gc.vocabulary().to_vec(),
            edges: gc
                .edges()
                .map(|(from, to, kind)| WireEdge { from, to, kind })
                .collect(),
            collection_elements: gc.children().iter().map(WireGraphCode::from).collect(),
        }
    }
}

impl TryFrom<WireGraphCode> for GraphCode {
    type Error = GraphCodeError;

    fn try_from(wire: WireGraphCode) -> Result<Self, Self::Error> {
        let mut gc = GraphCode::with_vocabulary(&wire.dictionary);
        for WireEdge { from, to, kind } in wire.edges {
            if kind == NO_EDGE || from == to || from >= gc.len() || to >= gc.len() {
                return Err(GraphCodeError::InvalidEdge { from, to, kind });
            }
            gc.set_edge(from, to, kind)?;
        }
        for child in wire.collection_elements {
            gc.add_child(GraphCode::try_from(child)?);
        }
        Ok(gc)
    }
}

impl Serialize for GraphCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireGraphCode::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GraphCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireGraphCode::deserialize(deserializer)?;
        GraphCode::try_from(wire).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph_code_has_minimal_form() {
        let json = GraphCode::new().to_canonical_json().unwrap();
        assert_eq!(json, r#"{"dictionary":[],"collectionElements":[]}"#);
    }

    #[test]
    fn edges_are_sorted_and_zero_edges_omitted() {
        let mut gc = GraphCode::with_vocabulary(["a", "b", "c"]);
        gc.set_edge(2, 0, 5).unwrap();
        gc.set_edge(0, 1, 1).unwrap();
        gc.set_edge(1, 2, 7).unwrap();
        gc.set_edge(1, 2, NO_EDGE).unwrap();
        let json = gc.to_canonical_json().unwrap();
        assert_eq!(
            json,
            r#"{"dictionary":["a","b","c"],"edges":[{"from":0,"to":1,"type":1},{"from":2,"to":0,"type":5}],"collectionElements":[]}"#
        );
    }

    #[test]
    fn children_are_nested_in_the_same_shape() {
        let mut gc = GraphCode::new();
        gc.add_child(GraphCode::with_vocabulary(["ChildTerm"]));
        let json = gc.to_canonical_json().unwrap();
        assert_eq!(
            json,
            r#"{"dictionary":[],"collectionElements":[{"dictionary":["childterm"],"collectionElements":[]}]}"#
        );
    }

    #[test]
    fn decoding_normalizes_and_restores_edges() {
        let gc = GraphCode::from_json(
            r#"{"dictionary":["Term1","term2"],"edges":[{"from":0,"to":1,"type":1}]}"#,
        )
        .unwrap();
        assert_eq!(gc.vocabulary(), ["term1", "term2"]);
        assert_eq!(gc.edge_for_terms("term1", "term2").unwrap(), 1);
        assert!(gc.children().is_empty());
    }

    #[test]
    fn decoding_rejects_invalid_edges() {
        for bad in [
            r#"{"dictionary":["a","b"],"edges":[{"from":0,"to":0,"type":1}]}"#,
            r#"{"dictionary":["a","b"],"edges":[{"from":0,"to":2,"type":1}]}"#,
            r#"{"dictionary":["a","b"],"edges":[{"from":0,"to":1,"type":0}]}"#,
        ] {
            assert!(GraphCode::from_json(bad).is_err(), "accepted {bad}");
        }
    }
}
