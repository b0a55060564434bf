// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use graphcode::{compare, GraphCode, Similarity};
use proptest::prelude::*;

fn arb_graph_code() -> impl Strategy<Value = GraphCode> {
    prop::collection::vec("[a-zA-Z]{1,6}", 0..8).prop_flat_map(|terms| {
        let len = terms.len();
        let edges = if len < 2 {
            Just(Vec::<(usize, usize, u32)>::new()).boxed()
        } else {
            prop::collection::vec((0..len, 0..len, 1u32..5), 0..12).boxed()
        };
        (Just(terms), edges).prop_map(|(terms, edges)| {
            let mut gc = GraphCode::with_vocabulary(&terms);
            for (from, to, kind) in edges {
                if from != to {
                    gc.set_edge(from, to, kind).unwrap();
                }
            }
            gc
        })
    })
}

fn distinct_graph_code() -> impl Strategy<Value = GraphCode> {
    (prop::collection::btree_set("[a-z]{1,6}", 2..8), any::<u64>()).prop_map(|(terms, seed)| {
        let terms: Vec<_> = terms.into_iter().collect();
        let mut gc = GraphCode::with_vocabulary(&terms);
        let len = terms.len();
        // at least one edge so the identity property covers the edge axes
        gc.set_edge(0, 1, 1).unwrap();
        let mut state = seed;
        for from in 0..len {
            for to in 0..len {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                if from != to && state >> 62 == 0 {
                    gc.set_edge(from, to, u32::try_from(state >> 60).unwrap() + 1).unwrap();
                }
            }
        }
        gc
    })
}

proptest! {
    #[test]
    fn canonical_json_round_trips(gc in arb_graph_code(), child in arb_graph_code()) {
        let mut gc = gc;
        gc.add_child(child);
        let json = gc.to_canonical_json().unwrap();
        let back = GraphCode::from_json(&json).unwrap();
        prop_assert_eq!(back.vocabulary(), gc.vocabulary());
        prop_assert_eq!(back.edges().collect::<Vec<_>>(), gc.edges().collect::<Vec<_>>());
        prop_assert_eq!(&back, &gc);
        prop_assert_eq!(back.to_canonical_json().unwrap(), json);
    }

    #[test]
    fn scores_stay_in_unit_range(query in arb_graph_code(), candidate in arb_graph_code()) {
        let s = compare(&query, &candidate);
        for score in s.as_array() {
            prop_assert!((0.0..=1.0).contains(&score), "{s:?}");
        }
    }

    #[test]
    fn empty_query_always_zero(candidate in arb_graph_code()) {
        prop_assert_eq!(compare(&GraphCode::new(), &candidate), Similarity::ZERO);
    }

    #[test]
    fn disjoint_vocabularies_have_zero_node_score(
        query in prop::collection::vec("[a-m]{1,4}", 1..6),
        candidate in prop::collection::vec("[n-z]{1,4}", 0..6),
    ) {
        let s = compare(
            &GraphCode::with_vocabulary(&query),
            &GraphCode::with_vocabulary(&candidate),
        );
        prop_assert_eq!(s.node, 0.0);
    }

    #[test]
    fn graph_is_identical_to_itself(gc in distinct_graph_code()) {
        prop_assert_eq!(compare(&gc, &gc), Similarity { node: 1.0, edge: 1.0, edge_type: 1.0 });
    }
}
