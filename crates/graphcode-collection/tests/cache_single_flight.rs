// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use graphcode::GraphCode;
use graphcode_collection::{
    CacheError, ExtractionError, FeatureExtractor, FeatureGraph, FeatureGraphExtractor, FeatureNode,
    GraphCodeCache, MediaRecord,
};
use graphcode_store::MemoryTier;

const THREADS: usize = 8;

/// Extractor that sleeps so concurrent callers pile up on the in-flight slot.
struct SlowExtractor {
    calls: AtomicUsize,
    fail: bool,
}

impl FeatureExtractor for SlowExtractor {
    fn extract(&self, record: &MediaRecord) -> Result<GraphCode, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(200));
        if self.fail {
            return Err(ExtractionError::failed(record, "model unavailable"));
        }
        FeatureGraphExtractor.extract(record)
    }
}

fn race(cache: &GraphCodeCache, record: &MediaRecord) -> Vec<Result<Arc<GraphCode>, CacheError>> {
    let barrier = Barrier::new(THREADS);
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    cache.get_or_generate(record)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

fn record() -> MediaRecord {
    MediaRecord::new("crowd.jpg").with_features(
        FeatureGraph::new()
            .with_node(FeatureNode::new("crowd").with_child(FeatureNode::new("person")))
            .with_node(FeatureNode::new("stage")),
    )
}

#[test]
fn concurrent_callers_share_one_generation() {
    let extractor = Arc::new(SlowExtractor {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let store = Arc::new(MemoryTier::new());
    let cache = GraphCodeCache::new(extractor.clone(), store.clone(), ".gc");
    let record = record();

    let results = race(&cache, &record);
    let first = results[0].as_ref().unwrap();
    for result in &results {
        assert!(Arc::ptr_eq(result.as_ref().unwrap(), first));
    }
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.write_count(), 1);
    assert_eq!(store.names(), ["crowd.jpg.gc"]);
}

#[test]
fn concurrent_callers_share_one_failure() {
    let extractor = Arc::new(SlowExtractor {
        calls: AtomicUsize::new(0),
        fail: true,
    });
    let store = Arc::new(MemoryTier::new());
    let cache = GraphCodeCache::new(extractor.clone(), store.clone(), ".gc");
    let record = record();

    let results = race(&cache, &record);
    assert!(results
        .iter()
        .all(|r| matches!(r, Err(CacheError::Extraction(ExtractionError::Failed { .. })))));
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    assert!(store.is_empty());
    assert!(cache.is_empty());
}

#[test]
fn distinct_records_generate_independently() {
    let extractor = Arc::new(SlowExtractor {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let cache = GraphCodeCache::new(extractor.clone(), Arc::new(MemoryTier::new()), ".gc");
    let records: Vec<_> = (0..4).map(|i| MediaRecord::new(format!("r{i}.jpg"))).collect();

    std::thread::scope(|s| {
        for record in &records {
            let cache = &cache;
            s.spawn(move || cache.get_or_generate(record).unwrap());
        }
    });
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 4);
    assert_eq!(cache.len(), 4);
}
