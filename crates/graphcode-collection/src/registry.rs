// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Collection registry: one default collection plus memoized per-session
//! collections, owned by the application entry point and passed by handle.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use graphcode_app_core::settings::EngineSettings;
use graphcode_store::{ArtifactStore, DirectoryTier};
use tracing::info;

use crate::cache::GraphCodeCache;
use crate::collection::Collection;
use crate::extract::FeatureExtractor;

/// Name of the registry's default collection.
pub const DEFAULT_COLLECTION: &str = "default";

/// Shared collaborators every collection is built from.
#[derive(Clone)]
pub struct Engine {
    settings: EngineSettings,
    extractor: Arc<dyn FeatureExtractor>,
    store: Arc<dyn ArtifactStore>,
}

impl Engine {
    /// Engine over explicit collaborators.
    pub fn new(
        settings: EngineSettings,
        extractor: Arc<dyn FeatureExtractor>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            settings,
            extractor,
            store,
        }
    }

    /// Engine persisting into `settings.graph_code_repository`.
    pub fn with_repository(settings: EngineSettings, extractor: Arc<dyn FeatureExtractor>) -> Self {
        let store = Arc::new(DirectoryTier::new(settings.graph_code_repository.clone()));
        Self::new(settings, extractor, store)
    }

    /// Settings in effect.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Fresh, empty graph code cache.
    pub fn cache(&self) -> GraphCodeCache {
        GraphCodeCache::new(
            Arc::clone(&self.extractor),
            Arc::clone(&self.store),
            self.settings.artifact_suffix.clone(),
        )
    }

    /// Fresh, empty collection with its own cache.
    pub fn collection(&self, name: impl Into<String>) -> Collection {
        Collection::new(name, self.cache())
            .with_parallelism(self.settings.effective_workers(), self.settings.parallel_threshold)
    }
}

/// Default collection plus independent session collections.
///
/// The same session key always yields the same collection; different keys
/// never share membership or caches.
pub struct CollectionRegistry {
    engine: Engine,
    default: Arc<Collection>,
    sessions: Mutex<BTreeMap<String, Arc<Collection>>>,
}

impl CollectionRegistry {
    /// Registry with an empty default collection.
    pub fn new(engine: Engine) -> Self {
        let default = Arc::new(engine.collection(DEFAULT_COLLECTION));
        Self {
            engine,
            default,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    fn sessions_lock(&self) -> MutexGuard<'_, BTreeMap<String, Arc<Collection>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Engine collections are built from.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The process default collection.
    pub fn default_collection(&self) -> Arc<Collection> {
        Arc::clone(&self.default)
    }

    /// Collection for `key`, created on first use.
    pub fn session(&self, key: &str) -> Arc<Collection> {
        let mut sessions = self.sessions_lock();
        if let Some(existing) = sessions.get(key) {
            return Arc::clone(existing);
        }
        info!(session = key, "session collection created");
        let collection = Arc::new(self.engine.collection(format!("session:{key}")));
        sessions.insert(key.to_owned(), Arc::clone(&collection));
        collection
    }

    /// Known session keys, sorted.
    pub fn sessions(&self) -> Vec<String> {
        self.sessions_lock().keys().cloned().collect()
    }

    /// Forget a session; returns its collection if it existed. Handles held
    /// elsewhere stay valid, but `session(key)` will build a new one.
    pub fn drop_session(&self, key: &str) -> Option<Arc<Collection>> {
        let removed = self.sessions_lock().remove(key);
        if removed.is_some() {
            info!(session = key, "session collection dropped");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FeatureGraphExtractor;
    use crate::record::MediaRecord;
    use graphcode_store::MemoryTier;

    fn registry() -> CollectionRegistry {
        CollectionRegistry::new(Engine::new(
            EngineSettings::default(),
            Arc::new(FeatureGraphExtractor),
            Arc::new(MemoryTier::new()),
        ))
    }

    #[test]
    fn default_collection_is_a_singleton() {
        let reg = registry();
        assert!(Arc::ptr_eq(&reg.default_collection(), &reg.default_collection()));
        assert_eq!(reg.default_collection().name(), DEFAULT_COLLECTION);
    }

    #[test]
    fn sessions_are_memoized_and_independent() {
        let reg = registry();
        let a1 = reg.session("a");
        let a2 = reg.session("a");
        let b = reg.session("b");
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert!(!Arc::ptr_eq(&a1, &reg.default_collection()));

        a1.add(MediaRecord::new("only-in-a.jpg"));
        assert_eq!(a2.len(), 1);
        assert!(b.is_empty());
        assert!(reg.default_collection().is_empty());
        assert_eq!(reg.sessions(), ["a", "b"]);
        assert_eq!(a1.name(), "session:a");
    }

    #[test]
    fn dropped_session_is_rebuilt() {
        let reg = registry();
        let first = reg.session("s");
        first.add(MediaRecord::new("x.jpg"));
        assert!(reg.drop_session("s").is_some());
        assert!(reg.drop_session("s").is_none());
        let second = reg.session("s");
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.is_empty());
    }
}
