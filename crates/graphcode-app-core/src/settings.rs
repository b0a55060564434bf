// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine settings: where graph code artifacts go and how queries fan out.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Config key the engine settings are stored under.
pub const SETTINGS_KEY: &str = "graph_code_engine";

/// Suffix appended to a media file name to form its artifact name.
pub const DEFAULT_ARTIFACT_SUFFIX: &str = ".gc";

/// Settings consumed (read-only) by graph code caches and collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Directory persisted graph codes are written to.
    pub graph_code_repository: PathBuf,
    /// Artifact name suffix (`<file name><suffix>`).
    pub artifact_suffix: String,
    /// Worker threads for query comparisons; `0` uses available parallelism.
    pub query_workers: usize,
    /// Collections smaller than this are scored on the calling thread.
    pub parallel_threshold: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            graph_code_repository: PathBuf::from("graph-codes"),
            artifact_suffix: DEFAULT_ARTIFACT_SUFFIX.to_owned(),
            query_workers: 0,
            parallel_threshold: 64,
        }
    }
}

impl EngineSettings {
    /// Settings with a specific repository directory, defaults elsewhere.
    pub fn with_repository(dir: impl Into<PathBuf>) -> Self {
        Self {
            graph_code_repository: dir.into(),
            ..Self::default()
        }
    }

    /// Load from config, writing defaults back on first use.
    pub fn load<S: ConfigStore>(config: &ConfigService<S>) -> Result<Self, ConfigError> {
        let settings: Self = config.load_or_init(SETTINGS_KEY)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings no cache could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            key: SETTINGS_KEY.to_owned(),
            reason: reason.to_owned(),
        };
        if self.artifact_suffix.is_empty() {
            return Err(invalid("artifact_suffix is empty"));
        }
        if self.artifact_suffix.contains(['/', '\\']) {
            return Err(invalid("artifact_suffix contains a path separator"));
        }
        if self.graph_code_repository.as_os_str().is_empty() {
            return Err(invalid("graph_code_repository is empty"));
        }
        if self.parallel_threshold == 0 {
            return Err(invalid("parallel_threshold must be at least 1"));
        }
        Ok(())
    }

    /// Worker count resolved against the host.
    pub fn effective_workers(&self) -> usize {
        if self.query_workers > 0 {
            return self.query_workers;
        }
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigStore;

    #[test]
    fn defaults_use_gc_suffix() {
        let s = EngineSettings::default();
        assert_eq!(s.artifact_suffix, ".gc");
        assert!(s.effective_workers() >= 1);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let store = MemoryConfigStore::new();
        store
            .save_raw(SETTINGS_KEY, br#"{"graph_code_repository":"/srv/gc","query_workers":3}"#)
            .unwrap();
        let s = EngineSettings::load(&ConfigService::new(store)).unwrap();
        assert_eq!(s.graph_code_repository, PathBuf::from("/srv/gc"));
        assert_eq!(s.query_workers, 3);
        assert_eq!(s.effective_workers(), 3);
        assert_eq!(s.artifact_suffix, ".gc");
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let store = MemoryConfigStore::new();
        store
            .save_raw(SETTINGS_KEY, br#"{"artifact_suffix":"/gc"}"#)
            .unwrap();
        let err = EngineSettings::load(&ConfigService::new(store)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let empty = EngineSettings {
            artifact_suffix: String::new(),
            ..EngineSettings::default()
        };
        assert!(empty.validate().is_err());
        let zero_threshold = EngineSettings {
            parallel_threshold: 0,
            ..EngineSettings::default()
        };
        assert!(matches!(zero_threshold.validate(), Err(ConfigError::Invalid { .. })));
        assert!(EngineSettings::default().validate().is_ok());
    }

    #[test]
    fn absent_config_is_initialized() {
        let config = ConfigService::new(MemoryConfigStore::new());
        let s = EngineSettings::load(&config).unwrap();
        assert_eq!(s, EngineSettings::default());
        assert_eq!(
            config.load::<EngineSettings>(SETTINGS_KEY).unwrap(),
            Some(EngineSettings::default())
        );
    }
}
