// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem `ConfigStore`: one `<key>.json` file per key under the
//! platform config directory, plus platform defaults for engine settings.

use directories::ProjectDirs;
use graphcode_app_core::config::{ConfigError, ConfigStore};
use graphcode_app_core::settings::EngineSettings;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("dev", "graphcode", "GraphCode").ok_or_else(|| {
        ConfigError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "no home directory to derive platform config paths from",
        ))
    })
}

/// Store configs as JSON files under the platform config directory.
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Create a store rooted at the user config directory (e.g., `~/.config/GraphCode`).
    pub fn new() -> Result<Self, ConfigError> {
        let proj = project_dirs()?;
        Self::at(proj.config_dir())
    }

    /// Create a store rooted at an explicit directory.
    pub fn at(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Directory config blobs live in.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// File holding the blob for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.json"))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        fs::read(self.path_for(key)).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound,
            _ => ConfigError::Io(err),
        })
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        // Readers never observe a half-written settings file.
        fs::create_dir_all(&self.base)?;
        let mut partial = tempfile::Builder::new()
            .prefix(&format!(".{key}."))
            .suffix(".partial")
            .tempfile_in(&self.base)?;
        partial.write_all(data)?;
        partial
            .persist(self.path_for(key))
            .map_err(|err| ConfigError::Io(err.error))?;
        Ok(())
    }
}

/// Default settings with the repository under the platform data directory
/// (e.g., `~/.local/share/GraphCode/graph-codes`).
pub fn platform_settings() -> Result<EngineSettings, ConfigError> {
    let proj = project_dirs()?;
    Ok(EngineSettings::with_repository(proj.data_dir().join("graph-codes")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use graphcode_app_core::config::ConfigService;
    use graphcode_app_core::settings::SETTINGS_KEY;

    #[test]
    fn settings_round_trip_through_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path().join("cfg")).unwrap();
        let config = ConfigService::new(store);

        let mut settings = EngineSettings::with_repository(dir.path().join("repo"));
        settings.query_workers = 2;
        config.save(SETTINGS_KEY, &settings).unwrap();

        assert!(dir.path().join("cfg").join("graph_code_engine.json").is_file());
        let loaded = EngineSettings::load(&config).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn platform_repository_lives_under_data_dir() {
        // No home directory (some CI sandboxes) means no platform dirs at all.
        if let Ok(settings) = platform_settings() {
            assert!(settings.graph_code_repository.ends_with("graph-codes"));
            assert_eq!(settings.artifact_suffix, ".gc");
        }
    }

    #[test]
    fn missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path()).unwrap();
        assert!(matches!(store.load_raw("absent"), Err(ConfigError::NotFound)));
    }

    #[test]
    fn save_replaces_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path()).unwrap();
        store.save_raw(SETTINGS_KEY, b"{}").unwrap();
        store.save_raw(SETTINGS_KEY, br#"{"query_workers":4}"#).unwrap();
        assert_eq!(store.load_raw(SETTINGS_KEY).unwrap(), br#"{"query_workers":4}"#);
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, ["graph_code_engine.json"]);
    }
}
