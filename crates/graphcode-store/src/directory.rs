// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Directory-backed artifact store: one file per artifact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{artifact_hash, check_name, ArtifactReceipt, ArtifactStore, StoreError};

/// Stores each artifact as `<root>/<name>`.
///
/// The root directory is created on first write. Each write goes to its own
/// uniquely named `.<name>.<random>.partial` sibling which is then renamed
/// over the target. Readers never observe a half-written artifact, and
/// concurrent writers of one name never share a partial file; the last
/// rename wins.
#[derive(Debug, Clone)]
pub struct DirectoryTier {
    root: PathBuf,
}

impl DirectoryTier {
    /// Create a tier rooted at `root` (not created until the first write).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Repository directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path an artifact named `name` is stored at.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        check_name(name)?;
        Ok(self.root.join(name))
    }
}

impl ArtifactStore for DirectoryTier {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<ArtifactReceipt, StoreError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.root)?;
        let mut partial = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".partial")
            .tempfile_in(&self.root)?;
        partial.write_all(bytes)?;
        partial.as_file().sync_data()?;
        partial.persist(&path).map_err(|err| StoreError::Io(err.error))?;
        Ok(ArtifactReceipt {
            name: name.to_owned(),
            hash: artifact_hash(bytes),
            len: bytes.len(),
        })
    }

    fn get(&self, name: &str) -> Result<Option<Arc<[u8]>>, StoreError> {
        let path = self.path_for(name)?;
        match fs::read(path) {
            Ok(bytes) => Ok(Some(Arc::from(bytes))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn has(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(name)?.is_file())
    }
}
