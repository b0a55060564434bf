// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named artifact store for persisted graph codes.
//!
//! `graphcode-store` provides an [`ArtifactStore`] trait keyed by artifact name
//! (e.g. `beach.jpg.gc`). Two tiers ship: [`MemoryTier`] for tests and
//! embedded use, and [`DirectoryTier`] which writes one file per artifact
//! under a repository directory.
//!
//! # Name Policy
//!
//! Artifact names are single path components. Empty names, `.`/`..`, and names
//! containing a path separator are rejected with [`StoreError::InvalidName`]
//! so no tier can be coaxed into writing outside its root.
//!
//! # Overwrite Semantics
//!
//! `put` on an existing name replaces the artifact. Stores never delete on
//! their own; removal is an external maintenance concern.
#![forbid(unsafe_code)]

mod directory;
mod memory;
pub use directory::DirectoryTier;
pub use memory::MemoryTier;

use std::sync::Arc;

/// A 32-byte BLAKE3 hash of an artifact's bytes.
///
/// The `Display` impl renders lowercase hex for logging.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ArtifactHash(pub [u8; 32]);

impl ArtifactHash {
    /// View the hash as a byte slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for ArtifactHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Compute the BLAKE3 hash of `bytes`.
pub fn artifact_hash(bytes: &[u8]) -> ArtifactHash {
    ArtifactHash(*blake3::hash(bytes).as_bytes())
}

/// Acknowledgement of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReceipt {
    /// Artifact name as stored.
    pub name: String,
    /// Content hash of the stored bytes.
    pub hash: ArtifactHash,
    /// Stored length in bytes.
    pub len: usize,
}

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Name is empty, relative (`.`/`..`), or contains a path separator.
    #[error("[STORE_INVALID_NAME] {0:?}")]
    InvalidName(String),
    /// Underlying filesystem failure.
    #[error("[STORE_IO] {0}")]
    Io(#[from] std::io::Error),
}

/// Named artifact store.
///
/// Methods take `&self` so one store can be shared (`Arc<dyn ArtifactStore>`)
/// by every cache in a process; tiers synchronize internally.
///
/// # Absence Semantics
///
/// [`get`](ArtifactStore::get) returns `Ok(None)` for missing artifacts.
/// Errors are reserved for invalid names and I/O failures.
pub trait ArtifactStore: Send + Sync {
    /// Store (or overwrite) `bytes` under `name`.
    fn put(&self, name: &str, bytes: &[u8]) -> Result<ArtifactReceipt, StoreError>;

    /// Retrieve an artifact by name.
    fn get(&self, name: &str) -> Result<Option<Arc<[u8]>>, StoreError>;

    /// Check existence without retrieving.
    fn has(&self, name: &str) -> Result<bool, StoreError>;
}

/// Validate an artifact name against the name policy.
pub fn check_name(name: &str) -> Result<(), StoreError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(StoreError::InvalidName(name.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_policy() {
        for ok in ["a.jpg.gc", "photo", ".hidden.gc"] {
            assert!(check_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", ".", "..", "dir/a.gc", "dir\\a.gc"] {
            assert!(matches!(check_name(bad), Err(StoreError::InvalidName(_))), "{bad}");
        }
    }

    #[test]
    fn hash_display_is_hex() {
        let hash = ArtifactHash([0xAB; 32]);
        let text = hash.to_string();
        assert_eq!(text.len(), 64);
        assert!(text.starts_with("abab"));
        assert_eq!(artifact_hash(b"x"), artifact_hash(b"x"));
    }
}
