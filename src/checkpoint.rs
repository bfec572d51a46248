// src/checkpoint.rs
//! File-backed marker of the newest item handed to delivery.
//!
//! The file holds a single JSON record `{"url": ..., "hash": ...}`. A missing file is
//! the normal first-run state. Writes go to a sibling temp file and are renamed into
//! place, so a reader never observes a partial record.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CheckpointError;

pub const DEFAULT_CHECKPOINT_PATH: &str = "last_post.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub hash: String,
}

impl Checkpoint {
    pub fn for_identifier(id: &str) -> Self {
        Self {
            url: id.to_string(),
            hash: fingerprint(id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hash.is_empty()
    }

    /// True when `fp` is the fingerprint of the stored identifier.
    pub fn matches(&self, fp: &str) -> bool {
        !self.hash.is_empty() && self.hash == fp
    }
}

/// SHA-256 of the identifier, lowercase hex.
pub fn fingerprint(id: &str) -> String {
    let digest = Sha256::digest(id.as_bytes());
    format!("{digest:x}")
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Checkpoint, CheckpointError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Checkpoint::default()),
            Err(e) => return Err(e.into()),
        };
        let mut cp: Checkpoint = serde_json::from_str(&data)?;
        if cp.hash.is_empty() && !cp.url.is_empty() {
            cp.hash = fingerprint(&cp.url);
        }
        Ok(cp)
    }

    pub fn save(&self, id: &str) -> Result<Checkpoint, CheckpointError> {
        let cp = Checkpoint::for_identifier(id);
        let json = serde_json::to_vec(&cp)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&json)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), url = %cp.url, "checkpoint saved");
        Ok(cp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("last_post.json"));
        let cp = store.load().unwrap();
        assert!(cp.is_empty());
        assert_eq!(cp, Checkpoint::default());
    }

    #[test]
    fn save_then_load_roundtrips_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("last_post.json");
        let store = CheckpointStore::new(&path);

        let saved = store.save("https://example.com/a").unwrap();
        assert_eq!(saved.hash, fingerprint("https://example.com/a"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded, saved);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_post.json");
        fs::write(&path, "{not json").unwrap();
        let err = CheckpointStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CheckpointError::Decode(_)));
    }

    #[test]
    fn empty_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_post.json");
        fs::write(&path, "").unwrap();
        let err = CheckpointStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CheckpointError::Decode(_)));

        fs::write(&path, "  \n").unwrap();
        let err = CheckpointStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CheckpointError::Decode(_)));
    }

    #[test]
    fn hash_is_recomputed_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_post.json");
        fs::write(&path, r#"{"url":"https://example.com/x"}"#).unwrap();
        let cp = CheckpointStore::new(&path).load().unwrap();
        assert!(cp.matches(&fingerprint("https://example.com/x")));
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = fingerprint("id");
        assert_eq!(a, fingerprint("id"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, fingerprint("id2"));
    }
}
