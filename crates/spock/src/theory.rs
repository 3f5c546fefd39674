//! The theory store: on-disk persistence for named, versioned theories and
//! the engine's canonical `Truth`/`False`/`Zero` vectors.
//!
//! Theories are saved and loaded against a configured storage directory,
//! keyed by theory name and version.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SpockError, SpockResult};
use crate::value::Value;
use crate::vector::Vector;

/// Metadata describing one version of one theory. Serialized as
/// `metadata.json` alongside the theory's `theory.spockdsl` source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheoryDescriptor {
    pub name: String,
    pub version: Uuid,
    pub parent_version: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    /// Free-form metadata (author, description, ...); preserved verbatim
    /// across save/load.
    pub metadata: serde_json::Value,
}

impl TheoryDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, parent_version: Option<Uuid>) -> Self {
        Self {
            name: name.into(),
            version: Uuid::new_v4(),
            parent_version,
            created_at: Utc::now(),
            metadata: serde_json::json!({}),
        }
    }
}

/// The engine's canonical vectors, persisted to `truth.bin` in the store's
/// root directory so a reopened engine sees the same `Truth`/`False`/`Zero`
/// as the one that wrote them.
#[derive(Debug, Clone, PartialEq)]
pub struct TruthConstants {
    pub truth: Vector,
    pub falsehood: Vector,
    pub zero: Vector,
}

impl TruthConstants {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.truth.to_le_bytes();
        bytes.extend(self.falsehood.to_le_bytes());
        bytes.extend(self.zero.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8], dim: usize) -> SpockResult<Self> {
        let stride = dim * 8;
        if bytes.len() != stride * 3 {
            return Err(SpockError::Storage(format!(
                "truth.bin has {} bytes, expected {} for dimension {dim}",
                bytes.len(),
                stride * 3
            )));
        }
        Ok(Self {
            truth: Vector::from_le_bytes(&bytes[0..stride])?,
            falsehood: Vector::from_le_bytes(&bytes[stride..stride * 2])?,
            zero: Vector::from_le_bytes(&bytes[stride * 2..stride * 3])?,
        })
    }
}

/// A theory's persisted content: its source script and a snapshot of the
/// declarations it defines, keyed by declaration name in insertion order
/// (the snapshot feeds the optional prototype-vector cache).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TheorySnapshot {
    pub descriptor: TheoryDescriptor,
    pub source: String,
    pub declarations: IndexMap<String, Value>,
}

/// Filesystem-backed store rooted at a working directory, matching the
/// `theories/<name>/theory.spockdsl` + `metadata.json` + optional cache
/// layout.
#[derive(Debug, Clone)]
pub struct TheoryStore {
    root: PathBuf,
}

impl TheoryStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn theory_dir(&self, name: &str) -> PathBuf {
        self.root.join("theories").join(name)
    }

    /// Writes `theory.spockdsl`, `metadata.json`, and a `postcard`-encoded
    /// declaration cache for one theory version.
    pub fn save(&self, snapshot: &TheorySnapshot) -> SpockResult<()> {
        let dir = self.theory_dir(&snapshot.descriptor.name);
        fs::create_dir_all(&dir).map_err(|e| SpockError::Storage(e.to_string()))?;

        fs::write(dir.join("theory.spockdsl"), &snapshot.source).map_err(|e| SpockError::Storage(e.to_string()))?;

        let metadata_json =
            serde_json::to_vec_pretty(&snapshot.descriptor).map_err(|e| SpockError::Storage(e.to_string()))?;
        fs::write(dir.join("metadata.json"), metadata_json).map_err(|e| SpockError::Storage(e.to_string()))?;

        let cache = postcard::to_allocvec(&snapshot.declarations).map_err(|e| SpockError::Storage(e.to_string()))?;
        fs::write(dir.join("declarations.cache"), cache).map_err(|e| SpockError::Storage(e.to_string()))?;

        tracing::debug!(theory = %snapshot.descriptor.name, version = %snapshot.descriptor.version, "saved theory");
        Ok(())
    }

    /// Loads a theory's most recently saved version. Returns
    /// `SpockError::TheoryNotFound` if no directory exists for `name`.
    pub fn load(&self, name: &str) -> SpockResult<TheorySnapshot> {
        let dir = self.theory_dir(name);
        if !dir.is_dir() {
            return Err(SpockError::TheoryNotFound { name: name.to_string() });
        }

        let source = fs::read_to_string(dir.join("theory.spockdsl")).map_err(|e| SpockError::Storage(e.to_string()))?;
        let metadata_json = fs::read(dir.join("metadata.json")).map_err(|e| SpockError::Storage(e.to_string()))?;
        let descriptor: TheoryDescriptor =
            serde_json::from_slice(&metadata_json).map_err(|e| SpockError::Storage(e.to_string()))?;

        let declarations = match fs::read(dir.join("declarations.cache")) {
            Ok(bytes) => postcard::from_bytes(&bytes).map_err(|e| SpockError::Storage(e.to_string()))?,
            Err(_) => IndexMap::new(),
        };

        tracing::debug!(theory = %name, version = %descriptor.version, "loaded theory");
        Ok(TheorySnapshot { descriptor, source, declarations })
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.theory_dir(name).is_dir()
    }

    /// Every theory name with a directory under `theories/`.
    pub fn list_names(&self) -> SpockResult<Vec<String>> {
        let theories_dir = self.root.join("theories");
        if !theories_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names: BTreeMap<String, ()> = BTreeMap::new();
        for entry in fs::read_dir(&theories_dir).map_err(|e| SpockError::Storage(e.to_string()))? {
            let entry = entry.map_err(|e| SpockError::Storage(e.to_string()))?;
            if entry.path().is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                names.insert(name.to_string(), ());
            }
        }
        Ok(names.into_keys().collect())
    }

    pub fn save_truth(&self, constants: &TruthConstants) -> SpockResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| SpockError::Storage(e.to_string()))?;
        fs::write(self.root.join("truth.bin"), constants.to_bytes()).map_err(|e| SpockError::Storage(e.to_string()))
    }

    pub fn load_truth(&self, dim: usize) -> SpockResult<Option<TruthConstants>> {
        let path = self.root.join("truth.bin");
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| SpockError::Storage(e.to_string()))?;
        Ok(Some(TruthConstants::from_bytes(&bytes, dim)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips_descriptor_and_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = TheoryStore::new(dir.path().to_path_buf());
        let descriptor = TheoryDescriptor::new("physics", None);
        let snapshot = TheorySnapshot {
            descriptor: descriptor.clone(),
            source: "@a believes b\n".to_string(),
            declarations: IndexMap::new(),
        };
        store.save(&snapshot).unwrap();
        let loaded = store.load("physics").unwrap();
        assert_eq!(loaded.descriptor.version, descriptor.version);
        assert_eq!(loaded.source, snapshot.source);
    }

    #[test]
    fn load_missing_theory_is_theory_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = TheoryStore::new(dir.path().to_path_buf());
        assert!(matches!(store.load("nope"), Err(SpockError::TheoryNotFound { .. })));
    }

    #[test]
    fn truth_constants_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TheoryStore::new(dir.path().to_path_buf());
        let constants = TruthConstants {
            truth: Vector::from_vec(vec![1.0, 0.0, 0.0, 0.0]),
            falsehood: Vector::from_vec(vec![-1.0, 0.0, 0.0, 0.0]),
            zero: Vector::zeros(4),
        };
        store.save_truth(&constants).unwrap();
        let loaded = store.load_truth(4).unwrap().unwrap();
        assert_eq!(loaded, constants);
    }
}
