//! Elimination Record Store.
//!
//! A single JSON document holds every space. Each mutation reloads the whole
//! file, applies the change and rewrites it through a temporary file and an
//! atomic rename, so readers never observe a partial document. Mutations are
//! serialized process-wide by one write lock.

use banroyale_types::{EliminationRecord, MemberId, SpaceDocument, SpaceId, StoreDocument};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read record store {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse record store {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode record store: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write record store {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RecordStore {
    /// The backing file need not exist yet; a missing file reads as empty.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_all(&self) -> Result<StoreDocument, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoreDocument::default()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(StoreDocument::default());
        }
        serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn load(&self, space: SpaceId) -> Result<SpaceDocument, StoreError> {
        Ok(self.load_all()?.space(space).cloned().unwrap_or_default())
    }

    pub fn save(
        &self,
        space: SpaceId,
        member: MemberId,
        record: EliminationRecord,
    ) -> Result<(), StoreError> {
        self.mutate(|doc| {
            doc.space_mut(space).insert(member, record);
            ((), true)
        })
    }

    /// Returns false if no record existed for the member.
    pub fn remove(&self, space: SpaceId, member: MemberId) -> Result<bool, StoreError> {
        self.mutate(|doc| {
            let removed = doc.space_mut(space).remove(member).is_some();
            doc.prune(space);
            (removed, removed)
        })
    }

    /// Returns false if the checkpoint was already logged.
    pub fn add_checkpoint(&self, space: SpaceId, pct: u8) -> Result<bool, StoreError> {
        self.mutate(|doc| {
            let added = doc.space_mut(space).add_checkpoint(pct);
            (added, added)
        })
    }

    pub fn list_checkpoints(&self, space: SpaceId) -> Result<BTreeSet<u8>, StoreError> {
        Ok(self.load(space)?.checkpoints().clone())
    }

    /// Delete every record and checkpoint of the space. Returns false if
    /// nothing was stored for it.
    pub fn reset(&self, space: SpaceId) -> Result<bool, StoreError> {
        self.mutate(|doc| {
            let existed = doc.remove_space(space).is_some();
            (existed, existed)
        })
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut StoreDocument) -> (T, bool)) -> Result<T, StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut doc = self.load_all()?;
        let (out, dirty) = apply(&mut doc);
        if dirty {
            self.write(&doc)?;
        }
        Ok(out)
    }

    fn write(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let encoded = serde_json::to_string_pretty(doc).map_err(StoreError::Encode)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, encoded).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;
        debug!(path = ?self.path, "record store written");
        Ok(())
    }
}
