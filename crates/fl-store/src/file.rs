//! File-backed key-value store.
//!
//! The whole keyspace is held in memory and mirrored to a single JSON
//! document whose values are hex-encoded. Every successful write rewrites the
//! document through a temporary file in the same directory followed by a
//! rename, so a crash leaves either the old or the new image on disk.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;

const IMAGE_VERSION: u32 = 1;

/// On-disk layout of a [`FileKvStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreImage {
    version: u32,
    /// Key to hex-encoded value.
    entries: BTreeMap<String, String>,
}

/// A [`KvStore`] persisted to one JSON file.
///
/// Intended for the command-line driver and small local ledgers. All access
/// is serialized through a mutex; `compare_and_swap` is atomic.
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl FileKvStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read(&path)?;
            decode_image(&raw)?
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "opened file store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All keys in lexicographic order.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    /// Insert under the held lock and persist, restoring the previous value
    /// if the file could not be rewritten.
    fn insert_and_persist(
        &self,
        entries: &mut BTreeMap<String, Vec<u8>>,
        key: &str,
        value: &[u8],
    ) -> StoreResult<()> {
        let previous = entries.insert(key.to_string(), value.to_vec());
        if let Err(e) = self.persist(entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self, entries: &BTreeMap<String, Vec<u8>>) -> StoreResult<()> {
        let image = StoreImage {
            version: IMAGE_VERSION,
            entries: entries
                .iter()
                .map(|(k, v)| (k.clone(), hex::encode(v)))
                .collect(),
        };
        let encoded = serde_json::to_vec_pretty(&image)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&encoded)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        debug!(path = %self.path.display(), keys = entries.len(), "file store persisted");
        Ok(())
    }
}

fn decode_image(raw: &[u8]) -> StoreResult<BTreeMap<String, Vec<u8>>> {
    let image: StoreImage =
        serde_json::from_slice(raw).map_err(|e| StoreError::Serialization(e.to_string()))?;
    if image.version != IMAGE_VERSION {
        return Err(StoreError::Serialization(format!(
            "unsupported store image version {}",
            image.version
        )));
    }
    image
        .entries
        .into_iter()
        .map(|(k, v)| {
            let bytes = hex::decode(&v).map_err(|e| StoreError::Corrupt {
                key: k.clone(),
                reason: format!("invalid hex value: {e}"),
            })?;
            Ok((k, bytes))
        })
        .collect()
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut entries = self.lock()?;
        self.insert_and_persist(&mut entries, key, value)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: &[u8],
    ) -> StoreResult<bool> {
        let mut entries = self.lock()?;
        if entries.get(key).map(Vec::as_slice) != expected {
            return Ok(false);
        }
        self.insert_and_persist(&mut entries, key, value)?;
        Ok(true)
    }
}
