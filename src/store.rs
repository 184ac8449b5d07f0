//! Durable record store backed by a single JSON file.
//!
//! The file holds the whole collection as a pretty-printed JSON array of
//! [`Record`]s (4-space indent, no envelope). The store is append-only from
//! the pipeline's point of view: [`JsonStore::merge`] adds records whose
//! `link` is not yet present and never rewrites existing ones.
//!
//! # Concurrency
//!
//! `merge` is a load-modify-save cycle. It runs under an async mutex shared
//! by every [`JsonStore`] in the process that points at the same file, so
//! two handles on one path never interleave their cycles. Each save writes
//! a fresh temporary file next to the store and renames it over the old
//! one; readers see either the previous or the next collection.
//!
//! Separate processes writing the same file are not coordinated.
//!
//! # Corrupt files
//!
//! [`JsonStore::load`] treats a missing, unreadable or unparseable file as
//! an empty store (logged at `warn`). A subsequent `merge` will then replace
//! the damaged file.

use crate::error::StoreError;
use crate::models::Record;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::collections::{HashMap, HashSet};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Merge locks, one per store file, shared by all handles in the process.
static MERGE_LOCKS: Lazy<std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| std::sync::Mutex::new(HashMap::new()));

/// The merge lock for `path`, created on first use.
///
/// Paths are made absolute first so `data/updates.json` and
/// `./data/updates.json` share a lock.
fn merge_lock(path: &Path) -> Arc<Mutex<()>> {
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut locks = MERGE_LOCKS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(locks.entry(key).or_default())
}

#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonStore {
    /// Open a handle on the store file at `path`.
    ///
    /// Nothing is read or created until the first [`load`](Self::load) or
    /// [`merge`](Self::merge).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = merge_lock(&path);
        Self { path, lock }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full collection.
    ///
    /// # Returns
    ///
    /// Every stored record in insertion order. A missing, unreadable or
    /// corrupt file yields an empty vector rather than an error.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Vec<Record> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Store file does not exist yet");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Cannot read store; treating as empty");
                return Vec::new();
            }
        };
        match serde_json::from_slice::<Vec<Record>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Store file is corrupt; treating as empty");
                Vec::new()
            }
        }
    }

    /// Merge a batch of freshly fetched records into the store.
    ///
    /// Records whose link is already stored are dropped, as are later copies
    /// of a link repeated inside `batch` (first occurrence wins). Survivors
    /// are appended in batch order and the whole collection is written back.
    ///
    /// # Arguments
    ///
    /// * `batch` - Records produced by one sync cycle, in adapter order
    ///
    /// # Returns
    ///
    /// The number of records added, or a [`StoreError`] if the collection
    /// could not be written. On error the previous file is left in place.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), batch = batch.len()))]
    pub async fn merge(&self, batch: Vec<Record>) -> Result<usize, StoreError> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await;
        let mut known: HashSet<String> = records.iter().map(|r| r.link.clone()).collect();

        let before = records.len();
        for record in batch {
            if known.insert(record.link.clone()) {
                records.push(record);
            }
        }
        let added = records.len() - before;

        self.persist(&records).await?;
        info!(added, total = records.len(), "Merged batch into store");
        Ok(added)
    }

    /// Write the full collection, replacing the store file.
    async fn persist(&self, records: &[Record]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).await?;

        let bytes = to_pretty_json(records)?;
        let len = bytes.len();
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;

        debug!(bytes = len, "Persisted store");
        Ok(())
    }
}

fn to_pretty_json(records: &[Record]) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut out, formatter);
    records.serialize(&mut serializer)?;
    Ok(out)
}
