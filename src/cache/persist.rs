//! Snapshot persistence — best-effort cache warm-up across sessions.
//!
//! The cache is serialized to a versioned JSON file (the durable
//! `translation-cache` slot) and read back at startup. Persistence is
//! advisory only: the snapshot is never a source of truth, a corrupt or
//! missing file simply means a cold start, and a failed save is logged
//! and forgotten. Nothing here may abort startup or block cache operation.
//!
//! Writes go through tmp + rename so a crash mid-save can't leave a torn
//! file, and the single persister task plus atomic rename means concurrent
//! save pressure resolves to last-write-wins (see
//! [`maintenance`](crate::gateway::maintenance)).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::warn;

use super::{CacheEntry, CacheKey};
use crate::types::ContentBundle;
use crate::{BragiError, Result};

/// Maximum supported snapshot format version.
const MAX_SUPPORTED_VERSION: u32 = 1;

/// Default snapshot path: `<platform cache dir>/bragi/translation-cache.json`.
pub fn default_snapshot_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("bragi")
        .join("translation-cache.json")
}

/// One cache entry in snapshot form, key flattened alongside the metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEntry {
    /// Entry namespace.
    pub namespace: String,
    /// Entry language.
    pub language: String,
    /// The cached bundle.
    pub data: ContentBundle,
    /// Creation/refresh time (epoch ms).
    pub timestamp: u64,
    /// Last live hit (epoch ms).
    pub last_access: u64,
    /// Accumulated hit count.
    pub hits: u64,
}

impl PersistedEntry {
    pub(crate) fn from_parts(key: &CacheKey, entry: &CacheEntry) -> Self {
        Self {
            namespace: key.namespace.clone(),
            language: key.language.clone(),
            data: entry.data.clone(),
            timestamp: entry.timestamp,
            last_access: entry.last_access,
            hits: entry.hits,
        }
    }

    pub(crate) fn into_parts(self) -> (CacheKey, CacheEntry) {
        (
            CacheKey {
                namespace: self.namespace,
                language: self.language,
            },
            CacheEntry {
                data: self.data,
                timestamp: self.timestamp,
                last_access: self.last_access,
                hits: self.hits,
            },
        )
    }
}

/// Versioned snapshot payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version (currently 1).
    pub version: u32,
    /// Persisted cache entries.
    pub entries: Vec<PersistedEntry>,
}

/// Parse a snapshot payload, rejecting unsupported future versions.
fn parse_snapshot(json: &str) -> Result<Vec<PersistedEntry>> {
    let snapshot: Snapshot = serde_json::from_str(json)
        .map_err(|e| BragiError::Snapshot(format!("failed to parse snapshot JSON: {e}")))?;
    if snapshot.version > MAX_SUPPORTED_VERSION {
        return Err(BragiError::Snapshot(format!(
            "unsupported snapshot version {} (max supported: {MAX_SUPPORTED_VERSION})",
            snapshot.version
        )));
    }
    Ok(snapshot.entries)
}

/// Load a persisted snapshot from disk.
///
/// Returns `None` on a missing or corrupt file. Corruption is logged at
/// warn and discarded — cold start, never partial repair.
pub fn load_snapshot(path: &Path) -> Option<Vec<PersistedEntry>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read cache snapshot");
            return None;
        }
    };
    match parse_snapshot(&content) {
        Ok(entries) => Some(entries),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt cache snapshot, starting cold");
            None
        }
    }
}

/// Save snapshot entries to disk (atomic write via tmp + rename).
pub fn save_snapshot(path: &Path, entries: Vec<PersistedEntry>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            BragiError::Snapshot(format!(
                "failed to create snapshot dir {}: {e}",
                parent.display()
            ))
        })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let snapshot = Snapshot {
        version: 1,
        entries,
    };
    let json = serde_json::to_string(&snapshot)
        .map_err(|e| BragiError::Snapshot(format!("failed to serialize snapshot: {e}")))?;
    std::fs::write(&tmp_path, &json).map_err(|e| {
        BragiError::Snapshot(format!(
            "failed to write snapshot file {}: {e}",
            tmp_path.display()
        ))
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        BragiError::Snapshot(format!(
            "failed to rename snapshot file {} → {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;

    Ok(())
}

/// Dirty flag plus wakeup for the debounced persister task.
///
/// Mutating cache operations call [`mark`](DirtySignal::mark); the persister
/// awaits [`changed`](DirtySignal::changed), sleeps its debounce window, then
/// consumes the flag with [`take`](DirtySignal::take). Marks landing during
/// the window coalesce into the same save.
pub(crate) struct DirtySignal {
    dirty: AtomicBool,
    notify: Notify,
}

impl DirtySignal {
    pub(crate) fn new() -> Self {
        Self {
            dirty: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub(crate) fn mark(&self) {
        self.dirty.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    pub(crate) async fn changed(&self) {
        if self.dirty.load(Ordering::Acquire) {
            return;
        }
        self.notify.notified().await;
    }

    pub(crate) fn take(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_entry(namespace: &str) -> PersistedEntry {
        let mut data = ContentBundle::new();
        data.insert("title".into(), json!("Hello"));
        PersistedEntry {
            namespace: namespace.into(),
            language: "en".into(),
            data,
            timestamp: 1_000,
            last_access: 2_000,
            hits: 7,
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translation-cache.json");

        save_snapshot(&path, vec![sample_entry("page"), sample_entry("footer")]).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].namespace, "page");
        assert_eq!(loaded[0].hits, 7);
        assert_eq!(loaded[0].data["title"], json!("Hello"));
    }

    #[test]
    fn load_nonexistent_returns_none() {
        assert!(load_snapshot(Path::new("/nonexistent/translation-cache.json")).is_none());
    }

    #[test]
    fn load_corrupt_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translation-cache.json");
        std::fs::write(&path, "this is not valid json").unwrap();

        assert!(load_snapshot(&path).is_none());
    }

    #[test]
    fn unsupported_version_rejected() {
        let err = parse_snapshot(r#"{"version": 999, "entries": []}"#).unwrap_err();
        assert!(err.to_string().contains("unsupported snapshot version"));
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("cache.json");

        save_snapshot(&path, vec![sample_entry("page")]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translation-cache.json");
        save_snapshot(&path, vec![sample_entry("page")]).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn dirty_signal_coalesces_marks() {
        let signal = DirtySignal::new();
        signal.mark();
        signal.mark();
        signal.changed().await; // returns immediately, flag already set
        assert!(signal.take());
        assert!(!signal.take());
    }
}
