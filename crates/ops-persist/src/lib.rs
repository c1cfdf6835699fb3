//! JSON file-backed snapshots for opsctl state.
//!
//! A [`JsonStore`] owns one snapshot file (`<dir>/<collection>.json`) holding a
//! map of string keys to serializable records, plus a sibling lock file
//! (`<dir>/<collection>.lock`). Several processes may share one directory:
//! readers hold a shared lock while loading, writers hold an exclusive lock
//! across load, change and save.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! use ops_persist::JsonStore;
//!
//! let store = JsonStore::new(Path::new(".opsctl"), "counters");
//! let _lock = store.lock_exclusive(Duration::from_millis(500))?;
//! let mut counters: HashMap<String, u64> = store.load()?;
//! *counters.entry("runs".to_string()).or_default() += 1;
//! store.save(&counters)?;
//! # Ok::<(), ops_persist::PersistError>(())
//! ```

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Delay between attempts to take a contended lock.
const LOCK_POLL: Duration = Duration::from_millis(5);

/// Errors raised by snapshot storage.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Reading, writing or locking a file failed.
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The snapshot exists but does not parse. It is left untouched on disk.
    #[error("corrupt snapshot {}: {source}", .path.display())]
    Corrupt {
        /// Snapshot file.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Another holder kept the lock for longer than the caller would wait.
    #[error("lock on {} not acquired within {waited:?}", .path.display())]
    LockTimeout {
        /// Lock file.
        path: PathBuf,
        /// How long the caller waited.
        waited: Duration,
    },
}

/// Result alias for snapshot operations.
pub type Result<T> = std::result::Result<T, PersistError>;

/// Snapshot file for a single named collection.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
    lock_path: PathBuf,
}

/// A held lock on a collection. Released when dropped.
#[derive(Debug)]
pub struct SnapshotLock {
    file: File,
    path: PathBuf,
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to release snapshot lock");
        }
    }
}

impl JsonStore {
    /// Creates a store for `collection` under `dir`. Nothing is touched on disk
    /// until the first lock or [`save`](Self::save).
    pub fn new(dir: &Path, collection: &str) -> Self {
        Self {
            path: dir.join(format!("{collection}.json")),
            lock_path: dir.join(format!("{collection}.lock")),
        }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Takes the collection lock for reading, waiting up to `timeout`.
    ///
    /// # Errors
    ///
    /// `LockTimeout` if a writer holds the lock for longer than `timeout`,
    /// `Io` if the lock file cannot be opened.
    pub fn lock_shared(&self, timeout: Duration) -> Result<SnapshotLock> {
        self.acquire(timeout, false)
    }

    /// Takes the collection lock for writing, waiting up to `timeout`.
    ///
    /// # Errors
    ///
    /// `LockTimeout` if any other holder keeps the lock for longer than
    /// `timeout`, `Io` if the lock file cannot be opened.
    pub fn lock_exclusive(&self, timeout: Duration) -> Result<SnapshotLock> {
        self.acquire(timeout, true)
    }

    /// Loads the collection. A missing file yields an empty map.
    ///
    /// # Errors
    ///
    /// `Io` if the file exists but cannot be read, `Corrupt` if it does not
    /// parse.
    pub fn load<T: DeserializeOwned>(&self) -> Result<HashMap<String, T>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot on disk");
                return Ok(HashMap::new());
            }
            Err(source) => return Err(io_error(&self.path, source)),
        };

        serde_json::from_slice(&raw).map_err(|source| {
            warn!(path = %self.path.display(), error = %source, "corrupt snapshot");
            PersistError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Writes the whole collection.
    ///
    /// The snapshot is written to a sibling temp file and renamed over the old
    /// one, so readers observe either the previous or the new snapshot.
    /// Callers sharing the directory with other processes must hold
    /// [`lock_exclusive`](Self::lock_exclusive) across their load and save.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created, the data cannot be
    /// serialized, or the file cannot be written or renamed.
    pub fn save<T: Serialize>(&self, data: &HashMap<String, T>) -> Result<()> {
        self.ensure_dir()?;

        let bytes = serde_json::to_vec_pretty(data)
            .map_err(|e| io_error(&self.path, io::Error::other(e)))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| io_error(&self.path, e))?;

        debug!(path = %self.path.display(), count = data.len(), "saved snapshot");
        Ok(())
    }

    fn acquire(&self, timeout: Duration, exclusive: bool) -> Result<SnapshotLock> {
        self.ensure_dir()?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| io_error(&self.lock_path, e))?;

        let deadline = Instant::now() + timeout;
        loop {
            let attempt = if exclusive {
                FileExt::try_lock_exclusive(&file)
            } else {
                FileExt::try_lock_shared(&file)
            };
            match attempt {
                Ok(()) => {
                    return Ok(SnapshotLock {
                        file,
                        path: self.lock_path.clone(),
                    });
                }
                Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                    if Instant::now() >= deadline {
                        debug!(path = %self.lock_path.display(), exclusive, "snapshot lock contended");
                        return Err(PersistError::LockTimeout {
                            path: self.lock_path.clone(),
                            waited: timeout,
                        });
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(e) => return Err(io_error(&self.lock_path, e)),
            }
        }
    }

    fn ensure_dir(&self) -> Result<()> {
        match self.path.parent() {
            Some(parent) => fs::create_dir_all(parent).map_err(|e| io_error(parent, e)),
            None => Ok(()),
        }
    }
}

fn io_error(path: &Path, source: io::Error) -> PersistError {
    PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    const WAIT: Duration = Duration::from_millis(20);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        hits: u32,
    }

    fn records() -> HashMap<String, Record> {
        let mut data = HashMap::new();
        data.insert(
            "a".to_string(),
            Record {
                name: "alpha".to_string(),
                hits: 3,
            },
        );
        data
    }

    mod snapshot_tests {
        use super::*;

        #[test]
        fn load_missing_file_is_empty() {
            let dir = tempfile::tempdir().expect("tempdir");
            let store = JsonStore::new(dir.path(), "records");
            let loaded: HashMap<String, Record> = store.load().expect("load");
            assert!(loaded.is_empty());
        }

        #[test]
        fn save_then_load() {
            let dir = tempfile::tempdir().expect("tempdir");
            let store = JsonStore::new(dir.path(), "records");
            store.save(&records()).expect("save");

            let reopened = JsonStore::new(dir.path(), "records");
            let loaded: HashMap<String, Record> = reopened.load().expect("load");
            assert_eq!(loaded, records());
        }

        #[test]
        fn save_creates_missing_directory() {
            let dir = tempfile::tempdir().expect("tempdir");
            let nested = dir.path().join("state").join("alerts");
            let store = JsonStore::new(&nested, "records");

            store.save(&HashMap::<String, Record>::new()).expect("save");
            assert!(store.path().exists());
        }

        #[test]
        fn corrupt_snapshot_is_an_error_and_left_in_place() {
            let dir = tempfile::tempdir().expect("tempdir");
            let store = JsonStore::new(dir.path(), "records");
            fs::write(store.path(), b"{not json").expect("write");

            let result: Result<HashMap<String, Record>> = store.load();
            assert!(matches!(result, Err(PersistError::Corrupt { .. })));
            assert_eq!(fs::read(store.path()).expect("read"), b"{not json");
        }

        #[test]
        fn unreadable_snapshot_is_an_error() {
            let dir = tempfile::tempdir().expect("tempdir");
            let store = JsonStore::new(dir.path(), "records");
            fs::create_dir(store.path()).expect("mkdir");

            let result: Result<HashMap<String, Record>> = store.load();
            assert!(matches!(result, Err(PersistError::Io { .. })));
        }

        #[test]
        fn save_leaves_no_temp_file() {
            let dir = tempfile::tempdir().expect("tempdir");
            let store = JsonStore::new(dir.path(), "records");
            store.save(&HashMap::<String, Record>::new()).expect("save");

            assert!(!dir.path().join("records.json.tmp").exists());
        }
    }

    mod lock_tests {
        use super::*;

        #[test]
        fn exclusive_lock_blocks_other_holders_until_dropped() {
            let dir = tempfile::tempdir().expect("tempdir");
            let first = JsonStore::new(dir.path(), "records");
            let second = JsonStore::new(dir.path(), "records");

            let held = first.lock_exclusive(WAIT).expect("first lock");
            assert!(matches!(
                second.lock_exclusive(WAIT),
                Err(PersistError::LockTimeout { .. })
            ));
            assert!(matches!(
                second.lock_shared(WAIT),
                Err(PersistError::LockTimeout { .. })
            ));

            drop(held);
            second.lock_exclusive(WAIT).expect("lock after release");
        }

        #[test]
        fn shared_locks_coexist() {
            let dir = tempfile::tempdir().expect("tempdir");
            let store = JsonStore::new(dir.path(), "records");

            let a = store.lock_shared(WAIT).expect("first reader");
            let b = store.lock_shared(WAIT).expect("second reader");
            assert!(matches!(
                store.lock_exclusive(WAIT),
                Err(PersistError::LockTimeout { .. })
            ));
            drop((a, b));
        }

        #[test]
        fn waiter_gets_lock_once_released() {
            let dir = tempfile::tempdir().expect("tempdir");
            let store = JsonStore::new(dir.path(), "records");
            let held = store.lock_exclusive(WAIT).expect("lock");

            let waiter = {
                let store = store.clone();
                thread::spawn(move || store.lock_exclusive(Duration::from_secs(5)).is_ok())
            };
            thread::sleep(Duration::from_millis(50));
            drop(held);

            assert!(waiter.join().expect("waiter thread"));
        }
    }
}
