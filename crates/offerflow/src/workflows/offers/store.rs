//! Whole-collection persistence over a named key-value substrate.
//!
//! Every mutation is read-all, modify in memory, write-all. The substrate is
//! last-writer-wins per key and gives no atomicity across the three collections;
//! callers that share a data directory between processes need their own locking.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::domain::{Application, Student, Task};

pub const STUDENTS_KEY: &str = "offerflow_students";
pub const APPLICATIONS_KEY: &str = "offerflow_applications";
pub const TASKS_KEY: &str = "offerflow_tasks";

/// Persistence substrate: opaque string payloads by named key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Error enumeration for persistence failures. All variants are fatal to the caller.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("stored payload for '{collection}' is malformed: {source}")]
    Integrity {
        collection: &'static str,
        source: serde_json::Error,
    },
    #[error("failed to encode '{collection}': {source}")]
    Encode {
        collection: &'static str,
        source: serde_json::Error,
    },
    #[error("storage io failure for key '{key}': {source}")]
    Io { key: String, source: io::Error },
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// In-process substrate used by tests and the demo command.
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw payload, bypassing serialization.
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .lock()
            .expect("store mutex poisoned")
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("store mutex poisoned")
            .get(key)
            .cloned()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .expect("store mutex poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a data directory.
///
/// Writers stage into their own `.<key>.json.<token>.tmp` file and rename it over the
/// live file. Writes through clones of one store are serialised.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileKeyValueStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn staging_path_for(&self, key: &str) -> PathBuf {
        let token = Uuid::new_v4().simple().to_string();
        self.root.join(format!(".{key}.json.{token}.tmp"))
    }
}

fn write_staged(staging: &Path, value: &str) -> io::Result<()> {
    let mut file = fs::File::create(staging)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let staging = self.staging_path_for(key);
        let io_error = |source: io::Error| StoreError::Io {
            key: key.to_string(),
            source,
        };

        // the guard protects no data, so a poisoned lock is still usable
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // rename is atomic on the same filesystem, readers see old or new payload
        let result = write_staged(&staging, value).and_then(|()| fs::rename(&staging, &path));
        if result.is_err() {
            let _ = fs::remove_file(&staging);
        }
        result.map_err(io_error)
    }
}

/// Marker for one persisted collection.
pub trait Collection {
    const KEY: &'static str;
    type Record: Serialize + DeserializeOwned;
}

pub struct Students;
pub struct Applications;
pub struct Tasks;

impl Collection for Students {
    const KEY: &'static str = STUDENTS_KEY;
    type Record = Student;
}

impl Collection for Applications {
    const KEY: &'static str = APPLICATIONS_KEY;
    type Record = Application;
}

impl Collection for Tasks {
    const KEY: &'static str = TASKS_KEY;
    type Record = Task;
}

/// Typed load-all/save-all over a [`KeyValueStore`].
pub struct EntityStore<K> {
    kv: Arc<K>,
}

impl<K> Clone for EntityStore<K> {
    fn clone(&self) -> Self {
        Self {
            kv: self.kv.clone(),
        }
    }
}

impl<K: KeyValueStore> EntityStore<K> {
    pub fn new(kv: Arc<K>) -> Self {
        Self { kv }
    }

    pub fn substrate(&self) -> &Arc<K> {
        &self.kv
    }

    /// Missing or blank payloads are an empty collection; anything unparseable is an
    /// integrity error rather than silently empty.
    pub fn load_all<C: Collection>(&self) -> Result<Vec<C::Record>, StoreError> {
        match self.kv.get(C::KEY)? {
            None => Ok(Vec::new()),
            Some(payload) if payload.trim().is_empty() => Ok(Vec::new()),
            Some(payload) => {
                serde_json::from_str(&payload).map_err(|source| StoreError::Integrity {
                    collection: C::KEY,
                    source,
                })
            }
        }
    }

    pub fn save_all<C: Collection>(&self, records: &[C::Record]) -> Result<(), StoreError> {
        let payload = serde_json::to_string(records).map_err(|source| StoreError::Encode {
            collection: C::KEY,
            source,
        })?;
        self.kv.set(C::KEY, &payload)
    }

    pub fn students(&self) -> Result<Vec<Student>, StoreError> {
        self.load_all::<Students>()
    }

    pub fn applications(&self) -> Result<Vec<Application>, StoreError> {
        self.load_all::<Applications>()
    }

    pub fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.load_all::<Tasks>()
    }
}
