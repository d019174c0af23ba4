//! File-backed session storage.
//!
//! Persists the login flow's key/value pairs as a flat JSON object of
//! strings, rewritten in full on every change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use ledgerly_auth::{PersistError, SessionStorage};

use crate::error::StorageError;

#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    ///
    /// A missing file is an empty session. A file that exists but is not a
    /// JSON object of strings is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// `<data dir>/ledgerly/session.json`.
    pub fn default_path() -> Result<PathBuf, StorageError> {
        let base = dirs::data_dir()
            .or_else(|| {
                dirs::home_dir().map(|mut h| {
                    h.push(".local");
                    h.push("share");
                    h
                })
            })
            .ok_or_else(|| {
                StorageError::Location(
                    "tried data_dir() and home_dir()/.local/share".to_string(),
                )
            })?;

        let mut path = base;
        path.push("ledgerly");
        path.push("session.json");
        Ok(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), PersistError> {
        let fail = |source| PersistError {
            location: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(fail)?;
        }

        let json = serde_json::to_vec_pretty(entries).map_err(|e| fail(e.into()))?;

        // Write-then-rename so a crash never leaves a half-written session.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(fail)?;
        std::fs::rename(&tmp, &self.path).map_err(fail)?;
        Ok(())
    }

    /// Apply `op` to a copy, persist it, and only then publish it.
    fn update(
        &self,
        op: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), PersistError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let mut next = entries.clone();
        op(&mut next);
        self.persist(&next).inspect_err(|err| {
            tracing::error!("failed to persist session storage: {err}");
        })?;
        *entries = next;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), PersistError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> Result<(), PersistError> {
        self.update(|entries| entries.clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerly_auth::{Role, resolve_principal};

    fn scratch_path() -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("ledgerly-storage-{}", uuid::Uuid::now_v7()));
        path.push("session.json");
        path
    }

    #[test]
    fn missing_file_is_an_empty_session() {
        let storage = FileStorage::open(scratch_path()).unwrap();
        assert_eq!(storage.get("token"), None);
        assert!(resolve_principal(&storage).is_none());
    }

    #[test]
    fn writes_survive_reopen() {
        let path = scratch_path();
        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set("token", "abc").unwrap();
            storage.set("role", "Client").unwrap();
            storage.set("scratch", "x").unwrap();
            storage.remove("scratch").unwrap();
        }

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("token").as_deref(), Some("abc"));
        assert_eq!(reopened.get("scratch"), None);
        assert_eq!(resolve_principal(&reopened).map(|p| p.role), Some(Role::Customer));

        reopened.clear().unwrap();
        assert!(FileStorage::open(&path).unwrap().get("token").is_none());
    }

    #[test]
    fn failed_write_keeps_previous_state() {
        let path = scratch_path();
        let storage = FileStorage::open(&path).unwrap();
        storage.set("token", "abc").unwrap();

        // A directory where the temp file goes makes every write fail.
        std::fs::create_dir_all(path.with_extension("json.tmp")).unwrap();

        assert!(storage.clear().is_err());
        assert!(storage.set("role", "admin").is_err());
        assert_eq!(storage.get("token").as_deref(), Some("abc"));
        assert_eq!(storage.get("role"), None);

        let on_disk = FileStorage::open(&path).unwrap();
        assert_eq!(on_disk.get("token").as_deref(), Some("abc"));
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let path = scratch_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"[1, 2, 3]").unwrap();
        assert!(matches!(FileStorage::open(&path), Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn default_path_ends_in_app_dir() {
        if let Ok(path) = FileStorage::default_path() {
            assert!(path.ends_with("ledgerly/session.json"));
        }
    }
}
