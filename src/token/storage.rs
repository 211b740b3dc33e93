use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persistent key-value slot backing the token store.
///
/// Failures are reported to the caller, which decides whether they matter;
/// [`TokenStore`](super::TokenStore) logs and ignores them.
pub trait CredentialStorage: Send + Sync {
    fn load(&self, key: &str) -> io::Result<Option<String>>;
    fn save(&self, key: &str, value: Option<&str>) -> io::Result<()>;
}

/// Process-local storage; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        storage
    }
}

impl CredentialStorage for MemoryStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| io::Error::other("memory storage poisoned"))?;
        Ok(slots.get(key).cloned())
    }

    fn save(&self, key: &str, value: Option<&str>) -> io::Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| io::Error::other("memory storage poisoned"))?;
        match value {
            Some(v) => slots.insert(key.to_string(), v.to_string()),
            None => slots.remove(key),
        };
        Ok(())
    }
}

/// One plain-text file per key inside `dir`.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl CredentialStorage for FileStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.slot_path(key)) {
            Ok(contents) => {
                let value = contents.trim();
                Ok((!value.is_empty()).then(|| value.to_string()))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn save(&self, key: &str, value: Option<&str>) -> io::Result<()> {
        let path = self.slot_path(key);
        match value {
            Some(v) => {
                std::fs::create_dir_all(&self.dir)?;
                // temp file + rename so a crash never leaves a half-written token
                let tmp = self.dir.join(format!(".{key}.tmp.{}", std::process::id()));
                std::fs::write(&tmp, v.as_bytes())?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
                }
                std::fs::rename(&tmp, &path)
            }
            None => match std::fs::remove_file(&path) {
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_roundtrips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));
        assert_eq!(storage.load("k").unwrap(), None);

        storage.save("k", Some("abc")).unwrap();
        assert_eq!(storage.load("k").unwrap().as_deref(), Some("abc"));

        storage.save("k", None).unwrap();
        assert_eq!(storage.load("k").unwrap(), None);
        // clearing an absent slot is not an error
        storage.save("k", None).unwrap();
    }

    #[test]
    fn memory_storage_is_keyed() {
        let storage = MemoryStorage::with_value("a", "1");
        assert_eq!(storage.load("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.load("b").unwrap(), None);
    }
}
