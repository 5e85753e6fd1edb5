//! File-backed [`KvStore`] backend.
//!
//! Each namespace is one JSON document at `{root}/{namespace}.json`. A handle
//! loads the namespace when it is opened and rewrites the whole file after
//! every mutation (temp file + rename), so a crash mid-write leaves either
//! the old or the new namespace on disk, never a torn one.
//!
//! [`StoreLimits::capacity`] applies to each namespace file on its own.
//! Handles only see their own namespace, so other files do not count.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::kv::{KvHandle, KvStore, OpenMode, StoreLimits, StoredValue};

/// Current on-disk namespace format version.
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct NamespaceFile {
    version: u32,
    entries: BTreeMap<String, StoredValue>,
}

/// Store persisting each namespace as a JSON file under a root directory.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    root: PathBuf,
    limits: StoreLimits,
}

impl FileKvStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the root directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        Self::with_limits(root, StoreLimits::default())
    }

    /// Open (or create) a store rooted at `root` with explicit limits.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the root directory cannot be created.
    pub fn with_limits(root: impl AsRef<Path>, limits: StoreLimits) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root, limits })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_path(&self, namespace: &str) -> StorageResult<PathBuf> {
        if namespace.contains(['/', '\\']) || namespace == "." || namespace == ".." {
            return Err(StorageError::InvalidNamespace(format!(
                "{namespace} is not a valid file name"
            )));
        }
        Ok(self.root.join(format!("{namespace}.json")))
    }
}

fn read_namespace(path: &Path) -> StorageResult<Option<NamespaceFile>> {
    let content = match fs::read(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::Io(e)),
    };
    let file: NamespaceFile = serde_json::from_slice(&content)
        .map_err(|e| StorageError::Serialization(format!("{}: {e}", path.display())))?;
    if file.version != FORMAT_VERSION {
        return Err(StorageError::Serialization(format!(
            "{}: unsupported namespace format version {}",
            path.display(),
            file.version
        )));
    }
    Ok(Some(file))
}

fn write_namespace(path: &Path, file: &NamespaceFile) -> StorageResult<()> {
    let data =
        serde_json::to_vec(file).map_err(|e| StorageError::Serialization(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl KvStore for FileKvStore {
    fn open(&self, namespace: &str, mode: OpenMode) -> StorageResult<Box<dyn KvHandle + '_>> {
        self.limits.check_namespace(namespace)?;
        let path = self.namespace_path(namespace)?;

        let data = match read_namespace(&path)? {
            Some(file) => file,
            None if mode.is_writable() => {
                let file = NamespaceFile {
                    version: FORMAT_VERSION,
                    entries: BTreeMap::new(),
                };
                write_namespace(&path, &file)?;
                debug!(namespace, path = %path.display(), "created namespace file");
                file
            },
            None => return Err(StorageError::NamespaceNotFound(namespace.to_owned())),
        };

        Ok(Box::new(FileHandle {
            limits: &self.limits,
            namespace: namespace.to_owned(),
            path,
            mode,
            data,
        }))
    }

    fn limits(&self) -> &StoreLimits {
        &self.limits
    }
}

struct FileHandle<'a> {
    limits: &'a StoreLimits,
    namespace: String,
    path: PathBuf,
    mode: OpenMode,
    data: NamespaceFile,
}

impl FileHandle<'_> {
    fn ensure_writable(&self) -> StorageResult<()> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(StorageError::ReadOnly(self.namespace.clone()))
        }
    }

    fn used_bytes(&self) -> usize {
        self.data
            .entries
            .values()
            .fold(0usize, |acc, v| acc.saturating_add(v.len()))
    }

    fn put(&mut self, key: &str, value: StoredValue) -> StorageResult<usize> {
        self.ensure_writable()?;
        self.limits.check_key(key)?;
        self.limits.check_value(key, value.len())?;

        if let Some(capacity) = self.limits.capacity {
            let replaced = self.data.entries.get(key).map_or(0, StoredValue::len);
            let available = capacity.saturating_sub(self.used_bytes().saturating_sub(replaced));
            if value.len() > available {
                return Err(StorageError::StorageFull {
                    needed: value.len(),
                    available,
                });
            }
        }

        let written = value.len();
        let previous = self.data.entries.insert(key.to_owned(), value);
        if let Err(e) = write_namespace(&self.path, &self.data) {
            // Keep the in-memory view consistent with what is on disk.
            match previous {
                Some(old) => self.data.entries.insert(key.to_owned(), old),
                None => self.data.entries.remove(key),
            };
            return Err(e);
        }
        Ok(written)
    }
}

impl KvHandle for FileHandle<'_> {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }

    fn exists(&self, key: &str) -> bool {
        self.data.entries.contains_key(key)
    }

    fn bytes_len(&self, key: &str) -> usize {
        self.data.entries.get(key).map_or(0, StoredValue::blob_len)
    }

    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> StorageResult<usize> {
        match self.data.entries.get(key) {
            Some(value) => value.copy_bytes_into(key, buf),
            None => Err(StorageError::NotFound(key.to_owned())),
        }
    }

    fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(match self.data.entries.get(key) {
            Some(StoredValue::Text(s)) => Some(s.clone()),
            _ => None,
        })
    }

    fn put_bytes(&mut self, key: &str, value: &[u8]) -> StorageResult<usize> {
        self.put(key, StoredValue::Bytes(value.to_vec()))
    }

    fn put_string(&mut self, key: &str, value: &str) -> StorageResult<usize> {
        self.put(key, StoredValue::Text(value.to_owned()))
    }

    fn remove(&mut self, key: &str) -> StorageResult<bool> {
        self.ensure_writable()?;
        let Some(previous) = self.data.entries.remove(key) else {
            return Ok(false);
        };
        if let Err(e) = write_namespace(&self.path, &self.data) {
            self.data.entries.insert(key.to_owned(), previous);
            return Err(e);
        }
        Ok(true)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.ensure_writable()?;
        let previous = std::mem::take(&mut self.data.entries);
        if let Err(e) = write_namespace(&self.path, &self.data) {
            self.data.entries = previous;
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_open_without_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.open("appcfg", OpenMode::ReadOnly),
            Err(StorageError::NamespaceNotFound(_))
        ));
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileKvStore::open(dir.path()).unwrap();
            let mut h = store.open("appcfg", OpenMode::ReadWrite).unwrap();
            h.put_bytes("blob", &[9, 8, 7]).unwrap();
            h.put_string("text", "{}").unwrap();
        }

        let store = FileKvStore::open(dir.path()).unwrap();
        let h = store.open("appcfg", OpenMode::ReadOnly).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(h.get_bytes("blob", &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[9, 8, 7]);
        assert_eq!(h.bytes_len("text"), 0);
        assert_eq!(h.get_string("text").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_namespace_with_separator_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.open("../etc", OpenMode::ReadWrite),
            Err(StorageError::InvalidNamespace(_))
        ));
    }

    #[test]
    fn test_clear_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path()).unwrap();
        {
            let mut h = store.open("appcfg", OpenMode::ReadWrite).unwrap();
            h.put_bytes("a", &[1]).unwrap();
            h.clear().unwrap();
        }
        let h = store.open("appcfg", OpenMode::ReadOnly).unwrap();
        assert!(!h.exists("a"));
    }

    #[test]
    fn test_capacity_is_per_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            FileKvStore::with_limits(dir.path(), StoreLimits::default().with_capacity(8)).unwrap();
        store
            .open("one", OpenMode::ReadWrite)
            .unwrap()
            .put_bytes("a", &[1; 8])
            .unwrap();

        let mut two = store.open("two", OpenMode::ReadWrite).unwrap();
        assert_eq!(two.put_bytes("a", &[2; 8]).unwrap(), 8);
        assert!(matches!(
            two.put_bytes("b", &[3; 1]),
            Err(StorageError::StorageFull { needed: 1, available: 0 })
        ));
    }

    #[test]
    fn test_corrupt_namespace_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("appcfg.json"), b"not json").unwrap();
        let store = FileKvStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.open("appcfg", OpenMode::ReadOnly),
            Err(StorageError::Serialization(_))
        ));
    }
}
