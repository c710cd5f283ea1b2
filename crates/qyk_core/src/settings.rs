use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::QykError;

/// A single value held by the key-value settings storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<u32> for SettingValue {
    fn from(value: u32) -> Self {
        SettingValue::Int(i64::from(value))
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Text(value)
    }
}

type Namespace = BTreeMap<String, SettingValue>;

/// Durable key-value storage grouped by namespace, the way platform
/// preference stores are. Reads never fail: anything absent or of the wrong
/// type comes back as `None` and callers fall back to their defaults.
pub trait SettingsStore: Send + Sync {
    fn get(&self, namespace: &str, key: &str) -> Option<SettingValue>;

    /// Writes every entry as one batch.
    fn put_many(&self, namespace: &str, entries: &[(&str, SettingValue)]) -> Result<(), QykError>;

    fn remove(&self, namespace: &str, key: &str) -> Result<(), QykError>;

    fn put(&self, namespace: &str, key: &str, value: SettingValue) -> Result<(), QykError> {
        self.put_many(namespace, &[(key, value)])
    }

    fn contains(&self, namespace: &str, key: &str) -> bool {
        self.get(namespace, key).is_some()
    }

    fn get_bool(&self, namespace: &str, key: &str) -> Option<bool> {
        match self.get(namespace, key) {
            Some(SettingValue::Bool(value)) => Some(value),
            _ => None,
        }
    }

    fn get_int(&self, namespace: &str, key: &str) -> Option<i64> {
        match self.get(namespace, key) {
            Some(SettingValue::Int(value)) => Some(value),
            _ => None,
        }
    }

    fn get_string(&self, namespace: &str, key: &str) -> Option<String> {
        match self.get(namespace, key) {
            Some(SettingValue::Text(value)) => Some(value),
            _ => None,
        }
    }
}

/// Process-local settings, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySettings {
    namespaces: RwLock<HashMap<String, Namespace>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, namespace: &str, key: &str) -> Option<SettingValue> {
        self.namespaces
            .read()
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .cloned()
    }

    fn put_many(&self, namespace: &str, entries: &[(&str, SettingValue)]) -> Result<(), QykError> {
        let mut namespaces = self.namespaces.write();
        let target = namespaces.entry(namespace.to_string()).or_default();
        for (key, value) in entries {
            target.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<(), QykError> {
        if let Some(entries) = self.namespaces.write().get_mut(namespace) {
            entries.remove(key);
        }
        Ok(())
    }
}

/// Settings kept as one JSON document per namespace inside `root`.
///
/// Namespaces are loaded on first access and cached. Every write goes to a
/// sibling temp file that is then renamed over the document, so readers see
/// either the old or the new batch.
#[derive(Debug)]
pub struct FileSettings {
    root: PathBuf,
    cache: RwLock<HashMap<String, Namespace>>,
}

impl FileSettings {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, QykError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| QykError::Storage {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn document_path(&self, namespace: &str) -> PathBuf {
        self.root.join(format!("{namespace}.json"))
    }

    fn load_namespace(&self, namespace: &str) -> Namespace {
        let path = self.document_path(namespace);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Namespace::new(),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "unable to read settings, using defaults");
                return Namespace::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "corrupt settings file, using defaults");
                Namespace::new()
            }
        }
    }

    fn with_namespace<T>(&self, namespace: &str, read: impl FnOnce(&Namespace) -> T) -> T {
        if let Some(entries) = self.cache.read().get(namespace) {
            return read(entries);
        }
        let loaded = self.load_namespace(namespace);
        let mut cache = self.cache.write();
        let entries = cache.entry(namespace.to_string()).or_insert(loaded);
        read(entries)
    }

    fn persist(&self, namespace: &str, entries: &Namespace) -> Result<(), QykError> {
        let path = self.document_path(namespace);
        let tmp = path.with_extension("json.tmp");
        let payload = serde_json::to_vec_pretty(entries)?;
        fs::write(&tmp, payload).map_err(|source| QykError::Storage {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| QykError::Storage { path, source })
    }

    fn update(&self, namespace: &str, apply: impl FnOnce(&mut Namespace)) -> Result<(), QykError> {
        let mut entries = self.with_namespace(namespace, Namespace::clone);
        apply(&mut entries);
        self.persist(namespace, &entries)?;
        self.cache.write().insert(namespace.to_string(), entries);
        Ok(())
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, namespace: &str, key: &str) -> Option<SettingValue> {
        self.with_namespace(namespace, |entries| entries.get(key).cloned())
    }

    fn put_many(&self, namespace: &str, entries: &[(&str, SettingValue)]) -> Result<(), QykError> {
        self.update(namespace, |target| {
            for (key, value) in entries {
                target.insert((*key).to_string(), value.clone());
            }
        })
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<(), QykError> {
        if !self.contains(namespace, key) {
            return Ok(());
        }
        self.update(namespace, |target| {
            target.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_reads_ignore_mismatched_values() {
        let store = MemorySettings::new();
        store.put("prefs", "hour", SettingValue::Text("nine".into())).unwrap();
        assert_eq!(store.get_int("prefs", "hour"), None);
        assert!(store.contains("prefs", "hour"));
        assert_eq!(store.get_bool("other", "hour"), None);
    }

    #[test]
    fn file_settings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileSettings::open(dir.path()).unwrap();
            store
                .put_many("prefs", &[("enabled", true.into()), ("hour", 7u32.into())])
                .unwrap();
        }
        let reopened = FileSettings::open(dir.path()).unwrap();
        assert_eq!(reopened.get_bool("prefs", "enabled"), Some(true));
        assert_eq!(reopened.get_int("prefs", "hour"), Some(7));
        assert!(!dir.path().join("prefs.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("prefs.json"), "{ not json").unwrap();
        let store = FileSettings::open(dir.path()).unwrap();
        assert_eq!(store.get("prefs", "enabled"), None);

        store.put("prefs", "enabled", false.into()).unwrap();
        assert_eq!(store.get_bool("prefs", "enabled"), Some(false));
    }

    #[test]
    fn removing_missing_key_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettings::open(dir.path()).unwrap();
        store.remove("prefs", "hour").unwrap();
        assert!(!dir.path().join("prefs.json").exists());
    }
}
