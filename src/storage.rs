use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Key-value persistence shared by page areas and global settings.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
}

impl<T: KeyValueStore> KeyValueStore for Rc<RefCell<T>> {
    fn get(&self, key: &str) -> Option<Value> {
        self.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.borrow_mut().set(key, value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// All keys in a single JSON object file, rewritten on every write.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStore {
    /// Opens `path`. A missing, empty or unreadable file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = load_object(&path);
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_object(path: &Path) -> Map<String, Value> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    if content.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(values)) => values,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "store file is not a JSON object; starting empty");
            Map::new()
        }
        Err(err) => {
            tracing::warn!(?err, path = %path.display(), "store file is malformed; starting empty");
            Map::new()
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create store folder {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.values).context("serialize store")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("write store file {}", self.path.display()))
    }
}
