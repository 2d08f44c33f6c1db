// Key/value persistence for saved progress
//
// The browser build talks to window.localStorage; native builds and tests
// use an in-memory map with the same semantics.

use std::collections::HashMap;

use crate::types::Result;
#[cfg(target_arch = "wasm32")]
use crate::types::MemoryMatchError;

/// String storage keyed by name, shaped after the Web Storage API
pub trait ProgressStorage {
    /// `Ok(None)` when nothing is stored under `key`
    fn load(&self, key: &str) -> Result<Option<String>>;

    fn save(&mut self, key: &str, value: &str) -> Result<()>;

    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<S: ProgressStorage + ?Sized> ProgressStorage for Box<S> {
    fn load(&self, key: &str) -> Result<Option<String>> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).save(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// In-memory storage for native builds and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    /// Pre-populate a key, e.g. with a payload written by an older build
    pub fn with_entry(key: &str, value: &str) -> MemoryStorage {
        let mut storage = MemoryStorage::new();
        storage.entries.insert(key.to_string(), value.to_string());
        storage
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl ProgressStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// window.localStorage
#[cfg(target_arch = "wasm32")]
pub struct BrowserStorage {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl BrowserStorage {
    pub fn new() -> Result<BrowserStorage> {
        let window = web_sys::window()
            .ok_or_else(|| MemoryMatchError::StorageError("no window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(js_error)?
            .ok_or_else(|| MemoryMatchError::StorageError("localStorage unavailable".to_string()))?;

        Ok(BrowserStorage { storage })
    }
}

#[cfg(target_arch = "wasm32")]
fn js_error(value: wasm_bindgen::JsValue) -> MemoryMatchError {
    MemoryMatchError::StorageError(format!("{:?}", value))
}

#[cfg(target_arch = "wasm32")]
impl ProgressStorage for BrowserStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.storage.get_item(key).map_err(js_error)
    }

    // setItem throws QuotaExceededError when storage is full
    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.storage.set_item(key, value).map_err(js_error)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.storage.remove_item(key).map_err(js_error)
    }
}
