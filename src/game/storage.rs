//! Durable local state: the participant id and the result log.
//!
//! In the browser this is `localStorage`, reached through `wasm-bindgen`
//! bindings. Native builds (tests) use [`MemoryStorage`].

use std::collections::HashMap;
use std::fmt::Debug;

use crate::error::EngineError;
use crate::game::results::ResultLog;

pub trait Storage: Debug {
    fn get_item(&self, key: &str) -> Result<Option<String>, EngineError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), EngineError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, EngineError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use wasm_bindgen::prelude::*;

    use super::Storage;
    use crate::error::EngineError;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(catch, js_namespace = localStorage, js_name = getItem)]
        fn local_get_item(key: &str) -> Result<Option<String>, JsValue>;

        #[wasm_bindgen(catch, js_namespace = localStorage, js_name = setItem)]
        fn local_set_item(key: &str, value: &str) -> Result<(), JsValue>;
    }

    #[derive(Debug, Default)]
    pub struct BrowserStorage;

    impl Storage for BrowserStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, EngineError> {
            local_get_item(key).map_err(|e| EngineError::Storage(format!("{:?}", e)))
        }

        fn set_item(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
            local_set_item(key, value).map_err(|e| EngineError::Storage(format!("{:?}", e)))
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserStorage;

/// Storage backend for the current target.
pub fn default_storage() -> Box<dyn Storage> {
    #[cfg(target_arch = "wasm32")]
    {
        Box::new(BrowserStorage)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(MemoryStorage::default())
    }
}

/// Return the stored participant id, creating and storing a v4 UUID on
/// first use.
pub fn load_or_create_user_id(storage: &mut dyn Storage, key: &str) -> Result<String, EngineError> {
    if let Some(id) = storage.get_item(key)? {
        if !id.trim().is_empty() {
            return Ok(id);
        }
    }
    let id = uuid::Uuid::new_v4().to_string();
    storage.set_item(key, &id)?;
    log::info!("created participant id {}", id);
    Ok(id)
}

/// Read the stored log. Unreadable content is logged and treated as empty.
pub fn load_results(storage: &dyn Storage, key: &str) -> Result<ResultLog, EngineError> {
    let Some(json) = storage.get_item(key)? else {
        return Ok(ResultLog::default());
    };
    match ResultLog::from_json(&json) {
        Ok(log) => Ok(log),
        Err(e) => {
            log::warn!("discarding unreadable result log: {}", e);
            Ok(ResultLog::default())
        }
    }
}

pub fn save_results(storage: &mut dyn Storage, key: &str, results: &ResultLog) -> Result<(), EngineError> {
    storage.set_item(key, &results.to_json()?)
}
