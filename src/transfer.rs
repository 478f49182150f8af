//! Transfer state: values computed by a server-side render pass, handed to the
//! client process that takes over.
//!
//! The server writes slots while it renders, serializes the whole store into a
//! JSON payload, and ships it with the page. The client rebuilds the store from
//! that payload at bootstrap and reads slots instead of repeating the requests
//! that produced them. Slots are keyed by name and typed through [`StateKey`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Failed to access transfer state file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid transfer state payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Typed name of a transfer-state slot.
pub struct StateKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StateKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for StateKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StateKey<T> {}

impl<T> fmt::Debug for StateKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateKey").field(&self.name).finish()
    }
}

/// Shared handle to the transfer-state store.
///
/// Clones share the same slots, so the service that fills a slot and the
/// bootstrap code that serializes the payload can hold separate handles.
#[derive(Debug, Clone, Default)]
pub struct TransferState {
    slots: Arc<RwLock<Map<String, Value>>>,
}

impl TransferState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a payload produced by [`TransferState::to_json`].
    pub fn from_json(payload: &str) -> Result<Self, TransferError> {
        let slots: Map<String, Value> = serde_json::from_str(payload)?;
        Ok(Self {
            slots: Arc::new(RwLock::new(slots)),
        })
    }

    /// Serialize every slot into a single JSON object.
    pub fn to_json(&self) -> Result<String, TransferError> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        Ok(serde_json::to_string(&*slots)?)
    }

    /// Load a payload file. A missing or empty file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, TransferError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No transfer state file, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(TransferError::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        let state = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), slots = state.len(), "Loaded transfer state");
        Ok(state)
    }

    /// Write the payload to `path` via a temp file and rename, so a reader
    /// never observes a half-written payload.
    pub fn save(&self, path: &Path) -> Result<(), TransferError> {
        let payload = self.to_json()?;
        let temp_path = path.with_extension(format!("tmp.{}", std::process::id()));

        let result = (|| {
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(payload.as_bytes())?;
            file.sync_all()?;
            drop(file);
            std::fs::rename(&temp_path, path)
        })();

        if let Err(e) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(TransferError::Io(e));
        }

        tracing::debug!(path = %path.display(), bytes = payload.len(), "Saved transfer state");
        Ok(())
    }

    pub fn has_key<T>(&self, key: &StateKey<T>) -> bool {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key.name)
    }

    /// Read a slot. A slot whose JSON does not decode as `T` reads as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &StateKey<T>) -> Option<T> {
        let value = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key.name)
            .cloned()?;

        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key = key.name, error = %e, "Ignoring undecodable transfer state slot");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &StateKey<T>, value: &T) -> Result<(), TransferError> {
        let value = serde_json::to_value(value)?;
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.name.to_string(), value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
