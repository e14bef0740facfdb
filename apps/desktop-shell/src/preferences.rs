//! Persisted key/value preferences
//!
//! Every successful `set` is echoed on the [`PreferenceStore::changes`] feed,
//! which the store's `preferences` listener turns into
//! `AppAction::PreferenceDidChange`. Writers never touch the tree directly.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::state::{PreferencesState, RATING_DID_RATE, RATING_LAST_CLICKED};

const CHANGE_FEED_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("preferences file i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("preferences could not be (de)serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid preferences document: {0}")]
    Invalid(String),
}

/// One persisted write
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceChange {
    pub key: String,
    pub value: Value,
}

pub trait PreferenceStore: Send + Sync {
    /// Current value, if set
    fn get(&self, key: &str) -> Option<Value>;

    /// Persist a value, then publish it on the change feed
    fn set(&self, key: &str, value: Value) -> Result<(), PreferenceError>;

    /// Feed of successful writes
    fn changes(&self) -> broadcast::Receiver<PreferenceChange>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn publish(tx: &broadcast::Sender<PreferenceChange>, key: &str, value: Value) {
    // No receivers is fine: nothing is listening yet
    let _ = tx.send(PreferenceChange {
        key: key.to_string(),
        value,
    });
}

/// In-memory preferences, lost on exit
#[derive(Debug)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, Value>>,
    tx: broadcast::Sender<PreferenceChange>,
}

impl Default for MemoryPreferences {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPreferences {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            values: Mutex::new(BTreeMap::new()),
            tx,
        }
    }

    /// Seed values without publishing them
    pub fn with_values<K: Into<String>>(values: impl IntoIterator<Item = (K, Value)>) -> Self {
        let prefs = Self::new();
        lock(&prefs.values).extend(values.into_iter().map(|(k, v)| (k.into(), v)));
        prefs
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<Value> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), PreferenceError> {
        lock(&self.values).insert(key.to_string(), value.clone());
        publish(&self.tx, key, value);
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<PreferenceChange> {
        self.tx.subscribe()
    }
}

/// Preferences kept in a JSON object document on disk
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
    tx: broadcast::Sender<PreferenceChange>,
}

impl JsonFilePreferences {
    /// Default location under the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("desktop-shell").join("preferences.json"))
    }

    /// Load the document at `path`; a missing file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => match serde_json::from_str::<Value>(&text)? {
                Value::Object(map) => map,
                other => {
                    return Err(PreferenceError::Invalid(format!(
                        "expected an object at the top level, found {}",
                        json_kind(&other)
                    )))
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = values.len(), "Preferences loaded");

        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self {
            path,
            values: Mutex::new(values),
            tx,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, values: &Map<String, Value>) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(values)?;
        // Write-then-rename so a crash never leaves a truncated document
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<Value> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), PreferenceError> {
        {
            let mut values = lock(&self.values);
            let previous = values.insert(key.to_string(), value.clone());
            if let Err(e) = self.write(&values) {
                // Keep memory and disk in agreement
                match previous {
                    Some(previous) => values.insert(key.to_string(), previous),
                    None => values.remove(key),
                };
                return Err(e);
            }
        }
        publish(&self.tx, key, value);
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<PreferenceChange> {
        self.tx.subscribe()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Seed the `preferences` slice from persisted values
///
/// Lenient: a value of the wrong type is logged and replaced by the default.
pub fn load_preferences_state(store: &dyn PreferenceStore) -> PreferencesState {
    let mut state = PreferencesState::default();

    match store.get(RATING_LAST_CLICKED) {
        None | Some(Value::Null) => {}
        Some(value) => match value.as_i64() {
            Some(ms) => state.rating_last_clicked = ms,
            None => tracing::warn!(
                key = RATING_LAST_CLICKED,
                found = json_kind(&value),
                "Ignoring persisted preference"
            ),
        },
    }

    match store.get(RATING_DID_RATE) {
        None | Some(Value::Null) => {}
        Some(value) => match value.as_bool() {
            Some(did_rate) => state.rating_did_rate = did_rate,
            None => tracing::warn!(
                key = RATING_DID_RATE,
                found = json_kind(&value),
                "Ignoring persisted preference"
            ),
        },
    }

    state
}
