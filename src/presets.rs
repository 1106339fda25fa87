//! Named settings snapshots and where they are kept.

use crate::error::ThereminError;
use crate::settings::Settings;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Name of the preset that always exists.
pub const DEFAULT_PRESET: &str = "default";

/// Backing store for the serialized preset map.
pub trait PresetStorage: Send {
    /// Returns the stored document, or `None` if nothing was stored yet.
    fn read(&self) -> anyhow::Result<Option<String>>;

    fn write(&mut self, data: &str) -> anyhow::Result<()>;
}

/// Keeps the document in memory. Clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents, for inspection.
    pub fn contents(&self) -> Option<String> {
        self.data.lock().ok().and_then(|data| data.clone())
    }
}

impl PresetStorage for MemoryStorage {
    fn read(&self) -> anyhow::Result<Option<String>> {
        let data = self
            .data
            .lock()
            .map_err(|_| anyhow::anyhow!("preset memory poisoned"))?;
        Ok(data.clone())
    }

    fn write(&mut self, data: &str) -> anyhow::Result<()> {
        let mut slot = self
            .data
            .lock()
            .map_err(|_| anyhow::anyhow!("preset memory poisoned"))?;
        *slot = Some(data.to_string());
        Ok(())
    }
}

/// Keeps the document in a JSON file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage backed by the file at `path`. Missing parent directories are
    /// created when writing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<temp dir>/theremin/presets.json`
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join("theremin").join("presets.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PresetStorage for FileStorage {
    fn read(&self) -> anyhow::Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.path)?))
    }

    fn write(&mut self, data: &str) -> anyhow::Result<()> {
        use std::io::Write;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = File::create(&self.path)?;
        write!(file, "{}", data)?;
        Ok(())
    }
}

/// Presets keyed by name. The `"default"` entry is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetStore {
    presets: BTreeMap<String, Settings>,
}

impl PresetStore {
    /// A store holding only the built-in `"default"` preset.
    ///
    /// # Examples
    ///
    /// ```
    /// use theremin::PresetStore;
    ///
    /// let store = PresetStore::new();
    /// assert!(store.contains("default"));
    /// assert_eq!(store.len(), 1);
    /// ```
    pub fn new() -> Self {
        let mut store = Self {
            presets: BTreeMap::new(),
        };
        store.ensure_default();
        store
    }

    /// Adds the built-in `"default"` preset unless one is stored already.
    pub fn ensure_default(&mut self) {
        self.presets
            .entry(DEFAULT_PRESET.to_string())
            .or_insert_with(Settings::default);
    }

    /// Stores a copy of `settings` under `name`, replacing any previous entry.
    pub fn save(&mut self, name: &str, settings: &Settings) -> Result<(), ThereminError> {
        if name.trim().is_empty() {
            return Err(ThereminError::InvalidParameter(
                "preset name must not be empty".to_string(),
            ));
        }
        self.presets.insert(name.to_string(), settings.clone());
        Ok(())
    }

    /// Returns a copy of the preset named `name`.
    pub fn load(&self, name: &str) -> Result<Settings, ThereminError> {
        self.presets
            .get(name)
            .cloned()
            .ok_or_else(|| ThereminError::PresetNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    /// Preset names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(&self.presets)?)
    }

    /// Parses a stored preset map. Missing fields take their defaults and
    /// out-of-range values are clamped.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let presets: BTreeMap<String, Settings> = serde_json::from_str(json)?;
        let mut store = Self {
            presets: presets
                .into_iter()
                .filter(|(name, _)| !name.trim().is_empty())
                .map(|(name, settings)| (name, settings.sanitized()))
                .collect(),
        };
        store.ensure_default();
        Ok(store)
    }

    /// Reads presets from `storage`, falling back to just the default on any
    /// failure.
    pub fn load_from(storage: &dyn PresetStorage) -> Self {
        match storage.read() {
            Ok(Some(json)) => match Self::from_json(&json) {
                Ok(store) => store,
                Err(e) => {
                    log::warn!("Failed to parse stored presets: {}", e);
                    Self::new()
                }
            },
            Ok(None) => Self::new(),
            Err(e) => {
                log::warn!("Failed to read stored presets: {}", e);
                Self::new()
            }
        }
    }

    /// Writes every preset to `storage`.
    pub fn persist(&self, storage: &mut dyn PresetStorage) -> Result<(), ThereminError> {
        self.to_json()
            .and_then(|json| storage.write(&json))
            .map_err(|e| ThereminError::Storage(e.to_string()))
    }
}

impl Default for PresetStore {
    fn default() -> Self {
        Self::new()
    }
}
