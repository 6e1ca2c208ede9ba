use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::item_def::{ItemDefinition, RawItemDefinition};
use crate::error::SpawnError;

/// The world item catalog. Merchants resolve their vend lists against it.
pub struct ItemRegistry {
    items: HashMap<String, Arc<ItemDefinition>>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    /// Load all item definitions from `<data_dir>/items`
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<(), String> {
        let items_dir = data_dir.join("items");

        if !items_dir.exists() {
            warn!("Items directory does not exist: {:?}", items_dir);
            return Ok(());
        }

        let entries = std::fs::read_dir(&items_dir)
            .map_err(|e| format!("Failed to read items directory: {}", e))?;

        for entry in entries {
            let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
            let path = entry.path();

            if path.extension().map_or(false, |ext| ext == "toml") {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

                // Parse as table of items keyed by name
                let table: HashMap<String, RawItemDefinition> = toml::from_str(&content)
                    .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

                for (name, raw) in table {
                    if self.items.contains_key(&name) {
                        warn!("Duplicate item '{}' in {:?}, overwriting", name, path);
                    }
                    let item = ItemDefinition::from_raw(&name, &raw);
                    self.items.insert(name, Arc::new(item));
                }
            }
        }

        info!("Loaded {} item definitions", self.items.len());

        Ok(())
    }

    pub fn insert(&mut self, item: ItemDefinition) {
        self.items.insert(item.name.clone(), Arc::new(item));
    }

    /// Get an item definition by name
    pub fn get(&self, name: &str) -> Option<Arc<ItemDefinition>> {
        self.items.get(name).cloned()
    }

    /// Like [`get`](Self::get), but an unknown name is a world configuration error
    pub fn resolve(&self, name: &str) -> Result<Arc<ItemDefinition>, SpawnError> {
        self.get(name)
            .ok_or_else(|| SpawnError::UnresolvedItemReference(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for ItemRegistry {
    fn default() -> Self {
        Self::new()
    }
}
