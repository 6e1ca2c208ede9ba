//! Merchant Registry
//!
//! Loads and caches merchant definitions from TOML files.

use super::definition::{MerchantDefinition, RawMerchantDefinition};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Registry for all merchant definitions
pub struct MerchantRegistry {
    merchants: HashMap<String, MerchantDefinition>,
}

impl MerchantRegistry {
    /// Create a new empty merchant registry
    pub fn new() -> Self {
        Self {
            merchants: HashMap::new(),
        }
    }

    /// Load all merchant definitions from `<data_dir>/merchants`
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<(), String> {
        let path = data_dir.join("merchants");
        if !path.exists() {
            warn!("Merchant directory does not exist: {:?}", path);
            return Ok(());
        }

        for entry in fs::read_dir(&path).map_err(|e| e.to_string())? {
            let entry = entry.map_err(|e| e.to_string())?;
            let file_path = entry.path();

            if file_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                let contents = fs::read_to_string(&file_path)
                    .map_err(|e| format!("Failed to read {:?}: {}", file_path, e))?;

                let table: HashMap<String, RawMerchantDefinition> = toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse {:?}: {}", file_path, e))?;

                for (name, raw) in table {
                    let merchant = MerchantDefinition::from_raw(&name, raw)
                        .map_err(|e| format!("{} in {:?}", e, file_path))?;

                    if self.merchants.contains_key(&name) {
                        warn!("Duplicate merchant '{}' in {:?}, overwriting", name, file_path);
                    }

                    self.merchants.insert(name, merchant);
                }
            }
        }

        info!("Loaded {} merchant definitions", self.merchants.len());
        Ok(())
    }

    pub fn insert(&mut self, definition: MerchantDefinition) {
        self.merchants.insert(definition.name.clone(), definition);
    }

    /// Get a merchant definition by name
    pub fn get(&self, name: &str) -> Option<&MerchantDefinition> {
        self.merchants.get(name)
    }

    /// Get an iterator over all merchant definitions
    pub fn all(&self) -> impl Iterator<Item = &MerchantDefinition> {
        self.merchants.values()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.merchants.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.merchants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merchants.is_empty()
    }
}

impl Default for MerchantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merchant::MerchantJob;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_merchants_from_directory() {
        let temp_dir = TempDir::new().unwrap();
        let merchants_dir = temp_dir.path().join("merchants");
        std::fs::create_dir_all(&merchants_dir).unwrap();

        let toml_content = r#"
[Riona]
sprite = 33
x = 10
y = 12
direction = "west"

[[Riona.roles.vend.items]]
name = "Apple"
quantity = 10
restock = 60

[Deoch]
sprite = 40
[Deoch.roles.bank]
"#;

        let mut file = std::fs::File::create(merchants_dir.join("mileth.toml")).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let mut registry = MerchantRegistry::new();
        registry.load_from_directory(temp_dir.path()).unwrap();

        assert_eq!(registry.len(), 2);
        let riona = registry.get("Riona").unwrap();
        assert_eq!(riona.jobs, MerchantJob::VEND);
        assert_eq!(riona.roles.vend.as_ref().unwrap().items[0].restock, 60);
        assert_eq!(registry.get("Deoch").unwrap().jobs, MerchantJob::BANK);
    }

    #[test]
    fn test_bad_job_fails_load() {
        let temp_dir = TempDir::new().unwrap();
        let merchants_dir = temp_dir.path().join("merchants");
        std::fs::create_dir_all(&merchants_dir).unwrap();
        std::fs::write(merchants_dir.join("bad.toml"), "[Odran]\njobs = [\"tailor\"]\n").unwrap();

        let mut registry = MerchantRegistry::new();
        assert!(registry.load_from_directory(temp_dir.path()).is_err());
    }
}
