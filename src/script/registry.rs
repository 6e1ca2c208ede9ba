//! Script Registry
//!
//! Loads merchant scripts from `<scripts_dir>/<merchant name>.lua`.
//! Supports hot-reloading during development.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{error, info, warn};

use super::lua::LuaScript;
use crate::error::ScriptError;
use super::MerchantScript;

/// Event sent when a script file changes on disk
#[derive(Debug, Clone)]
pub enum HotReloadEvent {
    Reloaded(String),
    Error(String),
}

pub struct ScriptRegistry {
    scripts: DashMap<String, Arc<dyn MerchantScript>>,
    scripts_dir: PathBuf,
}

impl ScriptRegistry {
    pub fn new(scripts_dir: &Path) -> Self {
        Self {
            scripts: DashMap::new(),
            scripts_dir: scripts_dir.to_path_buf(),
        }
    }

    /// Registry with no backing directory
    pub fn empty() -> Self {
        Self::new(Path::new(""))
    }

    /// Load every `.lua` file in the scripts directory. Returns how many loaded.
    pub fn load_all(&self) -> Result<usize, String> {
        if !self.scripts_dir.exists() {
            warn!("Scripts directory does not exist: {:?}", self.scripts_dir);
            return Ok(0);
        }

        let entries = std::fs::read_dir(&self.scripts_dir)
            .map_err(|e| format!("Failed to read directory {:?}: {}", self.scripts_dir, e))?;

        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "lua") {
                match self.load_file(&path) {
                    Ok(name) => {
                        info!("Loaded merchant script: {}", name);
                        count += 1;
                    }
                    Err(e) => warn!("Failed to load {:?}: {}", path, e),
                }
            }
        }

        info!("Loaded {} merchant scripts", count);
        Ok(count)
    }

    /// Load (or replace) the script in `path`, keyed by its file stem
    pub fn load_file(&self, path: &Path) -> Result<String, ScriptError> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ScriptError::InvalidName(path.to_path_buf()))?
            .to_string();

        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let script = LuaScript::load(&name, &source)?;

        self.scripts.insert(name.clone(), Arc::new(script));
        Ok(name)
    }

    pub fn insert(&self, name: &str, script: Arc<dyn MerchantScript>) {
        self.scripts.insert(name.to_string(), script);
    }

    /// The script for the merchant called `name`, if one exists
    pub fn get(&self, name: &str) -> Option<Arc<dyn MerchantScript>> {
        self.scripts.get(name).map(|s| Arc::clone(s.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Start watching the scripts directory for changes. Merchants pick up a
    /// reloaded script the next time they spawn.
    pub fn start_file_watcher(
        self: &Arc<Self>,
    ) -> Result<tokio::sync::mpsc::Receiver<HotReloadEvent>, String> {
        use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
        use std::time::Duration;

        if !self.scripts_dir.exists() {
            return Err(format!("Scripts directory does not exist: {:?}", self.scripts_dir));
        }

        let (tx, rx) = tokio::sync::mpsc::channel(32);
        let registry = Arc::clone(self);
        let scripts_dir = self.scripts_dir.clone();

        // notify is sync, so the watcher lives on its own thread
        std::thread::spawn(move || {
            let (notify_tx, notify_rx) = std::sync::mpsc::channel();

            let mut watcher = match RecommendedWatcher::new(
                move |res: Result<notify::Event, notify::Error>| {
                    if let Ok(event) = res {
                        let _ = notify_tx.send(event);
                    }
                },
                Config::default().with_poll_interval(Duration::from_secs(1)),
            ) {
                Ok(w) => w,
                Err(e) => {
                    error!("Failed to create file watcher: {}", e);
                    return;
                }
            };

            if let Err(e) = watcher.watch(&scripts_dir, RecursiveMode::NonRecursive) {
                error!("Failed to watch scripts directory: {}", e);
                return;
            }

            info!("Script hot-reload watcher started for {:?}", scripts_dir);

            while let Ok(event) = notify_rx.recv() {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    continue;
                }
                for path in event.paths.iter().filter(|p| p.extension().map_or(false, |e| e == "lua")) {
                    let reload = match registry.load_file(path) {
                        Ok(name) => HotReloadEvent::Reloaded(name),
                        Err(e) => HotReloadEvent::Error(format!("{:?}: {}", path, e)),
                    };
                    if tx.blocking_send(reload).is_err() {
                        // Receiver dropped, nobody is listening anymore
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}
