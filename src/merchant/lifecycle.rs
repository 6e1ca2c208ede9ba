//! Merchant lifecycle: spawning, speech, clicks and area-of-interest events.
//!
//! Readiness is a small state machine. `Unspawned -> Spawning -> Ready` on
//! success, `Spawning -> Unspawned` on failure. Interactions with a merchant
//! that is not ready retry the spawn first.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{InventoryEntry, InventoryLedger, Merchant, MerchantJob};
use crate::error::SpawnError;
use crate::protocol::{ActorAppearance, MerchantDialog};
use crate::script::{MerchantScript, ScriptArg, ScriptBinding, ScriptValue};
use crate::user::User;
use crate::world::{Creature, WorldObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpawnState {
    #[default]
    Unspawned,
    Spawning,
    Ready,
}

/// What happened when a user clicked a merchant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The script's `OnClick` handled it
    Scripted,
    /// No click hook, show the root menu
    Menu(MerchantDialog),
}

impl Merchant {
    /// Build stock and run the script's spawn hook. Safe to call again on a
    /// ready merchant, which respawns it with full stock.
    pub fn on_spawn(&self) -> Result<(), SpawnError> {
        {
            let mut state = self.state();
            if *state == SpawnState::Spawning {
                debug!("Merchant {} is already spawning", self.name());
                return Ok(());
            }
            *state = SpawnState::Spawning;
        }

        let result = self.spawn();

        *self.state() = match result {
            Ok(()) => SpawnState::Ready,
            Err(_) => SpawnState::Unspawned,
        };
        result
    }

    fn spawn(&self) -> Result<(), SpawnError> {
        if self.capabilities().contains(MerchantJob::VEND) {
            self.set_inventory(Some(Arc::new(self.build_ledger()?)));
        }

        let script = self.script_registry().get(self.name());
        self.set_script(script.clone());
        if let Some(script) = script {
            self.bind_script(script.as_ref())?;
        }

        info!("Merchant {} ({:#010x}) spawned", self.name(), self.id);
        Ok(())
    }

    /// Attach `script` to this merchant and run its spawn hook. Pursuits are
    /// cleared first so the hook registers a fresh set.
    fn bind_script(&self, script: &dyn MerchantScript) -> Result<(), SpawnError> {
        script.associate(ScriptBinding {
            merchant_id: self.id,
            merchant_name: self.name().to_string(),
            pursuits: Arc::clone(&self.pursuits),
        });
        self.reset_pursuits();

        if script.has_function("OnSpawn") && !script.execute_function("OnSpawn", &[]) {
            return Err(SpawnError::ScriptFailed("OnSpawn"));
        }
        Ok(())
    }

    /// The script to run hooks on. A ready merchant whose registry entry was
    /// replaced (hot reload) rebinds to the new script first, keeping its stock.
    pub fn refresh_script(&self) -> Option<Arc<dyn MerchantScript>> {
        let current = self.script();
        if !self.is_ready() {
            return current;
        }

        let latest = self.script_registry().get(self.name());
        let changed = match (&latest, &current) {
            (Some(latest), Some(current)) => !Arc::ptr_eq(latest, current),
            (None, None) => false,
            _ => true,
        };
        if !changed {
            return current;
        }

        info!("Merchant {} picked up a reloaded script", self.name());
        self.set_script(latest.clone());
        match &latest {
            Some(script) => {
                if let Err(e) = self.bind_script(script.as_ref()) {
                    warn!("Merchant {} failed to rebind its script: {}", self.name(), e);
                    *self.state() = SpawnState::Unspawned;
                }
            }
            None => self.reset_pursuits(),
        }
        latest
    }

    /// Every vend item must resolve against the world catalog, or nothing
    /// is stocked at all
    fn build_ledger(&self) -> Result<InventoryLedger, SpawnError> {
        let now = Utc::now();
        let vend_items = self
            .definition
            .roles
            .vend
            .as_ref()
            .map(|vend| vend.items.as_slice())
            .unwrap_or_default();

        let mut entries = Vec::with_capacity(vend_items.len());
        for vend_item in vend_items {
            let item = self.item_catalog().resolve(&vend_item.name)?;
            entries.push(InventoryEntry::new(item, vend_item.quantity, vend_item.restock, now));
        }
        Ok(InventoryLedger::new(entries))
    }

    /// Spawn if not ready yet. Returns whether the merchant is ready afterwards.
    pub fn ensure_spawned(&self) -> bool {
        if !self.is_ready() {
            if let Err(e) = self.on_spawn() {
                warn!("Merchant {} failed to spawn: {}", self.name(), e);
            }
        }
        self.is_ready()
    }

    pub fn on_hear(&self, speaker: &WorldObject, text: &str, is_shout: bool) {
        if speaker.id == self.id {
            return;
        }
        self.ensure_spawned();

        if let Some(script) = self.refresh_script() {
            if script.has_function("OnHear") {
                script.set_global_value("text", ScriptValue::Text(text.to_string()));
                script.set_global_value("shout", ScriptValue::Bool(is_shout));
                script.execute_function("OnHear", &[ScriptArg::Object(speaker.clone())]);
            }
        }
    }

    pub fn on_click(&self, invoker: &User) -> ClickOutcome {
        self.ensure_spawned();

        if let Some(script) = self.refresh_script() {
            if script.has_function("OnClick") {
                script.execute_function(
                    "OnClick",
                    &[ScriptArg::User {
                        id: invoker.id,
                        name: invoker.name.clone(),
                    }],
                );
                return ClickOutcome::Scripted;
            }
        }

        ClickOutcome::Menu(self.root_menu())
    }

    /// Record `observer` as able to see this merchant. Users get the
    /// appearance frame to draw it.
    pub fn on_area_entry(&self, observer: &WorldObject) -> Option<ActorAppearance> {
        self.observers().insert(observer.id);

        if let Some(script) = self.refresh_script() {
            if script.has_function("OnEntry") {
                script.execute_function("OnEntry", &[ScriptArg::Object(observer.clone())]);
            }
        }

        observer.is_user().then(|| self.appearance())
    }

    pub fn on_area_departure(&self, observer: &WorldObject) {
        self.observers().remove(&observer.id);

        if let Some(script) = self.refresh_script() {
            if script.has_function("OnLeave") {
                script.execute_function("OnLeave", &[ScriptArg::Object(observer.clone())]);
            }
        }
    }
}

// Merchants cannot be hurt or healed
impl Creature for Merchant {
    fn heal(&self, _amount: u32) {}

    fn damage(&self, _amount: u32, _source: Option<u32>) {}
}
