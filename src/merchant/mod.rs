//! Merchant System
//!
//! A merchant is a non-combat world actor offering services gated by its job
//! mask. This module holds the merchant itself; its inventory, lifecycle and
//! restock behavior live in the submodules.

pub mod definition;
pub mod job;
pub mod ledger;
pub mod lifecycle;
pub mod registry;
pub mod restock;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::data::ItemRegistry;
use crate::menu::MerchantMenuItem;
use crate::protocol::{ActorAppearance, DialogOption, DialogPayload, MerchantDialog};
use crate::script::{MerchantScript, Pursuits, ScriptRegistry};

pub use definition::{CastableOffer, MerchantDefinition, VendItem};
pub use job::MerchantJob;
pub use ledger::{InventoryEntry, InventoryLedger};
pub use lifecycle::{ClickOutcome, SpawnState};
pub use registry::MerchantRegistry;
pub use restock::RestockScheduler;

/// Prompt shown above the root menu
pub const ROOT_MENU_TEXT: &str = "What can I do for you?";

// ============================================================================
// Merchant
// ============================================================================

pub struct Merchant {
    pub id: u32,
    pub definition: Arc<MerchantDefinition>,
    /// Services this merchant is configured to provide
    capabilities: MerchantJob,
    /// Services the dispatch table lets users reach
    jobs: MerchantJob,
    ledger: RwLock<Option<Arc<InventoryLedger>>>,
    state: Mutex<SpawnState>,
    script: RwLock<Option<Arc<dyn MerchantScript>>>,
    pursuits: Pursuits,
    /// Ids of objects currently in this merchant's area of interest
    observers: Mutex<HashSet<u32>>,
    items: Arc<ItemRegistry>,
    scripts: Arc<ScriptRegistry>,
}

impl Merchant {
    pub fn new(
        id: u32,
        definition: Arc<MerchantDefinition>,
        items: Arc<ItemRegistry>,
        scripts: Arc<ScriptRegistry>,
    ) -> Self {
        Self {
            id,
            capabilities: definition.roles.capabilities(),
            jobs: definition.jobs,
            definition,
            ledger: RwLock::new(None),
            state: Mutex::new(SpawnState::Unspawned),
            script: RwLock::new(None),
            pursuits: Arc::new(Mutex::new(Vec::new())),
            observers: Mutex::new(HashSet::new()),
            items,
            scripts,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn jobs(&self) -> MerchantJob {
        self.jobs
    }

    pub fn capabilities(&self) -> MerchantJob {
        self.capabilities
    }

    /// The stock ledger, once spawned with the vend capability
    pub fn inventory(&self) -> Option<Arc<InventoryLedger>> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_inventory(&self, ledger: Option<Arc<InventoryLedger>>) {
        *self.ledger.write().unwrap_or_else(PoisonError::into_inner) = ledger;
    }

    pub fn script(&self) -> Option<Arc<dyn MerchantScript>> {
        self.script.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_script(&self, script: Option<Arc<dyn MerchantScript>>) {
        *self.script.write().unwrap_or_else(PoisonError::into_inner) = script;
    }

    fn state(&self) -> MutexGuard<'_, SpawnState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn spawn_state(&self) -> SpawnState {
        *self.state()
    }

    pub fn is_ready(&self) -> bool {
        self.spawn_state() == SpawnState::Ready
    }

    fn observers(&self) -> MutexGuard<'_, HashSet<u32>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_observed_by(&self, id: u32) -> bool {
        self.observers().contains(&id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }

    /// Script-registered menu options, in registration order
    pub fn pursuits(&self) -> Vec<DialogOption> {
        self.pursuits.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn reset_pursuits(&self) {
        self.pursuits.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn add_pursuit(&self, option: DialogOption) {
        self.pursuits.lock().unwrap_or_else(PoisonError::into_inner).push(option);
    }

    /// Skills this merchant teaches
    pub fn skills(&self) -> &[CastableOffer] {
        self.definition.roles.skills()
    }

    /// Spells this merchant teaches
    pub fn spells(&self) -> &[CastableOffer] {
        self.definition.roles.spells()
    }

    /// Bring due stock back to its restock amount. Merchants without a
    /// ledger have nothing to restock.
    pub fn restock(&self, now: DateTime<Utc>) -> usize {
        let Some(ledger) = self.inventory() else {
            return 0;
        };
        let restocked = ledger.restock_all(now);
        if restocked > 0 {
            debug!("Restocked {} entries for merchant {}", restocked, self.name());
        }
        restocked
    }

    /// Wrap a payload in a dialog frame from this merchant
    pub fn dialog(&self, text: impl Into<String>, payload: DialogPayload) -> MerchantDialog {
        MerchantDialog {
            merchant_id: self.id,
            sprite: self.definition.sprite,
            merchant_name: self.definition.name.clone(),
            text: text.into(),
            payload,
        }
    }

    /// A plain line of speech with nothing to pick
    pub fn say(&self, text: impl Into<String>) -> MerchantDialog {
        self.dialog(text, DialogPayload::Options(Vec::new()))
    }

    pub fn appearance(&self) -> ActorAppearance {
        ActorAppearance {
            id: self.id,
            x: self.definition.x,
            y: self.definition.y,
            sprite: self.definition.sprite,
            direction: self.definition.direction,
            name: self.definition.name.clone(),
        }
    }

    /// Top-level options: script pursuits first, then one entry per service
    /// the job mask allows
    pub fn root_menu_options(&self) -> Vec<DialogOption> {
        let mut options = self.pursuits();
        let jobs = self.jobs;

        if jobs.contains(MerchantJob::VEND) {
            options.push(DialogOption::new("Buy", MerchantMenuItem::BuyItemMenu));
            options.push(DialogOption::new("Sell", MerchantMenuItem::SellItemMenu));
        }
        if jobs.contains(MerchantJob::BANK) {
            options.push(DialogOption::new("Deposit Gold", MerchantMenuItem::DepositGoldMenu));
            options.push(DialogOption::new("Withdraw Gold", MerchantMenuItem::WithdrawGoldMenu));
        }
        if jobs.contains(MerchantJob::SKILLS) {
            options.push(DialogOption::new("Learn Skill", MerchantMenuItem::LearnSkillMenu));
            options.push(DialogOption::new("Forget Skill", MerchantMenuItem::ForgetSkillMenu));
        }
        if jobs.contains(MerchantJob::SPELLS) {
            options.push(DialogOption::new("Learn Spell", MerchantMenuItem::LearnSpellMenu));
            options.push(DialogOption::new("Forget Spell", MerchantMenuItem::ForgetSpellMenu));
        }
        if jobs.contains(MerchantJob::REPAIR) {
            options.push(DialogOption::new("Repair All Items", MerchantMenuItem::RepairAllItems));
        }

        options
    }

    pub fn root_menu(&self) -> MerchantDialog {
        self.dialog(ROOT_MENU_TEXT, DialogPayload::Options(self.root_menu_options()))
    }

    pub(crate) fn item_catalog(&self) -> &ItemRegistry {
        &self.items
    }

    pub(crate) fn script_registry(&self) -> &ScriptRegistry {
        &self.scripts
    }
}

impl std::fmt::Debug for Merchant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Merchant")
            .field("id", &self.id)
            .field("name", &self.definition.name)
            .field("jobs", &self.jobs)
            .field("state", &self.spawn_state())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::ItemDefinition;

    /// A merchant selling apples (10 on hand, hourly restock) with the given jobs
    pub(crate) fn apple_merchant(jobs: MerchantJob) -> Merchant {
        let mut items = ItemRegistry::new();
        let mut apple = ItemDefinition::simple("Apple", 4);
        apple.max_stack = 20;
        items.insert(apple);

        let definition = MerchantDefinition::new("Riona")
            .with_vend_items(vec![VendItem {
                name: "Apple".into(),
                quantity: 10,
                restock: 60,
            }])
            .with_jobs(jobs);

        Merchant::new(
            0x4000_0000,
            Arc::new(definition),
            Arc::new(items),
            Arc::new(ScriptRegistry::empty()),
        )
    }

    #[test]
    fn test_root_menu_follows_job_mask() {
        let merchant = apple_merchant(MerchantJob::VEND | MerchantJob::BANK);
        merchant.add_pursuit(DialogOption::new("Gossip", 3u16));

        let ids: Vec<u16> = merchant.root_menu_options().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![3, 0xFF01, 0xFF02, 0xFF06, 0xFF04]);

        merchant.reset_pursuits();
        assert_eq!(merchant.root_menu_options().len(), 4);
    }

    #[test]
    fn test_jobs_and_capabilities_are_separate() {
        let merchant = apple_merchant(MerchantJob::BANK);
        assert!(merchant.capabilities().contains(MerchantJob::VEND));
        assert!(!merchant.jobs().contains(MerchantJob::VEND));

        let labels: Vec<String> = merchant.root_menu_options().into_iter().map(|o| o.text).collect();
        assert_eq!(labels, vec!["Deposit Gold", "Withdraw Gold"]);
    }

    #[test]
    fn test_restock_without_ledger_is_noop() {
        let merchant = apple_merchant(MerchantJob::VEND);
        assert!(merchant.inventory().is_none());
        assert_eq!(merchant.restock(Utc::now()), 0);
    }

    #[test]
    fn test_dialog_carries_merchant_identity() {
        let merchant = apple_merchant(MerchantJob::VEND);
        let dialog = merchant.say("Hello");
        assert_eq!(dialog.merchant_id, 0x4000_0000);
        assert_eq!(dialog.merchant_name, "Riona");
        assert_eq!(dialog.payload, DialogPayload::Options(Vec::new()));
    }
}
