//! Per-merchant sellable stock.
//!
//! Every operation takes the ledger's single mutex for the duration of the
//! read or mutation only. Callers must not call out to scripts or the network
//! while holding anything borrowed from here; [`InventoryLedger::snapshot`]
//! hands out copies for that reason.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::data::ItemDefinition;
use crate::error::LedgerError;

/// One stocked item and its restock policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub item: Arc<ItemDefinition>,
    pub on_hand: u32,
    /// Quantity `on_hand` resets to on restock. Not a cap: sell-backs can exceed it.
    pub restock_amount: u32,
    pub restock_interval_minutes: i32,
    pub last_restock: DateTime<Utc>,
}

impl InventoryEntry {
    /// A fully stocked entry, as created at spawn
    pub fn new(item: Arc<ItemDefinition>, quantity: u32, restock_interval_minutes: i32, now: DateTime<Utc>) -> Self {
        Self {
            item,
            on_hand: quantity,
            restock_amount: quantity,
            restock_interval_minutes,
            last_restock: now,
        }
    }

    pub fn name(&self) -> &str {
        &self.item.name
    }

    /// Non-positive intervals are always due
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if self.restock_interval_minutes <= 0 {
            return true;
        }
        self.last_restock
            .checked_add_signed(Duration::minutes(self.restock_interval_minutes as i64))
            .is_some_and(|due| due <= now)
    }
}

#[derive(Debug, Default)]
pub struct InventoryLedger {
    entries: Mutex<Vec<InventoryEntry>>,
}

impl InventoryLedger {
    pub fn new(entries: Vec<InventoryEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    // Entries stay consistent even if a holder panicked, so poisoning is ignored
    fn entries(&self) -> MutexGuard<'_, Vec<InventoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Quantity currently on hand for `item_name`
    pub fn lookup(&self, item_name: &str) -> Result<u32, LedgerError> {
        self.entries()
            .iter()
            .find(|e| e.item.name == item_name)
            .map(|e| e.on_hand)
            .ok_or_else(|| LedgerError::NotFound(item_name.to_string()))
    }

    /// Definition of a stocked item
    pub fn item(&self, item_name: &str) -> Result<Arc<ItemDefinition>, LedgerError> {
        self.entries()
            .iter()
            .find(|e| e.item.name == item_name)
            .map(|e| Arc::clone(&e.item))
            .ok_or_else(|| LedgerError::NotFound(item_name.to_string()))
    }

    /// Take `quantity` out of stock. Returns what is left on hand.
    pub fn reduce(&self, item_name: &str, quantity: u32) -> Result<u32, LedgerError> {
        let mut entries = self.entries();
        let entry = entries
            .iter_mut()
            .find(|e| e.item.name == item_name)
            .ok_or_else(|| LedgerError::NotFound(item_name.to_string()))?;

        if quantity > entry.on_hand {
            return Err(LedgerError::InsufficientStock {
                item: item_name.to_string(),
                requested: quantity,
                on_hand: entry.on_hand,
            });
        }

        entry.on_hand -= quantity;
        Ok(entry.on_hand)
    }

    /// Put `quantity` back into stock, e.g. when a user sells an item the
    /// merchant carries. Returns the new on-hand quantity.
    pub fn restore(&self, item_name: &str, quantity: u32) -> Result<u32, LedgerError> {
        let mut entries = self.entries();
        let entry = entries
            .iter_mut()
            .find(|e| e.item.name == item_name)
            .ok_or_else(|| LedgerError::NotFound(item_name.to_string()))?;
        entry.on_hand = entry.on_hand.saturating_add(quantity);
        Ok(entry.on_hand)
    }

    /// Reset every due entry to its restock amount. Returns how many entries
    /// were restocked.
    pub fn restock_all(&self, now: DateTime<Utc>) -> usize {
        let mut restocked = 0;
        for entry in self.entries().iter_mut() {
            if entry.is_due(now) {
                entry.on_hand = entry.restock_amount;
                entry.last_restock = now;
                restocked += 1;
            }
        }
        restocked
    }

    /// Point-in-time copy of all entries, in configured order
    pub fn snapshot(&self) -> Vec<InventoryEntry> {
        self.entries().clone()
    }

    pub fn contains(&self, item_name: &str) -> bool {
        self.entries().iter().any(|e| e.item.name == item_name)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
