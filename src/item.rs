use std::sync::Arc;

use crate::data::ItemDefinition;

// ============================================================================
// Inventory
// ============================================================================

pub const INVENTORY_SIZE: usize = 59;

/// A stack of one item type in a user's inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    pub item: Arc<ItemDefinition>,
    pub quantity: u32,
    /// Current durability, for items that have any
    pub durability: Option<u32>,
}

impl InventoryItem {
    pub fn new(item: Arc<ItemDefinition>, quantity: u32) -> Self {
        let durability = item.durability;
        Self {
            item,
            quantity,
            durability,
        }
    }

    pub fn name(&self) -> &str {
        &self.item.name
    }

    /// Durability points missing from this item
    pub fn wear(&self) -> u32 {
        match (self.item.durability, self.durability) {
            (Some(max), Some(current)) => max.saturating_sub(current),
            _ => 0,
        }
    }

    /// Gold to restore full durability: the item's value scaled by the
    /// fraction missing, rounded up
    pub fn repair_cost(&self) -> u32 {
        let Some(max) = self.item.durability.filter(|max| *max > 0) else {
            return 0;
        };
        let cost = (self.item.value as u64 * self.wear() as u64).div_ceil(max as u64);
        u32::try_from(cost).unwrap_or(u32::MAX)
    }

    pub fn repair(&mut self) {
        if self.item.durability.is_some() {
            self.durability = self.item.durability;
        }
    }
}

#[derive(Debug, Clone)]
pub struct Inventory {
    pub slots: Vec<Option<InventoryItem>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self {
            slots: vec![None; INVENTORY_SIZE],
        }
    }

    pub fn get(&self, slot: u8) -> Option<&InventoryItem> {
        self.slots.get(slot as usize).and_then(Option::as_ref)
    }

    /// Check whether `quantity` of `item` fits without touching the inventory
    pub fn has_space_for(&self, item: &ItemDefinition, quantity: u32) -> bool {
        let mut remaining = quantity;
        for slot in &self.slots {
            if remaining == 0 {
                break;
            }
            match slot {
                Some(existing) if existing.item.name == item.name => {
                    remaining = remaining
                        .saturating_sub(item.max_stack.saturating_sub(existing.quantity));
                }
                None => remaining = remaining.saturating_sub(item.max_stack),
                _ => {}
            }
        }
        remaining == 0
    }

    /// Try to add an item to inventory. Returns the quantity that couldn't fit.
    pub fn add_item(&mut self, item: &Arc<ItemDefinition>, mut quantity: u32) -> u32 {
        let max_stack = item.max_stack;

        // First, try to stack with existing items
        for slot in self.slots.iter_mut().flatten() {
            if quantity == 0 {
                break;
            }
            if slot.item.name == item.name {
                let add = quantity.min(max_stack.saturating_sub(slot.quantity));
                slot.quantity += add;
                quantity -= add;
            }
        }

        // Then, try to find empty slots for remaining quantity
        for slot in &mut self.slots {
            if quantity == 0 {
                break;
            }
            if slot.is_none() {
                let add = quantity.min(max_stack);
                *slot = Some(InventoryItem::new(Arc::clone(item), add));
                quantity -= add;
            }
        }

        quantity
    }

    /// Take everything out of a slot
    pub fn remove(&mut self, slot: u8) -> Option<InventoryItem> {
        self.slots.get_mut(slot as usize).and_then(Option::take)
    }

    /// Slot indices holding items a merchant would buy
    pub fn sellable_slots(&self) -> Vec<u8> {
        self.occupied()
            .filter(|(_, item)| item.item.sellable)
            .map(|(slot, _)| slot)
            .collect()
    }

    pub fn occupied(&self) -> impl Iterator<Item = (u8, &InventoryItem)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (i as u8, item)))
    }

    pub fn occupied_mut(&mut self) -> impl Iterator<Item = &mut InventoryItem> {
        self.slots.iter_mut().flatten()
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stackable(name: &str, max_stack: u32) -> Arc<ItemDefinition> {
        let mut item = ItemDefinition::simple(name, 10);
        item.max_stack = max_stack;
        Arc::new(item)
    }

    #[test]
    fn test_add_item_stacks_then_fills_empty_slots() {
        let apple = stackable("Apple", 10);
        let mut inventory = Inventory::new();

        assert_eq!(inventory.add_item(&apple, 4), 0);
        assert_eq!(inventory.add_item(&apple, 8), 0);

        assert_eq!(inventory.get(0).unwrap().quantity, 10);
        assert_eq!(inventory.get(1).unwrap().quantity, 2);
    }

    #[test]
    fn test_full_inventory_reports_leftover() {
        let rock = stackable("Rock", 1);
        let mut inventory = Inventory::new();
        assert_eq!(inventory.add_item(&rock, INVENTORY_SIZE as u32 + 3), 3);
        assert!(!inventory.has_space_for(&rock, 1));
    }

    #[test]
    fn test_sellable_slots_skip_unsellable() {
        let mut junk = ItemDefinition::simple("Junk", 0);
        junk.sellable = false;
        let junk = Arc::new(junk);
        let gem = stackable("Gem", 1);

        let mut inventory = Inventory::new();
        inventory.add_item(&junk, 1);
        inventory.add_item(&gem, 1);

        assert_eq!(inventory.sellable_slots(), vec![1]);
        assert_eq!(inventory.remove(1).unwrap().name(), "Gem");
        assert!(inventory.get(1).is_none());
    }

    #[test]
    fn test_repair_cost_scales_with_wear() {
        let mut sword = ItemDefinition::simple("Sword", 300);
        sword.durability = Some(100);
        let mut item = InventoryItem::new(Arc::new(sword), 1);
        assert_eq!(item.repair_cost(), 0);

        item.durability = Some(67);
        assert_eq!(item.wear(), 33);
        assert_eq!(item.repair_cost(), 99);

        item.durability = Some(99);
        assert_eq!(item.repair_cost(), 3);

        item.repair();
        assert_eq!(item.durability, Some(100));
        assert_eq!(item.repair_cost(), 0);
    }
}
