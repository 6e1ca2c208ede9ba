//! The user side of a merchant interaction.

use crate::error::MenuError;
use crate::item::Inventory;

pub const BOOK_SIZE: usize = 36;

/// A skill or spell book: fixed slots holding castable names
#[derive(Debug, Clone)]
pub struct CastableBook {
    slots: Vec<Option<String>>,
}

impl CastableBook {
    pub fn new() -> Self {
        Self {
            slots: vec![None; BOOK_SIZE],
        }
    }

    pub fn knows(&self, name: &str) -> bool {
        self.slots.iter().flatten().any(|known| known == name)
    }

    /// Write `name` into the first free slot and return that slot
    pub fn learn(&mut self, name: &str) -> Result<u8, MenuError> {
        if self.knows(name) {
            return Err(MenuError::AlreadyKnown(name.to_string()));
        }
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(MenuError::BookFull)?;
        *slot = Some(name.to_string());
        Ok(index as u8)
    }

    pub fn forget(&mut self, slot: u8) -> Option<String> {
        self.slots.get_mut(slot as usize).and_then(Option::take)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().flatten().map(String::as_str)
    }
}

impl Default for CastableBook {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub gold: u32,
    /// Gold held by bankers on the user's behalf
    pub bank_gold: u32,
    pub inventory: Inventory,
    pub skill_book: CastableBook,
    pub spell_book: CastableBook,
}

impl User {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            gold: 0,
            bank_gold: 0,
            inventory: Inventory::new(),
            skill_book: CastableBook::new(),
            spell_book: CastableBook::new(),
        }
    }

    pub fn with_gold(mut self, gold: u32) -> Self {
        self.gold = gold;
        self
    }

    /// Take `amount` gold, or fail without changing anything
    pub fn charge(&mut self, amount: u32) -> Result<(), MenuError> {
        if self.gold < amount {
            return Err(MenuError::InsufficientGold {
                needed: amount,
                available: self.gold,
            });
        }
        self.gold -= amount;
        Ok(())
    }

    pub fn pay(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learn_and_forget() {
        let mut book = CastableBook::new();
        assert_eq!(book.learn("Assail").unwrap(), 0);
        assert_eq!(book.learn("Clobber").unwrap(), 1);
        assert!(matches!(book.learn("Assail"), Err(MenuError::AlreadyKnown(_))));

        assert_eq!(book.forget(0).as_deref(), Some("Assail"));
        assert!(!book.knows("Assail"));
        assert_eq!(book.learn("Wallop").unwrap(), 0);
    }

    #[test]
    fn test_full_book() {
        let mut book = CastableBook::new();
        for i in 0..BOOK_SIZE {
            book.learn(&format!("skill {}", i)).unwrap();
        }
        assert!(matches!(book.learn("one more"), Err(MenuError::BookFull)));
    }

    #[test]
    fn test_charge_leaves_gold_untouched_on_failure() {
        let mut user = User::new(1, "Kedian").with_gold(30);
        assert!(matches!(
            user.charge(31),
            Err(MenuError::InsufficientGold { needed: 31, available: 30 })
        ));
        assert_eq!(user.gold, 30);
        user.charge(30).unwrap();
        assert_eq!(user.gold, 0);
    }
}
