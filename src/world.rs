//! World-facing types shared by merchants and their observers.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Direction {
    North = 0,
    East = 1,
    #[default]
    South = 2,
    West = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    User,
    Creature,
    Merchant,
    Item,
}

/// Anything that can enter a merchant's area of interest or speak near it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldObject {
    pub id: u32,
    pub name: String,
    pub kind: ObjectKind,
}

impl WorldObject {
    pub fn new(id: u32, name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }

    pub fn is_user(&self) -> bool {
        self.kind == ObjectKind::User
    }
}

/// Anything that can take damage or be healed
pub trait Creature {
    fn heal(&self, amount: u32);

    /// `source` is the id of whoever dealt the damage, if anyone
    fn damage(&self, amount: u32, source: Option<u32>);
}
