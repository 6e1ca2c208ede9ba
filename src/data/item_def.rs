use serde::Deserialize;

// ============================================================================
// Raw Item Definition (direct from TOML)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RawItemDefinition {
    pub tile: Option<u16>,
    pub color: Option<u8>,
    pub value: Option<u32>,
    pub description: Option<String>,
    pub max_stack: Option<u32>,
    /// Items with durability wear down and can be repaired
    pub durability: Option<u32>,
    #[serde(default = "default_true")]
    pub sellable: bool,
}

fn default_true() -> bool { true }

// ============================================================================
// Resolved Item Definition
// ============================================================================

/// A world item, shared read-only between merchants and users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDefinition {
    pub name: String,
    pub tile: u16,
    pub color: u8,
    pub value: u32,
    pub description: String,
    pub max_stack: u32,
    pub durability: Option<u32>,
    pub sellable: bool,
}

impl ItemDefinition {
    pub fn from_raw(name: &str, raw: &RawItemDefinition) -> Self {
        Self {
            name: name.to_string(),
            tile: raw.tile.unwrap_or(0),
            color: raw.color.unwrap_or(0),
            value: raw.value.unwrap_or(1),
            description: raw.description.clone().unwrap_or_default(),
            max_stack: raw.max_stack.unwrap_or(1).max(1),
            durability: raw.durability,
            sellable: raw.sellable,
        }
    }

    /// Minimal definition, mostly useful for fixtures
    pub fn simple(name: &str, value: u32) -> Self {
        Self {
            name: name.to_string(),
            tile: 0,
            color: 0,
            value,
            description: String::new(),
            max_stack: 1,
            durability: None,
            sellable: true,
        }
    }

    pub fn is_stackable(&self) -> bool {
        self.max_stack > 1
    }

    /// What a merchant pays when buying this item back
    pub fn buyback_price(&self) -> u32 {
        self.value / 2
    }
}
