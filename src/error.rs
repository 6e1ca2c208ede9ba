//! Error types for the merchant core.
//!
//! Every failure here is recoverable at merchant or request scope; nothing in
//! this module is fatal to the world process.

use crate::merchant::MerchantJob;

/// Failures from [`crate::merchant::InventoryLedger`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("item '{0}' is not stocked by this merchant")]
    NotFound(String),

    #[error("cannot take {requested} of '{item}': only {on_hand} on hand")]
    InsufficientStock {
        item: String,
        requested: u32,
        on_hand: u32,
    },
}

/// Failures from dialog encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("{field} is {len} long, wire field holds at most {max}")]
    EncodingOverflow {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

/// Failures raised inside a menu handler. The handler's caller decides what
/// the user gets told.
#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("malformed menu request: {0}")]
    MalformedRequest(&'static str),

    #[error("merchant has no inventory")]
    NoInventory,

    #[error("not enough gold: need {needed}, have {available}")]
    InsufficientGold { needed: u32, available: u32 },

    #[error("inventory is full")]
    InventoryFull,

    #[error("inventory slot {0} is empty")]
    EmptySlot(u8),

    #[error("'{0}' cannot be sold")]
    NotSellable(String),

    #[error("'{0}' is not taught here")]
    UnknownCastable(String),

    #[error("'{0}' is already known")]
    AlreadyKnown(String),

    #[error("book is full")]
    BookFull,

    #[error("invalid quantity '{0}'")]
    InvalidQuantity(String),
}

/// Failures from [`crate::menu::MenuDispatchTable`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no handler registered for menu action {0:#06x}")]
    UnknownAction(u16),

    #[error("menu action {action:#06x} requires job {required:?}")]
    Unauthorized { action: u16, required: MerchantJob },

    #[error("menu action {0:#06x} registered twice")]
    DuplicateHandler(u16),

    #[error("malformed menu frame: {0}")]
    MalformedFrame(String),

    #[error("merchant {0:#010x} does not exist")]
    UnknownMerchant(u32),

    #[error("merchant {0:#010x} is not ready")]
    NotReady(u32),

    #[error(transparent)]
    Handler(#[from] MenuError),
}

/// Failures while bringing a merchant to the ready state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    #[error("vend item '{0}' is not defined in the world item catalog")]
    UnresolvedItemReference(String),

    #[error("script hook '{0}' reported failure")]
    ScriptFailed(&'static str),
}

/// Failures from the embedded script engine.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("script path {0:?} has no usable file name")]
    InvalidName(std::path::PathBuf),

    #[error("failed to read script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
