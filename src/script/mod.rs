//! Scripting hooks for merchant behavior.
//!
//! The engine owns script lifetimes; a merchant only holds an `Arc` to the
//! script associated with it.

pub mod lua;
pub mod registry;

use std::sync::{Arc, Mutex};

use crate::protocol::DialogOption;
use crate::world::WorldObject;

pub use lua::LuaScript;
pub use registry::{HotReloadEvent, ScriptRegistry};

/// Top-level menu options registered by a script
pub type Pursuits = Arc<Mutex<Vec<DialogOption>>>;

/// Argument passed to a script function
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    User { id: u32, name: String },
    Object(WorldObject),
    Number(i64),
}

/// Value written into a script's globals
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Text(String),
    Bool(bool),
    Integer(i64),
}

/// What a script learns about the merchant it is attached to
#[derive(Debug, Clone)]
pub struct ScriptBinding {
    pub merchant_id: u32,
    pub merchant_name: String,
    pub pursuits: Pursuits,
}

pub trait MerchantScript: Send + Sync {
    fn associate(&self, binding: ScriptBinding);

    fn has_function(&self, name: &str) -> bool;

    /// Run `name` with `args`. Returns false if the function is missing,
    /// raised an error, or returned `false`.
    fn execute_function(&self, name: &str, args: &[ScriptArg]) -> bool;

    fn set_global_value(&self, name: &str, value: ScriptValue);
}
