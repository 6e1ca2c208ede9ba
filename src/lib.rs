//! Merchant NPC server core: stock ledgers with timed restocking, job-gated
//! menu dispatch, and the binary dialog protocol merchants speak.

pub mod config;
pub mod data;
pub mod error;
pub mod game;
pub mod item;
pub mod menu;
pub mod merchant;
pub mod protocol;
pub mod script;
pub mod user;
pub mod world;

pub use config::ServerConfig;
pub use game::MerchantWorld;
