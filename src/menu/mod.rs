//! Menu dispatch.
//!
//! Every client menu action is routed through a [`MenuDispatchTable`], which
//! checks the merchant's job mask against the handler's required job before
//! the handler ever runs. Handlers themselves never check jobs.

pub mod handlers;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{DispatchError, MenuError};
use crate::merchant::{Merchant, MerchantJob};
use crate::protocol::{MerchantDialog, PacketReader};
use crate::user::User;

/// Action ids of the built-in merchant menus. Anything below `MainMenu` is a
/// script pursuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MerchantMenuItem {
    MainMenu = 0xFF00,
    BuyItemMenu = 0xFF01,
    SellItemMenu = 0xFF02,
    WithdrawGoldMenu = 0xFF04,
    DepositGoldMenu = 0xFF06,
    LearnSkillMenu = 0xFF07,
    LearnSpellMenu = 0xFF08,
    ForgetSkillMenu = 0xFF09,
    ForgetSpellMenu = 0xFF0A,
    RepairAllItems = 0xFF0C,

    BuyItem = 0xFF10,
    BuyItemQuantity = 0xFF11,
    SellItem = 0xFF13,
    SellItemAccept = 0xFF16,

    WithdrawGoldQuantity = 0xFF24,
    DepositGoldQuantity = 0xFF25,

    LearnSkill = 0xFF30,
    LearnSkillAccept = 0xFF31,
    LearnSpell = 0xFF32,
    LearnSpellAccept = 0xFF33,
    ForgetSkill = 0xFF34,
    ForgetSpell = 0xFF36,

    RepairAllItemsAccept = 0xFF43,
}

impl MerchantMenuItem {
    pub fn id(self) -> u16 {
        self as u16
    }

    /// True for ids handled by scripts rather than built-in handlers
    pub fn is_pursuit(id: u16) -> bool {
        id < MerchantMenuItem::MainMenu as u16
    }
}

impl From<MerchantMenuItem> for u16 {
    fn from(item: MerchantMenuItem) -> u16 {
        item as u16
    }
}

/// A built-in menu handler. Reads its arguments from the request and returns
/// the dialogs to send back to the user.
pub type MenuHandler = Box<
    dyn Fn(&mut User, &Merchant, &mut PacketReader<'_>) -> Result<Vec<MerchantDialog>, MenuError>
        + Send
        + Sync,
>;

pub struct MenuHandlerBinding {
    pub required_job: MerchantJob,
    handler: MenuHandler,
}

/// Action id to handler routing. Built once at startup, read-only afterwards.
#[derive(Default)]
pub struct MenuDispatchTable {
    handlers: HashMap<u16, MenuHandlerBinding>,
}

impl MenuDispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with every built-in vend, bank, training and repair handler
    pub fn with_builtin_handlers() -> Result<Self, DispatchError> {
        let mut table = Self::new();
        handlers::register_builtin(&mut table)?;
        Ok(table)
    }

    pub fn register<F>(
        &mut self,
        action: impl Into<u16>,
        required_job: MerchantJob,
        handler: F,
    ) -> Result<(), DispatchError>
    where
        F: Fn(&mut User, &Merchant, &mut PacketReader<'_>) -> Result<Vec<MerchantDialog>, MenuError>
            + Send
            + Sync
            + 'static,
    {
        let action = action.into();
        if self.handlers.contains_key(&action) {
            return Err(DispatchError::DuplicateHandler(action));
        }
        self.handlers.insert(
            action,
            MenuHandlerBinding {
                required_job,
                handler: Box::new(handler),
            },
        );
        Ok(())
    }

    pub fn contains(&self, action: u16) -> bool {
        self.handlers.contains_key(&action)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `action` if the merchant's job mask allows it
    pub fn dispatch(
        &self,
        action: u16,
        user: &mut User,
        merchant: &Merchant,
        args: &mut PacketReader<'_>,
    ) -> Result<Vec<MerchantDialog>, DispatchError> {
        let Some(binding) = self.handlers.get(&action) else {
            debug!("No menu handler for action {:#06x} on {}", action, merchant.name());
            return Err(DispatchError::UnknownAction(action));
        };

        if !merchant.jobs().intersects(binding.required_job) {
            warn!(
                "User {} requested {:#06x} from {} without job {:?}",
                user.name,
                action,
                merchant.name(),
                binding.required_job
            );
            return Err(DispatchError::Unauthorized {
                action,
                required: binding.required_job,
            });
        }

        Ok((binding.handler)(user, merchant, args)?)
    }
}
