//! The merchant world: every spawned merchant plus the shared catalogs and
//! menu routing. Transport hands raw client frames to
//! [`MerchantWorld::handle_menu_request`] and sends back whatever it returns.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::data::ItemRegistry;
use crate::error::{DispatchError, MenuError};
use crate::menu::{MenuDispatchTable, MerchantMenuItem};
use crate::merchant::{ClickOutcome, Merchant, MerchantDefinition, MerchantRegistry};
use crate::protocol::{MenuRequest, MerchantDialog};
use crate::script::{ScriptArg, ScriptRegistry};
use crate::user::User;

/// First id handed to a spawned merchant
pub const FIRST_MERCHANT_ID: u32 = 0x4000_0000;

pub struct MerchantWorld {
    items: Arc<ItemRegistry>,
    scripts: Arc<ScriptRegistry>,
    merchants: DashMap<u32, Arc<Merchant>>,
    next_id: AtomicU32,
    menus: MenuDispatchTable,
}

impl MerchantWorld {
    pub fn new(items: Arc<ItemRegistry>, scripts: Arc<ScriptRegistry>) -> Result<Self, DispatchError> {
        Ok(Self::with_menus(items, scripts, MenuDispatchTable::with_builtin_handlers()?))
    }

    pub fn with_menus(items: Arc<ItemRegistry>, scripts: Arc<ScriptRegistry>, menus: MenuDispatchTable) -> Self {
        Self {
            items,
            scripts,
            merchants: DashMap::new(),
            next_id: AtomicU32::new(FIRST_MERCHANT_ID),
            menus,
        }
    }

    pub fn items(&self) -> &Arc<ItemRegistry> {
        &self.items
    }

    pub fn scripts(&self) -> &Arc<ScriptRegistry> {
        &self.scripts
    }

    /// Place one merchant in the world. A failed spawn is logged and retried
    /// on the merchant's first interaction.
    pub fn spawn(&self, definition: Arc<MerchantDefinition>) -> Arc<Merchant> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let merchant = Arc::new(Merchant::new(
            id,
            definition,
            Arc::clone(&self.items),
            Arc::clone(&self.scripts),
        ));

        if let Err(e) = merchant.on_spawn() {
            warn!("Merchant {} ({:#010x}) failed to spawn: {}", merchant.name(), id, e);
        }

        self.merchants.insert(id, Arc::clone(&merchant));
        merchant
    }

    /// Spawn one merchant per definition. Returns how many came up ready.
    pub fn spawn_all(&self, registry: &MerchantRegistry) -> usize {
        let ready = registry
            .all()
            .map(|definition| self.spawn(Arc::new(definition.clone())))
            .filter(|merchant| merchant.is_ready())
            .count();
        info!("Spawned {} merchants, {} ready", registry.len(), ready);
        ready
    }

    pub fn merchant(&self, id: u32) -> Option<Arc<Merchant>> {
        self.merchants.get(&id).map(|m| Arc::clone(m.value()))
    }

    pub fn merchant_by_name(&self, name: &str) -> Option<Arc<Merchant>> {
        self.merchants
            .iter()
            .find(|m| m.name() == name)
            .map(|m| Arc::clone(m.value()))
    }

    /// All merchants, ordered by id
    pub fn merchants(&self) -> Vec<Arc<Merchant>> {
        let mut merchants: Vec<_> = self.merchants.iter().map(|m| Arc::clone(m.value())).collect();
        merchants.sort_by_key(|m| m.id);
        merchants
    }

    pub fn len(&self) -> usize {
        self.merchants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merchants.is_empty()
    }

    /// Restock every merchant that has something due. Returns the number of
    /// entries restocked across the world.
    pub fn restock_all(&self, now: DateTime<Utc>) -> usize {
        // Collected first so no map shard is held while ledgers lock
        self.merchants().iter().map(|m| m.restock(now)).sum()
    }

    /// Rebind the merchant named `name` to its freshly loaded script. Returns
    /// false when no such merchant is in the world.
    pub fn reload_script(&self, name: &str) -> bool {
        let Some(merchant) = self.merchant_by_name(name) else {
            debug!("Reloaded script {} has no merchant in the world", name);
            return false;
        };
        merchant.refresh_script();
        true
    }

    /// A user clicked a merchant. Returns the frames to send back.
    pub fn handle_click(&self, user: &User, merchant_id: u32) -> Result<Vec<Vec<u8>>, DispatchError> {
        let merchant = self
            .merchant(merchant_id)
            .ok_or(DispatchError::UnknownMerchant(merchant_id))?;

        match merchant.on_click(user) {
            ClickOutcome::Scripted => Ok(Vec::new()),
            ClickOutcome::Menu(dialog) => encode_all(vec![dialog]),
        }
    }

    /// Decode and route a 0x39 menu frame. Returns the encoded dialog frames
    /// to send back to `user`.
    pub fn handle_menu_request(&self, user: &mut User, data: &[u8]) -> Result<Vec<Vec<u8>>, DispatchError> {
        let request = MenuRequest::decode(data).map_err(DispatchError::MalformedFrame)?;
        let merchant = self
            .merchant(request.merchant_id)
            .ok_or(DispatchError::UnknownMerchant(request.merchant_id))?;

        if !merchant.ensure_spawned() {
            return Err(DispatchError::NotReady(merchant.id));
        }

        let dialogs = if request.action == MerchantMenuItem::MainMenu.id() {
            vec![merchant.root_menu()]
        } else if MerchantMenuItem::is_pursuit(request.action) {
            self.run_pursuit(user, &merchant, request.action)?
        } else {
            self.menus.dispatch(request.action, user, &merchant, &mut request.args())?
        };

        encode_all(dialogs)
    }

    /// Script pursuits answer through the script itself, so nothing comes back
    /// here on success
    fn run_pursuit(&self, user: &User, merchant: &Merchant, action: u16) -> Result<Vec<MerchantDialog>, DispatchError> {
        let script = merchant.refresh_script();
        let offered = merchant.pursuits().iter().any(|p| p.id == action);
        let script = script.filter(|_| offered);
        let Some(script) = script else {
            debug!("{} offers no pursuit {}", merchant.name(), action);
            return Err(DispatchError::UnknownAction(action));
        };

        script.execute_function(
            "OnPursuit",
            &[
                ScriptArg::User {
                    id: user.id,
                    name: user.name.clone(),
                },
                ScriptArg::Number(action as i64),
            ],
        );
        Ok(Vec::new())
    }
}

fn encode_all(dialogs: Vec<MerchantDialog>) -> Result<Vec<Vec<u8>>, DispatchError> {
    dialogs
        .iter()
        .map(|dialog| dialog.encode().map_err(|e| DispatchError::Handler(MenuError::from(e))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ItemDefinition;
    use crate::error::LedgerError;
    use crate::merchant::{MerchantJob, VendItem};
    use crate::protocol::dialog::MERCHANT_DIALOG_OPCODE;
    use crate::protocol::{PacketReader, PacketWriter};
    use crate::script::LuaScript;
    use chrono::Duration;

    fn apple_world() -> (MerchantWorld, Arc<Merchant>) {
        let mut items = ItemRegistry::new();
        let mut apple = ItemDefinition::simple("Apple", 4);
        apple.max_stack = 50;
        items.insert(apple);

        let world = MerchantWorld::new(Arc::new(items), Arc::new(ScriptRegistry::empty())).unwrap();
        let merchant = world.spawn(Arc::new(MerchantDefinition::new("Riona").with_vend_items(vec![
            VendItem {
                name: "Apple".into(),
                quantity: 10,
                restock: 60,
            },
        ])));
        (world, merchant)
    }

    fn menu_frame(merchant_id: u32, action: impl Into<u16>, args: &[&str]) -> Vec<u8> {
        let mut w = PacketWriter::with_opcode(0x39);
        w.write_u8(1);
        w.write_u32(merchant_id);
        w.write_u16(action.into());
        for arg in args {
            w.write_string8("arg", arg).unwrap();
        }
        w.into_vec()
    }

    #[test]
    fn test_ids_start_at_merchant_range() {
        let (world, merchant) = apple_world();
        assert_eq!(merchant.id, FIRST_MERCHANT_ID);
        let second = world.spawn(Arc::new(MerchantDefinition::new("Deoch")));
        assert_eq!(second.id, FIRST_MERCHANT_ID + 1);
        assert_eq!(world.merchants().len(), 2);
        assert_eq!(world.merchant_by_name("Deoch").unwrap().id, second.id);
    }

    #[test]
    fn test_apple_scenario() {
        let (world, merchant) = apple_world();
        let ledger = merchant.inventory().unwrap();
        let t0 = ledger.snapshot()[0].last_restock;

        assert_eq!(ledger.reduce("Apple", 3), Ok(7));
        assert_eq!(world.restock_all(t0 + Duration::minutes(30)), 0);
        assert_eq!(ledger.lookup("Apple"), Ok(7));
        assert_eq!(world.restock_all(t0 + Duration::minutes(61)), 1);
        assert_eq!(ledger.lookup("Apple"), Ok(10));
        assert_eq!(ledger.lookup("Banana"), Err(LedgerError::NotFound("Banana".into())));
    }

    #[test]
    fn test_main_menu_frame() {
        let (world, merchant) = apple_world();
        let mut user = User::new(1, "Kedian");

        let frames = world
            .handle_menu_request(&mut user, &menu_frame(merchant.id, MerchantMenuItem::MainMenu, &[]))
            .unwrap();
        assert_eq!(frames.len(), 1);

        let mut reader = PacketReader::new(&frames[0]);
        assert_eq!(reader.read_u8(), Some(MERCHANT_DIALOG_OPCODE));
        assert_eq!(reader.read_u8(), Some(0));
        assert_eq!(reader.read_u8(), Some(1));
        assert_eq!(reader.read_u32(), Some(merchant.id));
    }

    #[test]
    fn test_buy_through_frames() {
        let (world, merchant) = apple_world();
        let mut user = User::new(1, "Kedian").with_gold(40);

        world
            .handle_menu_request(
                &mut user,
                &menu_frame(merchant.id, MerchantMenuItem::BuyItemQuantity, &["Apple", "5"]),
            )
            .unwrap();
        assert_eq!(merchant.inventory().unwrap().lookup("Apple"), Ok(5));
        assert_eq!(user.gold, 20);
    }

    #[test]
    fn test_routing_errors() {
        let (world, merchant) = apple_world();
        let mut user = User::new(1, "Kedian");

        let result = world.handle_menu_request(&mut user, &menu_frame(7, MerchantMenuItem::BuyItemMenu, &[]));
        assert!(matches!(result, Err(DispatchError::UnknownMerchant(7))));

        let result = world.handle_menu_request(&mut user, &[0x39, 1]);
        assert!(matches!(result, Err(DispatchError::MalformedFrame(_))));

        let result = world.handle_menu_request(&mut user, &menu_frame(merchant.id, MerchantMenuItem::DepositGoldMenu, &[]));
        assert!(matches!(
            result,
            Err(DispatchError::Unauthorized { required, .. }) if required == MerchantJob::BANK
        ));

        let result = world.handle_menu_request(&mut user, &menu_frame(merchant.id, 12u16, &[]));
        assert!(matches!(result, Err(DispatchError::UnknownAction(12))));
    }

    #[test]
    fn test_script_pursuit_round_trip() {
        let scripts = ScriptRegistry::empty();
        let script = LuaScript::load(
            "Deoch",
            r#"
            function OnSpawn()
                npc.add_pursuit("Tell me a story", 12)
            end
            function OnPursuit(user, id)
                last_pursuit = user.name .. ":" .. id
            end
            "#,
        )
        .unwrap();
        let script = Arc::new(script);
        scripts.insert("Deoch", script.clone());

        let world = MerchantWorld::new(Arc::new(ItemRegistry::new()), Arc::new(scripts)).unwrap();
        let merchant = world.spawn(Arc::new(MerchantDefinition::new("Deoch").with_jobs(MerchantJob::BANK)));
        assert!(merchant.is_ready());
        assert_eq!(merchant.root_menu_options()[0].id, 12);

        let mut user = User::new(1, "Kedian");
        let frames = world
            .handle_menu_request(&mut user, &menu_frame(merchant.id, 12u16, &[]))
            .unwrap();
        assert!(frames.is_empty());
        assert_eq!(script.global_string("last_pursuit").as_deref(), Some("Kedian:12"));
    }

    #[test]
    fn test_click_without_script_sends_root_menu() {
        let (world, merchant) = apple_world();
        let frames = world.handle_click(&User::new(1, "Kedian"), merchant.id).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0][0], MERCHANT_DIALOG_OPCODE);
    }

    #[test]
    fn test_shipped_world_data_spawns() {
        let data_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        let mut items = ItemRegistry::new();
        items.load_from_directory(&data_dir).unwrap();
        let mut merchants = MerchantRegistry::new();
        merchants.load_from_directory(&data_dir).unwrap();
        let scripts = ScriptRegistry::new(&data_dir.join("scripts/merchants"));
        assert_eq!(scripts.load_all().unwrap(), 1);

        let world = MerchantWorld::new(Arc::new(items), Arc::new(scripts)).unwrap();
        assert_eq!(world.spawn_all(&merchants), 3);

        let riona = world.merchant_by_name("Riona").unwrap();
        assert_eq!(riona.inventory().unwrap().len(), 3);
        assert_eq!(riona.root_menu_options()[0].text, "What news?");

        let dar = world.merchant_by_name("Dar").unwrap();
        assert_eq!(dar.jobs(), MerchantJob::SKILLS | MerchantJob::SPELLS);
        assert!(dar.inventory().is_none());
    }

    #[test]
    fn test_unready_merchant_rejects_menu_requests() {
        let world = MerchantWorld::new(Arc::new(ItemRegistry::new()), Arc::new(ScriptRegistry::empty())).unwrap();
        let merchant = world.spawn(Arc::new(MerchantDefinition::new("Aingeal").with_vend_items(vec![VendItem {
            name: "Pear".into(),
            quantity: 5,
            restock: 60,
        }])));
        assert!(!merchant.is_ready());

        let mut user = User::new(1, "Kedian");
        let result = world.handle_menu_request(&mut user, &menu_frame(merchant.id, MerchantMenuItem::MainMenu, &[]));
        assert!(matches!(result, Err(DispatchError::NotReady(id)) if id == merchant.id));
    }

    #[test]
    fn test_reload_script_rebinds_spawned_merchant() {
        let scripts = ScriptRegistry::empty();
        let old = LuaScript::load("Deoch", r#"function OnSpawn() npc.add_pursuit("Old tale", 12) end"#).unwrap();
        scripts.insert("Deoch", Arc::new(old));

        let world = MerchantWorld::new(Arc::new(ItemRegistry::new()), Arc::new(scripts)).unwrap();
        let merchant = world.spawn(Arc::new(MerchantDefinition::new("Deoch").with_jobs(MerchantJob::BANK)));
        assert_eq!(merchant.root_menu_options()[0].id, 12);

        let new = LuaScript::load(
            "Deoch",
            r#"
            function OnSpawn() npc.add_pursuit("New tale", 13) end
            function OnPursuit(user, id) last_pursuit = "tale " .. id end
            "#,
        )
        .unwrap();
        let new = Arc::new(new);
        world.scripts().insert("Deoch", new.clone());

        assert!(world.reload_script("Deoch"));
        assert!(!world.reload_script("Nobody"));
        assert_eq!(merchant.root_menu_options()[0].id, 13);

        let mut user = User::new(1, "Kedian");
        world
            .handle_menu_request(&mut user, &menu_frame(merchant.id, 13u16, &[]))
            .unwrap();
        assert_eq!(new.global_string("last_pursuit").as_deref(), Some("tale 13"));
    }
}
