//! Built-in menu handlers for vending, banking, training and repair.
//!
//! Each handler validates everything it can before touching the user or the
//! ledger, so a failed request leaves both unchanged.

use std::sync::Arc;

use chrono::Utc;

use super::{MenuDispatchTable, MerchantMenuItem};
use crate::data::ItemDefinition;
use crate::error::{DispatchError, LedgerError, MenuError};
use crate::item::InventoryItem;
use crate::merchant::{CastableOffer, InventoryLedger, Merchant, MerchantJob};
use crate::protocol::{
    CastableEntry, CastableList, DialogOption, DialogPayload, MerchantDialog, PacketReader, ShopItem,
};
use crate::user::{CastableBook, User};

/// Icon sheet for skills in castable lists
pub const SKILL_ICON_TYPE: u8 = 3;
/// Icon sheet for spells in castable lists
pub const SPELL_ICON_TYPE: u8 = 2;

type MenuResult = Result<Vec<MerchantDialog>, MenuError>;

pub(super) fn register_builtin(table: &mut MenuDispatchTable) -> Result<(), DispatchError> {
    use MerchantMenuItem::*;

    table.register(BuyItemMenu, MerchantJob::VEND, buy_item_menu)?;
    table.register(BuyItem, MerchantJob::VEND, buy_item)?;
    table.register(BuyItemQuantity, MerchantJob::VEND, buy_item_quantity)?;
    table.register(SellItemMenu, MerchantJob::VEND, sell_item_menu)?;
    table.register(SellItem, MerchantJob::VEND, sell_item)?;
    table.register(SellItemAccept, MerchantJob::VEND, sell_item_accept)?;

    table.register(DepositGoldMenu, MerchantJob::BANK, deposit_gold_menu)?;
    table.register(DepositGoldQuantity, MerchantJob::BANK, deposit_gold_quantity)?;
    table.register(WithdrawGoldMenu, MerchantJob::BANK, withdraw_gold_menu)?;
    table.register(WithdrawGoldQuantity, MerchantJob::BANK, withdraw_gold_quantity)?;

    for discipline in [Discipline::Skill, Discipline::Spell] {
        let ids = discipline.menu_ids();
        let job = discipline.job();
        table.register(ids.learn_menu, job, move |u, m, a| learn_menu(discipline, u, m, a))?;
        table.register(ids.learn, job, move |u, m, a| learn(discipline, u, m, a))?;
        table.register(ids.learn_accept, job, move |u, m, a| learn_accept(discipline, u, m, a))?;
        table.register(ids.forget_menu, job, move |u, m, a| forget_menu(discipline, u, m, a))?;
        table.register(ids.forget, job, move |u, m, a| forget(discipline, u, m, a))?;
    }

    table.register(RepairAllItems, MerchantJob::REPAIR, repair_all_items)?;
    table.register(RepairAllItemsAccept, MerchantJob::REPAIR, repair_all_items_accept)?;

    Ok(())
}

// ============================================================================
// Argument Parsing
// ============================================================================

fn read_string(args: &mut PacketReader<'_>, field: &'static str) -> Result<String, MenuError> {
    args.read_string8().ok_or(MenuError::MalformedRequest(field))
}

fn read_slot(args: &mut PacketReader<'_>) -> Result<u8, MenuError> {
    args.read_u8().ok_or(MenuError::MalformedRequest("slot"))
}

/// Positive whole number typed into an input prompt
fn parse_amount(text: &str) -> Result<u32, MenuError> {
    text.trim()
        .parse::<u32>()
        .ok()
        .filter(|amount| *amount > 0)
        .ok_or_else(|| MenuError::InvalidQuantity(text.to_string()))
}

fn yes_no(yes: MerchantMenuItem, no: MerchantMenuItem) -> Vec<DialogOption> {
    vec![DialogOption::new("Yes", yes), DialogOption::new("No", no)]
}

// ============================================================================
// Vend
// ============================================================================

fn ledger(merchant: &Merchant) -> Result<Arc<InventoryLedger>, MenuError> {
    merchant.inventory().ok_or(MenuError::NoInventory)
}

fn buy_item_menu(_user: &mut User, merchant: &Merchant, _args: &mut PacketReader<'_>) -> MenuResult {
    let ledger = ledger(merchant)?;
    ledger.restock_all(Utc::now());

    let items = ledger
        .snapshot()
        .into_iter()
        .filter(|entry| entry.on_hand > 0)
        .map(|entry| ShopItem {
            tile: entry.item.tile,
            color: entry.item.color,
            price: entry.item.value,
            name: entry.item.name.clone(),
            description: entry.item.description.clone(),
        })
        .collect();

    Ok(vec![merchant.dialog(
        "What would you like to buy?",
        DialogPayload::ShopItems {
            id: MerchantMenuItem::BuyItem.id(),
            items,
        },
    )])
}

fn buy_item(user: &mut User, merchant: &Merchant, args: &mut PacketReader<'_>) -> MenuResult {
    let name = read_string(args, "item name")?;
    let ledger = ledger(merchant)?;
    let item = ledger.item(&name)?;
    let on_hand = ledger.lookup(&name)?;

    if on_hand == 0 {
        return Err(LedgerError::InsufficientStock {
            item: name,
            requested: 1,
            on_hand,
        }
        .into());
    }

    if !item.is_stackable() {
        return purchase(user, merchant, &ledger, &item, 1);
    }

    Ok(vec![merchant.dialog(
        format!("How many {} would you like? I have {} left.", name, on_hand),
        DialogPayload::InputWithArgument {
            argument: name,
            id: MerchantMenuItem::BuyItemQuantity.id(),
        },
    )])
}

fn buy_item_quantity(user: &mut User, merchant: &Merchant, args: &mut PacketReader<'_>) -> MenuResult {
    let name = read_string(args, "item name")?;
    let quantity = parse_amount(&read_string(args, "quantity")?)?;
    let ledger = ledger(merchant)?;
    let item = ledger.item(&name)?;
    purchase(user, merchant, &ledger, &item, quantity)
}

fn purchase(
    user: &mut User,
    merchant: &Merchant,
    ledger: &InventoryLedger,
    item: &Arc<ItemDefinition>,
    quantity: u32,
) -> MenuResult {
    let on_hand = ledger.lookup(&item.name)?;
    if quantity > on_hand {
        return Err(LedgerError::InsufficientStock {
            item: item.name.clone(),
            requested: quantity,
            on_hand,
        }
        .into());
    }

    let price = item
        .value
        .checked_mul(quantity)
        .ok_or_else(|| MenuError::InvalidQuantity(quantity.to_string()))?;
    if !user.inventory.has_space_for(item, quantity) {
        return Err(MenuError::InventoryFull);
    }

    user.charge(price)?;
    // Another buyer may have emptied the shelf since the lookup
    if let Err(e) = ledger.reduce(&item.name, quantity) {
        user.pay(price);
        return Err(e.into());
    }
    user.inventory.add_item(item, quantity);

    Ok(vec![merchant.say(format!(
        "{} {} for {} gold. Thank you!",
        quantity, item.name, price
    ))])
}

fn sell_item_menu(user: &mut User, merchant: &Merchant, _args: &mut PacketReader<'_>) -> MenuResult {
    Ok(vec![merchant.dialog(
        "What would you like to sell?",
        DialogPayload::UserInventoryItems {
            id: MerchantMenuItem::SellItem.id(),
            slots: user.inventory.sellable_slots(),
        },
    )])
}

fn sellable(user: &User, slot: u8) -> Result<&InventoryItem, MenuError> {
    let item = user.inventory.get(slot).ok_or(MenuError::EmptySlot(slot))?;
    if !item.item.sellable {
        return Err(MenuError::NotSellable(item.name().to_string()));
    }
    Ok(item)
}

fn offer_for(item: &InventoryItem) -> u32 {
    item.item.buyback_price().saturating_mul(item.quantity)
}

fn sell_item(user: &mut User, merchant: &Merchant, args: &mut PacketReader<'_>) -> MenuResult {
    let slot = read_slot(args)?;
    let item = sellable(user, slot)?;

    Ok(vec![merchant.dialog(
        format!("I'll give you {} gold for {}. Deal?", offer_for(item), item.name()),
        DialogPayload::OptionsWithArgument {
            argument: slot.to_string(),
            options: yes_no(MerchantMenuItem::SellItemAccept, MerchantMenuItem::SellItemMenu),
        },
    )])
}

fn sell_item_accept(user: &mut User, merchant: &Merchant, args: &mut PacketReader<'_>) -> MenuResult {
    let slot: u8 = read_string(args, "slot")?
        .parse()
        .map_err(|_| MenuError::MalformedRequest("slot"))?;
    let offer = offer_for(sellable(user, slot)?);

    let Some(sold) = user.inventory.remove(slot) else {
        return Err(MenuError::EmptySlot(slot));
    };
    user.pay(offer);

    if let Some(ledger) = merchant.inventory() {
        if ledger.contains(sold.name()) {
            ledger.restore(sold.name(), sold.quantity)?;
        }
    }

    Ok(vec![merchant.say(format!("Here is {} gold for {}.", offer, sold.name()))])
}

// ============================================================================
// Bank
// ============================================================================

fn deposit_gold_menu(user: &mut User, merchant: &Merchant, _args: &mut PacketReader<'_>) -> MenuResult {
    Ok(vec![merchant.dialog(
        format!("You carry {} gold. How much will you deposit?", user.gold),
        DialogPayload::Input {
            id: MerchantMenuItem::DepositGoldQuantity.id(),
        },
    )])
}

fn deposit_gold_quantity(user: &mut User, merchant: &Merchant, args: &mut PacketReader<'_>) -> MenuResult {
    let amount = parse_amount(&read_string(args, "amount")?)?;
    user.charge(amount)?;
    user.bank_gold = user.bank_gold.saturating_add(amount);
    Ok(vec![merchant.say(format!("I am holding {} gold for you.", user.bank_gold))])
}

fn withdraw_gold_menu(user: &mut User, merchant: &Merchant, _args: &mut PacketReader<'_>) -> MenuResult {
    Ok(vec![merchant.dialog(
        format!("I am holding {} gold for you. How much will you withdraw?", user.bank_gold),
        DialogPayload::Input {
            id: MerchantMenuItem::WithdrawGoldQuantity.id(),
        },
    )])
}

fn withdraw_gold_quantity(user: &mut User, merchant: &Merchant, args: &mut PacketReader<'_>) -> MenuResult {
    let amount = parse_amount(&read_string(args, "amount")?)?;
    if amount > user.bank_gold {
        return Err(MenuError::InsufficientGold {
            needed: amount,
            available: user.bank_gold,
        });
    }
    user.bank_gold -= amount;
    user.pay(amount);
    Ok(vec![merchant.say(format!("Here is {} gold.", amount))])
}

// ============================================================================
// Skills and Spells
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discipline {
    Skill,
    Spell,
}

struct DisciplineMenus {
    learn_menu: MerchantMenuItem,
    learn: MerchantMenuItem,
    learn_accept: MerchantMenuItem,
    forget_menu: MerchantMenuItem,
    forget: MerchantMenuItem,
}

impl Discipline {
    fn job(self) -> MerchantJob {
        match self {
            Discipline::Skill => MerchantJob::SKILLS,
            Discipline::Spell => MerchantJob::SPELLS,
        }
    }

    fn menu_ids(self) -> DisciplineMenus {
        use MerchantMenuItem::*;
        match self {
            Discipline::Skill => DisciplineMenus {
                learn_menu: LearnSkillMenu,
                learn: LearnSkill,
                learn_accept: LearnSkillAccept,
                forget_menu: ForgetSkillMenu,
                forget: ForgetSkill,
            },
            Discipline::Spell => DisciplineMenus {
                learn_menu: LearnSpellMenu,
                learn: LearnSpell,
                learn_accept: LearnSpellAccept,
                forget_menu: ForgetSpellMenu,
                forget: ForgetSpell,
            },
        }
    }

    fn label(self) -> &'static str {
        match self {
            Discipline::Skill => "skill",
            Discipline::Spell => "spell",
        }
    }

    fn offers(self, merchant: &Merchant) -> &[CastableOffer] {
        match self {
            Discipline::Skill => merchant.skills(),
            Discipline::Spell => merchant.spells(),
        }
    }

    fn book(self, user: &mut User) -> &mut CastableBook {
        match self {
            Discipline::Skill => &mut user.skill_book,
            Discipline::Spell => &mut user.spell_book,
        }
    }

    fn offer<'m>(self, merchant: &'m Merchant, name: &str) -> Result<&'m CastableOffer, MenuError> {
        self.offers(merchant)
            .iter()
            .find(|offer| offer.name == name)
            .ok_or_else(|| MenuError::UnknownCastable(name.to_string()))
    }
}

fn learn_menu(discipline: Discipline, user: &mut User, merchant: &Merchant, _args: &mut PacketReader<'_>) -> MenuResult {
    let icon_type = match discipline {
        Discipline::Skill => SKILL_ICON_TYPE,
        Discipline::Spell => SPELL_ICON_TYPE,
    };
    let book = discipline.book(user);
    let entries = discipline
        .offers(merchant)
        .iter()
        .filter(|offer| !book.knows(&offer.name))
        .map(|offer| CastableEntry {
            icon_type,
            icon: offer.icon,
            color: offer.color,
            name: offer.name.clone(),
        })
        .collect();

    let list = CastableList {
        id: discipline.menu_ids().learn.id(),
        icon_type,
        entries,
    };
    let payload = match discipline {
        Discipline::Skill => DialogPayload::Skills(list),
        Discipline::Spell => DialogPayload::Spells(list),
    };
    Ok(vec![merchant.dialog(format!("Which {} would you like to learn?", discipline.label()), payload)])
}

fn learn(discipline: Discipline, user: &mut User, merchant: &Merchant, args: &mut PacketReader<'_>) -> MenuResult {
    let name = read_string(args, "castable name")?;
    let offer = discipline.offer(merchant, &name)?;
    if discipline.book(user).knows(&name) {
        return Err(MenuError::AlreadyKnown(name));
    }

    let ids = discipline.menu_ids();
    Ok(vec![merchant.dialog(
        format!("{} costs {} gold. Shall I teach you?", offer.name, offer.price),
        DialogPayload::OptionsWithArgument {
            argument: name,
            options: yes_no(ids.learn_accept, ids.learn_menu),
        },
    )])
}

fn learn_accept(discipline: Discipline, user: &mut User, merchant: &Merchant, args: &mut PacketReader<'_>) -> MenuResult {
    let name = read_string(args, "castable name")?;
    let price = discipline.offer(merchant, &name)?.price;

    user.charge(price)?;
    if let Err(e) = discipline.book(user).learn(&name) {
        user.pay(price);
        return Err(e);
    }

    Ok(vec![merchant.say(format!("You have learned {}.", name))])
}

fn forget_menu(discipline: Discipline, _user: &mut User, merchant: &Merchant, _args: &mut PacketReader<'_>) -> MenuResult {
    let id = discipline.menu_ids().forget.id();
    let payload = match discipline {
        Discipline::Skill => DialogPayload::UserSkillBook { id },
        Discipline::Spell => DialogPayload::UserSpellBook { id },
    };
    Ok(vec![merchant.dialog(format!("Which {} will you forget?", discipline.label()), payload)])
}

fn forget(discipline: Discipline, user: &mut User, merchant: &Merchant, args: &mut PacketReader<'_>) -> MenuResult {
    let slot = read_slot(args)?;
    let forgotten = discipline.book(user).forget(slot).ok_or(MenuError::EmptySlot(slot))?;
    Ok(vec![merchant.say(format!("You have forgotten {}.", forgotten))])
}

// ============================================================================
// Repair
// ============================================================================

fn repair_quote(user: &User) -> u32 {
    user.inventory
        .occupied()
        .map(|(_, item)| item.repair_cost())
        .fold(0u32, u32::saturating_add)
}

fn repair_all_items(user: &mut User, merchant: &Merchant, _args: &mut PacketReader<'_>) -> MenuResult {
    let cost = repair_quote(user);
    if cost == 0 {
        return Ok(vec![merchant.say("Your equipment is in fine condition.")]);
    }

    Ok(vec![merchant.dialog(
        format!("I can repair everything for {} gold.", cost),
        DialogPayload::Options(yes_no(MerchantMenuItem::RepairAllItemsAccept, MerchantMenuItem::MainMenu)),
    )])
}

fn repair_all_items_accept(user: &mut User, merchant: &Merchant, _args: &mut PacketReader<'_>) -> MenuResult {
    let cost = repair_quote(user);
    user.charge(cost)?;
    user.inventory.occupied_mut().for_each(InventoryItem::repair);
    Ok(vec![merchant.say(format!("All repaired, for {} gold.", cost))])
}
