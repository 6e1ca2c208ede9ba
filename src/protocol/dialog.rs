//! Merchant dialog payloads and their wire encoding.
//!
//! Payloads never store their own count or length fields. Every prefix is
//! computed from the live `Vec`/`String` at the moment of encoding, so a frame
//! cannot declare a size that disagrees with its data.

use super::packet::PacketWriter;
use crate::error::CodecError;

/// Opcode of the server frame carrying a merchant dialog
pub const MERCHANT_DIALOG_OPCODE: u8 = 0x2F;

/// Added to a creature sprite to select the NPC sprite sheet
pub const NPC_SPRITE_BIAS: u16 = 0x4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MerchantDialogType {
    Options = 0,
    OptionsWithArgument = 1,
    Input = 2,
    InputWithArgument = 3,
    MerchantShopItems = 4,
    UserInventoryItems = 5,
    MerchantSpells = 6,
    MerchantSkills = 7,
    UserSpellBook = 8,
    UserSkillBook = 9,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MerchantDialogObjectType {
    Merchant = 1,
}

/// One selectable line in an option list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogOption {
    pub text: String,
    pub id: u16,
}

impl DialogOption {
    pub fn new(text: impl Into<String>, id: impl Into<u16>) -> Self {
        Self {
            text: text.into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopItem {
    pub tile: u16,
    pub color: u8,
    pub price: u32,
    pub name: String,
    pub description: String,
}

/// A spell or skill offered for learning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastableEntry {
    pub icon_type: u8,
    pub icon: u8,
    pub color: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastableList {
    pub id: u16,
    pub icon_type: u8,
    pub entries: Vec<CastableEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogPayload {
    Options(Vec<DialogOption>),
    OptionsWithArgument {
        argument: String,
        options: Vec<DialogOption>,
    },
    Input {
        id: u16,
    },
    InputWithArgument {
        argument: String,
        id: u16,
    },
    ShopItems {
        id: u16,
        items: Vec<ShopItem>,
    },
    UserInventoryItems {
        id: u16,
        slots: Vec<u8>,
    },
    Spells(CastableList),
    Skills(CastableList),
    UserSpellBook {
        id: u16,
    },
    UserSkillBook {
        id: u16,
    },
}

impl DialogPayload {
    pub fn dialog_type(&self) -> MerchantDialogType {
        match self {
            DialogPayload::Options(_) => MerchantDialogType::Options,
            DialogPayload::OptionsWithArgument { .. } => MerchantDialogType::OptionsWithArgument,
            DialogPayload::Input { .. } => MerchantDialogType::Input,
            DialogPayload::InputWithArgument { .. } => MerchantDialogType::InputWithArgument,
            DialogPayload::ShopItems { .. } => MerchantDialogType::MerchantShopItems,
            DialogPayload::UserInventoryItems { .. } => MerchantDialogType::UserInventoryItems,
            DialogPayload::Spells(_) => MerchantDialogType::MerchantSpells,
            DialogPayload::Skills(_) => MerchantDialogType::MerchantSkills,
            DialogPayload::UserSpellBook { .. } => MerchantDialogType::UserSpellBook,
            DialogPayload::UserSkillBook { .. } => MerchantDialogType::UserSkillBook,
        }
    }

    /// Write the variant body (everything after the frame header)
    pub fn encode_into(&self, w: &mut PacketWriter) -> Result<(), CodecError> {
        match self {
            DialogPayload::Options(options) => write_options(w, options),
            DialogPayload::OptionsWithArgument { argument, options } => {
                w.write_string8("argument", argument)?;
                write_options(w, options)
            }
            DialogPayload::Input { id } => {
                w.write_u16(*id);
                Ok(())
            }
            DialogPayload::InputWithArgument { argument, id } => {
                w.write_string8("argument", argument)?;
                w.write_u16(*id);
                Ok(())
            }
            DialogPayload::ShopItems { id, items } => {
                w.write_u16(*id);
                w.write_count16("shop item count", items.len())?;
                for item in items {
                    w.write_u16(item.tile);
                    w.write_u8(item.color);
                    w.write_u32(item.price);
                    w.write_string8("shop item name", &item.name)?;
                    w.write_string8("shop item description", &item.description)?;
                }
                Ok(())
            }
            DialogPayload::UserInventoryItems { id, slots } => {
                w.write_u16(*id);
                w.write_count8("inventory slot count", slots.len())?;
                w.write_bytes(slots);
                Ok(())
            }
            DialogPayload::Spells(list) | DialogPayload::Skills(list) => write_castables(w, list),
            DialogPayload::UserSpellBook { id } | DialogPayload::UserSkillBook { id } => {
                w.write_u16(*id);
                Ok(())
            }
        }
    }

    /// Encode only the variant body
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut w = PacketWriter::new();
        self.encode_into(&mut w)?;
        Ok(w.into_vec())
    }
}

fn write_options(w: &mut PacketWriter, options: &[DialogOption]) -> Result<(), CodecError> {
    w.write_count8("option count", options.len())?;
    for option in options {
        w.write_string8("option text", &option.text)?;
        w.write_u16(option.id);
    }
    Ok(())
}

fn write_castables(w: &mut PacketWriter, list: &CastableList) -> Result<(), CodecError> {
    w.write_u16(list.id);
    w.write_count16("castable count", list.entries.len())?;
    w.write_u8(list.icon_type);
    for entry in &list.entries {
        w.write_u8(entry.icon_type);
        w.write_u8(entry.icon);
        w.write_u8(entry.color);
        w.write_string8("castable name", &entry.name)?;
    }
    Ok(())
}

/// A complete dialog frame as sent to one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantDialog {
    pub merchant_id: u32,
    pub sprite: u16,
    pub merchant_name: String,
    pub text: String,
    pub payload: DialogPayload,
}

impl MerchantDialog {
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut w = PacketWriter::with_opcode(MERCHANT_DIALOG_OPCODE);
        let sprite = self.sprite.wrapping_add(NPC_SPRITE_BIAS);

        w.write_u8(self.payload.dialog_type() as u8);
        w.write_u8(MerchantDialogObjectType::Merchant as u8);
        w.write_u32(self.merchant_id);
        w.write_u8(1);
        w.write_u16(sprite);
        w.write_u8(0);
        w.write_u8(1);
        w.write_u16(sprite);
        w.write_u8(0);
        w.write_u8(0);
        w.write_string8("merchant name", &self.merchant_name)?;
        w.write_string16("dialog text", &self.text)?;
        self.payload.encode_into(&mut w)?;

        Ok(w.into_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop_item(name: &str, description: &str) -> ShopItem {
        ShopItem {
            tile: 0x0102,
            color: 7,
            price: 250,
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_options_layout() {
        let payload = DialogPayload::Options(vec![
            DialogOption::new("Buy", 0xFF01u16),
            DialogOption::new("Sell", 0xFF02u16),
        ]);
        assert_eq!(
            payload.encode().unwrap(),
            vec![2, 3, b'B', b'u', b'y', 0xFF, 0x01, 4, b'S', b'e', b'l', b'l', 0xFF, 0x02]
        );
    }

    #[test]
    fn test_shop_items_count_and_length() {
        let items = vec![
            shop_item("Apple", "Crunchy."),
            shop_item("Pear", ""),
            shop_item("Dragon Scale Mail", "Heavy, but worth it."),
        ];
        let expected_len: usize = 2
            + 2
            + items
                .iter()
                .map(|i| 2 + 1 + 4 + 1 + i.name.len() + 1 + i.description.len())
                .sum::<usize>();

        let bytes = DialogPayload::ShopItems { id: 0xFF10, items }.encode().unwrap();

        assert_eq!(&bytes[0..2], &[0xFF, 0x10]);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 3);
        assert_eq!(bytes.len(), expected_len);
    }

    #[test]
    fn test_shop_item_fields() {
        let bytes = DialogPayload::ShopItems {
            id: 1,
            items: vec![shop_item("Hat", "Warm")],
        }
        .encode()
        .unwrap();
        assert_eq!(
            &bytes[4..],
            &[0x01, 0x02, 7, 0, 0, 0, 250, 3, b'H', b'a', b't', 4, b'W', b'a', b'r', b'm']
        );
    }

    #[test]
    fn test_input_variants() {
        assert_eq!(DialogPayload::Input { id: 0xFF25 }.encode().unwrap(), vec![0xFF, 0x25]);
        assert_eq!(
            DialogPayload::InputWithArgument {
                argument: "Apple".into(),
                id: 0xFF11
            }
            .encode()
            .unwrap(),
            vec![5, b'A', b'p', b'p', b'l', b'e', 0xFF, 0x11]
        );
    }

    #[test]
    fn test_inventory_slots() {
        let bytes = DialogPayload::UserInventoryItems {
            id: 0xFF13,
            slots: vec![1, 4, 9],
        }
        .encode()
        .unwrap();
        assert_eq!(bytes, vec![0xFF, 0x13, 3, 1, 4, 9]);
    }

    #[test]
    fn test_castable_list() {
        let list = CastableList {
            id: 0xFF30,
            icon_type: 3,
            entries: vec![CastableEntry {
                icon_type: 3,
                icon: 12,
                color: 0,
                name: "Assail".into(),
            }],
        };
        let bytes = DialogPayload::Skills(list).encode().unwrap();
        assert_eq!(&bytes[..5], &[0xFF, 0x30, 0, 1, 3]);
        assert_eq!(&bytes[5..], &[3, 12, 0, 6, b'A', b's', b's', b'a', b'i', b'l']);
    }

    #[test]
    fn test_option_text_overflow() {
        let payload = DialogPayload::Options(vec![DialogOption::new("z".repeat(300), 1u16)]);
        assert!(matches!(
            payload.encode(),
            Err(CodecError::EncodingOverflow { field: "option text", len: 300, .. })
        ));
    }

    #[test]
    fn test_too_many_options() {
        let options = (0..256).map(|i| DialogOption::new("o", i as u16)).collect();
        assert!(matches!(
            DialogPayload::Options(options).encode(),
            Err(CodecError::EncodingOverflow { field: "option count", .. })
        ));
    }

    #[test]
    fn test_frame_header() {
        let dialog = MerchantDialog {
            merchant_id: 0x4000_0001,
            sprite: 5,
            merchant_name: "Riona".into(),
            text: "Hello".into(),
            payload: DialogPayload::Input { id: 0xFF24 },
        };
        let bytes = dialog.encode().unwrap();
        assert_eq!(bytes[0], MERCHANT_DIALOG_OPCODE);
        assert_eq!(bytes[1], MerchantDialogType::Input as u8);
        assert_eq!(bytes[2], 1);
        assert_eq!(&bytes[3..7], &[0x40, 0, 0, 1]);
        assert_eq!(&bytes[8..10], &[0x40, 0x05]);
        assert_eq!(&bytes[12..14], &[0x40, 0x05]);
        assert_eq!(bytes[16], 5);
        assert_eq!(&bytes[17..22], b"Riona");
        assert_eq!(&bytes[22..24], &[0, 5]);
        assert_eq!(&bytes[24..29], b"Hello");
        assert_eq!(&bytes[29..], &[0xFF, 0x24]);
    }
}
