//! Binary wire protocol for merchant interactions.

pub mod appearance;
pub mod dialog;
pub mod packet;
pub mod request;

pub use appearance::ActorAppearance;
pub use dialog::{
    CastableEntry, CastableList, DialogOption, DialogPayload, MerchantDialog, MerchantDialogType,
    ShopItem,
};
pub use packet::{PacketReader, PacketWriter};
pub use request::MenuRequest;
