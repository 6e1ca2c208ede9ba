use super::dialog::NPC_SPRITE_BIAS;
use super::packet::PacketWriter;
use crate::error::CodecError;
use crate::world::Direction;

/// Opcode of the "creatures visible" frame
pub const SHOW_CREATURE_OPCODE: u8 = 0x07;

/// Minimap dot colors. 0 = monster, 1 = non-solid monster, 2 = NPC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DotColor {
    Monster = 0,
    NonSolidMonster = 1,
    Npc = 2,
}

/// What an observer needs to draw a merchant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorAppearance {
    pub id: u32,
    pub x: u16,
    pub y: u16,
    pub sprite: u16,
    pub direction: Direction,
    pub name: String,
}

impl ActorAppearance {
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut w = PacketWriter::with_opcode(SHOW_CREATURE_OPCODE);
        // Always exactly one creature in this frame
        w.write_u16(1);
        w.write_u16(self.x);
        w.write_u16(self.y);
        w.write_u32(self.id);
        w.write_u16(self.sprite.wrapping_add(NPC_SPRITE_BIAS));
        w.write_bytes(&[0, 0, 0, 0]);
        w.write_u8(self.direction as u8);
        w.write_u8(0);
        w.write_u8(DotColor::Npc as u8);
        w.write_string8("creature name", &self.name)?;
        Ok(w.into_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appearance_frame() {
        let frame = ActorAppearance {
            id: 0x4000_0002,
            x: 10,
            y: 300,
            sprite: 0x21,
            direction: Direction::South,
            name: "Deoch".into(),
        }
        .encode()
        .unwrap();

        assert_eq!(
            frame,
            vec![
                0x07, 0, 1, 0, 10, 0x01, 0x2c, 0x40, 0, 0, 2, 0x40, 0x21, 0, 0, 0, 0, 2, 0, 2, 5,
                b'D', b'e', b'o', b'c', b'h'
            ]
        );
    }
}
