use super::packet::PacketReader;

/// Opcode of the client frame selecting a merchant menu action
pub const MENU_REQUEST_OPCODE: u8 = 0x39;

/// A decoded menu action from a client. `args` holds whatever followed the
/// action id; handlers parse it themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuRequest {
    pub object_type: u8,
    pub merchant_id: u32,
    pub action: u16,
    pub args: Vec<u8>,
}

impl MenuRequest {
    /// Decode a full frame, opcode included
    pub fn decode(data: &[u8]) -> Result<Self, String> {
        let mut reader = PacketReader::new(data);
        let opcode = reader.read_u8().ok_or("empty menu request")?;
        if opcode != MENU_REQUEST_OPCODE {
            return Err(format!("unexpected opcode {:#04x} for menu request", opcode));
        }
        let object_type = reader.read_u8().ok_or("missing object type")?;
        let merchant_id = reader.read_u32().ok_or("missing merchant id")?;
        let action = reader.read_u16().ok_or("missing menu action")?;
        let args = reader
            .read_bytes(reader.remaining())
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        Ok(Self {
            object_type,
            merchant_id,
            action,
            args,
        })
    }

    pub fn args(&self) -> PacketReader<'_> {
        PacketReader::new(&self.args)
    }
}
