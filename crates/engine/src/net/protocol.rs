//! Datagram framing shared by client and server.
//!
//! ```text
//! 0..4   protocol id (u32 LE)
//! 4      packet type
//! 5..9   assigned client id (u32 LE), connect_ack only
//! 5..    payload, data only
//! ```

pub const PROTOCOL_ID: u32 = 0x0696_969E;
pub const HEADER_SIZE: usize = 5;
pub const MAX_PAYLOAD: usize = 1400;
pub const MAX_PACKET_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD;
pub const DEFAULT_PORT: u16 = 6969;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Connect = 0,
    ConnectAck = 1,
    Disconnect = 2,
    Data = 3,
}

impl TryFrom<u8> for PacketType {
    type Error = PacketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Connect),
            1 => Ok(Self::ConnectAck),
            2 => Ok(Self::Disconnect),
            3 => Ok(Self::Data),
            other => Err(PacketError::UnknownType(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("datagram too short: {len} bytes")]
    TooShort { len: usize },
    #[error("foreign protocol id {found:#010x}")]
    ProtocolMismatch { found: u32 },
    #[error("unknown packet type {0}")]
    UnknownType(u8),
}

pub fn encode_header(packet_type: PacketType) -> [u8; HEADER_SIZE] {
    let id = PROTOCOL_ID.to_le_bytes();
    [id[0], id[1], id[2], id[3], packet_type as u8]
}

/// Validates the protocol id and returns the packet type.
pub fn decode_header(buf: &[u8]) -> Result<PacketType, PacketError> {
    if buf.len() < HEADER_SIZE {
        return Err(PacketError::TooShort { len: buf.len() });
    }

    let found = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if found != PROTOCOL_ID {
        return Err(PacketError::ProtocolMismatch { found });
    }

    PacketType::try_from(buf[4])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect,
    ConnectAck { client_id: u32 },
    Disconnect,
    Data(Vec<u8>),
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Connect => PacketType::Connect,
            Packet::ConnectAck { .. } => PacketType::ConnectAck,
            Packet::Disconnect => PacketType::Disconnect,
            Packet::Data(_) => PacketType::Data,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + 4);
        buf.extend_from_slice(&encode_header(self.packet_type()));

        match self {
            Packet::ConnectAck { client_id } => buf.extend_from_slice(&client_id.to_le_bytes()),
            Packet::Data(payload) => buf.extend_from_slice(clamp_payload(payload)),
            Packet::Connect | Packet::Disconnect => {}
        }

        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let packet_type = decode_header(buf)?;
        let body = &buf[HEADER_SIZE..];

        Ok(match packet_type {
            PacketType::Connect => Packet::Connect,
            PacketType::ConnectAck => {
                // a short ack still completes the handshake, with id 0
                let client_id = match body {
                    [a, b, c, d, ..] => u32::from_le_bytes([*a, *b, *c, *d]),
                    _ => 0,
                };
                Packet::ConnectAck { client_id }
            }
            PacketType::Disconnect => Packet::Disconnect,
            PacketType::Data => Packet::Data(clamp_payload(body).to_vec()),
        })
    }
}

/// Builds a data datagram without an intermediate `Packet`.
pub fn encode_data(payload: &[u8]) -> Vec<u8> {
    let payload = clamp_payload(payload);
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&encode_header(PacketType::Data));
    buf.extend_from_slice(payload);
    buf
}

#[inline]
pub fn clamp_payload(payload: &[u8]) -> &[u8] {
    &payload[..payload.len().min(MAX_PAYLOAD)]
}
