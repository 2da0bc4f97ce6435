/// Stable numeric codes for hosts that cannot see the Rust enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EventKind {
    None = 0,
    Connect = 1,
    Disconnect = 2,
    Data = 3,
}

/// One unit of protocol work surfaced by a `poll` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    Connect { client_id: u32 },
    Disconnect { client_id: u32 },
    Data { client_id: u32, payload: Vec<u8> },
}

impl NetEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            NetEvent::Connect { .. } => EventKind::Connect,
            NetEvent::Disconnect { .. } => EventKind::Disconnect,
            NetEvent::Data { .. } => EventKind::Data,
        }
    }

    pub fn client_id(&self) -> u32 {
        match self {
            NetEvent::Connect { client_id }
            | NetEvent::Disconnect { client_id }
            | NetEvent::Data { client_id, .. } => *client_id,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            NetEvent::Data { payload, .. } => payload,
            _ => &[],
        }
    }
}

impl EventKind {
    pub fn of(event: Option<&NetEvent>) -> Self {
        event.map_or(EventKind::None, NetEvent::kind)
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}
