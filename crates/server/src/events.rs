use std::net::SocketAddrV4;

#[derive(Debug, Clone)]
pub enum ServerEvent {
    PeerConnected {
        client_id: u32,
        addr: Option<SocketAddrV4>,
    },
    PeerDisconnected {
        client_id: u32,
        reason: DisconnectReason,
    },
    DataRelayed {
        client_id: u32,
        bytes: usize,
        recipients: usize,
    },
    GameDataReloaded {
        script_bytes: usize,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer said goodbye or went quiet past the timeout
    Left,
    Kicked,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::Left => "disconnected",
            DisconnectReason::Kicked => "kicked",
        }
    }
}

impl ServerEvent {
    pub fn describe(&self) -> String {
        match self {
            ServerEvent::PeerConnected { client_id, addr } => match addr {
                Some(addr) => format!("Client {} connected from {}", client_id, addr),
                None => format!("Client {} connected", client_id),
            },
            ServerEvent::PeerDisconnected { client_id, reason } => {
                format!("Client {} {}", client_id, reason.as_str())
            }
            ServerEvent::DataRelayed {
                client_id,
                bytes,
                recipients,
            } => format!(
                "Relayed {} bytes from client {} to {} peers",
                bytes, client_id, recipients
            ),
            ServerEvent::GameDataReloaded { script_bytes } => {
                format!("Game data reloaded ({} byte server script)", script_bytes)
            }
            ServerEvent::Error { message } => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let event = ServerEvent::PeerDisconnected {
            client_id: 3,
            reason: DisconnectReason::Kicked,
        };
        assert_eq!(event.describe(), "Client 3 kicked");

        let event = ServerEvent::PeerConnected {
            client_id: 0,
            addr: Some("127.0.0.1:5000".parse().unwrap()),
        };
        assert_eq!(event.describe(), "Client 0 connected from 127.0.0.1:5000");
    }
}
