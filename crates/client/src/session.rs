use std::net::SocketAddr;

use sausages::{
    ArchiveResult, ConnectionState, ModuleLoader, NetClient, NetError, NetEvent, NetworkStats,
    Role,
};

use crate::config::SessionConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    Sent(usize),
    NotConnected,
    Stats,
    Quit,
    Ignored,
}

pub struct Session {
    client: NetClient,
    config: SessionConfig,
}

impl Session {
    pub fn new(host: &str, port: u16, config: SessionConfig) -> Result<Self, NetError> {
        let mut client = NetClient::with_config(host, port, config.net.clone())?;
        if let Some(sim) = &config.packet_loss {
            client.set_loss_simulation(sim.clone());
        }
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::V4(self.client.server_addr())
    }

    pub fn state(&self) -> ConnectionState {
        self.client.state()
    }

    pub fn stats(&self) -> &NetworkStats {
        self.client.stats()
    }

    /// Reads `client.lua` from the configured game data, if any.
    pub fn load_entry_script(&self) -> Option<ArchiveResult<Vec<u8>>> {
        let path = self.config.game_data.as_ref()?;
        Some(ModuleLoader::new(path).load_entry(Role::Client))
    }

    pub fn drain_events(&mut self) -> Vec<NetEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.client.poll() {
            events.push(event);
        }
        events
    }

    pub fn handle_line(&mut self, line: &str) -> LineAction {
        match line.trim_end_matches(['\r', '\n']) {
            "" => LineAction::Ignored,
            "/quit" => LineAction::Quit,
            "/stats" => LineAction::Stats,
            text if self.client.is_connected() => {
                self.client.send(text.as_bytes());
                LineAction::Sent(text.len().min(sausages::MAX_PAYLOAD))
            }
            _ => LineAction::NotConnected,
        }
    }

    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }
}

pub fn describe_event(event: &NetEvent) -> String {
    match event {
        NetEvent::Connect { client_id } => format!("Connected as client {}", client_id),
        NetEvent::Disconnect { .. } => "Disconnected by server".to_string(),
        NetEvent::Data { payload, .. } => String::from_utf8_lossy(payload).into_owned(),
    }
}
