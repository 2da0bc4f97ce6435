use std::path::PathBuf;

use clap::ValueEnum;
use sausages::{PacketLossSimulation, ServerConfig};

/// What the relay does with a data packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RelayMode {
    /// Forward to every other connected peer
    Broadcast,
    /// Send straight back to the sender
    Echo,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub tick_rate: u32,
    pub net: ServerConfig,
    pub relay_mode: RelayMode,
    pub game_data: Option<PathBuf>,
    pub packet_loss: Option<PacketLossSimulation>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            net: ServerConfig::default(),
            relay_mode: RelayMode::Broadcast,
            game_data: None,
            packet_loss: None,
        }
    }
}
