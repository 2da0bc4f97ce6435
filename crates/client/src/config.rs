use std::path::PathBuf;
use std::time::Duration;

use sausages::{ClientConfig, PacketLossSimulation};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub tick_rate: u32,
    pub net: ClientConfig,
    pub game_data: Option<PathBuf>,
    pub packet_loss: Option<PacketLossSimulation>,
}

impl SessionConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            net: ClientConfig::default(),
            game_data: None,
            packet_loss: None,
        }
    }
}
