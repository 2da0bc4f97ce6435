use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use sausages::{ModuleLoader, NetError, NetEvent, NetServer, NetworkStats, ReloadWatcher, Role};

use crate::config::{RelayConfig, RelayMode};
use crate::events::{DisconnectReason, ServerEvent};

/// Upper bound on events handled per tick so a flood cannot starve the UI.
const MAX_EVENTS_PER_TICK: usize = 256;

struct GameData {
    loader: ModuleLoader,
    watcher: ReloadWatcher,
}

pub struct RelayServer {
    net: NetServer,
    config: RelayConfig,
    game_data: Option<GameData>,
    tick_duration: Duration,
    running: Arc<AtomicBool>,
    start_time: Instant,
    packets_relayed: u64,
    pending_events: VecDeque<ServerEvent>,
}

impl RelayServer {
    pub fn new(port: u16, config: RelayConfig) -> Result<Self, NetError> {
        let mut net = NetServer::with_config(port, config.net.clone())?;
        if let Some(sim) = &config.packet_loss {
            net.set_loss_simulation(sim.clone());
        }

        let game_data = config.game_data.as_ref().map(|path| {
            let loader = ModuleLoader::new(path);
            let watcher = loader.watcher();
            GameData { loader, watcher }
        });

        let tick_duration = Duration::from_secs_f64(1.0 / config.tick_rate.max(1) as f64);

        Ok(Self {
            net,
            config,
            game_data,
            tick_duration,
            running: Arc::new(AtomicBool::new(true)),
            start_time: Instant::now(),
            packets_relayed: 0,
            pending_events: VecDeque::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.net.local_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.tick_once();
            for event in self.pending_events.drain(..) {
                match &event {
                    ServerEvent::Error { .. } => log::error!("{}", event.describe()),
                    ServerEvent::DataRelayed { .. } => log::debug!("{}", event.describe()),
                    _ => log::info!("{}", event.describe()),
                }
            }
            std::thread::sleep(self.tick_duration);
        }
        self.shutdown_connections();
    }

    pub fn tick_once(&mut self) {
        self.check_game_data();

        for _ in 0..MAX_EVENTS_PER_TICK {
            let Some(event) = self.net.poll() else {
                break;
            };
            self.handle_event(event);
        }
    }

    fn check_game_data(&mut self) {
        let Some(data) = &mut self.game_data else {
            return;
        };
        if !data.watcher.poll() {
            return;
        }

        let event = match data.loader.load_entry(Role::Server) {
            Ok(script) => ServerEvent::GameDataReloaded {
                script_bytes: script.len(),
            },
            Err(e) => ServerEvent::Error {
                message: format!("Failed to load game data: {}", e),
            },
        };
        self.pending_events.push_back(event);
    }

    fn handle_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::Connect { client_id } => {
                self.pending_events.push_back(ServerEvent::PeerConnected {
                    client_id,
                    addr: self.net.peer_addr(client_id),
                });
            }
            NetEvent::Disconnect { client_id } => {
                self.pending_events.push_back(ServerEvent::PeerDisconnected {
                    client_id,
                    reason: DisconnectReason::Left,
                });
            }
            NetEvent::Data { client_id, payload } => self.relay(client_id, &payload),
        }
    }

    fn relay(&mut self, from: u32, payload: &[u8]) {
        let recipients: Vec<u32> = match self.config.relay_mode {
            RelayMode::Echo => vec![from],
            RelayMode::Broadcast => self
                .net
                .peers()
                .map(|peer| peer.client_id)
                .filter(|&id| id != from)
                .collect(),
        };

        for &client_id in &recipients {
            self.net.send(client_id, payload);
        }
        self.packets_relayed += 1;

        self.pending_events.push_back(ServerEvent::DataRelayed {
            client_id: from,
            bytes: payload.len(),
            recipients: recipients.len(),
        });
    }

    pub fn kick_client(&mut self, client_id: u32) {
        if self.net.kick(client_id) {
            self.pending_events.push_back(ServerEvent::PeerDisconnected {
                client_id,
                reason: DisconnectReason::Kicked,
            });
        }
    }

    pub fn shutdown_connections(&mut self) {
        self.net.disconnect_all();
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            uptime_secs: self.start_time.elapsed().as_secs(),
            peer_count: self.net.peer_count(),
            max_clients: self.net.max_clients(),
            packets_relayed: self.packets_relayed,
            relay_mode: self.config.relay_mode,
            peer_timeout: self.net.config().timeout,
            network_stats: self.net.stats().clone(),
        }
    }

    pub fn peer_infos(&self) -> Vec<PeerRow> {
        self.net
            .peers()
            .map(|peer| PeerRow {
                client_id: peer.client_id,
                addr: peer.addr.to_string(),
                idle_secs: peer.idle.as_secs_f32(),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ServerStats {
    pub uptime_secs: u64,
    pub peer_count: usize,
    pub max_clients: u32,
    pub packets_relayed: u64,
    pub relay_mode: RelayMode,
    pub peer_timeout: Duration,
    pub network_stats: NetworkStats,
}

#[derive(Debug, Clone)]
pub struct PeerRow {
    pub client_id: u32,
    pub addr: String,
    pub idle_secs: f32,
}
