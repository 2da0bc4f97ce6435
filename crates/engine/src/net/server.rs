use std::net::{SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

use super::event::NetEvent;
use super::peer::{DEFAULT_MAX_CLIENTS, MAX_CLIENTS_LIMIT, PeerTable};
use super::protocol::{MAX_PAYLOAD, Packet, encode_data};
use super::stats::{NetworkStats, PacketLossSimulation};
use super::transport::{NetError, UdpTransport};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_clients: u32,
    /// Silence after which a peer is evicted.
    pub timeout: Duration,
    /// Minimum gap between the starts of two timeout sweeps.
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_clients: DEFAULT_MAX_CLIENTS,
            timeout: DEFAULT_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Snapshot of one connected peer, for dashboards and tooling.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub client_id: u32,
    pub addr: SocketAddrV4,
    pub idle: Duration,
}

pub struct NetServer {
    transport: UdpTransport,
    peers: PeerTable,
    config: ServerConfig,
    last_sweep: Instant,
}

impl NetServer {
    pub fn create(port: u16, max_clients: u32) -> Result<Self, NetError> {
        Self::with_config(
            port,
            ServerConfig {
                max_clients,
                ..Default::default()
            },
        )
    }

    pub fn with_config(port: u16, mut config: ServerConfig) -> Result<Self, NetError> {
        if !(1..=MAX_CLIENTS_LIMIT).contains(&config.max_clients) {
            let clamped = config.max_clients.clamp(1, MAX_CLIENTS_LIMIT);
            log::warn!(
                "max_clients {} out of range, using {}",
                config.max_clients,
                clamped
            );
            config.max_clients = clamped;
        }

        let transport = UdpTransport::bind(port)?;
        log::info!(
            "server listening on {} ({} slots)",
            transport.local_addr(),
            config.max_clients
        );

        Ok(Self {
            transport,
            peers: PeerTable::new(config.max_clients),
            config,
            last_sweep: Instant::now(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn stats(&self) -> &NetworkStats {
        self.transport.stats()
    }

    pub fn set_loss_simulation(&mut self, sim: PacketLossSimulation) {
        self.transport.set_loss_simulation(sim);
    }

    pub fn max_clients(&self) -> u32 {
        self.config.max_clients
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn is_connected(&self, client_id: u32) -> bool {
        self.peers.get(client_id).is_some()
    }

    pub fn peer_addr(&self, client_id: u32) -> Option<SocketAddrV4> {
        self.peers.get(client_id).map(|peer| peer.addr)
    }

    pub fn peers(&self) -> impl Iterator<Item = PeerInfo> + '_ {
        let now = Instant::now();
        self.peers.iter().map(move |(client_id, peer)| PeerInfo {
            client_id,
            addr: peer.addr,
            idle: now.saturating_duration_since(peer.last_receive_time),
        })
    }

    /// Performs one unit of protocol work: either one step of the timeout
    /// sweep or one received datagram. Returns at most one event.
    pub fn poll(&mut self) -> Option<NetEvent> {
        let now = Instant::now();

        if let Some(event) = self.sweep(now) {
            return Some(event);
        }

        self.receive(now)
    }

    fn sweep(&mut self, now: Instant) -> Option<NetEvent> {
        if now.saturating_duration_since(self.last_sweep) < self.config.sweep_interval {
            return None;
        }

        match self.peers.sweep_next(now, self.config.timeout) {
            Some(client_id) => {
                log::info!("client {} timed out", client_id);
                Some(NetEvent::Disconnect { client_id })
            }
            None => {
                self.last_sweep = now;
                None
            }
        }
    }

    fn receive(&mut self, now: Instant) -> Option<NetEvent> {
        let (bytes, from) = self.transport.recv_from()?;
        let decoded = Packet::decode(bytes);

        let packet = match decoded {
            Ok(packet) => packet,
            Err(e) => {
                log::trace!("dropping datagram from {}: {}", from, e);
                self.transport.record_rejected();
                return None;
            }
        };

        match packet {
            Packet::Connect => self.handle_connect(from, now),
            Packet::Disconnect => self.handle_disconnect(from),
            Packet::Data(payload) => self.handle_data(from, payload, now),
            Packet::ConnectAck { .. } => {
                log::trace!("unexpected connect_ack from {}", from);
                None
            }
        }
    }

    fn handle_connect(&mut self, from: SocketAddrV4, now: Instant) -> Option<NetEvent> {
        if let Some(client_id) = self.peers.find(&from) {
            if let Some(peer) = self.peers.get_mut(client_id) {
                peer.touch(now);
            }
            log::debug!("duplicate connect from {}, re-acking {}", from, client_id);
            self.send_ack(client_id, from);
            return None;
        }

        let Some(client_id) = self.peers.insert(from, now) else {
            log::debug!("server full, ignoring connect from {}", from);
            return None;
        };

        self.send_ack(client_id, from);
        log::info!("client {} connected from {}", client_id, from);

        Some(NetEvent::Connect { client_id })
    }

    fn handle_disconnect(&mut self, from: SocketAddrV4) -> Option<NetEvent> {
        let Some(client_id) = self.peers.find(&from) else {
            log::trace!("disconnect from unknown sender {}", from);
            return None;
        };

        self.peers.remove(client_id);
        log::info!("client {} disconnected", client_id);

        Some(NetEvent::Disconnect { client_id })
    }

    fn handle_data(
        &mut self,
        from: SocketAddrV4,
        payload: Vec<u8>,
        now: Instant,
    ) -> Option<NetEvent> {
        let Some(client_id) = self.peers.find(&from) else {
            log::trace!("data from unknown sender {}", from);
            return None;
        };

        if let Some(peer) = self.peers.get_mut(client_id) {
            peer.touch(now);
        }

        Some(NetEvent::Data { client_id, payload })
    }

    fn send_ack(&mut self, client_id: u32, to: SocketAddrV4) {
        self.transport
            .send_to(&Packet::ConnectAck { client_id }.encode(), to);
    }

    /// Unicasts `data` to one peer. Unknown or free slots are ignored and
    /// payloads beyond `MAX_PAYLOAD` are truncated.
    pub fn send(&mut self, client_id: u32, data: &[u8]) {
        let Some(peer) = self.peers.get(client_id) else {
            log::trace!("send to inactive client {}", client_id);
            return;
        };
        let addr = peer.addr;

        if data.len() > MAX_PAYLOAD {
            log::debug!(
                "truncating {} byte payload for client {}",
                data.len(),
                client_id
            );
        }

        self.transport.send_to(&encode_data(data), addr);
    }

    pub fn broadcast(&mut self, data: &[u8]) {
        let packet = encode_data(data);
        for (_, peer) in self.peers.iter() {
            self.transport.send_to(&packet, peer.addr);
        }
    }

    /// Drops a peer without emitting an event, telling it first.
    pub fn kick(&mut self, client_id: u32) -> bool {
        let Some(peer) = self.peers.remove(client_id) else {
            return false;
        };

        self.transport.send_to(&Packet::Disconnect.encode(), peer.addr);
        log::info!("client {} kicked", client_id);
        true
    }

    /// Notifies every peer and frees all slots.
    pub fn disconnect_all(&mut self) {
        let packet = Packet::Disconnect.encode();
        for (_, peer) in self.peers.drain() {
            self.transport.send_to(&packet, peer.addr);
        }
    }
}

impl Drop for NetServer {
    fn drop(&mut self) {
        let count = self.peers.len();
        self.disconnect_all();
        log::debug!("server on {} closed, notified {} peers", self.local_addr(), count);
    }
}
