use std::net::{SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

use super::event::NetEvent;
use super::protocol::{MAX_PAYLOAD, Packet, encode_data};
use super::stats::{NetworkStats, PacketLossSimulation};
use super::transport::{NetError, UdpTransport, resolve};

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_DISCONNECT_REDUNDANCY: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gap between connect retransmissions while unacknowledged.
    pub retry_interval: Duration,
    /// Copies of the disconnect packet sent on a local disconnect.
    pub disconnect_redundancy: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            disconnect_redundancy: DEFAULT_DISCONNECT_REDUNDANCY,
        }
    }
}

pub struct NetClient {
    transport: UdpTransport,
    server: SocketAddrV4,
    state: ConnectionState,
    client_id: Option<u32>,
    last_attempt: Option<Instant>,
    config: ClientConfig,
}

impl NetClient {
    pub fn create(host: &str, port: u16) -> Result<Self, NetError> {
        Self::with_config(host, port, ClientConfig::default())
    }

    pub fn with_config(host: &str, port: u16, config: ClientConfig) -> Result<Self, NetError> {
        let server = resolve(host, port)?;
        let transport = UdpTransport::ephemeral()?;

        log::info!(
            "client on {} connecting to {}",
            transport.local_addr(),
            server
        );

        Ok(Self {
            transport,
            server,
            state: ConnectionState::Connecting,
            client_id: None,
            last_attempt: None,
            config,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Id assigned by the server in the most recent acknowledgment.
    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    pub fn server_addr(&self) -> SocketAddrV4 {
        self.server
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn stats(&self) -> &NetworkStats {
        self.transport.stats()
    }

    pub fn set_loss_simulation(&mut self, sim: PacketLossSimulation) {
        self.transport.set_loss_simulation(sim);
    }

    /// Starts a fresh handshake after a disconnect. No-op otherwise.
    pub fn connect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            return;
        }

        self.state = ConnectionState::Connecting;
        self.client_id = None;
        self.last_attempt = None;
    }

    pub fn poll(&mut self) -> Option<NetEvent> {
        let now = Instant::now();

        if self.state == ConnectionState::Connecting && self.retry_due(now) {
            self.transport.send_to(&Packet::Connect.encode(), self.server);
            self.last_attempt = Some(now);
        }

        let (bytes, from) = self.transport.recv_from()?;
        if from != self.server {
            log::trace!("ignoring datagram from {}", from);
            return None;
        }

        let decoded = Packet::decode(bytes);
        let packet = match decoded {
            Ok(packet) => packet,
            Err(e) => {
                log::trace!("dropping datagram from server: {}", e);
                self.transport.record_rejected();
                return None;
            }
        };

        match packet {
            Packet::ConnectAck { client_id } => self.handle_ack(client_id),
            Packet::Disconnect => self.handle_disconnect(),
            Packet::Data(payload) => {
                if self.state != ConnectionState::Connected {
                    return None;
                }
                Some(NetEvent::Data {
                    client_id: self.client_id.unwrap_or_default(),
                    payload,
                })
            }
            Packet::Connect => None,
        }
    }

    fn retry_due(&self, now: Instant) -> bool {
        self.last_attempt
            .is_none_or(|last| now.saturating_duration_since(last) >= self.config.retry_interval)
    }

    fn handle_ack(&mut self, client_id: u32) -> Option<NetEvent> {
        if self.state != ConnectionState::Connecting {
            log::trace!("ignoring connect_ack in state {:?}", self.state);
            return None;
        }

        self.state = ConnectionState::Connected;
        self.client_id = Some(client_id);
        log::info!("connected to {} as client {}", self.server, client_id);

        Some(NetEvent::Connect { client_id })
    }

    fn handle_disconnect(&mut self) -> Option<NetEvent> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }

        self.state = ConnectionState::Disconnected;
        log::info!("server {} closed the connection", self.server);

        Some(NetEvent::Disconnect {
            client_id: self.client_id.unwrap_or_default(),
        })
    }

    /// Sends one data packet. Dropped unless connected; payloads beyond
    /// `MAX_PAYLOAD` are truncated.
    pub fn send(&mut self, data: &[u8]) {
        if self.state != ConnectionState::Connected {
            return;
        }

        if data.len() > MAX_PAYLOAD {
            log::debug!("truncating {} byte payload", data.len());
        }

        self.transport.send_to(&encode_data(data), self.server);
    }

    /// There is no acknowledgment for disconnects, so the packet is repeated
    /// to ride out loss.
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Connected {
            let packet = Packet::Disconnect.encode();
            for _ in 0..self.config.disconnect_redundancy {
                self.transport.send_to(&packet, self.server);
            }
            log::info!("disconnected from {}", self.server);
        }

        self.state = ConnectionState::Disconnected;
    }
}

impl Drop for NetClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::{HEADER_SIZE, MAX_PACKET_SIZE};
    use std::net::{Ipv4Addr, UdpSocket};

    fn fake_server() -> (UdpSocket, u16) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(300)))
            .unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, port)
    }

    fn fast_config() -> ClientConfig {
        ClientConfig {
            retry_interval: Duration::from_millis(30),
            ..Default::default()
        }
    }

    fn client_addr(client: &NetClient) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, client.local_addr().port())
    }

    fn poll_for(client: &mut NetClient, timeout_ms: u64) -> Option<NetEvent> {
        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(timeout_ms) {
            if let Some(event) = client.poll() {
                return Some(event);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        None
    }

    fn recv_packet(socket: &UdpSocket) -> Option<Packet> {
        let mut buf = [0u8; MAX_PACKET_SIZE + 64];
        let (n, _) = socket.recv_from(&mut buf).ok()?;
        Packet::decode(&buf[..n]).ok()
    }

    fn handshake(server: &UdpSocket, port: u16, client_id: u32) -> NetClient {
        let mut client = NetClient::with_config("127.0.0.1", port, fast_config()).unwrap();
        assert_eq!(client.poll(), None);
        assert_eq!(recv_packet(server), Some(Packet::Connect));

        server
            .send_to(
                &Packet::ConnectAck { client_id }.encode(),
                client_addr(&client),
            )
            .unwrap();
        assert_eq!(
            poll_for(&mut client, 300),
            Some(NetEvent::Connect { client_id })
        );

        // discard retransmitted connects that raced the ack
        server
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        while recv_packet(server).is_some() {}
        server
            .set_read_timeout(Some(Duration::from_millis(300)))
            .unwrap();

        client
    }

    #[test]
    fn test_starts_connecting() {
        let (_server, port) = fake_server();
        let client = NetClient::create("127.0.0.1", port).unwrap();
        assert_eq!(client.state(), ConnectionState::Connecting);
        assert_eq!(client.client_id(), None);
    }

    #[test]
    fn test_handshake_records_assigned_id() {
        let (server, port) = fake_server();
        let client = handshake(&server, port, 7);

        assert!(client.is_connected());
        assert_eq!(client.client_id(), Some(7));
    }

    #[test]
    fn test_connect_retried_until_acked() {
        let (server, port) = fake_server();
        let mut client = NetClient::with_config("127.0.0.1", port, fast_config()).unwrap();

        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(100) {
            client.poll();
            std::thread::sleep(Duration::from_millis(1));
        }

        let mut attempts = 0;
        server
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        while recv_packet(&server) == Some(Packet::Connect) {
            attempts += 1;
        }
        assert!(attempts >= 2, "only {} connect attempts", attempts);
    }

    #[test]
    fn test_ignores_other_senders() {
        let (_server, port) = fake_server();
        let (impostor, _) = fake_server();
        let mut client = NetClient::with_config("127.0.0.1", port, fast_config()).unwrap();
        client.poll();

        impostor
            .send_to(
                &Packet::ConnectAck { client_id: 1 }.encode(),
                client_addr(&client),
            )
            .unwrap();

        assert_eq!(poll_for(&mut client, 100), None);
        assert_eq!(client.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_duplicate_ack_ignored() {
        let (server, port) = fake_server();
        let mut client = handshake(&server, port, 2);

        server
            .send_to(
                &Packet::ConnectAck { client_id: 9 }.encode(),
                client_addr(&client),
            )
            .unwrap();
        assert_eq!(poll_for(&mut client, 100), None);
        assert_eq!(client.client_id(), Some(2));
    }

    #[test]
    fn test_data_before_connect_ignored() {
        let (server, port) = fake_server();
        let mut client = NetClient::with_config("127.0.0.1", port, fast_config()).unwrap();
        client.poll();
        let _ = recv_packet(&server);

        server
            .send_to(&encode_data(b"early"), client_addr(&client))
            .unwrap();
        assert_eq!(poll_for(&mut client, 100), None);
    }

    #[test]
    fn test_data_event_after_connect() {
        let (server, port) = fake_server();
        let mut client = handshake(&server, port, 5);

        server
            .send_to(&encode_data(b"snapshot"), client_addr(&client))
            .unwrap();
        assert_eq!(
            poll_for(&mut client, 300),
            Some(NetEvent::Data {
                client_id: 5,
                payload: b"snapshot".to_vec(),
            })
        );
    }

    #[test]
    fn test_send_truncates_payload() {
        let (server, port) = fake_server();
        let mut client = handshake(&server, port, 0);

        client.send(&vec![1u8; MAX_PAYLOAD + 1]);

        let mut buf = [0u8; MAX_PACKET_SIZE * 2];
        let (n, _) = server.recv_from(&mut buf).unwrap();
        assert_eq!(n, HEADER_SIZE + MAX_PAYLOAD);
    }

    #[test]
    fn test_send_requires_connection() {
        let (server, port) = fake_server();
        let mut client = NetClient::with_config("127.0.0.1", port, fast_config()).unwrap();

        client.send(b"too soon");
        server
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        assert_eq!(recv_packet(&server), None);
    }

    #[test]
    fn test_disconnect_sends_redundant_packets() {
        let (server, port) = fake_server();
        let mut client = handshake(&server, port, 0);

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);

        for _ in 0..DEFAULT_DISCONNECT_REDUNDANCY {
            assert_eq!(recv_packet(&server), Some(Packet::Disconnect));
        }

        server
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        client.disconnect();
        assert_eq!(recv_packet(&server), None);
    }

    #[test]
    fn test_remote_disconnect() {
        let (server, port) = fake_server();
        let mut client = handshake(&server, port, 3);

        server
            .send_to(&Packet::Disconnect.encode(), client_addr(&client))
            .unwrap();
        assert_eq!(
            poll_for(&mut client, 300),
            Some(NetEvent::Disconnect { client_id: 3 })
        );
        assert_eq!(client.state(), ConnectionState::Disconnected);

        server
            .send_to(&Packet::Disconnect.encode(), client_addr(&client))
            .unwrap();
        assert_eq!(poll_for(&mut client, 100), None);
    }

    #[test]
    fn test_reconnect_after_disconnect() {
        let (server, port) = fake_server();
        let mut client = handshake(&server, port, 3);
        client.disconnect();
        for _ in 0..DEFAULT_DISCONNECT_REDUNDANCY {
            let _ = recv_packet(&server);
        }

        client.connect();
        assert_eq!(client.state(), ConnectionState::Connecting);
        assert_eq!(client.client_id(), None);

        client.poll();
        assert_eq!(recv_packet(&server), Some(Packet::Connect));
    }
}
