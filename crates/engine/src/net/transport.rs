use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};

use super::protocol::MAX_PACKET_SIZE;
use super::stats::{NetworkStats, PacketLossSimulation};

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("failed to bind UDP port {port}: {source}")]
    Bind { port: u16, source: io::Error },
    #[error("socket setup failed: {0}")]
    Socket(#[from] io::Error),
    #[error("failed to resolve '{host}': {source}")]
    Resolve { host: String, source: io::Error },
    #[error("'{host}' has no IPv4 address")]
    NoIpv4Address { host: String },
}

/// Resolves `host` to the first IPv4 address it maps to.
pub fn resolve(host: &str, port: u16) -> Result<SocketAddrV4, NetError> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| NetError::Resolve {
            host: host.to_string(),
            source,
        })?;

    addrs
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| NetError::NoIpv4Address {
            host: host.to_string(),
        })
}

/// Non-blocking IPv4 UDP socket. Sends are fire-and-forget and receives
/// never wait.
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    stats: NetworkStats,
    loss_sim: PacketLossSimulation,
    recv_buffer: [u8; MAX_PACKET_SIZE],
}

impl UdpTransport {
    /// Binds `port` on all interfaces. Port 0 picks an ephemeral port.
    pub fn bind(port: u16) -> Result<Self, NetError> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
            .map_err(|source| NetError::Bind { port, source })?;
        socket.set_nonblocking(true)?;

        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            stats: NetworkStats::default(),
            loss_sim: PacketLossSimulation::default(),
            recv_buffer: [0u8; MAX_PACKET_SIZE],
        })
    }

    pub fn ephemeral() -> Result<Self, NetError> {
        Self::bind(0)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn set_loss_simulation(&mut self, sim: PacketLossSimulation) {
        self.loss_sim = sim;
    }

    pub fn record_rejected(&mut self) {
        self.stats.packets_rejected += 1;
    }

    /// Best-effort send. Returns whether the datagram left the socket.
    pub fn send_to(&mut self, data: &[u8], to: SocketAddrV4) -> bool {
        if self.loss_sim.should_drop() {
            self.stats.packets_dropped += 1;
            return false;
        }

        match self.socket.send_to(data, to) {
            Ok(bytes) => {
                self.stats.packets_sent += 1;
                self.stats.bytes_sent += bytes as u64;
                true
            }
            Err(e) => {
                log::debug!("send to {} failed: {}", to, e);
                false
            }
        }
    }

    /// Takes at most one datagram off the socket.
    pub fn recv_from(&mut self) -> Option<(&[u8], SocketAddrV4)> {
        match self.socket.recv_from(&mut self.recv_buffer) {
            Ok((size, SocketAddr::V4(from))) => {
                self.stats.packets_received += 1;
                self.stats.bytes_received += size as u64;
                Some((&self.recv_buffer[..size], from))
            }
            Ok((_, from)) => {
                log::trace!("ignoring datagram from non-IPv4 peer {}", from);
                None
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) => {
                // e.g. ICMP port unreachable surfacing as ConnectionReset
                log::trace!("recv failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn loopback(transport: &UdpTransport) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, transport.local_addr().port())
    }

    fn wait_recv(transport: &mut UdpTransport) -> Option<(Vec<u8>, SocketAddrV4)> {
        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(500) {
            if let Some((bytes, from)) = transport.recv_from() {
                return Some((bytes.to_vec(), from));
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        None
    }

    #[test]
    fn test_resolve_ipv4_literal() {
        let addr = resolve("127.0.0.1", 9000).unwrap();
        assert_eq!(addr, SocketAddrV4::new(Ipv4Addr::LOCALHOST, 9000));
    }

    #[test]
    fn test_resolve_failure() {
        assert!(resolve("no such host.invalid", 9000).is_err());
    }

    #[test]
    fn test_recv_is_non_blocking() {
        let mut transport = UdpTransport::ephemeral().unwrap();
        let start = Instant::now();
        assert!(transport.recv_from().is_none());
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_send_and_receive() {
        let mut a = UdpTransport::ephemeral().unwrap();
        let mut b = UdpTransport::ephemeral().unwrap();

        assert!(a.send_to(b"hello", loopback(&b)));

        let (bytes, from) = wait_recv(&mut b).expect("No datagram received");
        assert_eq!(bytes, b"hello");
        assert_eq!(from.port(), a.local_addr().port());
        assert_eq!(a.stats().packets_sent, 1);
        assert_eq!(b.stats().bytes_received, 5);
    }

    #[test]
    fn test_loss_simulation_drops_outbound() {
        let mut a = UdpTransport::ephemeral().unwrap();
        let mut b = UdpTransport::ephemeral().unwrap();
        a.set_loss_simulation(PacketLossSimulation::new(100.0));

        assert!(!a.send_to(b"lost", loopback(&b)));
        assert_eq!(a.stats().packets_dropped, 1);
        assert!(wait_recv(&mut b).is_none());
    }
}
