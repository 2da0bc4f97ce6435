//! Connection management over raw UDP.
//!
//! Both ends are driven by calling `poll` once per tick. Each call does at
//! most one unit of work and yields at most one [`NetEvent`]; callers drain a
//! backlog by polling until `None`. Nothing blocks and nothing runs in the
//! background.

mod client;
mod event;
mod peer;
pub(crate) mod protocol;
mod server;
mod stats;
mod transport;

pub use client::{
    ClientConfig, ConnectionState, DEFAULT_DISCONNECT_REDUNDANCY, DEFAULT_RETRY_INTERVAL,
    NetClient,
};
pub use event::{EventKind, NetEvent};
pub use peer::{DEFAULT_MAX_CLIENTS, MAX_CLIENTS_LIMIT};
pub use protocol::{DEFAULT_PORT, MAX_PAYLOAD, PROTOCOL_ID};
pub use server::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TIMEOUT, NetServer, PeerInfo, ServerConfig};
pub use stats::{NetworkStats, PacketLossSimulation};
pub use transport::{NetError, resolve};
