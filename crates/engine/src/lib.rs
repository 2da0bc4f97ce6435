pub mod archive;
pub mod net;
pub mod script;

pub use archive::{ArchiveEntry, ArchiveError, ArchiveResult, ExtractSummary, ReloadWatcher};
pub use net::{
    ClientConfig, ConnectionState, EventKind, MAX_PAYLOAD, NetClient, NetError, NetEvent,
    NetServer, NetworkStats, PacketLossSimulation, PeerInfo, ServerConfig,
};
pub use script::{ModuleLoader, Role};
