//! Peer-to-peer synchronization for ledger nodes.
//!
//! Peers exchange newline-delimited JSON messages over TCP. On connect each
//! side pushes its whole chain; afterwards nodes gossip new chains, single
//! transactions and pool-clear signals. Convergence relies only on the
//! longest-valid-chain rule, so delivery is best effort.
pub mod message;
pub mod registry;
pub mod server;
pub mod worker;

pub use message::PeerMessage;
pub use registry::{PeerId, PeerRegistry};
pub use server::{P2pServer, SharedLedger};
pub use worker::{spawn_mining, MiningHandle, MiningJob};
