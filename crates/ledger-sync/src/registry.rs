use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::message::PeerMessage;

pub type PeerId = u64;

struct Peer {
    addr: SocketAddr,
    outbox: UnboundedSender<String>,
}

/// Open peer connections, each reached through the outbox its writer task drains.
#[derive(Default)]
pub struct PeerRegistry {
    next_id: AtomicU64,
    peers: Mutex<HashMap<PeerId, Peer>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn peers(&self) -> MutexGuard<'_, HashMap<PeerId, Peer>> {
        // Entries stay consistent even if a holder panicked.
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, addr: SocketAddr, outbox: UnboundedSender<String>) -> PeerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.peers().insert(id, Peer { addr, outbox });
        info!("Socket connected: peer {id} at {addr}");
        id
    }

    pub fn remove(&self, id: PeerId) {
        if let Some(peer) = self.peers().remove(&id) {
            info!("Socket closed: peer {id} at {}", peer.addr);
        }
    }

    pub fn len(&self) -> usize {
        self.peers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers().is_empty()
    }

    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.peers().values().map(|p| p.addr).collect()
    }

    /// Queue `message` for one peer. False if it is gone.
    pub fn send(&self, id: PeerId, message: &PeerMessage) -> bool {
        let Ok(line) = message.encode() else {
            return false;
        };
        let mut peers = self.peers();
        let delivered = peers.get(&id).is_some_and(|p| p.outbox.send(line).is_ok());
        if !delivered {
            peers.remove(&id);
        }
        delivered
    }

    /// Queue `message` for every open peer and return how many took it.
    /// Peers whose writer has gone away are dropped.
    pub fn broadcast(&self, message: &PeerMessage) -> usize {
        let line = match message.encode() {
            Ok(line) => line,
            Err(e) => {
                warn!("Not broadcasting {}: {e:#}", message.kind());
                return 0;
            }
        };
        let mut peers = self.peers();
        peers.retain(|id, peer| {
            let open = peer.outbox.send(line.clone()).is_ok();
            if !open {
                debug!("Dropping closed peer {id}");
            }
            open
        });
        debug!("Broadcast {} to {} peers", message.kind(), peers.len());
        peers.len()
    }
}
