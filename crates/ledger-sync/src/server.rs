use anyhow::{Context, Result};
use ledger_core::{Block, Gossip, Ledger, Transaction};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::message::PeerMessage;
use crate::registry::{PeerId, PeerRegistry};

/// The node's ledger behind the one lock every mutation goes through.
pub type SharedLedger = Arc<Mutex<Ledger>>;

/// Accepts and opens peer connections, applies what peers send to the
/// ledger, and gossips local changes back out.
#[derive(Clone)]
pub struct P2pServer {
    ledger: SharedLedger,
    registry: Arc<PeerRegistry>,
}

impl P2pServer {
    pub fn new(ledger: SharedLedger) -> Self {
        Self {
            ledger,
            registry: Arc::new(PeerRegistry::new()),
        }
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Bind `addr` and accept peers in the background. Returns the bound
    /// address, which differs from `addr` when it asked for port 0.
    pub async fn listen(&self, addr: &str) -> Result<SocketAddr> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("bind p2p listener on {addr}"))?;
        let local = listener.local_addr()?;
        info!("Listening for P2P connections on {local}");

        let server = self.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => server.connect_socket(stream, peer).await,
                    Err(e) => warn!("Failed to accept peer: {e}"),
                }
            }
        });
        Ok(local)
    }

    /// Open an outbound connection to `peer` (`host:port`).
    pub async fn connect(&self, peer: &str) -> Result<()> {
        let stream = TcpStream::connect(peer)
            .await
            .with_context(|| format!("connect to peer {peer}"))?;
        let addr = stream.peer_addr()?;
        self.connect_socket(stream, addr).await;
        Ok(())
    }

    /// Connect to each bootstrap peer, retrying with a linear backoff. Peers
    /// that never answer are left out.
    pub async fn connect_to_peers(&self, peers: &[String], attempts: u32) {
        for peer in peers {
            let mut attempt = 1;
            loop {
                match self.connect(peer).await {
                    Ok(()) => break,
                    Err(e) if attempt >= attempts => {
                        warn!("Giving up on peer {peer}: {e:#}");
                        break;
                    }
                    Err(e) => {
                        debug!("Peer {peer} unavailable (attempt {attempt}): {e:#}");
                        tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                        attempt += 1;
                    }
                }
            }
        }
    }

    /// Register an open socket, push our chain to it, and start its reader
    /// and writer tasks.
    async fn connect_socket(&self, stream: TcpStream, addr: SocketAddr) {
        let (reader, mut writer) = stream.into_split();
        let (outbox, mut inbox) = mpsc::unbounded_channel::<String>();
        let id = self.registry.add(addr, outbox);

        tokio::spawn(async move {
            while let Some(line) = inbox.recv().await {
                if let Err(e) = writer.write_all(format!("{line}\n").as_bytes()).await {
                    warn!("Write to {addr} failed: {e}");
                    break;
                }
            }
        });

        self.send_chain(id).await;

        let server = self.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => server.handle_line(&line).await,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Read from {addr} failed: {e}");
                        break;
                    }
                }
            }
            server.registry.remove(id);
        });
    }

    async fn send_chain(&self, id: PeerId) {
        let chain = self.ledger.lock().await.chain.blocks().to_vec();
        self.registry.send(id, &PeerMessage::Chain { chain });
    }

    async fn handle_line(&self, line: &str) {
        match PeerMessage::decode(line) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => warn!("Ignoring peer message: {e:#}"),
        }
    }

    /// Apply one message from a peer to the local ledger.
    pub async fn handle_message(&self, message: PeerMessage) {
        debug!("Received {}", message.kind());
        let mut ledger = self.ledger.lock().await;
        match message {
            PeerMessage::Chain { chain } => {
                // Rejections are logged by the chain itself.
                let _ = ledger.chain.replace_chain(chain);
            }
            PeerMessage::Transaction { transaction } => ledger.pool.admit_or_replace(transaction),
            PeerMessage::ClearTransactions => ledger.pool.clear(),
        }
    }

    /// Push the current chain to every peer.
    pub async fn sync_chains(&self) {
        let chain = self.ledger.lock().await.chain.blocks().to_vec();
        self.broadcast_chain(&chain);
    }
}

impl Gossip for P2pServer {
    fn broadcast_chain(&self, chain: &[Block]) {
        self.registry.broadcast(&PeerMessage::Chain {
            chain: chain.to_vec(),
        });
    }

    fn broadcast_transaction(&self, transaction: &Transaction) {
        self.registry.broadcast(&PeerMessage::Transaction {
            transaction: transaction.clone(),
        });
    }

    fn broadcast_clear_transactions(&self) {
        self.registry.broadcast(&PeerMessage::ClearTransactions);
    }
}
