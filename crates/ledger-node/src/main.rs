mod api;
mod constants;

use clap::Parser;
use ledger_core::{
    constants::{DIFFICULTY, INITIAL_BALANCE, MINE_RATE_MS, MINING_REWARD},
    Ledger, LedgerConfig,
};
use ledger_sync::P2pServer;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;
use tracing::{info, Level};

use crate::constants::{DEFAULT_HTTP_ADDR, DEFAULT_P2P_ADDR, PEER_CONNECT_ATTEMPTS};

#[derive(Parser, Debug)]
struct Args {
    /// Address the HTTP API listens on, e.g. 127.0.0.1:3001
    #[arg(long, env = "HTTP_ADDR", default_value = DEFAULT_HTTP_ADDR)]
    http_addr: String,

    /// Address peers connect to, e.g. 127.0.0.1:5001
    #[arg(long, env = "P2P_ADDR", default_value = DEFAULT_P2P_ADDR)]
    p2p_addr: String,

    /// Comma-separated peer addresses to connect to on startup
    #[arg(long, env = "PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    /// How many times to try each startup peer before giving up
    #[arg(long, default_value_t = PEER_CONNECT_ATTEMPTS)]
    peer_connect_attempts: u32,

    /// Difficulty of the genesis block; must match across the network
    #[arg(long, env = "DIFFICULTY", default_value_t = DIFFICULTY)]
    difficulty: u32,

    /// Target time between blocks in milliseconds
    #[arg(long, env = "MINE_RATE_MS", default_value_t = MINE_RATE_MS)]
    mine_rate_ms: u64,

    #[arg(long, env = "INITIAL_BALANCE", default_value_t = INITIAL_BALANCE)]
    initial_balance: u64,

    #[arg(long, env = "MINING_REWARD", default_value_t = MINING_REWARD)]
    mining_reward: u64,

    /// Search nonces on all cores
    #[arg(long, env = "PARALLEL_MINING")]
    parallel_mining: bool,
}

impl Args {
    fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            difficulty: self.difficulty,
            mine_rate_ms: self.mine_rate_ms,
            initial_balance: self.initial_balance,
            mining_reward: self.mining_reward,
            parallel_mining: self.parallel_mining,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = args.ledger_config();
    info!(?config, "starting ledger node");

    let ledger = Arc::new(Mutex::new(Ledger::new(config)));
    let p2p = P2pServer::new(ledger);
    p2p.listen(&args.p2p_addr).await?;

    let bootstrap = p2p.clone();
    let peers = args.peers.clone();
    let attempts = args.peer_connect_attempts;
    tokio::spawn(async move { bootstrap.connect_to_peers(&peers, attempts).await });

    let app = api::router(p2p);
    let addr: SocketAddr = args.http_addr.parse()?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
