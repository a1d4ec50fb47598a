use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:3001)
    #[arg(long, global = true, env = "LEDGER_NODE", default_value = "http://127.0.0.1:3001")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the node is up
    Health,
    /// Print the node's chain
    Blocks,
    /// Print the pending transaction pool
    Transactions,
    /// Send coins from the node's wallet
    Transact {
        /// Recipient address (a hex public key)
        #[arg(long)]
        recipient: String,
        /// Amount
        #[arg(long)]
        amount: u64,
    },
    /// Mine a block holding arbitrary data
    Mine {
        /// JSON payload; plain text is sent as a string
        data: String,
    },
    /// Mine the pool into a block
    MineTransactions,
    /// Print the node wallet's address
    PublicKey,
    /// Print the node wallet's balance
    Balance,
}

#[derive(Serialize)]
struct TransactIn {
    recipient: String,
    amount: u64,
}

fn payload(data: &str) -> Value {
    serde_json::from_str(data).unwrap_or_else(|_| Value::String(data.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();

    let request = match cli.cmd {
        Command::Health => client.get(format!("{node}/health")),
        Command::Blocks => client.get(format!("{node}/blocks")),
        Command::Transactions => client.get(format!("{node}/transactions")),
        Command::Transact { recipient, amount } => client
            .post(format!("{node}/transact"))
            .json(&TransactIn { recipient, amount }),
        Command::Mine { data } => client
            .post(format!("{node}/mine"))
            .json(&serde_json::json!({ "data": payload(&data) })),
        Command::MineTransactions => client.get(format!("{node}/mine-transactions")),
        Command::PublicKey => client.get(format!("{node}/public-key")),
        Command::Balance => client.get(format!("{node}/balance")),
    };

    let res = request.send().await?;
    let status = res.status();
    let body: Value = res.json().await?;
    debug!("status: {status}");
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        bail!("node answered {status}");
    }
    Ok(())
}
