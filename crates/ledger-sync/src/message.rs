use anyhow::{Context, Result};
use ledger_core::{Block, Transaction};
use serde::{Deserialize, Serialize};

/// Everything one node tells another. The `type` tag selects the variant;
/// unknown tags fail to decode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerMessage {
    Chain { chain: Vec<Block> },
    Transaction { transaction: Transaction },
    ClearTransactions,
}

impl PeerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::Chain { .. } => "CHAIN",
            PeerMessage::Transaction { .. } => "TRANSACTION",
            PeerMessage::ClearTransactions => "CLEAR_TRANSACTIONS",
        }
    }

    /// One line of the wire format, without the trailing newline.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).context("encode peer message")
    }

    pub fn decode(line: &str) -> Result<Self> {
        serde_json::from_str(line).with_context(|| format!("decode peer message {line:.64}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{LedgerConfig, Wallet};
    use serde_json::{json, Value};

    #[test]
    fn clear_transactions_wire_form() {
        let line = PeerMessage::ClearTransactions.encode().unwrap();
        assert_eq!(line, r#"{"type":"CLEAR_TRANSACTIONS"}"#);
        assert_eq!(PeerMessage::decode(&line).unwrap(), PeerMessage::ClearTransactions);
    }

    #[test]
    fn chain_wire_form() {
        let chain = vec![Block::genesis(LedgerConfig::default().difficulty)];
        let msg = PeerMessage::Chain { chain: chain.clone() };
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "CHAIN");
        assert_eq!(value["chain"][0]["hash"], "f1r57-h45h");
        assert_eq!(PeerMessage::decode(&msg.encode().unwrap()).unwrap(), msg);
    }

    #[test]
    fn transaction_wire_form() {
        let wallet = Wallet::new(500);
        let tx = Transaction::new_transaction(&wallet, "r3c1p13nt", 5).unwrap();
        let msg = PeerMessage::Transaction { transaction: tx.clone() };
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "TRANSACTION");
        assert_eq!(value["transaction"]["id"], tx.id.as_str());
        assert_eq!(msg.kind(), "TRANSACTION");
    }

    #[test]
    fn rejects_unknown_tags_and_garbage() {
        assert!(PeerMessage::decode(&json!({"type": "BLOCK"}).to_string()).is_err());
        assert!(PeerMessage::decode(r#"{"chain":[]}"#).is_err());
        assert!(PeerMessage::decode("not json").is_err());
    }
}
