use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::crypto;
use crate::error::{LedgerError, Result};
use crate::now_millis;
use crate::wallet::Wallet;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub amount: u64,
    pub address: String,
}

/// The sender's signature over the outputs, plus the balance snapshot the
/// outputs must add up to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub timestamp: u64,
    pub amount: u64,
    pub address: String,
    pub signature: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub input: Input,
    pub outputs: Vec<Output>,
}

impl Transaction {
    /// Signs `outputs` with `sender` under a fresh id.
    pub fn with_outputs(sender: &Wallet, outputs: Vec<Output>) -> Result<Self> {
        let input = Self::sign_outputs(sender, &outputs)?;
        Ok(Self {
            id: crypto::new_id(),
            input,
            outputs,
        })
    }

    /// Transfer `amount` to `recipient`, returning the change to the sender.
    pub fn new_transaction(sender: &Wallet, recipient: &str, amount: u64) -> Result<Self> {
        let balance = sender.balance();
        if amount > balance {
            warn!("Amount {amount} exceeds balance {balance}");
            return Err(LedgerError::InsufficientBalance { amount, balance });
        }

        Self::with_outputs(
            sender,
            vec![
                Output {
                    amount: balance - amount,
                    address: sender.public_key().to_string(),
                },
                Output {
                    amount,
                    address: recipient.to_string(),
                },
            ],
        )
    }

    /// Credit `miner` with `reward`, signed by `issuer` rather than the miner.
    pub fn reward_transaction(miner: &Wallet, issuer: &Wallet, reward: u64) -> Result<Self> {
        Self::with_outputs(
            issuer,
            vec![Output {
                amount: reward,
                address: miner.public_key().to_string(),
            }],
        )
    }

    /// Move another `amount` out of the sender's change output to `recipient`
    /// and re-sign. The id is kept, so the pool replaces the pending copy.
    pub fn update(&mut self, sender: &Wallet, recipient: &str, amount: u64) -> Result<()> {
        let change = self
            .outputs
            .iter_mut()
            .find(|o| o.address == sender.public_key())
            .ok_or(LedgerError::MissingSenderOutput)?;

        if amount > change.amount {
            warn!("Amount {amount} exceeds balance {}", change.amount);
            return Err(LedgerError::InsufficientBalance {
                amount,
                balance: change.amount,
            });
        }

        change.amount -= amount;
        self.outputs.push(Output {
            amount,
            address: recipient.to_string(),
        });
        self.input = Self::sign_outputs(sender, &self.outputs)?;
        Ok(())
    }

    fn sign_outputs(sender: &Wallet, outputs: &[Output]) -> Result<Input> {
        Ok(Input {
            timestamp: now_millis(),
            amount: sender.balance(),
            address: sender.public_key().to_string(),
            signature: sender.sign(&crypto::hash(outputs)?),
        })
    }

    /// Does the input signature cover the current outputs?
    pub fn verify(&self) -> bool {
        let Ok(digest) = crypto::hash(&self.outputs) else {
            return false;
        };
        crypto::verify(&self.input.address, &self.input.signature, &digest)
    }

    /// Sum of all output amounts, or `None` if it does not fit in a `u64`.
    pub fn output_total(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |total, o| total.checked_add(o.amount))
    }

    /// Sum of the outputs paid to `address`, or `None` on overflow.
    pub fn amount_to(&self, address: &str) -> Option<u64> {
        self.outputs
            .iter()
            .filter(|o| o.address == address)
            .try_fold(0u64, |total, o| total.checked_add(o.amount))
    }

    pub fn output_for(&self, address: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.address == address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{INITIAL_BALANCE, MINING_REWARD};

    const RECIPIENT: &str = "r3c1p13nt";

    fn setup() -> (Wallet, Transaction) {
        let wallet = Wallet::new(INITIAL_BALANCE);
        let tx = Transaction::new_transaction(&wallet, RECIPIENT, 50).unwrap();
        (wallet, tx)
    }

    #[test]
    fn outputs_amount_subtracted_from_balance() {
        let (wallet, tx) = setup();
        assert_eq!(
            tx.output_for(wallet.public_key()).unwrap().amount,
            wallet.balance() - 50
        );
    }

    #[test]
    fn outputs_amount_added_to_recipient() {
        let (_, tx) = setup();
        assert_eq!(tx.output_for(RECIPIENT).unwrap().amount, 50);
    }

    #[test]
    fn input_carries_wallet_balance() {
        let (wallet, tx) = setup();
        assert_eq!(tx.input.amount, wallet.balance());
        assert_eq!(tx.input.address, wallet.public_key());
        assert_eq!(tx.output_total(), Some(tx.input.amount));
    }

    #[test]
    fn validates_a_valid_transaction() {
        let (_, tx) = setup();
        assert!(tx.verify());
    }

    #[test]
    fn invalidates_tampered_outputs() {
        let (_, mut tx) = setup();
        tx.outputs[0].amount = 500_000;
        assert!(!tx.verify());
    }

    #[test]
    fn rejects_amount_exceeding_balance() {
        let wallet = Wallet::new(INITIAL_BALANCE);
        let err = Transaction::new_transaction(&wallet, RECIPIENT, 50_000).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                amount: 50_000,
                balance: INITIAL_BALANCE
            }
        ));
    }

    #[test]
    fn update_subtracts_next_amount_and_adds_output() {
        let (wallet, mut tx) = setup();
        let id = tx.id.clone();
        tx.update(&wallet, "n3xt-4ddre55", 20).unwrap();
        assert_eq!(tx.id, id);
        assert_eq!(
            tx.output_for(wallet.public_key()).unwrap().amount,
            wallet.balance() - 50 - 20
        );
        assert_eq!(tx.output_for("n3xt-4ddre55").unwrap().amount, 20);
        assert!(tx.verify());
    }

    #[test]
    fn update_twice_to_same_recipient_accumulates_outputs() {
        let (wallet, mut tx) = setup();
        tx.update(&wallet, RECIPIENT, 30).unwrap();
        let to_recipient: Vec<u64> = tx
            .outputs
            .iter()
            .filter(|o| o.address == RECIPIENT)
            .map(|o| o.amount)
            .collect();
        assert_eq!(to_recipient, vec![50, 30]);
        assert_eq!(
            tx.output_for(wallet.public_key()).unwrap().amount,
            wallet.balance() - 80
        );
    }

    #[test]
    fn update_rejects_amount_exceeding_change() {
        let (wallet, mut tx) = setup();
        let before = tx.clone();
        let err = tx.update(&wallet, RECIPIENT, 451).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { balance: 450, .. }));
        assert_eq!(tx, before);
    }

    #[test]
    fn update_by_foreign_wallet_fails() {
        let (_, mut tx) = setup();
        let stranger = Wallet::new(INITIAL_BALANCE);
        assert!(matches!(
            tx.update(&stranger, RECIPIENT, 1),
            Err(LedgerError::MissingSenderOutput)
        ));
    }

    #[test]
    fn reward_pays_miner_signed_by_issuer() {
        let miner = Wallet::new(INITIAL_BALANCE);
        let issuer = Wallet::issuing(INITIAL_BALANCE);
        let tx = Transaction::reward_transaction(&miner, &issuer, MINING_REWARD).unwrap();
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.output_for(miner.public_key()).unwrap().amount, MINING_REWARD);
        assert_eq!(tx.input.address, issuer.public_key());
        assert!(tx.verify());
    }

    #[test]
    fn output_total_reports_overflow() {
        let (wallet, _) = setup();
        let tx = Transaction::with_outputs(
            &wallet,
            vec![
                Output {
                    amount: u64::MAX,
                    address: RECIPIENT.into(),
                },
                Output {
                    amount: 2,
                    address: RECIPIENT.into(),
                },
            ],
        )
        .unwrap();
        assert_eq!(tx.output_total(), None);
        assert_eq!(tx.amount_to(RECIPIENT), None);
        assert_eq!(tx.amount_to(wallet.public_key()), Some(0));
    }

    #[test]
    fn json_uses_wire_field_names() {
        let (_, tx) = setup();
        let value = serde_json::to_value(&tx).unwrap();
        assert!(value["input"]["signature"].is_string());
        assert_eq!(value["outputs"][1]["address"], RECIPIENT);
        let back: Transaction = serde_json::from_value(value).unwrap();
        assert_eq!(back, tx);
    }
}
