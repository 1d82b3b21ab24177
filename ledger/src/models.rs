use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zk_auth::{Address, Amount, MessageHash};

/// Read-only projection of a pending (or executed) transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionView {
    pub index: u64,
    pub destination: Address,
    pub value: Amount,
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,
    pub message_hash: MessageHash,
    pub confirmations: u32,
    pub required_confirmations: u32,
    pub executed: bool,
    pub proposed_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl TransactionView {
    pub fn quorum_met(&self) -> bool {
        self.confirmations >= self.required_confirmations
    }
}
