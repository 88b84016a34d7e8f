//! Collaborators the spend pipeline talks to
//!
//! Node RPC, fee estimation services and storage live outside this crate.
//! Their failures are reported as `anyhow::Error` and wrapped into
//! [`MultisigError::External`](crate::error::MultisigError::External).

use crate::address::Address;
use crate::fee::FeeRate;
use crate::types::Utxo;
use serde::{Deserialize, Serialize};

/// Lists unspent outputs locked to an address
pub trait UtxoSource {
    fn list_unspent(
        &self,
        address: &Address,
        min_confirmations: u32,
        max_confirmations: u32,
    ) -> anyhow::Result<Vec<Utxo>>;
}

/// Estimates the fee rate for confirmation within `target_blocks`
pub trait FeeOracle {
    fn estimate_fee_rate(&self, target_blocks: u16) -> anyhow::Result<FeeRate>;
}

/// Node mempool access for a signed raw transaction (hex)
pub trait BroadcastSink {
    fn test_accept(&self, raw_tx: &str) -> anyhow::Result<TestAcceptResult>;

    /// Returns the txid reported by the node
    fn send_raw_transaction(&self, raw_tx: &str) -> anyhow::Result<String>;
}

/// One entry of a node's `testmempoolaccept` answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAcceptResult {
    pub allowed: bool,
    #[serde(rename = "reject-reason", default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

impl TestAcceptResult {
    pub fn accepted() -> Self {
        Self {
            allowed: true,
            reject_reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reject_reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_result_from_node_json() {
        let json = r#"[{"txid":"ab","allowed":false,"reject-reason":"min relay fee not met"}]"#;
        let results: Vec<TestAcceptResult> = serde_json::from_str(json).unwrap();
        assert_eq!(results[0], TestAcceptResult::rejected("min relay fee not met"));

        let allowed: TestAcceptResult = serde_json::from_str(r#"{"allowed":true}"#).unwrap();
        assert_eq!(allowed, TestAcceptResult::accepted());
    }
}
