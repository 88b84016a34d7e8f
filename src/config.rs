//! Spend configuration
//!
//! Loaded from JSON by the caller; every field has a default so an empty
//! object is a valid regtest configuration.

use crate::constants::*;
use crate::error::{MultisigError, Result};
use crate::fee::FeeRate;
use crate::network::Network;
use crate::types::SighashType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpendConfig {
    pub network: Network,
    pub min_confirmations: u32,
    pub max_confirmations: u32,
    pub fee_target_blocks: u16,
    pub fallback_fee_rate: FeeRate,
    pub sighash: SighashType,
}

impl Default for SpendConfig {
    fn default() -> Self {
        Self {
            network: Network::Regtest,
            min_confirmations: DEFAULT_MIN_CONFIRMATIONS,
            max_confirmations: DEFAULT_MAX_CONFIRMATIONS,
            fee_target_blocks: DEFAULT_FEE_TARGET_BLOCKS,
            fallback_fee_rate: FeeRate::default(),
            sighash: SighashType::ALL,
        }
    }
}

impl SpendConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SpendConfig =
            serde_json::from_str(json).map_err(|e| MultisigError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_confirmations > self.max_confirmations {
            return Err(MultisigError::Config(format!(
                "min_confirmations {} is above max_confirmations {}",
                self.min_confirmations, self.max_confirmations
            )));
        }
        if !(1..=MAX_FEE_TARGET_BLOCKS).contains(&self.fee_target_blocks) {
            return Err(MultisigError::Config(format!(
                "fee_target_blocks {} outside 1..={}",
                self.fee_target_blocks, MAX_FEE_TARGET_BLOCKS
            )));
        }
        if self.fallback_fee_rate.sat_per_byte == 0 {
            return Err(MultisigError::Config(
                "fallback_fee_rate must be positive".to_string(),
            ));
        }
        SighashType::from_u32(self.sighash.to_u32())
            .map_err(|e| MultisigError::Config(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config = SpendConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SpendConfig::default());
        assert_eq!(config.network, Network::Regtest);
        assert_eq!(config.max_confirmations, 9_999_999);
        assert_eq!(config.fee_target_blocks, 6);
    }

    #[test]
    fn test_partial_json() {
        let config = SpendConfig::from_json_str(
            r#"{"network":"testnet","min_confirmations":1,"fallback_fee_rate":{"sat_per_byte":20}}"#,
        )
        .unwrap();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.min_confirmations, 1);
        assert_eq!(config.fallback_fee_rate, FeeRate::new(20));
        assert_eq!(config.sighash, SighashType::ALL);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            SpendConfig::from_json_str(r#"{"min_confirmations":10,"max_confirmations":1}"#),
            Err(MultisigError::Config(_))
        ));
        assert!(SpendConfig::from_json_str(r#"{"fee_target_blocks":0}"#).is_err());
        assert!(SpendConfig::from_json_str(r#"{"fallback_fee_rate":{"sat_per_byte":0}}"#).is_err());
        assert!(SpendConfig::from_json_str(r#"{"sighash":4}"#).is_err());
        assert!(SpendConfig::from_json_str(r#"{"network":"signet"}"#).is_err());
    }

    #[test]
    fn test_fee_target_bounds() {
        let config = SpendConfig::from_json_str(r#"{"fee_target_blocks":1008}"#).unwrap();
        assert_eq!(config.fee_target_blocks, MAX_FEE_TARGET_BLOCKS);
        assert!(SpendConfig::from_json_str(r#"{"fee_target_blocks":1}"#).is_ok());
        assert!(matches!(
            SpendConfig::from_json_str(r#"{"fee_target_blocks":1009}"#),
            Err(MultisigError::Config(_))
        ));
    }
}
