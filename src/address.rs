//! Base58Check address codec for P2SH and P2PKH
//!
//! Every call takes the network explicitly; version bytes differ per chain.

use crate::constants::*;
use crate::crypto::{checksum, hash160};
use crate::error::{MultisigError, Result};
use crate::network::Network;
use crate::script::{p2pkh_script, p2sh_script, Script};
use crate::types::Hash160;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base58Check-encoded address string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap an address string; it is checked when decoded against a network
    pub fn new(address: impl Into<String>) -> Self {
        Address(address.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Address::new(address)
    }
}

/// Kind of hash an address commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    P2pkh,
    P2sh,
}

/// Base58(version || payload || checksum)
pub fn base58check_encode(version: u8, payload: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(1 + payload.len() + CHECKSUM_LEN);
    bytes.push(version);
    bytes.extend_from_slice(payload);
    let check = checksum(&bytes);
    bytes.extend_from_slice(&check);
    bs58::encode(bytes).into_string()
}

/// Decode and verify a Base58Check string into `(version, payload)`
pub fn base58check_decode(encoded: &str) -> Result<(u8, Vec<u8>)> {
    let decoded = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| MultisigError::InvalidAddress(format!("base58: {}", e)))?;
    if decoded.len() < 1 + CHECKSUM_LEN {
        return Err(MultisigError::InvalidAddress(format!(
            "{} bytes is too short for Base58Check",
            decoded.len()
        )));
    }
    let (body, check) = decoded.split_at(decoded.len() - CHECKSUM_LEN);
    if checksum(body)[..] != check[..] {
        return Err(MultisigError::InvalidAddress("checksum mismatch".to_string()));
    }
    Ok((body[0], body[1..].to_vec()))
}

/// HASH160 of the redeem script, versioned for P2SH
pub fn p2sh_address(script: &Script, network: Network) -> Address {
    Address(base58check_encode(
        network.p2sh_version(),
        &hash160(script.as_bytes()),
    ))
}

pub fn p2pkh_address(hash: &Hash160, network: Network) -> Address {
    Address(base58check_encode(network.p2pkh_version(), hash))
}

/// Decode an address into its kind and 20-byte hash for the given network
pub fn decode_address(address: &Address, network: Network) -> Result<(AddressKind, Hash160)> {
    let (version, payload) = base58check_decode(address.as_str())?;
    let hash: Hash160 = payload.as_slice().try_into().map_err(|_| {
        MultisigError::InvalidAddress(format!(
            "payload of {} bytes, expected {}",
            payload.len(),
            HASH160_LEN
        ))
    })?;
    let kind = if version == network.p2pkh_version() {
        AddressKind::P2pkh
    } else if version == network.p2sh_version() {
        AddressKind::P2sh
    } else {
        return Err(MultisigError::InvalidAddress(format!(
            "version byte 0x{:02x} is not valid on {}",
            version, network
        )));
    };
    Ok((kind, hash))
}

/// Public key hash of a P2PKH address
pub fn p2pkh_hash160(address: &Address, network: Network) -> Result<Hash160> {
    match decode_address(address, network)? {
        (AddressKind::P2pkh, hash) => Ok(hash),
        (AddressKind::P2sh, _) => Err(MultisigError::InvalidAddress(format!(
            "{} is a P2SH address, expected P2PKH",
            address
        ))),
    }
}

/// Script hash of a P2SH address
pub fn p2sh_hash160(address: &Address, network: Network) -> Result<Hash160> {
    match decode_address(address, network)? {
        (AddressKind::P2sh, hash) => Ok(hash),
        (AddressKind::P2pkh, _) => Err(MultisigError::InvalidAddress(format!(
            "{} is a P2PKH address, expected P2SH",
            address
        ))),
    }
}

/// Locking script paying to the address
pub fn script_pubkey_for_address(address: &Address, network: Network) -> Result<Script> {
    Ok(match decode_address(address, network)? {
        (AddressKind::P2pkh, hash) => p2pkh_script(&hash),
        (AddressKind::P2sh, hash) => p2sh_script(&hash),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATOR_HASH: &str = "751e76e8199196d454941c45d1b3a323f1433bd6";

    fn generator_hash() -> Hash160 {
        hex::decode(GENERATOR_HASH).unwrap().try_into().unwrap()
    }

    #[test]
    fn test_p2pkh_address_vectors() {
        let hash = generator_hash();
        assert_eq!(
            p2pkh_address(&hash, Network::Mainnet).as_str(),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
        );
        assert_eq!(
            p2pkh_address(&hash, Network::Testnet).as_str(),
            "mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r"
        );
    }

    #[test]
    fn test_p2pkh_hash160_decodes() {
        let address = Address::new("mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r");
        assert_eq!(
            p2pkh_hash160(&address, Network::Regtest).unwrap(),
            generator_hash()
        );
    }

    #[test]
    fn test_wrong_network_rejected() {
        let address = Address::new("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
        assert!(matches!(
            p2pkh_hash160(&address, Network::Regtest),
            Err(MultisigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_p2sh_is_not_p2pkh() {
        let address = p2sh_address(&Script::from_bytes(vec![0x51]), Network::Regtest);
        assert!(p2pkh_hash160(&address, Network::Regtest).is_err());
        assert!(p2sh_hash160(&address, Network::Regtest).is_ok());
    }

    #[test]
    fn test_bad_base58_and_length() {
        assert!(base58check_decode("0OIl").is_err());
        let short = Address::new(base58check_encode(0x6f, &[0u8; 19]));
        assert!(matches!(
            p2pkh_hash160(&short, Network::Regtest),
            Err(MultisigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_script_pubkey_for_address() {
        let address = Address::new("mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r");
        let script = script_pubkey_for_address(&address, Network::Regtest).unwrap();
        assert!(script.is_p2pkh());
        assert_eq!(&script.as_bytes()[3..23], &generator_hash()[..]);
    }

    #[test]
    fn test_address_serde_is_plain_string() {
        let address = Address::new("mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r");
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r\"");
    }
}
