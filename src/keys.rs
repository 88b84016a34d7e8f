//! secp256k1 key wrappers
//!
//! Public keys are kept as validated raw bytes because redeem scripts embed
//! them verbatim (compressed or uncompressed). Private keys are only held for
//! the duration of a signing call and are erased on drop.

use crate::address::{base58check_decode, base58check_encode, p2pkh_address, Address};
use crate::constants::*;
use crate::crypto::hash160;
use crate::error::{MultisigError, Result};
use crate::network::Network;
use crate::types::{ByteString, Hash, Hash160};
use secp256k1::{Message, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compressed (33 byte) or uncompressed (65 byte) public key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(ByteString);

impl PublicKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        secp256k1::PublicKey::from_slice(bytes)
            .map_err(|e| MultisigError::InvalidKey(format!("public key: {}", e)))?;
        Ok(Self(bytes.to_vec()))
    }

    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| MultisigError::InvalidKey(format!("public key hex: {}", e)))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn is_compressed(&self) -> bool {
        self.0.len() == COMPRESSED_PUBKEY_LEN
    }

    pub fn hash160(&self) -> Hash160 {
        hash160(&self.0)
    }

    pub fn p2pkh_address(&self, network: Network) -> Address {
        p2pkh_address(&self.hash160(), network)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Private scalar plus the encoding of the public key it controls
#[derive(Clone)]
pub struct PrivateKey {
    secret: SecretKey,
    compressed: bool,
}

impl PrivateKey {
    /// Key from 32 raw bytes; its public key is compressed
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| MultisigError::InvalidKey(format!("private key: {}", e)))?;
        Ok(Self {
            secret,
            compressed: true,
        })
    }

    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| MultisigError::InvalidKey(format!("private key hex: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Decode a Wallet Import Format key for the given network
    pub fn from_wif(wif: &str, network: Network) -> Result<Self> {
        let (version, payload) = base58check_decode(wif.trim())
            .map_err(|e| MultisigError::InvalidKey(format!("WIF: {}", e)))?;
        if version != network.wif_version() {
            return Err(MultisigError::InvalidKey(format!(
                "WIF version 0x{:02x} does not match {} (0x{:02x})",
                version,
                network,
                network.wif_version()
            )));
        }
        let compressed = match payload.len() {
            32 => false,
            33 if payload[32] == 0x01 => true,
            _ => {
                return Err(MultisigError::InvalidKey(format!(
                    "WIF payload of {} bytes",
                    payload.len()
                )))
            }
        };
        let mut key = Self::from_slice(&payload[..32])?;
        key.compressed = compressed;
        Ok(key)
    }

    pub fn to_wif(&self, network: Network) -> String {
        let mut payload = self.secret.secret_bytes().to_vec();
        if self.compressed {
            payload.push(0x01);
        }
        base58check_encode(network.wif_version(), &payload)
    }

    /// Same scalar, but controlling the uncompressed public key encoding
    pub fn into_uncompressed(mut self) -> Self {
        self.compressed = false;
        self
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn public_key(&self) -> PublicKey {
        let secp = Secp256k1::signing_only();
        let public_key = secp256k1::PublicKey::from_secret_key(&secp, &self.secret);
        if self.compressed {
            PublicKey(public_key.serialize().to_vec())
        } else {
            PublicKey(public_key.serialize_uncompressed().to_vec())
        }
    }

    /// Deterministic (RFC 6979) low-S ECDSA signature over a 32-byte digest, DER encoded
    pub fn sign_digest(&self, digest: &Hash) -> Result<ByteString> {
        let secp = Secp256k1::signing_only();
        let message = Message::from_digest_slice(digest)
            .map_err(|e| MultisigError::InvalidKey(format!("digest: {}", e)))?;
        let signature = secp.sign_ecdsa(&message, &self.secret);
        Ok(signature.serialize_der().to_vec())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
    }
}
