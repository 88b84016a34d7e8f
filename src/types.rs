//! Core transaction types for building P2SH multisig spends

use crate::constants::*;
use crate::error::{MultisigError, Result};
use serde::{Deserialize, Serialize};

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// HASH160 digest: RIPEMD160(SHA256(x))
pub type Hash160 = [u8; 20];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Amount in satoshis
pub type Amount = u64;

/// Reference to a previous transaction output.
///
/// `txid` is kept in display (RPC) byte order; serialization reverses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash,
    pub vout: u32,
}

impl OutPoint {
    /// Parse an outpoint from a display-order hex txid
    pub fn from_hex(txid: &str, vout: u32) -> Result<Self> {
        Ok(Self {
            txid: txid_from_hex(txid)?,
            vout,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub script_sig: ByteString,
    pub sequence: u32,
}

impl TransactionInput {
    /// Input with an empty scriptSig and a final sequence number
    pub fn new(prevout: OutPoint) -> Self {
        Self {
            prevout,
            script_sig: Vec::new(),
            sequence: SEQUENCE_FINAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: Amount,
    pub script_pubkey: ByteString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// Transaction with the default version and lock time
    pub fn new(inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>) -> Self {
        Self {
            version: DEFAULT_TX_VERSION,
            inputs,
            outputs,
            lock_time: DEFAULT_LOCK_TIME,
        }
    }
}

/// Unspent output available for spending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub amount: Amount,
}

impl Utxo {
    pub fn new(txid: &str, vout: u32, amount: Amount) -> Result<Self> {
        Ok(Self {
            outpoint: OutPoint::from_hex(txid, vout)?,
            amount,
        })
    }
}

/// One entry of a node's `listunspent` reply; amounts are in BTC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcUnspent {
    pub txid: String,
    pub vout: u32,
    pub amount: f64,
    #[serde(default)]
    pub confirmations: u32,
}

impl TryFrom<RpcUnspent> for Utxo {
    type Error = MultisigError;

    fn try_from(entry: RpcUnspent) -> Result<Self> {
        Utxo::new(&entry.txid, entry.vout, btc_to_satoshis(entry.amount)?)
    }
}

/// Convert a BTC amount to satoshis, rounding to the nearest satoshi
pub fn btc_to_satoshis(btc: f64) -> Result<Amount> {
    if !btc.is_finite() || btc < 0.0 {
        return Err(MultisigError::InvalidAmount(format!("{} BTC", btc)));
    }
    let sats = (btc * SATOSHIS_PER_BTC as f64).round();
    if sats > MAX_MONEY as f64 {
        return Err(MultisigError::InvalidAmount(format!(
            "{} BTC exceeds the money supply",
            btc
        )));
    }
    Ok(sats as Amount)
}

/// Parse a 32-byte txid given as display-order hex
pub fn txid_from_hex(txid: &str) -> Result<Hash> {
    let bytes = hex::decode(txid)
        .map_err(|e| MultisigError::Serialization(format!("txid {}: {}", txid, e)))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        MultisigError::Serialization(format!("txid must be 32 bytes, got {}", b.len()))
    })
}

/// Legacy signature hash type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SighashType(u32);

impl SighashType {
    pub const ALL: SighashType = SighashType(0x01);
    pub const NONE: SighashType = SighashType(0x02);
    pub const SINGLE: SighashType = SighashType(0x03);
    pub const ANYONECANPAY: u32 = 0x80;

    /// Accepts ALL, NONE and SINGLE, optionally combined with ANYONECANPAY
    pub fn from_u32(value: u32) -> Result<Self> {
        match value & !Self::ANYONECANPAY {
            0x01..=0x03 => Ok(SighashType(value)),
            _ => Err(MultisigError::InvalidScript(format!(
                "unsupported sighash type 0x{:02x}",
                value
            ))),
        }
    }

    pub fn anyone_can_pay(self) -> Self {
        SighashType(self.0 | Self::ANYONECANPAY)
    }

    pub fn is_anyone_can_pay(self) -> bool {
        self.0 & Self::ANYONECANPAY != 0
    }

    /// Base type with the ANYONECANPAY flag masked off
    pub fn base(self) -> u32 {
        self.0 & 0x1f
    }

    pub fn to_u32(self) -> u32 {
        self.0
    }

    /// Byte appended to each DER signature
    pub fn to_byte(self) -> u8 {
        self.0 as u8
    }
}

impl Default for SighashType {
    fn default() -> Self {
        Self::ALL
    }
}
