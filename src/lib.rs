//! # P2SH-Multisig
//!
//! Build, sign and serialize legacy Bitcoin transactions that spend
//! Pay-to-Script-Hash `m`-of-`n` multisig outputs to a Pay-to-Public-Key-Hash
//! destination.
//!
//! ## Architecture
//!
//! Leaves first:
//! - Hashing and wire encoding (`crypto`, `encode`)
//! - Script builder, keys and addresses (`script`, `keys`, `address`)
//! - Transaction model, serialization and legacy signature hashing (`types`, `transaction`)
//! - Script verifier for the spends this crate produces (`interpreter`)
//! - Signer, fee strategies and assembler (`signer`, `fee`, `builder`)
//! - Spend pipeline over pluggable collaborators (`interfaces`, `spend`)
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: operations return new values; nothing is mutated in place
//! 2. **Explicit Network**: every address and key encoding takes a [`Network`](network::Network)
//! 3. **Exact Version Pinning**: cryptographic dependencies are pinned to exact versions
//! 4. **No I/O**: node RPC and fee services are traits implemented by the caller
//!
//! ## Usage
//!
//! ```rust
//! use p2sh_multisig::P2shMultisig;
//! use p2sh_multisig::keys::PrivateKey;
//! use p2sh_multisig::network::Network;
//!
//! let multisig = P2shMultisig::new(Network::Regtest);
//! let pubkeys: Vec<_> = [0x11u8, 0x22, 0x33]
//!     .iter()
//!     .map(|b| PrivateKey::from_slice(&[*b; 32]).unwrap().public_key())
//!     .collect();
//! let redeem_script = multisig.redeem_script(2, &pubkeys).unwrap();
//! let address = multisig.p2sh_address(&redeem_script);
//! assert_eq!(address.as_str(), "2MuXogRGTh7uADB2wKBqFcsPTprVKnChJe6");
//! ```

pub mod types;
pub mod constants;
pub mod crypto;
pub mod encode;
pub mod network;
pub mod script;
pub mod keys;
pub mod address;
pub mod transaction;
pub mod interpreter;
pub mod signer;
pub mod fee;
pub mod builder;
pub mod interfaces;
pub mod spend;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use types::*;
pub use error::{MultisigError, Result};
pub use address::Address;
pub use keys::{PrivateKey, PublicKey};
pub use network::Network;
pub use script::Script;

/// Multisig operations bound to one network
///
/// # Examples
///
/// ```
/// use p2sh_multisig::{P2shMultisig, Network, PrivateKey, Utxo, Address};
///
/// let multisig = P2shMultisig::new(Network::Regtest);
/// let keys: Vec<PrivateKey> = [0x11u8, 0x22, 0x33]
///     .iter()
///     .map(|b| PrivateKey::from_slice(&[*b; 32]).unwrap())
///     .collect();
/// let pubkeys: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
/// let redeem_script = multisig.redeem_script(2, &pubkeys).unwrap();
///
/// let utxo = Utxo::new(
///     "2a60c33fd18722a74e3555154803a0077e95f510a0def717c54f2cf592b9cf70",
///     0,
///     50_000,
/// )
/// .unwrap();
/// let destination = Address::new("mz8AXDhDMhvLs7kxwfQxvcH5GoVH6AdARZ");
/// let unsigned = multisig.build_unsigned(&[utxo], 500, &destination).unwrap();
/// assert_eq!(unsigned.outputs[0].value, 49_500);
///
/// let signed = multisig
///     .sign_input(&unsigned, 0, &redeem_script, &keys[..2])
///     .unwrap();
/// assert!(multisig.verify_input(&signed, 0, &redeem_script).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct P2shMultisig {
    network: Network,
}

impl P2shMultisig {
    /// Create an instance for `network`
    ///
    /// # Examples
    ///
    /// ```
    /// use p2sh_multisig::{P2shMultisig, Network};
    ///
    /// let multisig = P2shMultisig::new(Network::Testnet);
    /// assert_eq!(multisig.network(), Network::Testnet);
    /// ```
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// `OP_m <pubkeys> OP_n OP_CHECKMULTISIG`
    pub fn redeem_script(&self, m: usize, pubkeys: &[PublicKey]) -> Result<Script> {
        script::multisig_redeem_script(m, pubkeys)
    }

    /// Base58Check P2SH address of a redeem script
    ///
    /// # Examples
    ///
    /// ```
    /// use p2sh_multisig::{P2shMultisig, Network, Script};
    ///
    /// let multisig = P2shMultisig::new(Network::Mainnet);
    /// let redeem_script = Script::from_hex(
    ///     "5221034f355bdcb7cc0af728ef3cceb9615d90684bb5b2ca5f859ab0f0b704075871aa\
    ///      2102466d7fcae563e5cb09a0d1870bb580344804617879a14949cf22285f1bae3f27\
    ///      21023c72addb4fdf09af94f0c94d7fe92a386a7e70cf8a1d85916386bb2535c7b1b153ae",
    /// )
    /// .unwrap();
    /// let address = multisig.p2sh_address(&redeem_script);
    /// assert_eq!(address.as_str(), "33ybcgLS5fPp1PQPe4DNzvQCcWH9y6bTE1");
    /// ```
    pub fn p2sh_address(&self, redeem_script: &Script) -> Address {
        address::p2sh_address(redeem_script, self.network)
    }

    /// Twenty-byte public key hash of a P2PKH address on this network
    pub fn p2pkh_hash160(&self, address: &Address) -> Result<Hash160> {
        address::p2pkh_hash160(address, self.network)
    }

    /// Sweep `utxos` into one P2PKH output paying `destination`
    pub fn build_unsigned(
        &self,
        utxos: &[Utxo],
        fee: Amount,
        destination: &Address,
    ) -> Result<Transaction> {
        builder::build_unsigned(utxos, fee, destination, self.network)
    }

    /// Sign one input with SIGHASH_ALL; keys must be in redeem-script order
    pub fn sign_input(
        &self,
        tx: &Transaction,
        input_index: usize,
        redeem_script: &Script,
        keys: &[PrivateKey],
    ) -> Result<Transaction> {
        signer::sign_input(tx, input_index, redeem_script, keys)
    }

    /// Check an input against the P2SH output locked by `redeem_script`
    pub fn verify_input(
        &self,
        tx: &Transaction,
        input_index: usize,
        redeem_script: &Script,
    ) -> Result<bool> {
        let script_pubkey = script::p2sh_script(&crypto::hash160(redeem_script.as_bytes()));
        interpreter::verify_input(tx, input_index, &script_pubkey)
    }

    /// Raw transaction hex as accepted by a node
    pub fn serialize_hex(&self, tx: &Transaction) -> String {
        transaction::serialize_hex(tx)
    }

    /// Transaction id in display order
    pub fn txid(&self, tx: &Transaction) -> String {
        transaction::txid_hex(tx)
    }
}

impl Default for P2shMultisig {
    fn default() -> Self {
        Self::new(Network::Regtest)
    }
}
