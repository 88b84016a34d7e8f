//! Protocol constants for legacy P2SH multisig spends

/// Maximum money supply: 21,000,000 BTC in satoshis
pub const MAX_MONEY: u64 = 21_000_000 * 100_000_000;

/// Satoshis per BTC
pub const SATOSHIS_PER_BTC: u64 = 100_000_000;

/// Maximum size of a single data push
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum serialized redeem script size accepted for P2SH
pub const MAX_REDEEM_SCRIPT_SIZE: usize = 520;

/// Maximum number of public keys in a CHECKMULTISIG expressible with OP_1..OP_16
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 16;

/// Maximum stack size during script execution
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum number of operations in script
pub const MAX_SCRIPT_OPS: usize = 201;

/// Default transaction version
pub const DEFAULT_TX_VERSION: u32 = 2;

/// Default lock time
pub const DEFAULT_LOCK_TIME: u32 = 0;

/// Sequence number for final transaction
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Length of a HASH160 digest
pub const HASH160_LEN: usize = 20;

/// Length of a Base58Check checksum
pub const CHECKSUM_LEN: usize = 4;

/// Upper bound of a DER signature plus its sighash byte
pub const MAX_SIGNATURE_WITH_SIGHASH_LEN: usize = 73;

/// Compressed public key length
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Uncompressed public key length
pub const UNCOMPRESSED_PUBKEY_LEN: usize = 65;

/// Default confirmation window used when listing unspent outputs
pub const DEFAULT_MIN_CONFIRMATIONS: u32 = 0;
pub const DEFAULT_MAX_CONFIRMATIONS: u32 = 9_999_999;

/// Default confirmation target (blocks) asked of a fee oracle
pub const DEFAULT_FEE_TARGET_BLOCKS: u16 = 6;

/// Highest confirmation target node fee estimators accept
pub const MAX_FEE_TARGET_BLOCKS: u16 = 1008;

/// Fee rate (sat/byte) used when the fee oracle is unavailable
pub const DEFAULT_FALLBACK_FEE_RATE: u64 = 5;
