//! Hash functions used by scripts, addresses and transactions

use crate::types::{Hash, Hash160};
use bitcoin_hashes::{sha256d, Hash as BitcoinHash};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// SHA256(x)
pub fn sha256(data: &[u8]) -> Hash {
    let result = Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// SHA256(SHA256(x))
pub fn double_sha256(data: &[u8]) -> Hash {
    sha256d::Hash::hash(data).into_inner()
}

/// RIPEMD160(SHA256(x))
pub fn hash160(data: &[u8]) -> Hash160 {
    let sha256_hash = Sha256::digest(data);
    let ripemd160_hash = Ripemd160::digest(&sha256_hash);
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&ripemd160_hash);
    hash
}

/// First four bytes of SHA256(SHA256(x)), as used by Base58Check
pub fn checksum(data: &[u8]) -> [u8; 4] {
    let hash = double_sha256(data);
    [hash[0], hash[1], hash[2], hash[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_double_sha256_matches_two_rounds() {
        let data = b"hello";
        assert_eq!(double_sha256(data), sha256(&sha256(data)));
    }

    #[test]
    fn test_hash160_generator_point() {
        let pubkey =
            hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap();
        assert_eq!(
            hex::encode(hash160(&pubkey)),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn test_checksum_is_prefix_of_double_sha256() {
        let data = [0x6f; 21];
        assert_eq!(checksum(&data)[..], double_sha256(&data)[..4]);
    }
}
