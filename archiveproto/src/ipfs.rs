//! Placeholder IPFS content identifier helpers.
//!
//! The archive never talks to a real IPFS node. Uploads produce a
//! CIDv0-shaped placeholder, `Qm` followed by 44 base58 characters, that
//! stands in for the real content hash end to end.

use rand::Rng;

/// Base58 alphabet used for placeholder hashes (no 0, O, I or l).
const IPFS_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Total length of a placeholder hash, prefix included.
pub const MOCK_HASH_LEN: usize = 46;

/// Generate a placeholder CIDv0-style content identifier.
pub fn generate_mock_ipfs_hash() -> String {
    let mut rng = rand::rng();
    let mut out = String::with_capacity(MOCK_HASH_LEN);
    out.push_str("Qm");
    for _ in 0..MOCK_HASH_LEN - 2 {
        let idx = rng.random_range(0..IPFS_ALPHABET.len());
        out.push(IPFS_ALPHABET[idx] as char);
    }
    out
}

/// Whether a string is shaped like one of our placeholder identifiers.
pub fn looks_like_ipfs_hash(value: &str) -> bool {
    value.len() == MOCK_HASH_LEN
        && value.starts_with("Qm")
        && value.bytes().skip(2).all(|b| IPFS_ALPHABET.contains(&b))
}
