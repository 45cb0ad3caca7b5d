//! Secret address token helpers.
//!
//! Secrets in the archive are account-style tokens: 20 random bytes
//! rendered as a `0x..` hex string with EIP-55 mixed-case checksumming.
//! A fresh one is generated per upload and used purely as codec key
//! material; the hub only ever sees it relayer-locked.

use sha3::{Digest, Keccak256};

/// Byte length of a secret address token.
pub const ADDRESS_BYTES: usize = 20;

/// Generate a fresh random secret address token.
pub fn random_secret_address() -> String {
    let raw = rand::random::<[u8; ADDRESS_BYTES]>();
    to_checksum_address(&raw)
}

/// Render 20 address bytes as an EIP-55 checksummed `0x..` string.
///
/// A hex letter is uppercased when the matching nibble of the Keccak-256
/// digest of the lowercase hex body is 8 or more; digits are unaffected.
pub fn to_checksum_address(bytes: &[u8; ADDRESS_BYTES]) -> String {
    let body = hex::encode(bytes);
    let digest = Keccak256::digest(body.as_bytes());

    let mut out = String::with_capacity(2 + body.len());
    out.push_str("0x");
    for (i, ch) in body.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            digest[i / 2] >> 4
        } else {
            digest[i / 2] & 0x0f
        };
        if nibble >= 8 {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Whether a token has the shape of an address: `0x` plus 40 hex digits.
///
/// Casing is not checked; the codec canonicalizes it away.
pub fn is_hex_address(token: &str) -> bool {
    match token.strip_prefix("0x") {
        Some(body) => {
            body.len() == ADDRESS_BYTES * 2 && body.bytes().all(|b| b.is_ascii_hexdigit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_tokens_are_address_shaped() {
        for _ in 0..32 {
            let token = random_secret_address();
            assert_eq!(token.len(), 42);
            assert!(is_hex_address(&token));
        }
    }

    #[test]
    fn checksumming_keeps_the_digits() {
        let token = to_checksum_address(&[0u8; ADDRESS_BYTES]);
        assert_eq!(token, format!("0x{}", "0".repeat(40)));
    }

    #[test]
    fn checksumming_is_case_only() {
        let raw = rand::random::<[u8; ADDRESS_BYTES]>();
        let token = to_checksum_address(&raw);
        assert_eq!(token.to_lowercase(), format!("0x{}", hex::encode(raw)));
        // Deterministic for the same bytes.
        assert_eq!(token, to_checksum_address(&raw));
    }

    #[test]
    fn address_shape_validation() {
        assert!(is_hex_address("0x8ba1f109551bD432803012645Ac136ddd64DBA72"));
        assert!(!is_hex_address("8ba1f109551bd432803012645ac136ddd64dba72"));
        assert!(!is_hex_address("0x8ba1f109551bd432803012645ac136ddd64dba7"));
        assert!(!is_hex_address("0x8ba1f109551bd432803012645ac136ddd64dba7g"));
        assert!(!is_hex_address(""));
        assert!(!is_hex_address("0x"));
    }
}
