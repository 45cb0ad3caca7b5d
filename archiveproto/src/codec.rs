//! Keystream codec used to obfuscate stored content identifiers.
//!
//! This module implements the symmetric XOR transform shared by the hub
//! upload flow, the task CLI and the test suites. A 32-byte keystream is
//! derived from a secret address token with Keccak-256 and repeated
//! cyclically over the payload. It is NOT authenticated encryption: there
//! is no integrity tag, so decoding with a wrong secret succeeds and
//! yields garbage instead of an error. Confidentiality of the secret
//! token is the only thing protecting the plaintext.

use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Width of the derived keystream in bytes, one Keccak-256 digest.
pub const KEYSTREAM_WIDTH: usize = 32;

/// Errors produced by the keystream codec.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// The secret token is empty.
    #[error("secret token must not be empty")]
    InvalidSecret,
    /// The ciphertext is not well-formed even-length hex.
    #[error("malformed ciphertext: {0}")]
    MalformedInput(#[from] hex::FromHexError),
}

/// Canonical byte encoding of a secret token.
///
/// A `0x`-prefixed even-length hex token contributes its decoded bytes, so
/// `0xAB..` and `0xab..` derive the same keystream (the relayer may hand
/// back a stored address with different casing). Anything else contributes
/// its UTF-8 bytes unchanged.
fn canonical_secret_bytes(secret: &str) -> Vec<u8> {
    if let Some(body) = secret.strip_prefix("0x") {
        if !body.is_empty() && body.len() % 2 == 0 {
            if let Ok(bytes) = hex::decode(body) {
                return bytes;
            }
        }
    }
    secret.as_bytes().to_vec()
}

/// Derive the repeating keystream for a secret token.
///
/// The keystream is the Keccak-256 digest of the token's canonical bytes;
/// byte `i` of the stream is `digest[i % KEYSTREAM_WIDTH]`.
pub fn derive_keystream(secret: &str) -> Result<[u8; KEYSTREAM_WIDTH], CodecError> {
    if secret.is_empty() {
        return Err(CodecError::InvalidSecret);
    }
    let mut hasher = Keccak256::new();
    hasher.update(canonical_secret_bytes(secret));
    Ok(hasher.finalize().into())
}

/// Obfuscate a plaintext string under the keystream for `secret`.
///
/// Returns the ciphertext as bare lowercase hex, exactly twice the
/// plaintext byte length; callers add their own `0x` prefix when storing
/// or transmitting it. Encoding is deterministic and an empty plaintext
/// encodes to an empty string.
pub fn encode(plaintext: &str, secret: &str) -> Result<String, CodecError> {
    let key = derive_keystream(secret)?;
    let cipher: Vec<u8> = plaintext
        .as_bytes()
        .iter()
        .enumerate()
        .map(|(i, &byte)| byte ^ key[i % KEYSTREAM_WIDTH])
        .collect();
    Ok(hex::encode(cipher))
}

/// Recover a plaintext string from a hex ciphertext and its secret token.
///
/// An optional `0x` or `0X` prefix is accepted. The ciphertext must be
/// valid hex of even length; beyond that nothing is checked, and invalid
/// UTF-8 in the output is replaced rather than rejected. Feeding the
/// wrong secret therefore returns a garbled string, not an error.
pub fn decode(hex_ciphertext: &str, secret: &str) -> Result<String, CodecError> {
    let key = derive_keystream(secret)?;
    let body = hex_ciphertext
        .strip_prefix("0x")
        .or_else(|| hex_ciphertext.strip_prefix("0X"))
        .unwrap_or(hex_ciphertext);
    let cipher = hex::decode(body)?;
    let plain: Vec<u8> = cipher
        .iter()
        .enumerate()
        .map(|(i, &byte)| byte ^ key[i % KEYSTREAM_WIDTH])
        .collect();
    Ok(String::from_utf8_lossy(&plain).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_recovers_plaintext() {
        let secret = "0x8ba1f109551bD432803012645Ac136ddd64DBA72";
        let encrypted = encode("QmTestEncryptedHash", secret).unwrap();
        assert_eq!(encrypted.len(), 2 * "QmTestEncryptedHash".len());
        assert!(encrypted.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(decode(&encrypted, secret).unwrap(), "QmTestEncryptedHash");
    }

    #[test]
    fn empty_plaintext_encodes_to_empty_hex() {
        let secret = "0x8ba1f109551bD432803012645Ac136ddd64DBA72";
        let encrypted = encode("", secret).unwrap();
        assert_eq!(encrypted, "");
        assert_eq!(decode(&encrypted, secret).unwrap(), "");
        assert_eq!(decode("0x", secret).unwrap(), "");
    }

    #[test]
    fn secret_casing_is_canonicalized() {
        let upper = "0x8BA1F109551BD432803012645AC136DDD64DBA72";
        let lower = "0x8ba1f109551bd432803012645ac136ddd64dba72";
        assert_eq!(derive_keystream(upper).unwrap(), derive_keystream(lower).unwrap());
        let encrypted = encode("QmTestEncryptedHash", upper).unwrap();
        assert_eq!(decode(&encrypted, lower).unwrap(), "QmTestEncryptedHash");
    }

    #[test]
    fn non_hex_secret_uses_utf8_bytes() {
        // Odd-length body, so the hex path cannot apply.
        let token = "0xAbCdEf0123456789AbCdEf0123456789AbCdEf1";
        let encrypted = encode("QmTestEncryptedHash", token).unwrap();
        assert_eq!(decode(&encrypted, token).unwrap(), "QmTestEncryptedHash");

        // A plain passphrase works too, just through the UTF-8 path.
        let derived = derive_keystream("correct horse battery staple").unwrap();
        let direct: [u8; KEYSTREAM_WIDTH] =
            Keccak256::digest(b"correct horse battery staple").into();
        assert_eq!(derived, direct);
    }

    #[test]
    fn hex_secret_hashes_decoded_bytes() {
        let token = "0x8ba1f109551bd432803012645ac136ddd64dba72";
        let derived = derive_keystream(token).unwrap();
        let direct: [u8; KEYSTREAM_WIDTH] =
            Keccak256::digest(hex::decode(&token[2..]).unwrap()).into();
        assert_eq!(derived, direct);
    }

    #[test]
    fn empty_secret_is_rejected_everywhere() {
        assert_eq!(derive_keystream(""), Err(CodecError::InvalidSecret));
        assert_eq!(encode("QmTestEncryptedHash", ""), Err(CodecError::InvalidSecret));
        assert_eq!(decode("0x1234", ""), Err(CodecError::InvalidSecret));
    }

    #[test]
    fn malformed_ciphertext_is_rejected() {
        let secret = "0x8ba1f109551bd432803012645ac136ddd64dba72";
        assert!(matches!(decode("0xZZ", secret), Err(CodecError::MalformedInput(_))));
        assert!(matches!(decode("0xA", secret), Err(CodecError::MalformedInput(_))));
        assert!(matches!(decode("zz", secret), Err(CodecError::MalformedInput(_))));
        assert!(matches!(decode("abc", secret), Err(CodecError::MalformedInput(_))));
    }

    #[test]
    fn wrong_secret_decodes_to_garbage_not_error() {
        let right = "0x8ba1f109551bd432803012645ac136ddd64dba72";
        let wrong = "0x00000000219ab540356cbb839cbe05303d7705fa";
        let encrypted = encode("QmTestEncryptedHash", right).unwrap();
        let garbled = decode(&encrypted, wrong).unwrap();
        assert_ne!(garbled, "QmTestEncryptedHash");
    }

    #[test]
    fn keystream_repeats_past_one_width() {
        let secret = "0x8ba1f109551bd432803012645ac136ddd64dba72";
        let plaintext = "a".repeat(2 * KEYSTREAM_WIDTH + 5);
        let key = derive_keystream(secret).unwrap();
        let cipher = hex::decode(encode(&plaintext, secret).unwrap()).unwrap();
        assert_eq!(cipher.len(), plaintext.len());
        for (i, &byte) in cipher.iter().enumerate() {
            assert_eq!(byte, plaintext.as_bytes()[i] ^ key[i % KEYSTREAM_WIDTH]);
        }
        // Bytes one full width apart see the same key byte.
        for i in 0..KEYSTREAM_WIDTH + 5 {
            assert_eq!(cipher[i] ^ plaintext.as_bytes()[i], cipher[i + KEYSTREAM_WIDTH] ^ plaintext.as_bytes()[i + KEYSTREAM_WIDTH]);
        }
    }
}
