//! Shared protocol crate for the Cipher Archive.
//!
//! Everything the hub, the task CLI and the tests have in common lives
//! here: the keystream codec that obfuscates content identifiers, secret
//! address tokens, placeholder IPFS hashes, the stored record type and
//! the hub wire messages. These modules stay free of network and UI
//! concerns so that every caller shares one implementation instead of
//! growing its own.

/// Keystream derivation and XOR obfuscation
pub mod codec;
/// Secret address token generation and validation
pub mod secret;
/// Placeholder IPFS content identifier helpers
pub mod ipfs;
/// Stored file record type and display helpers
pub mod record;
/// Hub request and response wire messages
pub mod wire;
