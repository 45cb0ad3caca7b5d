//! Mock relayer for locking and unlocking secret addresses.
//!
//! Stands in for the external encryption relayer: `encrypt_address`
//! issues an opaque handle plus an input proof for a secret address, and
//! `decrypt_handle` turns a known handle back into that address. Handles
//! are Keccak derived with a random salt so locking the same address
//! twice never collides, and proofs are keyed with a per-instance secret
//! so only this relayer can mint ones that verify. None of this is real
//! cryptography; the table behind the handles IS the secret store, which
//! is all a demo hub needs.
//!
use std::collections::HashMap;
use std::sync::RwLock;

use sha3::{Digest, Keccak256};

/// Relayer capability the hub calls through; swap in a fake for tests.
pub(crate) trait Relayer: Send + Sync {
    /// Lock a secret address for an owner, returning (handle, proof).
    fn encrypt_address(&self, owner: &str, secret_address: &str) -> (String, String);
    /// Check that an input proof matches a handle and owner.
    fn verify_proof(&self, handle: &str, proof: &str, owner: &str) -> bool;
    /// Recover the secret address behind a handle issued earlier.
    fn decrypt_handle(&self, handle: &str) -> Option<String>;
}

/// In-memory relayer used by the hub and the tests.
pub(crate) struct MockRelayer {
    // Proof key minted at startup; proofs from other instances fail.
    proof_key: [u8; 32],
    // Handle to secret address, insertion only.
    handles: RwLock<HashMap<String, String>>,
}

impl MockRelayer {
    pub(crate) fn new() -> Self {
        Self {
            proof_key: rand::random(),
            handles: RwLock::new(HashMap::new()),
        }
    }

    fn proof_for(&self, handle: &str, owner: &str) -> String {
        let mut hasher = Keccak256::new();
        hasher.update(self.proof_key);
        hasher.update(handle.as_bytes());
        hasher.update(owner.as_bytes());
        format!("0x{}", hex::encode(hasher.finalize()))
    }
}

impl Relayer for MockRelayer {
    fn encrypt_address(&self, owner: &str, secret_address: &str) -> (String, String) {
        let salt: [u8; 16] = rand::random();
        let mut hasher = Keccak256::new();
        hasher.update(secret_address.as_bytes());
        hasher.update(salt);
        let handle = format!("0x{}", hex::encode(hasher.finalize()));

        let proof = self.proof_for(&handle, owner);
        self.handles
            .write()
            .unwrap()
            .insert(handle.clone(), secret_address.to_string());
        (handle, proof)
    }

    fn verify_proof(&self, handle: &str, proof: &str, owner: &str) -> bool {
        self.proof_for(handle, owner) == proof
    }

    fn decrypt_handle(&self, handle: &str) -> Option<String> {
        self.handles.read().unwrap().get(handle).cloned()
    }
}
