//! Hub wire messages.
//!
//! Task clients talk to the hub over TCP with one JSON message per line;
//! these are the payload shapes for both directions. Socket handling
//! lives in the binaries, this module only defines the data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client-to-hub requests, one JSON object per line.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Identify the archive and report how many records it holds.
    ArchiveInfo,
    /// Have the relayer lock a secret address for an owner.
    EncryptSecret { owner: String, secret_address: String },
    /// Store a prepared record.
    StoreFile {
        owner: String,
        file_name: String,
        encrypted_ipfs_hash: String,
        handle: String,
        proof: String,
    },
    /// List every record stored for an owner, oldest first.
    ListFiles { owner: String },
    /// Fetch one record by its store index.
    GetFile { owner: String, index: u64 },
    /// Have the relayer unlock a handle back into a secret address.
    DecryptSecret { handle: String },
}

/// Hub-to-client responses, one JSON object per line.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    ArchiveInfo {
        archive_address: String,
        file_count: u64,
    },
    SecretEncrypted {
        handle: String,
        proof: String,
    },
    Stored {
        index: u64,
        created_at: u64,
    },
    /// Record payloads travel as loose JSON, the way contract returns
    /// arrive; consumers decode each one with
    /// [`crate::record::FileRecord::from_wire`].
    Files {
        records: Vec<Value>,
    },
    File {
        record: Value,
    },
    SecretDecrypted {
        secret_address: String,
    },
    /// Any request can fail with a message instead of its usual reply.
    Error {
        message: String,
    },
}
