//! In-memory archive store.
//!
//! Keeps every stored record grouped by owner in insertion order, the way
//! the hub reports them to clients. Indexes handed out by `store` stay
//! valid for the life of the process since records are never removed.
//!
use std::collections::HashMap;

use archiveproto::record::FileRecord;
use archiveproto::secret;
use tokio::sync::RwLock;

/// Archive identity plus the records it holds.
pub(crate) struct Archive {
    /// Address identifying this hub instance, minted at startup.
    address: String,
    /// Records per owner, insertion order.
    records: RwLock<HashMap<String, Vec<FileRecord>>>,
}

impl Archive {
    pub(crate) fn new() -> Self {
        Self {
            address: secret::random_secret_address(),
            records: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn address(&self) -> &str {
        &self.address
    }

    /// Validate and append a record, returning its index for the owner.
    pub(crate) async fn store(&self, record: FileRecord) -> Result<u64, String> {
        if !secret::is_hex_address(&record.owner) {
            return Err(format!("owner {} is not an address", record.owner));
        }
        if !is_hex_payload(&record.encrypted_ipfs_hash) {
            return Err("encrypted_ipfs_hash must be 0x-prefixed hex".to_string());
        }
        if !record.encrypted_secret_address.starts_with("0x")
            || record.encrypted_secret_address.len() <= 2
        {
            return Err("encrypted_secret_address must be a relayer handle".to_string());
        }

        let mut records = self.records.write().await;
        let owned = records.entry(record.owner.clone()).or_default();
        owned.push(record);
        Ok(owned.len() as u64 - 1)
    }

    /// All records for an owner, oldest first.
    pub(crate) async fn list(&self, owner: &str) -> Vec<FileRecord> {
        let records = self.records.read().await;
        records.get(owner).cloned().unwrap_or_default()
    }

    /// One record by store index.
    pub(crate) async fn get(&self, owner: &str, index: u64) -> Option<FileRecord> {
        let records = self.records.read().await;
        records.get(owner)?.get(index as usize).cloned()
    }

    /// Record count across every owner.
    pub(crate) async fn total_count(&self) -> u64 {
        let records = self.records.read().await;
        records.values().map(|r| r.len() as u64).sum()
    }
}

/// `0x` plus any even number of hex digits, empty payload included.
fn is_hex_payload(value: &str) -> bool {
    match value.strip_prefix("0x") {
        Some(body) => body.len() % 2 == 0 && body.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}
