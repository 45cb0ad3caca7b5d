//! Stored file record type and display helpers.
//!
//! `FileRecord` is the explicit shape of one archive entry. Wire payloads
//! are decoded once at the boundary with [`FileRecord::from_wire`], which
//! accepts the named-object form the hub emits as well as the positional
//! array form contract tooling hands back, and rejects anything malformed
//! instead of falling back to loose field access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One stored archive entry: the ciphertext plus its relayer-locked secret.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Filename as supplied at store time.
    pub file_name: String,
    /// `0x..` hex ciphertext of the IPFS hash.
    pub encrypted_ipfs_hash: String,
    /// `0x..` relayer handle locking the secret address.
    pub encrypted_secret_address: String,
    /// `0x..` address of the record owner.
    pub owner: String,
    /// Store time, unix seconds.
    pub created_at: u64,
}

/// Errors produced when decoding a wire record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A field is missing or has the wrong JSON type.
    #[error("record field {0} is missing or malformed")]
    BadField(&'static str),
    /// The payload is neither an object nor a five-element array.
    #[error("record payload has an unrecognized shape")]
    BadShape,
}

impl FileRecord {
    /// Decode a record from a wire payload.
    ///
    /// Accepts `{"file_name": .., ..}` or the positional form
    /// `[file_name, encrypted_ipfs_hash, encrypted_secret_address, owner,
    /// created_at]`. Every field must be present and well typed; there are
    /// no defaults.
    pub fn from_wire(value: &Value) -> Result<FileRecord, RecordError> {
        match value {
            Value::Object(map) => Ok(FileRecord {
                file_name: field_str(map, "file_name")?,
                encrypted_ipfs_hash: field_str(map, "encrypted_ipfs_hash")?,
                encrypted_secret_address: field_str(map, "encrypted_secret_address")?,
                owner: field_str(map, "owner")?,
                created_at: field_u64(map, "created_at")?,
            }),
            Value::Array(items) if items.len() == 5 => Ok(FileRecord {
                file_name: item_str(&items[0], "file_name")?,
                encrypted_ipfs_hash: item_str(&items[1], "encrypted_ipfs_hash")?,
                encrypted_secret_address: item_str(&items[2], "encrypted_secret_address")?,
                owner: item_str(&items[3], "owner")?,
                created_at: items[4]
                    .as_u64()
                    .ok_or(RecordError::BadField("created_at"))?,
            }),
            _ => Err(RecordError::BadShape),
        }
    }
}

fn field_str(
    map: &serde_json::Map<String, Value>,
    name: &'static str,
) -> Result<String, RecordError> {
    map.get(name)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(RecordError::BadField(name))
}

fn field_u64(map: &serde_json::Map<String, Value>, name: &'static str) -> Result<u64, RecordError> {
    map.get(name)
        .and_then(Value::as_u64)
        .ok_or(RecordError::BadField(name))
}

fn item_str(value: &Value, name: &'static str) -> Result<String, RecordError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or(RecordError::BadField(name))
}

/// Shorten a long token for display: the first and last `visible`
/// characters joined with an ellipsis. Short values pass through whole.
pub fn truncate_middle(value: &str, visible: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= visible * 2 {
        return value.to_string();
    }
    let head: String = chars[..visible].iter().collect();
    let tail: String = chars[chars.len() - visible..].iter().collect();
    format!("{head}...{tail}")
}

/// Render a unix-seconds timestamp as a UTC wall clock string.
///
/// Zero renders as an empty string, the way unset records display.
pub fn format_timestamp(created_at: u64) -> String {
    if created_at == 0 {
        return String::new();
    }
    match DateTime::<Utc>::from_timestamp(created_at as i64, 0) {
        Some(stamp) => stamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> FileRecord {
        FileRecord {
            file_name: "report.pdf".to_string(),
            encrypted_ipfs_hash: "0x1f2e3d4c".to_string(),
            encrypted_secret_address: "0xaabbccdd".to_string(),
            owner: "0x8ba1f109551bD432803012645Ac136ddd64DBA72".to_string(),
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn decodes_named_object_form() {
        let wire = serde_json::to_value(sample()).unwrap();
        assert_eq!(FileRecord::from_wire(&wire).unwrap(), sample());
    }

    #[test]
    fn decodes_positional_array_form() {
        let wire = json!([
            "report.pdf",
            "0x1f2e3d4c",
            "0xaabbccdd",
            "0x8ba1f109551bD432803012645Ac136ddd64DBA72",
            1_700_000_000u64
        ]);
        assert_eq!(FileRecord::from_wire(&wire).unwrap(), sample());
    }

    #[test]
    fn rejects_missing_and_mistyped_fields() {
        let wire = json!({
            "file_name": "report.pdf",
            "encrypted_ipfs_hash": "0x1f2e3d4c",
            "encrypted_secret_address": "0xaabbccdd",
            "owner": "0x8ba1f109551bD432803012645Ac136ddd64DBA72"
        });
        assert_eq!(
            FileRecord::from_wire(&wire),
            Err(RecordError::BadField("created_at"))
        );

        let wire = json!({
            "file_name": 7,
            "encrypted_ipfs_hash": "0x1f2e3d4c",
            "encrypted_secret_address": "0xaabbccdd",
            "owner": "0x8ba1f109551bD432803012645Ac136ddd64DBA72",
            "created_at": 1_700_000_000u64
        });
        assert_eq!(
            FileRecord::from_wire(&wire),
            Err(RecordError::BadField("file_name"))
        );
    }

    #[test]
    fn rejects_unrecognized_shapes() {
        assert_eq!(
            FileRecord::from_wire(&json!(["too", "short"])),
            Err(RecordError::BadShape)
        );
        assert_eq!(FileRecord::from_wire(&json!(42)), Err(RecordError::BadShape));
        assert_eq!(FileRecord::from_wire(&json!(null)), Err(RecordError::BadShape));
    }

    #[test]
    fn truncation_keeps_both_ends() {
        let token = "0x8ba1f109551bD432803012645Ac136ddd64DBA72";
        assert_eq!(truncate_middle(token, 6), "0x8ba1...4DBA72");
        assert_eq!(truncate_middle("short", 6), "short");
        assert_eq!(truncate_middle("", 6), "");
        // Char based, so multibyte names do not split mid character.
        assert_eq!(truncate_middle("日本語のとても長いファイル名です", 3), "日本語...名です");
    }

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(0), "");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13:20 UTC");
    }
}
