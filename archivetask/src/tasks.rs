//! Task implementations for the archive CLI.
//!
//! Every task opens one TCP connection to the hub, sends line-delimited
//! JSON requests and reads one response per request. Hash encryption and
//! decryption happen here on the client: the plain IPFS hash never goes
//! over the wire, only its ciphertext. Secret addresses do, since the
//! hub-side relayer is what locks and unlocks them.
//!
use std::error::Error;

use archiveproto::{
    codec, ipfs,
    record::{FileRecord, RecordError, format_timestamp, truncate_middle},
    secret,
    wire::{Request, Response},
};
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
};

/// Owner used when --owner is not given: the first well-known dev
/// account every local chain tool seeds.
const DEFAULT_OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// One connected hub conversation.
struct HubClient {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl HubClient {
    async fn connect(hub: &str) -> Result<Self, Box<dyn Error>> {
        let stream = TcpStream::connect(hub).await?;
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer,
        })
    }

    /// Send one request and wait for its response line. A hub-side
    /// `error` response becomes an `Err` here.
    async fn call(&mut self, request: &Request) -> Result<Response, Box<dyn Error>> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;

        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf).await?;
        if n == 0 {
            return Err("hub closed the connection".into());
        }
        match serde_json::from_str::<Response>(buf.trim_end())? {
            Response::Error { message } => Err(message.into()),
            response => Ok(response),
        }
    }
}

/// Resolve the owner address for a task.
fn resolve_owner(owner: Option<String>) -> String {
    owner.unwrap_or_else(|| DEFAULT_OWNER.to_string())
}

/// Decode the loose record payloads a hub response carries, rejecting
/// the whole batch if any record is malformed.
fn decode_records(records: &[Value]) -> Result<Vec<FileRecord>, RecordError> {
    records.iter().map(FileRecord::from_wire).collect()
}

/// Use the provided secret token or mint a fresh random one. Supplied
/// tokens must be address shaped, the relayer cannot lock anything else.
fn resolve_secret(secret: Option<String>) -> Result<String, Box<dyn Error>> {
    match secret {
        Some(token) => {
            if !secret::is_hex_address(&token) {
                return Err(format!("secret {token} is not a 0x address token").into());
            }
            Ok(token)
        }
        None => Ok(secret::random_secret_address()),
    }
}

/// Print the archive address and record count.
pub async fn address(hub: &str) -> Result<(), Box<dyn Error>> {
    let mut client = HubClient::connect(hub).await?;
    match client.call(&Request::ArchiveInfo).await? {
        Response::ArchiveInfo {
            archive_address,
            file_count,
        } => {
            println!("CipherArchive address is {archive_address}");
            println!("Files stored: {file_count}");
            Ok(())
        }
        other => Err(format!("unexpected response {other:?}").into()),
    }
}

/// Encrypt an IPFS hash under a secret address and store the record.
pub async fn store_file(
    hub: &str,
    name: &str,
    hash: &str,
    secret: Option<String>,
    owner: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let owner = resolve_owner(owner);
    let secret_address = resolve_secret(secret)?;
    if !ipfs::looks_like_ipfs_hash(hash) {
        println!("Note: {hash} is not CIDv0 shaped, storing it as-is");
    }

    let encrypted_ipfs_hash = format!("0x{}", codec::encode(hash, &secret_address)?);

    let mut client = HubClient::connect(hub).await?;
    let (handle, proof) = match client
        .call(&Request::EncryptSecret {
            owner: owner.clone(),
            secret_address: secret_address.clone(),
        })
        .await?
    {
        Response::SecretEncrypted { handle, proof } => (handle, proof),
        other => return Err(format!("unexpected response {other:?}").into()),
    };

    match client
        .call(&Request::StoreFile {
            owner: owner.clone(),
            file_name: name.to_string(),
            encrypted_ipfs_hash,
            handle,
            proof,
        })
        .await?
    {
        Response::Stored { index, created_at } => {
            println!("Stored {name} for {owner}");
            println!("  Index: {index}");
            println!("  Stored at: {}", format_timestamp(created_at));
            println!("  Secret address: {secret_address}");
            println!("Keep the secret address, it is the only way back to the hash.");
            Ok(())
        }
        other => Err(format!("unexpected response {other:?}").into()),
    }
}

/// List the records stored for an owner.
pub async fn list_files(hub: &str, owner: Option<String>) -> Result<(), Box<dyn Error>> {
    let owner = resolve_owner(owner);
    let mut client = HubClient::connect(hub).await?;
    match client
        .call(&Request::ListFiles {
            owner: owner.clone(),
        })
        .await?
    {
        Response::Files { records } => {
            let records = decode_records(&records)?;
            println!("Found {} file(s) for {owner}", records.len());
            for (index, record) in records.iter().enumerate() {
                println!(
                    "[{index}] {} hash={} secret={} stored={}",
                    record.file_name,
                    truncate_middle(&record.encrypted_ipfs_hash, 10),
                    truncate_middle(&record.encrypted_secret_address, 10),
                    format_timestamp(record.created_at)
                );
            }
            Ok(())
        }
        other => Err(format!("unexpected response {other:?}").into()),
    }
}

/// Recover the secret address and plaintext IPFS hash of one record.
pub async fn decrypt_file(hub: &str, index: u64, owner: Option<String>) -> Result<(), Box<dyn Error>> {
    let owner = resolve_owner(owner);
    let mut client = HubClient::connect(hub).await?;

    let record = match client
        .call(&Request::GetFile {
            owner: owner.clone(),
            index,
        })
        .await?
    {
        Response::File { record } => FileRecord::from_wire(&record)?,
        other => return Err(format!("unexpected response {other:?}").into()),
    };

    let secret_address = match client
        .call(&Request::DecryptSecret {
            handle: record.encrypted_secret_address.clone(),
        })
        .await?
    {
        Response::SecretDecrypted { secret_address } => secret_address,
        other => return Err(format!("unexpected response {other:?}").into()),
    };

    let ipfs_hash = codec::decode(&record.encrypted_ipfs_hash, &secret_address)?;

    println!("Decrypted file #{index} for {owner}");
    println!("  Filename: {}", record.file_name);
    println!("  Secret address: {secret_address}");
    println!("  IPFS hash: {ipfs_hash}");
    Ok(())
}
