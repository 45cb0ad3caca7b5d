//! archiveweb crate entrypoint.
//!
//! Starts the Tokio runtime and launches the archive hub defined in the
//! `server` module. Keep this file minimal — most application logic lives
//! in `server`, `archive`, `relayer`, and `config`.
//!
/// Hub server implementation and request handling
mod server;
/// Configuration management and settings
mod config;
/// In-memory record store and archive identity
mod archive;
/// Mock relayer that locks and unlocks secret addresses
mod relayer;

/// Entry point for the async Tokio runtime
#[tokio::main]
async fn main() {
    server::run().await;
}
