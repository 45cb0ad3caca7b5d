//! Configuration loader and defaults for the archive hub.
//!
//! Exposes a lazily-initialized `CONFIG` which reads values from
//! environment variables (with sensible defaults). Fields cover the two
//! listening ports (`web_port`, `hub_port`) and optional TLS assets
//! (`cert`, `key`); without both TLS values the web API serves plain
//! HTTP, which is what local demo runs want.
//!
use std::env;

use base64::{Engine as _, engine::general_purpose};
use once_cell::sync::Lazy;

const DEFAULT_WEB_PORT: u16 = 8443;
const DEFAULT_HUB_PORT: u16 = 7401;

/// Application configuration for ports and TLS assets
pub struct Config {
    /// Optional PEM certificate for HTTPS
    pub cert: Option<String>,
    /// Optional PEM private key for HTTPS
    pub key: Option<String>,
    /// Web API port
    pub web_port: u16,
    /// Hub TCP port for task clients
    pub hub_port: u16,
}

/// Global application configuration instance, lazily initialized
pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    let decode_maybe_b64 = |val: String| -> String {
        general_purpose::STANDARD
            .decode(&val)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or(val)
    };

    Config {
        cert: env::var("ARCHIVE_CERT").ok().map(decode_maybe_b64),
        key: env::var("ARCHIVE_KEY").ok().map(decode_maybe_b64),
        web_port: env::var("ARCHIVE_WEB_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_WEB_PORT),

        hub_port: env::var("ARCHIVE_HUB_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_HUB_PORT),
    }
});
