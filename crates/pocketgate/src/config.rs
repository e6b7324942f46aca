//! Server configuration.
//!
//! Loaded from JSON, with every field optional:
//!
//! ```json
//! {
//!   "encryption_enabled": true,
//!   "max_concurrent_logins": 32,
//!   "idle_timeout_secs": 30,
//!   "default_level": "world"
//! }
//! ```
//!
//! Omitted fields take the values from [`ServerConfig::default`], which
//! trusts the Mojang identity root.

use std::fs;
use std::path::Path;
use std::time::Duration;

use pocketgate_protocol::BatchLimits;
use pocketgate_protocol::compression::{DEFAULT_LEVEL, DEFAULT_MAX_DECOMPRESSED};
use pocketgate_session::auth::MOJANG_ROOT_KEY;
use pocketgate_session::pool::DEFAULT_MAX_CONCURRENT_LOGINS;
use pocketgate_session::{DEFAULT_UNTRUSTED_IDENTITY_MESSAGE, SessionConfig, TrustRoot};
use serde::{Deserialize, Serialize};

use crate::PocketgateError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Root of the login certificate chain, base64 SPKI DER (secp384r1).
    pub trust_root_key: String,
    pub encryption_enabled: bool,
    /// Logins verified at once; more are refused as busy.
    pub max_concurrent_logins: usize,
    /// A connection that sends nothing for this long is dropped.
    pub idle_timeout_secs: u64,
    /// zlib level for outbound batches, 0-9.
    pub compression_level: u32,
    pub max_decompressed_size: usize,
    pub max_batch_packets: usize,
    /// Level every player spawns in.
    pub default_level: String,
    pub untrusted_identity_message: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            trust_root_key: MOJANG_ROOT_KEY.to_string(),
            encryption_enabled: true,
            max_concurrent_logins: DEFAULT_MAX_CONCURRENT_LOGINS,
            idle_timeout_secs: 30,
            compression_level: DEFAULT_LEVEL,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED,
            max_batch_packets: BatchLimits::default().max_packets,
            default_level: "world".to_string(),
            untrusted_identity_message: DEFAULT_UNTRUSTED_IDENTITY_MESSAGE.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_json(json: &str) -> Result<Self, PocketgateError> {
        serde_json::from_str(json).map_err(|e| PocketgateError::Config(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PocketgateError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Lists everything wrong with this config. Empty means usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.trust_root_key.trim().is_empty() {
            problems.push("trust_root_key must not be empty".to_string());
        }
        if self.max_concurrent_logins == 0 {
            problems.push("max_concurrent_logins must be at least 1".to_string());
        }
        if self.idle_timeout_secs == 0 {
            problems.push("idle_timeout_secs must be positive".to_string());
        }
        if self.compression_level > 9 {
            problems.push(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            ));
        }
        if self.max_decompressed_size == 0 {
            problems.push("max_decompressed_size must be positive".to_string());
        }
        if self.max_batch_packets == 0 {
            problems.push("max_batch_packets must be at least 1".to_string());
        }
        if self.default_level.is_empty() {
            problems.push("default_level must not be empty".to_string());
        }
        problems
    }

    /// Like [`validate`](Self::validate), but fails on the first report.
    pub fn validate_strict(&self) -> Result<(), PocketgateError> {
        let problems = self.validate();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(PocketgateError::Config(problems.join("; ")))
        }
    }

    /// Parses [`trust_root_key`](Self::trust_root_key).
    pub fn trust_root(&self) -> Result<TrustRoot, PocketgateError> {
        TrustRoot::from_base64(self.trust_root_key.trim())
            .map_err(|e| PocketgateError::Config(format!("trust_root_key: {e}")))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// The part of this config each session needs.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            encryption: self.encryption_enabled.into(),
            compression_level: self.compression_level,
            batch_limits: BatchLimits {
                max_decompressed: self.max_decompressed_size,
                max_packets: self.max_batch_packets,
            },
            untrusted_identity_message: self.untrusted_identity_message.clone(),
            ..SessionConfig::default()
        }
    }
}
