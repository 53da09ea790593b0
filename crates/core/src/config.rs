//! Configuration types shared across crates.

use crate::session::SessionLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum declared payload size in bytes.
    #[serde(default = "default_max_total_size")]
    pub max_total_size: u64,
    /// Maximum number of chunks a session may declare.
    #[serde(default = "default_max_chunk_count")]
    pub max_chunk_count: u32,
    /// Delay before a completed session is reclaimed, in seconds.
    #[serde(default = "default_completed_session_ttl_secs")]
    pub completed_session_ttl_secs: u64,
    /// TTL for abandoned (never completed) sessions, in seconds.
    #[serde(default = "default_abandoned_session_ttl_secs")]
    pub abandoned_session_ttl_secs: u64,
    /// Interval between expiry sweeps, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_total_size() -> u64 {
    crate::DEFAULT_MAX_TOTAL_SIZE
}

fn default_max_chunk_count() -> u32 {
    crate::DEFAULT_MAX_CHUNK_COUNT
}

fn default_completed_session_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_abandoned_session_ttl_secs() -> u64 {
    86_400 // 24 hours
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_total_size: default_max_total_size(),
            max_chunk_count: default_max_chunk_count(),
            completed_session_ttl_secs: default_completed_session_ttl_secs(),
            abandoned_session_ttl_secs: default_abandoned_session_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl ServerConfig {
    /// Session dimension limits derived from this configuration.
    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            max_total_size: self.max_total_size,
            max_chunk_count: self.max_chunk_count,
        }
    }

    /// Completed-session reclamation delay as a Duration.
    pub fn completed_session_ttl(&self) -> Duration {
        saturating_seconds(self.completed_session_ttl_secs)
    }

    /// Abandoned-session TTL as a Duration.
    pub fn abandoned_session_ttl(&self) -> Duration {
        saturating_seconds(self.abandoned_session_ttl_secs)
    }
}

/// Saturate at i64::MAX to prevent overflow wrapping to negative.
fn saturating_seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}

/// Session store backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionStoreConfig {
    /// In-memory store. Sessions do not survive a restart.
    Memory,
    /// Durable SQLite-backed store.
    Sqlite {
        /// Path to the database file.
        path: PathBuf,
    },
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/sessions.db"),
        }
    }
}

/// Asset store backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AssetStoreConfig {
    /// Local filesystem asset store.
    Filesystem {
        /// Root directory for stored assets.
        path: PathBuf,
    },
}

impl Default for AssetStoreConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/assets"),
        }
    }
}

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Session store backend.
    #[serde(default)]
    pub sessions: SessionStoreConfig,
    /// Asset store backend.
    #[serde(default)]
    pub assets: AssetStoreConfig,
}

impl AppConfig {
    /// Create a test configuration with an in-memory session store.
    ///
    /// **For testing only.** The asset path points under the current
    /// directory; tests normally build their stores directly instead.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            sessions: SessionStoreConfig::Memory,
            assets: AssetStoreConfig::Filesystem {
                path: PathBuf::from("./data/test-assets"),
            },
        }
    }
}
