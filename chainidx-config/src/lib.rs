//! Layered configuration for the explorer daemon: built-in defaults, then an
//! optional TOML file, then `EXPLORER__`-prefixed environment variables,
//! then CLI flags applied last by the caller.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreConfig {
    pub redis_addr: String,
    pub redis_db: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    pub chain_name: String,
    pub network: chainidx_core::Network,
    pub persistent_directory: PathBuf,
    pub datastore: DatastoreConfig,
    /// Accepted for CLI/schema compatibility; serving RPC is out of scope.
    pub rpc_addr: String,
    pub log: LogConfig,
}

impl ExplorerConfig {
    /// Loads defaults, then `path` if it exists, then `EXPLORER__`-prefixed
    /// environment variables, in that order of increasing precedence.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("chain_name", "examplecoin")?
            .set_default("network", "standard")?
            .set_default(
                "persistent_directory",
                default_persistent_directory().to_string_lossy().into_owned(),
            )?
            .set_default("datastore.redis_addr", "127.0.0.1:6379")?
            .set_default("datastore.redis_db", 0)?
            .set_default("rpc_addr", "127.0.0.1:8080")?
            .set_default("log.level", "info")?
            .set_default("log.format", "pretty")?;

        if let Some(path) = path {
            if path.exists() {
                builder = builder.add_source(config::File::from(path));
            }
        }
        builder = builder.add_source(config::Environment::with_prefix("EXPLORER").separator("__"));

        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn example() -> Self {
        Self {
            chain_name: "examplecoin".into(),
            network: chainidx_core::Network::Standard,
            persistent_directory: default_persistent_directory(),
            datastore: DatastoreConfig {
                redis_addr: "127.0.0.1:6379".into(),
                redis_db: 0,
            },
            rpc_addr: "127.0.0.1:8080".into(),
            log: LogConfig {
                level: "info".into(),
                format: LogFormat::Pretty,
            },
        }
    }

    pub fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(network) = overrides.network {
            self.network = network;
        }
        if let Some(dir) = overrides.persistent_directory {
            self.persistent_directory = dir;
        }
        if let Some(addr) = overrides.redis_addr {
            self.datastore.redis_addr = addr;
        }
        if let Some(db) = overrides.redis_db {
            self.datastore.redis_db = db;
        }
        if let Some(addr) = overrides.rpc_addr {
            self.rpc_addr = addr;
        }
    }
}

/// CLI-supplied overrides, the highest-precedence configuration layer.
/// Clap-free so this crate doesn't need to depend on the CLI parser.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub network: Option<chainidx_core::Network>,
    pub persistent_directory: Option<PathBuf>,
    pub redis_addr: Option<String>,
    pub redis_db: Option<i64>,
    pub rpc_addr: Option<String>,
}

fn default_persistent_directory() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("chainidx")
}
