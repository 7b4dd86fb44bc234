use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use alloy::primitives::Address;
use mirror_core::{BlockNumber, IndexerConfig, RetryPolicy};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "indexer.toml";

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub factory: FactoryConfig,
    #[serde(default)]
    pub indexer: IndexerSection,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ChainConfig {
    pub rpc_url: Option<String>,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            chain_id: default_chain_id(),
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct FactoryConfig {
    pub address: Option<Address>,
    #[serde(default)]
    pub start_block: u64,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct IndexerSection {
    #[serde(default = "default_max_block_range")]
    pub max_block_range: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_recent_bids")]
    pub recent_bids: usize,
    #[serde(default = "default_recent_checkpoints")]
    pub recent_checkpoints: usize,
}

impl Default for IndexerSection {
    fn default() -> Self {
        Self {
            max_block_range: default_max_block_range(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            recent_bids: default_recent_bids(),
            recent_checkpoints: default_recent_checkpoints(),
        }
    }
}

fn default_chain_id() -> u64 {
    31337
}

fn default_max_block_range() -> u64 {
    2_000
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_recent_bids() -> usize {
    50
}

fn default_recent_checkpoints() -> usize {
    100
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Overrides {
    pub rpc_url: Option<String>,
    pub factory: Option<Address>,
    pub start_block: Option<u64>,
}

/// Everything the `index` command needs, with overrides applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub rpc_url: String,
    pub chain_id: u64,
    pub indexer: IndexerConfig,
    pub recent_bids: usize,
    pub recent_checkpoints: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse toml at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("missing {0}: set it in the config file or pass it on the command line")]
    Missing(&'static str),
}

pub fn load_config(path: impl AsRef<Path>) -> Result<FileConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: FileConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(config)
}

/// Like [`load_config`], but a missing file at the default path falls back to
/// defaults so a flags-only invocation works.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<FileConfig, ConfigError> {
    let path = path.as_ref();
    if path == Path::new(DEFAULT_CONFIG_PATH) && !path.exists() {
        return Ok(FileConfig::default());
    }
    load_config(path)
}

pub fn resolve(config: FileConfig, overrides: Overrides) -> Result<Settings, ConfigError> {
    let rpc_url = overrides
        .rpc_url
        .or(config.chain.rpc_url)
        .ok_or(ConfigError::Missing("rpc url"))?;
    let factory = overrides
        .factory
        .or(config.factory.address)
        .ok_or(ConfigError::Missing("factory address"))?;
    let start_block = overrides.start_block.unwrap_or(config.factory.start_block);

    Ok(Settings {
        rpc_url,
        chain_id: config.chain.chain_id,
        indexer: IndexerConfig {
            factory,
            start_block: BlockNumber::new(start_block),
            max_block_range: config.indexer.max_block_range,
            retry: RetryPolicy {
                attempts: config.indexer.retry_attempts,
                backoff: Duration::from_millis(config.indexer.retry_backoff_ms),
            },
        },
        recent_bids: config.indexer.recent_bids,
        recent_checkpoints: config.indexer.recent_checkpoints,
    })
}
