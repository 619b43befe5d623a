//! Configuration file management.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tidal_strategy::StrategyParams;
use tidal_types::{parse_address, ChainId, DomainId, PoolKey};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TIDAL_CONFIG";

/// Complete daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Source ledger settings.
    #[serde(default)]
    pub source: SourceConfig,
    /// Destination ledger settings.
    #[serde(default)]
    pub destination: DestinationConfig,
    /// Trigger engine tunables.
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// Pools to replicate.
    #[serde(default = "default_pools")]
    pub pools: Vec<PoolConfig>,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Source ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Transport domain of the source ledger.
    #[serde(default = "default_source_domain")]
    pub domain: DomainId,
    /// Seconds between keeper rounds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
}

/// Destination ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Chain id the source side routes by.
    #[serde(default = "default_chain_id")]
    pub chain_id: ChainId,
    /// Transport domain of the destination ledger.
    #[serde(default = "default_destination_domain")]
    pub domain: DomainId,
    /// Slots allocated for each new sidechain oracle.
    #[serde(default = "default_initial_cardinality")]
    pub initial_cardinality: u16,
}

/// Trigger engine configuration. Mirrors [`StrategyParams`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_cooldown")]
    pub cooldown: u32,
    #[serde(default = "default_period_length")]
    pub period_length: u32,
    #[serde(default = "default_twap_length")]
    pub twap_length: u32,
    #[serde(default = "default_upper_threshold")]
    pub upper_twap_threshold: i32,
    #[serde(default = "default_lower_threshold")]
    pub lower_twap_threshold: i32,
}

/// A pool served by a stub adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// First token, hex.
    pub token_a: String,
    /// Second token, hex.
    pub token_b: String,
    /// Fee tier.
    #[serde(default = "default_fee")]
    pub fee: u32,
    /// Tick the stub pool starts at.
    #[serde(default)]
    pub initial_tick: i32,
    /// Largest random tick move per keeper round. 0 = flat.
    #[serde(default = "default_tick_drift")]
    pub tick_drift: i32,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_source_domain() -> DomainId {
    1
}

fn default_tick_interval() -> u64 {
    15
}

fn default_chain_id() -> ChainId {
    10
}

fn default_destination_domain() -> DomainId {
    2
}

fn default_initial_cardinality() -> u16 {
    64
}

fn default_cooldown() -> u32 {
    3600
}

fn default_period_length() -> u32 {
    300
}

fn default_twap_length() -> u32 {
    1800
}

fn default_upper_threshold() -> i32 {
    50
}

fn default_lower_threshold() -> i32 {
    -50
}

fn default_fee() -> u32 {
    3000
}

fn default_tick_drift() -> i32 {
    25
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_pools() -> Vec<PoolConfig> {
    vec![PoolConfig {
        token_a: "01".repeat(32),
        token_b: "02".repeat(32),
        fee: default_fee(),
        initial_tick: 0,
        tick_drift: default_tick_drift(),
    }]
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            destination: DestinationConfig::default(),
            strategy: StrategyConfig::default(),
            pools: default_pools(),
            advanced: AdvancedConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            domain: default_source_domain(),
            tick_interval_secs: default_tick_interval(),
        }
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            domain: default_destination_domain(),
            initial_cardinality: default_initial_cardinality(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            cooldown: default_cooldown(),
            period_length: default_period_length(),
            twap_length: default_twap_length(),
            upper_twap_threshold: default_upper_threshold(),
            lower_twap_threshold: default_lower_threshold(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl StrategyConfig {
    pub fn params(&self) -> StrategyParams {
        StrategyParams {
            cooldown: self.cooldown,
            period_length: self.period_length,
            twap_length: self.twap_length,
            upper_twap_threshold: self.upper_twap_threshold,
            lower_twap_threshold: self.lower_twap_threshold,
        }
    }
}

impl PoolConfig {
    pub fn key(&self) -> anyhow::Result<PoolKey> {
        Ok(PoolKey::new(
            parse_address(&self.token_a)?,
            parse_address(&self.token_b)?,
            self.fee,
        ))
    }
}

impl DaemonConfig {
    /// Load configuration from `$TIDAL_CONFIG` or `./tidal.toml`.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reject inconsistent strategy parameters and malformed pools.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.strategy.params().validate()?;
        if self.source.tick_interval_secs == 0 {
            anyhow::bail!("source.tick_interval_secs must be positive");
        }
        if self.source.domain == self.destination.domain {
            anyhow::bail!("source and destination domains must differ");
        }
        for pool in &self.pools {
            pool.key()
                .with_context(|| format!("pool {}/{}", pool.token_a, pool.token_b))?;
            if pool.tick_drift < 0 {
                anyhow::bail!("tick_drift must not be negative");
            }
        }
        Ok(())
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("tidal.toml"))
    }
}
