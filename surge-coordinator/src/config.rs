use clap::Parser;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("pool max must be at least 1")]
    ZeroMax,

    #[error("pool min ({min}) exceeds pool max ({max})")]
    MinAboveMax { min: u32, max: u32 },
}

/// Sizing and eviction policy for the connection pool.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub min: u32,
    pub max: u32,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
    /// How long the storage driver may spend opening a connection for a
    /// checkout that already holds a pool slot.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min: 2,
            max: 5,
            max_lifetime: Duration::from_secs(300),
            idle_timeout: Duration::from_secs(60),
            acquire_timeout: Duration::from_secs(1),
        }
    }
}

impl PoolConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.max == 0 {
            Err(ConfigError::ZeroMax)
        } else if self.min > self.max {
            Err(ConfigError::MinAboveMax {
                min: self.min,
                max: self.max,
            })
        } else {
            Ok(self)
        }
    }
}

#[derive(Clone, Debug)]
pub struct DownstreamConfig {
    pub base_url: String,
    /// Must stay below the caller's own per-request timeout.
    pub timeout: Duration,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8082".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Transaction coordinator")]
pub struct CoordinatorCli {
    #[arg(short, long, env = "PORT", default_value_t = 8081)]
    pub port: u16,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://surge.db?mode=rwc")]
    pub database_url: String,

    #[arg(long, env = "DOWNSTREAM_URL", default_value = "http://127.0.0.1:8082")]
    pub downstream_url: String,

    #[arg(long, env = "DOWNSTREAM_TIMEOUT", value_parser = humantime::parse_duration, default_value = "5s")]
    pub downstream_timeout: Duration,

    #[arg(long, env = "POOL_MIN_CONNECTIONS", default_value_t = 2)]
    pub pool_min: u32,

    #[arg(long, env = "POOL_MAX_CONNECTIONS", default_value_t = 5)]
    pub pool_max: u32,

    #[arg(long, env = "POOL_MAX_LIFETIME", value_parser = humantime::parse_duration, default_value = "5m")]
    pub pool_max_lifetime: Duration,

    #[arg(long, env = "POOL_IDLE_TIMEOUT", value_parser = humantime::parse_duration, default_value = "1m")]
    pub pool_idle_timeout: Duration,

    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

impl CoordinatorCli {
    pub fn pool_config(&self) -> Result<PoolConfig, ConfigError> {
        PoolConfig {
            min: self.pool_min,
            max: self.pool_max,
            max_lifetime: self.pool_max_lifetime,
            idle_timeout: self.pool_idle_timeout,
            ..PoolConfig::default()
        }
        .validate()
    }

    pub fn downstream_config(&self) -> DownstreamConfig {
        DownstreamConfig {
            base_url: self.downstream_url.clone(),
            timeout: self.downstream_timeout,
        }
    }
}
