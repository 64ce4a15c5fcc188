use std::env;
use std::time::Duration;

use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::{BusError, BusResult};

const FIXED_POOL_SIZE: &str = "LINKBUS_FIXED_POOL_SIZE";
const THREADED_MANAGEMENT: &str = "LINKBUS_THREADED_MANAGEMENT";

/// Construction-time settings for an [`EventBus`](crate::EventBus).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Worker count of the fixed pool. Must be at least 1.
    pub fixed_pool_size: usize,
    /// When true, async submissions go through a per-pipeline ordering
    /// queue drained by a dedicated processor thread instead of straight
    /// to the pool.
    pub threaded_management: bool,
    /// How long shutdown and cull wait for in-flight async work before
    /// abandoning it.
    pub shutdown_grace: Duration,
    /// How long a cached-pool worker sits idle before it retires.
    pub cached_idle_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            fixed_pool_size: 4,
            threaded_management: false,
            shutdown_grace: Duration::from_secs(5),
            cached_idle_timeout: Duration::from_secs(60),
        }
    }
}

impl BusConfig {
    pub fn from_env() -> BusConfig {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(err) => panic!("{}", err),
        }
    }

    /// Loads overrides for the pool size and management mode from the
    /// environment (reading a `.env` file first if present); unset
    /// variables keep their defaults.
    pub fn try_from_env() -> BusResult<BusConfig> {
        dotenv().ok();

        let mut config = BusConfig::default();

        if let Ok(raw) = env::var(FIXED_POOL_SIZE) {
            let size = raw.trim().parse::<usize>().map_err(|_| {
                BusError::Config(format!("failed to parse {}: {}", FIXED_POOL_SIZE, raw))
            })?;
            if size == 0 {
                return Err(BusError::Config(format!(
                    "{} must be at least 1",
                    FIXED_POOL_SIZE
                )));
            }
            config.fixed_pool_size = size;
        }

        if let Ok(raw) = env::var(THREADED_MANAGEMENT) {
            config.threaded_management = raw.trim().parse::<bool>().map_err(|_| {
                BusError::Config(format!("failed to parse {}: {}", THREADED_MANAGEMENT, raw))
            })?;
        }

        info!(
            fixed_pool_size = config.fixed_pool_size,
            threaded_management = config.threaded_management,
            "loaded bus configuration from environment"
        );
        Ok(config)
    }
}
