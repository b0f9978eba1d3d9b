use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub ledger: LedgerSettings,
    pub stake: StakeConfig,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    pub data_dir: PathBuf,
    /// "memory" or "rocksdb"
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeConfig {
    /// Polling attempts while waiting for a stake transfer to confirm.
    pub confirm_attempts: u32,
    pub confirm_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// WATT credited to the bounty pool on startup in standalone mode,
    /// so demo settlements have funds to pay out of.
    pub pool_float_watt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerSettings {
                data_dir: PathBuf::from("./data"),
                backend: "memory".to_string(),
            },
            stake: StakeConfig {
                confirm_attempts: 5,
                confirm_interval_ms: 200,
            },
            gateway: GatewayConfig {
                pool_float_watt: 10_000_000.0,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl LedgerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Environment variable overrides, applied after file load and before
    /// CLI flags.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(data_dir) = env::var("WATT_DATA_DIR") {
            self.ledger.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(backend) = env::var("WATT_BACKEND") {
            if !backend.is_empty() {
                self.ledger.backend = backend;
            }
        }
        if let Ok(attempts) = env::var("WATT_CONFIRM_ATTEMPTS") {
            if let Ok(val) = attempts.parse() {
                self.stake.confirm_attempts = val;
            }
        }
        if let Ok(interval) = env::var("WATT_CONFIRM_INTERVAL_MS") {
            if let Ok(val) = interval.parse() {
                self.stake.confirm_interval_ms = val;
            }
        }
        if let Ok(level) = env::var("WATT_LOG") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }
}
