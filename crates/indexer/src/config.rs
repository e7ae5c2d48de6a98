//! Configuration loading.
//!
//! A single JSON file describes the node endpoint, the store connection, the
//! protocol contract addresses and the per-task scan parameters. Environment
//! overrides are applied after the file load, in a documented order, so
//! deployments can inject connection strings without rewriting the file.

use crate::errors::ConfigError;
use alloy_primitives::{Address, B256};
use serde::Deserialize;
use std::{collections::HashMap, path::Path};

/// Environment variable replacing the whole configuration JSON.
pub const ENV_APP_CONFIG: &str = "APP_CONFIG";
/// Environment override for the store connection string.
pub const ENV_APP_MONGO_URI: &str = "APP_MONGO_URI";
/// Environment override for the store database name.
pub const ENV_APP_MONGO_DB: &str = "APP_MONGO_DB";
/// Environment override for the node endpoint.
pub const ENV_APP_CONNECTION_URI: &str = "APP_CONNECTION_URI";

/// Task name of the raw transaction walker.
pub const TASK_SCAN_RAW_TRANSACTIONS: &str = "scan_raw_transactions";
/// Task name of the log dispatcher.
pub const TASK_SCAN_LOGS: &str = "scan_logs";
/// Task name of the status scanner.
pub const TASK_SCAN_TX_STATUS: &str = "scan_tx_status";
/// Task name of the confirming rescanner.
pub const TASK_SCAN_RAW_TRANSACTIONS_CONFIRMING: &str = "scan_raw_transactions_confirming";

/// Top-level indexer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Node RPC endpoint; a single URI or a list (the first entry is used,
    /// the rest are reserved for failover).
    pub uri: NodeUri,
    /// Store connection.
    pub mongo: MongoConfig,
    /// Selector for the deployed ABI variant family.
    pub app_project: String,
    /// Protocol contract addresses.
    pub addresses: AddressesConfig,
    /// Legacy collateral variant selector.
    #[serde(default)]
    pub collateral: Option<String>,
    /// Raw transaction walker parameters.
    pub scan_raw_transactions: ScanBlocksConfig,
    /// Confirming rescanner parameters.
    pub scan_raw_transactions_confirming: ScanConfirmingConfig,
    /// Log dispatcher parameters.
    pub scan_logs: ScanLogsConfig,
    /// Status scanner parameters.
    pub scan_tx_status: ScanStatusConfig,
    /// Enabled tasks; a task runs iff its name is present here.
    pub tasks: HashMap<String, TaskConfig>,
    /// OMOC governance wiring. Required when `addresses.IRegistry` is set.
    #[serde(default)]
    pub omoc: Option<OmocConfig>,
    /// Verbose per-block progress logging.
    #[serde(default)]
    pub debug: bool,
}

impl Config {
    /// Parses a configuration from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration file and applies process environment
    /// overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    /// Loads the configuration file and applies overrides from the given
    /// environment lookup. `APP_CONFIG` replaces the file contents entirely;
    /// the remaining overrides patch individual connection fields.
    pub fn load_with_env(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let json = match env(ENV_APP_CONFIG) {
            Some(inline) => inline,
            None => std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?,
        };
        let mut config = Self::from_json(&json)?;
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    /// Applies the single-field environment overrides.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(uri) = env(ENV_APP_MONGO_URI) {
            self.mongo.uri = uri;
        }
        if let Some(db) = env(ENV_APP_MONGO_DB) {
            self.mongo.db = db;
        }
        if let Some(uri) = env(ENV_APP_CONNECTION_URI) {
            self.uri = NodeUri::Single(uri);
        }
    }

    /// The node endpoint actually used.
    pub fn node_uri(&self) -> Result<&str, ConfigError> {
        match &self.uri {
            NodeUri::Single(uri) => Ok(uri),
            NodeUri::List(uris) => uris
                .first()
                .map(String::as_str)
                .ok_or_else(|| ConfigError::Invalid("`uri` list is empty".to_string())),
        }
    }

    /// Whether a task is enabled, and with which schedule.
    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.get(name)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.node_uri()?;
        if self.mongo.uri.is_empty() || self.mongo.db.is_empty() {
            return Err(ConfigError::Invalid("`mongo.uri` and `mongo.db` are required".into()));
        }
        if self.addresses.tp.is_empty() {
            return Err(ConfigError::Invalid("`addresses.TP` must list at least one token".into()));
        }
        if self.addresses.i_registry.is_some() && self.omoc.is_none() {
            return Err(ConfigError::Invalid(
                "`addresses.IRegistry` is set but `omoc.registry_constants` is missing".into(),
            ));
        }
        Ok(())
    }
}

/// A node endpoint: one URI or a failover list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NodeUri {
    /// A single endpoint.
    Single(String),
    /// A list of endpoints; only the first is used.
    List(Vec<String>),
}

/// Store connection parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    /// Connection string.
    pub uri: String,
    /// Database name.
    pub db: String,
}

/// The protocol contract addresses. Key names mirror the deployment
/// artifacts and are load-bearing.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressesConfig {
    /// Multicall aggregator. Unused by the pipeline, kept for parity with
    /// the deployment artifact.
    #[serde(rename = "Multicall2", default)]
    pub multicall2: Option<Address>,
    /// The core protocol contract.
    #[serde(rename = "Moc")]
    pub moc: Address,
    /// The operations queue.
    #[serde(rename = "MocQueue")]
    pub moc_queue: Address,
    /// Collateral token.
    #[serde(rename = "TC")]
    pub tc: Address,
    /// Pegged tokens, indexed by position.
    #[serde(rename = "TP")]
    pub tp: Vec<Address>,
    /// Collateral asset tokens, indexed by position.
    #[serde(rename = "CA", default)]
    pub ca: Vec<Address>,
    /// Optional protocol fee token.
    #[serde(rename = "FeeToken", default)]
    pub fee_token: Option<Address>,
    /// Peg-out bridge.
    #[serde(rename = "FastBtcBridge", default)]
    pub fast_btc_bridge: Option<Address>,
    /// OMOC registry; enables governance contract resolution.
    #[serde(rename = "IRegistry", default)]
    pub i_registry: Option<Address>,
    /// Optional OMOC incentives contract.
    #[serde(rename = "IncentiveV2", default)]
    pub incentive_v2: Option<Address>,
}

/// Raw transaction walker parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanBlocksConfig {
    /// First block ever visited.
    pub from_block: u64,
    /// Hard upper bound; `0` means no bound.
    #[serde(default)]
    pub to_block: u64,
    /// Blocks subtracted from the head before the walker will visit them.
    pub blocks_recession: u64,
    /// Maximum number of blocks visited in one tick.
    pub max_blocks_to_process: u64,
}

/// Confirming rescanner parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfirmingConfig {
    /// First block ever visited.
    pub from_block: u64,
    /// Hard upper bound; `0` means no bound.
    #[serde(default)]
    pub to_block: u64,
    /// Blocks subtracted from the head before the rescanner will visit them.
    pub blocks_recession: u64,
    /// Additional lag so only settled blocks are re-scanned.
    pub confirm_blocks: u64,
    /// Maximum number of blocks visited in one tick.
    pub max_blocks_to_process: u64,
}

/// Log dispatcher parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanLogsConfig {
    /// Depth at which a block is considered final.
    pub confirm_blocks: u64,
}

/// Status scanner parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanStatusConfig {
    /// Depth at which a block is considered final.
    pub confirm_blocks: u64,
    /// Age after which an operation with no resolvable receipt is stale.
    pub seconds_not_in_chain_error: u64,
}

/// Schedule of a single task.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Seconds between tick starts.
    pub interval: u64,
    /// Seconds before a running tick is cancelled.
    #[serde(default = "default_task_timeout")]
    pub timeout: u64,
}

const fn default_task_timeout() -> u64 {
    180
}

/// OMOC governance wiring.
#[derive(Debug, Clone, Deserialize)]
pub struct OmocConfig {
    /// Symbolic name → `bytes32` key used with `IRegistry.getAddress`.
    pub registry_constants: HashMap<String, B256>,
}

/// Registry constant naming the delay machine contract.
pub const REGISTRY_MOC_DELAY_MACHINE: &str = "MOC_DELAY_MACHINE";
/// Registry constant naming the supporters contract.
pub const REGISTRY_SUPPORTERS_ADDR: &str = "SUPPORTERS_ADDR";
/// Registry constant naming the vesting factory contract.
pub const REGISTRY_MOC_VESTING_MACHINE: &str = "MOC_VESTING_MACHINE";
/// Registry constant naming the voting machine contract.
pub const REGISTRY_MOC_VOTING_MACHINE: &str = "MOC_VOTING_MACHINE";

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"{
        "uri": ["https://node.example/rpc", "https://fallback.example/rpc"],
        "mongo": {"uri": "mongodb://localhost:27017", "db": "indexer"},
        "app_project": "flipmoney",
        "addresses": {
            "Multicall2": "0x0b0a8c7c3bcee120faa4f2a9e1fefd0897aafd3d",
            "Moc": "0x0123456789012345678901234567890123456789",
            "MocQueue": "0x1123456789012345678901234567890123456789",
            "TC": "0x2123456789012345678901234567890123456789",
            "TP": ["0x3123456789012345678901234567890123456789"],
            "CA": ["0x4123456789012345678901234567890123456789"],
            "FeeToken": "0x5123456789012345678901234567890123456789",
            "FastBtcBridge": "0x6123456789012345678901234567890123456789"
        },
        "collateral": "bag",
        "scan_raw_transactions": {
            "from_block": 100, "to_block": 0,
            "blocks_recession": 5, "max_blocks_to_process": 10
        },
        "scan_raw_transactions_confirming": {
            "from_block": 100, "to_block": 0,
            "blocks_recession": 5, "confirm_blocks": 10,
            "max_blocks_to_process": 10
        },
        "scan_logs": {"confirm_blocks": 10},
        "scan_tx_status": {"confirm_blocks": 10, "seconds_not_in_chain_error": 7200},
        "tasks": {
            "scan_raw_transactions": {"interval": 20},
            "scan_logs": {"interval": 20},
            "scan_tx_status": {"interval": 60},
            "scan_raw_transactions_confirming": {"interval": 120}
        },
        "debug": true
    }"#;

    #[test]
    fn parses_the_sample() {
        let config = Config::from_json(SAMPLE).unwrap();
        assert_eq!(config.node_uri().unwrap(), "https://node.example/rpc");
        assert_eq!(config.app_project, "flipmoney");
        assert_eq!(config.addresses.tp.len(), 1);
        assert_eq!(config.scan_raw_transactions.blocks_recession, 5);
        assert_eq!(config.task(TASK_SCAN_LOGS).unwrap().interval, 20);
        assert_eq!(config.task(TASK_SCAN_LOGS).unwrap().timeout, 180);
        assert!(config.task("scan_raw_transactions_history").is_none());
        assert!(config.debug);
    }

    #[test]
    fn missing_required_field_is_fatal() {
        let broken = SAMPLE.replace("\"mongo\"", "\"mango\"");
        assert!(Config::from_json(&broken).is_err());
    }

    #[test]
    fn env_overrides_apply_in_order() {
        let mut config = Config::from_json(SAMPLE).unwrap();
        config.apply_env(|name| match name {
            ENV_APP_MONGO_URI => Some("mongodb://db.example:27017".to_string()),
            ENV_APP_MONGO_DB => Some("indexer_prod".to_string()),
            ENV_APP_CONNECTION_URI => Some("https://other.example/rpc".to_string()),
            _ => None,
        });
        assert_eq!(config.mongo.uri, "mongodb://db.example:27017");
        assert_eq!(config.mongo.db, "indexer_prod");
        assert_eq!(config.node_uri().unwrap(), "https://other.example/rpc");
    }

    #[test]
    fn single_uri_form_is_accepted() {
        let single = SAMPLE.replace(
            "[\"https://node.example/rpc\", \"https://fallback.example/rpc\"]",
            "\"https://node.example/rpc\"",
        );
        let config = Config::from_json(&single).unwrap();
        assert_eq!(config.node_uri().unwrap(), "https://node.example/rpc");
    }

    #[test]
    fn iregistry_without_omoc_constants_is_rejected() {
        let with_registry = SAMPLE.replace(
            "\"FastBtcBridge\": \"0x6123456789012345678901234567890123456789\"",
            "\"FastBtcBridge\": \"0x6123456789012345678901234567890123456789\",
             \"IRegistry\": \"0x7123456789012345678901234567890123456789\"",
        );
        assert!(Config::from_json(&with_registry).is_err());
    }
}
