//! Node configuration loader
//!
//! A node runs against one network preset. A config file may name the
//! network and override any governance field; fields it leaves out keep the
//! preset value. Runtime settings can be overridden from the environment.

use anyhow::{Context, Result};
use mnbudget_governance::GovernanceConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub const NETWORKS: &[&str] = &["mainnet", "testnet", "regtest"];
pub const LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];

/// Complete node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub governance: GovernanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty`, `compact` or `json`
    pub format: String,
    /// Additional log file, same format as the console
    pub file_output: Option<PathBuf>,
    /// Per-module level directives, e.g. `mnbudget_governance = "debug"`
    pub module_filters: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_output: None,
            module_filters: BTreeMap::new(),
        }
    }
}

/// On-disk layout; every section is optional
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    network: Option<NetworkConfig>,
    governance: Option<toml::Table>,
    logging: Option<LoggingConfig>,
}

impl NodeConfig {
    /// Preset configuration for a network
    pub fn for_network(network: &str) -> Result<Self> {
        if !NETWORKS.contains(&network) {
            anyhow::bail!(
                "Invalid network '{}'. Valid options: {}",
                network,
                NETWORKS.join(", ")
            );
        }
        let governance = GovernanceConfig::for_network(network)?;

        Ok(Self {
            network: NetworkConfig {
                name: network.to_string(),
            },
            governance,
            logging: LoggingConfig::default(),
        })
    }

    /// Load from `path` if given, otherwise use the preset for `network`.
    ///
    /// A network named in the file takes precedence over `network`.
    pub fn load(path: Option<&Path>, network: &str) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration from file");
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                Self::from_toml_str(&contents, network)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => Self::for_network(network)?,
        };

        config.apply_env_overrides();
        config.validate()?;

        info!(
            network = %config.network.name,
            cycle_length = config.governance.cycle_length,
            address_prefix = %config.governance.address_hrp,
            "⚙️ Configuration loaded"
        );

        Ok(config)
    }

    /// Parse a config file, filling unset governance fields from the preset
    pub fn from_toml_str(contents: &str, default_network: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;

        let network = file
            .network
            .map(|n| n.name)
            .unwrap_or_else(|| default_network.to_string());
        let mut config = Self::for_network(&network)?;

        if let Some(overrides) = file.governance {
            let mut merged = toml::Table::try_from(&config.governance)
                .context("Failed to serialize governance preset")?;
            for (key, value) in overrides {
                merged.insert(key, value);
            }
            config.governance = merged
                .try_into()
                .context("Invalid [governance] section")?;
        }

        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        Ok(config)
    }

    /// Apply environment variable overrides for runtime settings.
    ///
    /// Only logging can be overridden; governance parameters are protocol
    /// constants and must come from the preset or the config file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(log_level) = lookup("LOG_LEVEL") {
            info!(old = %self.logging.level, new = %log_level, "Overriding log level from environment");
            self.logging.level = log_level;
        }

        if let Some(log_format) = lookup("LOG_FORMAT") {
            info!(old = %self.logging.format, new = %log_format, "Overriding log format from environment");
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !NETWORKS.contains(&self.network.name.as_str()) {
            anyhow::bail!(
                "Invalid network '{}'. Valid options: {}",
                self.network.name,
                NETWORKS.join(", ")
            );
        }

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Invalid log format '{}'. Valid options: {}",
                self.logging.format,
                LOG_FORMATS.join(", ")
            );
        }

        self.governance
            .validate()
            .context("Invalid governance configuration")?;

        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
