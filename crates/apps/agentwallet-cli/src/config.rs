//! CLI configuration.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use agentwallet_chain::RpcConfig;
use agentwallet_ops::OpsConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Environment variable holding the base64 vault master key.
pub const MASTER_KEY_ENV: &str = "AGENTWALLET_MASTER_KEY";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "AGENTWALLET_DATA_DIR";

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var pattern"))
}

/// Expand environment variables in a string.
/// Supports `${VAR_NAME}` syntax; unset variables are left as written.
fn expand_env_vars(input: &str) -> String {
    env_var_pattern()
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
}

/// CLI configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Key vault configuration.
    pub vault: VaultConfig,
    /// Solana RPC configuration.
    pub chain: RpcConfig,
    /// Wallet operation and worker configuration.
    pub ops: OpsConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::new(&default_base_dir()),
            vault: VaultConfig::default(),
            chain: RpcConfig::default(),
            ops: OpsConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist. `${VAR}` references in the master key and RPC
    /// URL are expanded.
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;

        config.vault.master_key = expand_env_vars(&config.vault.master_key);
        if let Some(url) = config.chain.url.as_mut() {
            *url = expand_env_vars(url);
        }

        config
            .ops
            .validate()
            .map_err(|e| CliError::config(format!("invalid [ops] section: {}", e)))?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> CliResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// The master key, or an error naming where to set it.
    pub fn master_key(&self) -> CliResult<&str> {
        let key = self.vault.master_key.trim();
        if key.is_empty() || env_var_pattern().is_match(key) {
            return Err(CliError::config(format!(
                "vault master key is not set. Export {} or set vault.master_key",
                MASTER_KEY_ENV
            )));
        }
        Ok(key)
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database.
    pub database: PathBuf,
}

impl StorageConfig {
    fn new(base_dir: &Path) -> Self {
        Self {
            database: base_dir.join("agentwallet.db"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(&default_base_dir())
    }
}

/// Key vault configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Base64 AES-256 master key. Keep it out of the file by leaving the
    /// default `${AGENTWALLET_MASTER_KEY}` reference.
    pub master_key: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            master_key: format!("${{{}}}", MASTER_KEY_ENV),
        }
    }
}

/// Get the default base directory for agentwallet data.
///
/// `AGENTWALLET_DATA_DIR` wins; otherwise the platform data directory.
pub fn default_base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    directories::ProjectDirs::from("io", "agentwallet", "agentwallet")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".agentwallet")
        })
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    default_base_dir().join("config.toml")
}
