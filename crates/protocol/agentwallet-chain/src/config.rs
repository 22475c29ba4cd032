//! Configuration for the chain gateway.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ChainError, ChainResult};

/// Solana cluster selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SolanaNetwork {
    /// Mainnet beta
    Mainnet,
    /// Devnet (default for development)
    #[default]
    Devnet,
    /// Testnet
    Testnet,
    /// A local validator
    Localnet,
}

impl SolanaNetwork {
    /// Get the network name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
            Self::Localnet => "localnet",
        }
    }

    /// Public RPC endpoint for the cluster.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.mainnet-beta.solana.com",
            Self::Devnet => "https://api.devnet.solana.com",
            Self::Testnet => "https://api.testnet.solana.com",
            Self::Localnet => "http://127.0.0.1:8899",
        }
    }
}

impl std::fmt::Display for SolanaNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for the JSON-RPC gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Cluster, used for the default URL and for logging
    pub network: SolanaNetwork,

    /// RPC endpoint; overrides the network default
    pub url: Option<String>,

    /// Commitment level for reads
    pub commitment: String,

    /// Per-request timeout
    #[serde(with = "millis_serde")]
    pub request_timeout: Duration,

    /// Retry policy for every RPC call
    pub retry: RetryConfig,

    /// Confirmation polling
    pub confirm: ConfirmConfig,
}

impl RpcConfig {
    /// Configuration pointing at `url`.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// The effective endpoint.
    pub fn endpoint(&self) -> &str {
        self.url
            .as_deref()
            .unwrap_or_else(|| self.network.default_rpc_url())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ChainResult<()> {
        let url = self.endpoint();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ChainError::config(format!("RPC url must be http(s): {}", url)));
        }
        if !matches!(self.commitment.as_str(), "processed" | "confirmed" | "finalized") {
            return Err(ChainError::config(format!(
                "unknown commitment level: {}",
                self.commitment
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ChainError::config("retry.max_attempts must be at least 1"));
        }
        if self.confirm.max_polls == 0 {
            return Err(ChainError::config("confirm.max_polls must be at least 1"));
        }
        Ok(())
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            network: SolanaNetwork::Devnet,
            url: None,
            commitment: "confirmed".to_string(),
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            confirm: ConfirmConfig::default(),
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Base delay between retries
    #[serde(with = "millis_serde")]
    pub base_delay: Duration,
    /// Maximum delay between retries
    #[serde(with = "millis_serde")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Confirmation polling configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmConfig {
    /// Number of status polls before giving up
    pub max_polls: u32,
    /// Delay between polls
    #[serde(with = "millis_serde")]
    pub poll_interval: Duration,
}

impl ConfirmConfig {
    pub fn new(max_polls: u32, poll_interval: Duration) -> Self {
        Self {
            max_polls,
            poll_interval,
        }
    }
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            max_polls: 20,
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Serde helper for Duration as integer milliseconds.
pub mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RpcConfig::default();
        assert_eq!(config.endpoint(), "https://api.devnet.solana.com");
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.base_delay, Duration::from_secs(1));
        assert_eq!(config.retry.max_delay, Duration::from_secs(30));
        assert_eq!(config.confirm.max_polls, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_url_override() {
        let config = RpcConfig::with_url("http://localhost:8899");
        assert_eq!(config.endpoint(), "http://localhost:8899");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RpcConfig::with_url("ftp://example.com");
        assert!(config.validate().is_err());

        config = RpcConfig::default();
        config.commitment = "eventual".into();
        assert!(config.validate().is_err());

        config = RpcConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_millis() {
        let json = serde_json::to_value(RetryConfig::default()).unwrap();
        assert_eq!(json["base_delay"], 1000);
        let parsed: RpcConfig =
            serde_json::from_str(r#"{"network": "mainnet", "request_timeout": 5000}"#).unwrap();
        assert_eq!(parsed.network, SolanaNetwork::Mainnet);
        assert_eq!(parsed.request_timeout, Duration::from_secs(5));
        assert_eq!(parsed.commitment, "confirmed");
    }
}
