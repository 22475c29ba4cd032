//! Configuration types for the operations layer.

use std::time::Duration;

use agentwallet_chain::{millis_serde, ConfirmConfig};
use agentwallet_crypto::Pubkey;
use agentwallet_econ::FeeSchedule;
use agentwallet_types::constants::{
    DEFAULT_APPROVAL_EXPIRY_HOURS, DEFAULT_BATCH_CONCURRENCY, DEFAULT_ESCROW_EXPIRY_HOURS,
    DEFAULT_REQUIRED_APPROVALS, MAX_BATCH_SIZE,
};
use serde::{Deserialize, Serialize};

use crate::error::{OpsError, OpsResult};

/// Configuration for wallet operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    /// Receives platform fees and holds escrowed funds. Without it no fee
    /// instruction is added and escrows are funded straight to the recipient.
    pub platform_wallet: Option<Pubkey>,

    /// Platform fee rates per tier.
    pub fees: FeeSchedule,

    /// Maximum concurrently in-flight transfers across all batches.
    pub batch_concurrency: usize,

    /// Confirmation polling used by escrow funding and PDA operations.
    pub confirm: ConfirmConfig,

    /// Default escrow lifetime.
    pub escrow_expiry_hours: i64,

    /// Lifetime of a pending approval request.
    pub approval_expiry_hours: i64,

    /// Approving votes needed to release a held transfer.
    pub required_approvals: u32,

    /// Background worker schedule.
    pub workers: WorkerConfig,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            platform_wallet: None,
            fees: FeeSchedule::default(),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            confirm: ConfirmConfig::default(),
            escrow_expiry_hours: DEFAULT_ESCROW_EXPIRY_HOURS,
            approval_expiry_hours: DEFAULT_APPROVAL_EXPIRY_HOURS,
            required_approvals: DEFAULT_REQUIRED_APPROVALS,
            workers: WorkerConfig::default(),
        }
    }
}

impl OpsConfig {
    /// Set the platform wallet.
    pub fn with_platform_wallet(mut self, address: Pubkey) -> Self {
        self.platform_wallet = Some(address);
        self
    }

    /// Set the confirmation polling.
    pub fn with_confirm(mut self, confirm: ConfirmConfig) -> Self {
        self.confirm = confirm;
        self
    }

    /// Set the batch concurrency bound.
    pub fn with_batch_concurrency(mut self, permits: usize) -> Self {
        self.batch_concurrency = permits;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> OpsResult<()> {
        self.fees.validate()?;
        if self.batch_concurrency == 0 || self.batch_concurrency > MAX_BATCH_SIZE {
            return Err(OpsError::validation(format!(
                "batch_concurrency must be between 1 and {}",
                MAX_BATCH_SIZE
            )));
        }
        if self.confirm.max_polls == 0 {
            return Err(OpsError::validation("confirm.max_polls must be at least 1"));
        }
        if self.escrow_expiry_hours <= 0 || self.approval_expiry_hours <= 0 {
            return Err(OpsError::validation("expiry hours must be positive"));
        }
        if self.required_approvals == 0 {
            return Err(OpsError::validation("required_approvals must be at least 1"));
        }
        self.workers.validate()
    }
}

/// Schedule for the background workers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    #[serde(with = "millis_serde")]
    pub tx_confirmation_interval: Duration,

    /// Submitted transactions checked per confirmation tick.
    pub tx_confirmation_limit: u32,

    /// A submitted transaction still unconfirmed after this long is marked
    /// `timeout`.
    #[serde(with = "millis_serde")]
    pub tx_timeout: Duration,

    #[serde(with = "millis_serde")]
    pub escrow_expiry_interval: Duration,

    #[serde(with = "millis_serde")]
    pub approval_expiry_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tx_confirmation_interval: Duration::from_secs(5),
            tx_confirmation_limit: 50,
            tx_timeout: Duration::from_secs(120),
            escrow_expiry_interval: Duration::from_secs(300),
            approval_expiry_interval: Duration::from_secs(300),
        }
    }
}

impl WorkerConfig {
    fn validate(&self) -> OpsResult<()> {
        if self.tx_confirmation_interval.is_zero()
            || self.escrow_expiry_interval.is_zero()
            || self.approval_expiry_interval.is_zero()
            || self.tx_timeout.is_zero()
        {
            return Err(OpsError::validation("worker intervals must be non-zero"));
        }
        if self.tx_confirmation_limit == 0 {
            return Err(OpsError::validation("tx_confirmation_limit must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OpsConfig::default();
        assert_eq!(config.batch_concurrency, 5);
        assert_eq!(config.escrow_expiry_hours, 24);
        assert_eq!(config.workers.tx_confirmation_interval, Duration::from_secs(5));
        assert_eq!(config.workers.tx_confirmation_limit, 50);
        assert_eq!(config.workers.tx_timeout, Duration::from_secs(120));
        assert!(config.platform_wallet.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(OpsConfig::default().with_batch_concurrency(0).validate().is_err());

        let mut config = OpsConfig::default();
        config.required_approvals = 0;
        assert!(config.validate().is_err());

        let mut config = OpsConfig::default();
        config.workers.escrow_expiry_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = OpsConfig::default();
        config.fees.free_bps = 20_000;
        assert!(matches!(config.validate(), Err(OpsError::Econ(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OpsConfig = serde_json::from_str(
            r#"{"platform_wallet": "11111111111111111111111111111111", "workers": {"escrow_expiry_interval": 60000}}"#,
        )
        .unwrap();
        assert_eq!(config.platform_wallet, Some(Pubkey::default()));
        assert_eq!(config.workers.escrow_expiry_interval, Duration::from_secs(60));
        assert_eq!(config.workers.tx_confirmation_interval, Duration::from_secs(5));
        assert_eq!(config.fees, FeeSchedule::default());
    }
}
