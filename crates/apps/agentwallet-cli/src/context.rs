//! Operator context for CLI commands.

use std::sync::Arc;

use agentwallet_chain::{ChainGateway, RpcGateway};
use agentwallet_crypto::KeyVault;
use agentwallet_ops::Platform;
use agentwallet_store::{SqliteStore, Store};
use tracing::info;

use crate::config::CliConfig;
use crate::error::CliResult;

/// Chain access for read-only commands.
pub fn chain_gateway(config: &CliConfig) -> CliResult<Arc<dyn ChainGateway>> {
    Ok(Arc::new(RpcGateway::new(config.chain.clone())?))
}

/// Everything the long-running commands need: the SQLite store, the RPC
/// gateway and the assembled services.
pub struct OperatorContext {
    pub config: CliConfig,
    pub store: Arc<dyn Store>,
    pub chain: Arc<dyn ChainGateway>,
    pub platform: Platform,
}

impl OperatorContext {
    /// Open the database, connect the gateway and unlock the vault.
    pub fn open(config: CliConfig) -> CliResult<Self> {
        let vault = KeyVault::from_base64(config.master_key()?)?;
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&config.storage.database)?);
        let chain = chain_gateway(&config)?;
        let platform = Platform::with_system_clock(
            Arc::clone(&store),
            Arc::clone(&chain),
            vault,
            config.ops.clone(),
        )?;

        info!(
            database = %config.storage.database.display(),
            endpoint = %config.chain.endpoint(),
            "Operator context ready"
        );
        Ok(Self {
            config,
            store,
            chain,
            platform,
        })
    }
}

impl std::fmt::Debug for OperatorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorContext")
            .field("database", &self.config.storage.database)
            .field("platform", &self.platform)
            .finish()
    }
}
