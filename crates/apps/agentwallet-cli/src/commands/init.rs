//! Write the default configuration.

use std::path::Path;

use agentwallet_crypto::KeyVault;

use crate::config::{CliConfig, MASTER_KEY_ENV};
use crate::error::{CliError, CliResult};
use crate::output::{InitOutput, OutputFormat, Render};

/// Execute the init command.
///
/// The config keeps the master key as a `${AGENTWALLET_MASTER_KEY}`
/// reference; the generated key is only printed.
pub fn init(config: CliConfig, format: OutputFormat, config_path: &Path, force: bool) -> CliResult<String> {
    if config_path.exists() && !force {
        return Err(CliError::ConfigExists(config_path.to_path_buf()));
    }

    config.save(config_path)?;

    let output = InitOutput {
        config_path: config_path.to_string_lossy().to_string(),
        database: config.storage.database.to_string_lossy().to_string(),
        master_key: KeyVault::generate_master_key(),
        master_key_env: MASTER_KEY_ENV.to_string(),
    };

    Ok(output.render(format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> CliConfig {
        let mut config = CliConfig::default();
        config.storage.database = temp_dir.path().join("agentwallet.db");
        config
    }

    #[test]
    fn test_init_writes_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let output = init(test_config(&temp_dir), OutputFormat::Human, &path, false).unwrap();
        assert!(output.contains("Configuration saved to"));
        assert!(output.contains(MASTER_KEY_ENV));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("${AGENTWALLET_MASTER_KEY}"));
    }

    #[test]
    fn test_init_prints_usable_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let output = init(test_config(&temp_dir), OutputFormat::Json, &path, false).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        let key = json["master_key"].as_str().unwrap();
        assert!(KeyVault::from_base64(key).is_ok());
    }

    #[test]
    fn test_init_fails_if_exists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        init(test_config(&temp_dir), OutputFormat::Human, &path, false).unwrap();
        let second = init(test_config(&temp_dir), OutputFormat::Human, &path, false);
        assert!(matches!(second, Err(CliError::ConfigExists(_))));

        assert!(init(test_config(&temp_dir), OutputFormat::Human, &path, true).is_ok());
    }
}
