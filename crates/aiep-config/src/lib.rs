//! Configuration module for the AIEP delegated-authorization SDK.
//!
//! This module provides structures and utilities for loading SDK
//! configuration from TOML files. Values may reference environment
//! variables with `${VAR_NAME}` (and `${VAR_NAME:-default}`), which keeps
//! private keys out of checked-in files.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use aiep_types::SecretString;
use alloy_primitives::Address;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message without the full input dump.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the SDK.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Signing key configuration.
	pub signer: SignerConfig,
	/// RPC endpoint configuration.
	pub network: NetworkConfig,
	/// Agent identity configuration.
	pub agent: AgentConfig,
	/// HTTP relayer backend, absent when unused.
	pub relayer: Option<RelayerConfig>,
	/// Account-abstraction bundler backend, absent when unused.
	pub bundler: Option<BundlerConfig>,
	/// Retry and confirmation-wait parameters.
	#[serde(default)]
	pub retry: RetryConfig,
}

/// Signing key configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SignerConfig {
	/// The agent signing key as 0x-prefixed hex; redacted in debug output.
	pub private_key: SecretString,
}

/// RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
	/// HTTP JSON-RPC endpoint URL.
	pub rpc_url: String,
	/// Expected chain id; when set, implementations verify it against the
	/// endpoint at startup.
	pub chain_id: Option<u64>,
}

/// Agent identity configuration.
///
/// Exactly one of `contract` and `factory` drives the flow: a deployed
/// identity signs against its contract, a counterfactual identity signs
/// against the address the factory will deploy to.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
	/// Deployed identity contract address.
	pub contract: Option<Address>,
	/// Factory address for counterfactual identities.
	pub factory: Option<Address>,
	/// Agent id for registry contracts.
	pub agent_id: Option<u64>,
	/// Metadata URI used in counterfactual deployment.
	pub metadata_uri: Option<String>,
}

/// HTTP relayer backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayerConfig {
	/// Base URL of the relayer service.
	pub url: String,
}

/// Account-abstraction bundler backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BundlerConfig {
	/// Bundler JSON-RPC endpoint URL.
	pub url: String,
	/// Entry point contract the bundler executes against.
	pub entry_point: Address,
}

/// Retry and confirmation-wait parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
	/// Retries after the initial submission attempt.
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	/// Backoff before the first retry, in milliseconds.
	#[serde(default = "default_initial_backoff_ms")]
	pub initial_backoff_ms: u64,
	/// Receipt wait before returning a pending result, in seconds.
	#[serde(default = "default_confirmation_timeout_secs")]
	pub confirmation_timeout_secs: u64,
	/// Sleep between receipt polls, in milliseconds.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: default_max_retries(),
			initial_backoff_ms: default_initial_backoff_ms(),
			confirmation_timeout_secs: default_confirmation_timeout_secs(),
			poll_interval_ms: default_poll_interval_ms(),
		}
	}
}

fn default_max_retries() -> u32 {
	3
}

fn default_initial_backoff_ms() -> u64 {
	500
}

fn default_confirmation_timeout_secs() -> u64 {
	60
}

fn default_poll_interval_ms() -> u64 {
	2000
}

/// Resolves `${VAR_NAME}` references in the input with environment
/// variable values. Supports default values with `${VAR_NAME:-default}`.
fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = match cap.get(0) {
			Some(m) => m,
			None => continue,
		};
		let var_name = match cap.get(1) {
			Some(m) => m.as_str(),
			None => continue,
		};
		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)))
				}
			},
		};
		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions.
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a TOML file with environment variable
	/// resolution and validation.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path)?;
		Self::from_toml_str(&raw)
	}

	/// Parses configuration from a TOML string.
	pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
		let resolved = resolve_env_vars(raw)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates the configuration.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.signer.private_key.is_empty() {
			return Err(ConfigError::Validation(
				"Signer private_key cannot be empty".into(),
			));
		}
		if self.network.rpc_url.is_empty() {
			return Err(ConfigError::Validation(
				"Network rpc_url cannot be empty".into(),
			));
		}
		if self.agent.contract.is_none() && self.agent.factory.is_none() {
			return Err(ConfigError::Validation(
				"Agent must set either contract or factory".into(),
			));
		}
		if self.agent.contract.is_some() && self.agent.factory.is_some() {
			return Err(ConfigError::Validation(
				"Agent cannot set both contract and factory".into(),
			));
		}
		if self.agent.factory.is_some() && self.agent.metadata_uri.is_none() {
			return Err(ConfigError::Validation(
				"Counterfactual agents require metadata_uri".into(),
			));
		}
		if let Some(relayer) = &self.relayer {
			if relayer.url.is_empty() {
				return Err(ConfigError::Validation(
					"Relayer url cannot be empty".into(),
				));
			}
		}
		if let Some(bundler) = &self.bundler {
			if bundler.url.is_empty() {
				return Err(ConfigError::Validation(
					"Bundler url cannot be empty".into(),
				));
			}
		}
		if self.retry.poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"Retry poll_interval_ms must be greater than 0".into(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const BASE_CONFIG: &str = r#"
[signer]
private_key = "0x1111111111111111111111111111111111111111111111111111111111111111"

[network]
rpc_url = "http://localhost:8545"
chain_id = 31337

[agent]
contract = "0x1111111111111111111111111111111111111111"
"#;

	#[test]
	fn test_parse_minimal_config() {
		let config = Config::from_toml_str(BASE_CONFIG).unwrap();
		assert_eq!(config.network.chain_id, Some(31337));
		assert!(config.relayer.is_none());
		assert_eq!(config.retry.max_retries, 3);
		assert_eq!(config.retry.initial_backoff_ms, 500);
	}

	#[test]
	fn test_from_file_round_trip() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(BASE_CONFIG.as_bytes()).unwrap();
		let config = Config::from_file(file.path()).unwrap();
		assert_eq!(config.network.rpc_url, "http://localhost:8545");
	}

	#[test]
	fn test_env_var_resolution_with_default() {
		let raw = BASE_CONFIG.replace(
			"http://localhost:8545",
			"${AIEP_TEST_MISSING_RPC:-http://fallback:8545}",
		);
		let config = Config::from_toml_str(&raw).unwrap();
		assert_eq!(config.network.rpc_url, "http://fallback:8545");
	}

	#[test]
	fn test_missing_env_var_fails() {
		let raw = BASE_CONFIG.replace("http://localhost:8545", "${AIEP_TEST_MISSING_RPC}");
		let err = Config::from_toml_str(&raw).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_rejects_agent_without_contract_or_factory() {
		let raw = BASE_CONFIG.replace(
			"contract = \"0x1111111111111111111111111111111111111111\"",
			"agent_id = 1",
		);
		let err = Config::from_toml_str(&raw).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_counterfactual_agent_requires_metadata_uri() {
		let raw = BASE_CONFIG.replace(
			"contract = \"0x1111111111111111111111111111111111111111\"",
			"factory = \"0x2222222222222222222222222222222222222222\"",
		);
		let err = Config::from_toml_str(&raw).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));

		let with_uri = format!("{}\nmetadata_uri = \"ipfs://agent\"\n", raw);
		Config::from_toml_str(&with_uri).unwrap();
	}

	#[test]
	fn test_retry_section_overrides_defaults() {
		let raw = format!(
			"{}\n[retry]\nmax_retries = 5\npoll_interval_ms = 100\n",
			BASE_CONFIG
		);
		let config = Config::from_toml_str(&raw).unwrap();
		assert_eq!(config.retry.max_retries, 5);
		assert_eq!(config.retry.poll_interval_ms, 100);
		assert_eq!(config.retry.confirmation_timeout_secs, 60);
	}
}
