//! Configuration module for the storefront client.
//!
//! This module provides structures and utilities for managing client
//! configuration. It loads TOML files, resolves `${VAR}` references against
//! the environment and validates that every section names implementations
//! that are actually configured.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` in the main file to include other config files
//! - The top-level sections are `client`, `storage`, `transport`, `envelope` and `orders`;
//!   each may be defined in only one file and anything else is rejected

#[cfg(feature = "testing")]
pub mod builders {
	pub mod config;
}
mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[cfg(feature = "testing")]
pub use builders::config::ConfigBuilder;

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
	/// A file defines a top-level section the client does not know.
	#[error("Unknown section '{section}' in {}", .file.display())]
	UnknownSection { section: String, file: PathBuf },
	/// Two files define the same top-level section.
	#[error("Duplicate section '{section}' found in {} and {}", .first.display(), .second.display())]
	DuplicateSection {
		section: String,
		first: PathBuf,
		second: PathBuf,
	},
	/// A file is reached twice while following includes.
	#[error("Configuration file {} is included more than once", .0.display())]
	RepeatedInclude(PathBuf),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the storefront client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this client instance.
	pub client: ClientConfig,
	/// Client-side key-value store holding the session.
	pub storage: StorageConfig,
	/// Outbound HTTP transport.
	pub transport: TransportConfig,
	/// Body encryption for authentication requests and responses.
	pub envelope: Option<EnvelopeConfig>,
	/// Order rules.
	#[serde(default)]
	pub orders: OrdersConfig,
}

/// Identity of this client instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
	/// Identifier used in logs.
	pub id: String,
}

/// Configuration for the client store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the outbound HTTP transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of transport implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for body encryption.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnvelopeConfig {
	/// Which cipher implementation to use.
	pub primary: String,
	/// Map of cipher implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Whether sign-in and sign-up bodies are encrypted before sending.
	#[serde(default = "default_encrypt_auth_requests")]
	pub encrypt_auth_requests: bool,
}

fn default_encrypt_auth_requests() -> bool {
	true
}

/// Order rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrdersConfig {
	/// How long after placing an order a customer may still cancel it.
	#[serde(default = "default_cancellation_window_hours")]
	pub cancellation_window_hours: u64,
}

impl Default for OrdersConfig {
	fn default() -> Self {
		Self {
			cancellation_window_hours: default_cancellation_window_hours(),
		}
	}
}

fn default_cancellation_window_hours() -> u64 {
	8
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

/// Checks that `primary` names one of `implementations`.
fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

impl Config {
	/// Loads configuration from a file.
	///
	/// Includes are resolved relative to the directory of `path`.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		loader::load(path.as_ref()).await
	}

	/// Primary storage implementation and its table.
	pub fn primary_storage(&self) -> Option<(&str, &toml::Value)> {
		self.storage
			.implementations
			.get_key_value(&self.storage.primary)
			.map(|(name, value)| (name.as_str(), value))
	}

	/// Primary transport implementation and its table.
	pub fn primary_transport(&self) -> Option<(&str, &toml::Value)> {
		self.transport
			.implementations
			.get_key_value(&self.transport.primary)
			.map(|(name, value)| (name.as_str(), value))
	}

	/// Primary cipher implementation and its table, if encryption is configured.
	pub fn primary_cipher(&self) -> Option<(&str, &toml::Value)> {
		let envelope = self.envelope.as_ref()?;
		envelope
			.implementations
			.get_key_value(&envelope.primary)
			.map(|(name, value)| (name.as_str(), value))
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.client.id.trim().is_empty() {
			return Err(ConfigError::Validation("Client ID cannot be empty".into()));
		}

		validate_primary(
			"storage",
			&self.storage.primary,
			&self.storage.implementations,
		)?;
		validate_primary(
			"transport",
			&self.transport.primary,
			&self.transport.implementations,
		)?;
		if let Some(envelope) = &self.envelope {
			validate_primary("envelope", &envelope.primary, &envelope.implementations)?;
		}

		let window = self.orders.cancellation_window_hours;
		if window == 0 || window > 720 {
			return Err(ConfigError::Validation(format!(
				"orders.cancellation_window_hours must be between 1 and 720, got {}",
				window
			)));
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
