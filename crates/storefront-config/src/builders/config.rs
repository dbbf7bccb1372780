//! Configuration builder for creating test and development configurations.
//!
//! Produces a `Config` backed by in-memory storage and an HTTP transport,
//! which is what most tests against a mock server need.

use crate::{
	ClientConfig, Config, EnvelopeConfig, OrdersConfig, StorageConfig, TransportConfig,
};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	client_id: String,
	base_url: String,
	timeout_seconds: u64,
	storage_primary: String,
	storage_path: Option<String>,
	envelope_key: Option<String>,
	encrypt_auth_requests: bool,
	cancellation_window_hours: u64,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` with default values suitable for testing.
	pub fn new() -> Self {
		Self {
			client_id: "test-client".to_string(),
			base_url: "http://localhost:8080/api".to_string(),
			timeout_seconds: 5,
			storage_primary: "memory".to_string(),
			storage_path: None,
			envelope_key: None,
			encrypt_auth_requests: true,
			cancellation_window_hours: 8,
		}
	}

	pub fn client_id(mut self, id: impl Into<String>) -> Self {
		self.client_id = id.into();
		self
	}

	/// Sets the API base URL, typically a mock server's URI.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = url.into();
		self
	}

	pub fn timeout_seconds(mut self, timeout: u64) -> Self {
		self.timeout_seconds = timeout;
		self
	}

	/// Switches storage to the file backend rooted at `path`.
	pub fn file_storage(mut self, path: impl Into<String>) -> Self {
		self.storage_primary = "file".to_string();
		self.storage_path = Some(path.into());
		self
	}

	/// Enables body encryption with a hex-encoded 32-byte key.
	pub fn envelope_key(mut self, key: impl Into<String>) -> Self {
		self.envelope_key = Some(key.into());
		self
	}

	pub fn encrypt_auth_requests(mut self, enabled: bool) -> Self {
		self.encrypt_auth_requests = enabled;
		self
	}

	pub fn cancellation_window_hours(mut self, hours: u64) -> Self {
		self.cancellation_window_hours = hours;
		self
	}

	/// Builds the `Config`.
	pub fn build(self) -> Config {
		let mut storage_table = toml::map::Map::new();
		if let Some(path) = &self.storage_path {
			storage_table.insert("storage_path".into(), toml::Value::String(path.clone()));
		}
		let mut storage_implementations = HashMap::new();
		storage_implementations.insert(
			self.storage_primary.clone(),
			toml::Value::Table(storage_table),
		);

		let mut http_table = toml::map::Map::new();
		http_table.insert("base_url".into(), toml::Value::String(self.base_url));
		http_table.insert(
			"timeout_seconds".into(),
			toml::Value::Integer(self.timeout_seconds as i64),
		);
		let mut transport_implementations = HashMap::new();
		transport_implementations.insert("http".to_string(), toml::Value::Table(http_table));

		let envelope = self.envelope_key.map(|key| {
			let mut cipher_table = toml::map::Map::new();
			cipher_table.insert("key".into(), toml::Value::String(key));
			let mut implementations = HashMap::new();
			implementations.insert("aes_gcm".to_string(), toml::Value::Table(cipher_table));
			EnvelopeConfig {
				primary: "aes_gcm".to_string(),
				implementations,
				encrypt_auth_requests: self.encrypt_auth_requests,
			}
		});

		Config {
			client: ClientConfig { id: self.client_id },
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: storage_implementations,
			},
			transport: TransportConfig {
				primary: "http".to_string(),
				implementations: transport_implementations,
			},
			envelope,
			orders: OrdersConfig {
				cancellation_window_hours: self.cancellation_window_hours,
			},
		}
	}
}
