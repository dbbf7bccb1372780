//! Client-side store for the storefront session.
//!
//! The store is a small key-value space addressed by [`SessionKey`]: tokens,
//! the signed-in user, the active role and the active workspace. Backends
//! implement [`StorageInterface`] over raw bytes; [`StorageService`] adds
//! typed access on top.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use storefront_types::{ConfigSchema, ImplementationRegistry, SecretString, SessionKey};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// Backends store opaque bytes under string keys.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Typed access to the client store.
///
/// Structured values are stored as JSON. Secrets are stored as their raw
/// UTF-8 bytes since their serialized form is redacted.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a serializable value under `key`.
	pub async fn store<T: Serialize>(&self, key: SessionKey, data: &T) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(key.as_str(), bytes).await
	}

	/// Retrieves the value under `key`, or `None` when it is absent.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		key: SessionKey,
	) -> Result<Option<T>, StorageError> {
		match self.backend.get_bytes(key.as_str()).await {
			Ok(bytes) => serde_json::from_slice(&bytes)
				.map(Some)
				.map_err(|e| StorageError::Serialization(e.to_string())),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Stores a secret under `key`.
	pub async fn store_secret(
		&self,
		key: SessionKey,
		secret: &SecretString,
	) -> Result<(), StorageError> {
		self.backend
			.set_bytes(key.as_str(), secret.expose_secret().as_bytes().to_vec())
			.await
	}

	/// Retrieves a secret, treating an empty value as absent.
	pub async fn retrieve_secret(
		&self,
		key: SessionKey,
	) -> Result<Option<SecretString>, StorageError> {
		match self.backend.get_bytes(key.as_str()).await {
			Ok(bytes) => {
				let value = String::from_utf8(bytes)
					.map_err(|e| StorageError::Serialization(e.to_string()))?;
				let secret = SecretString::new(value);
				Ok((!secret.is_empty()).then_some(secret))
			},
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Removes a value from storage. Removing an absent key is not an error.
	pub async fn remove(&self, key: SessionKey) -> Result<(), StorageError> {
		self.backend.delete(key.as_str()).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, key: SessionKey) -> Result<bool, StorageError> {
		self.backend.exists(key.as_str()).await
	}

	/// Removes every key in `keys`.
	///
	/// All keys are attempted; the first failure is returned afterwards.
	pub async fn clear(
		&self,
		keys: impl IntoIterator<Item = SessionKey>,
	) -> Result<(), StorageError> {
		let mut first_error = None;
		for key in keys {
			if let Err(e) = self.backend.delete(key.as_str()).await {
				tracing::warn!(key = key.as_str(), error = %e, "Failed to remove session key");
				first_error.get_or_insert(e);
			}
		}
		match first_error {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}
}
