//! File-backed client store.
//!
//! Each session key is one file under `storage_path`, so a session survives
//! process restarts (the command-line binary relies on this between
//! invocations). A file holds the raw value bytes and nothing else.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use std::path::PathBuf;
use storefront_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use tokio::fs;

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
}

impl FileStorage {
	/// Creates a new FileStorage instance rooted at `base_path`.
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Converts a key to a filesystem-safe file path with a `.bin` extension.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', '\\', ':', '.'], "_");
		self.base_path.join(format!("{}.bin", safe_key))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);

		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		// Write to a temp file then rename so readers never see a partial file
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		fs::try_exists(self.get_file_path(key))
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let optional_fields = vec![Field::new("storage_path", FieldType::String)
			.with_validator(|value| match value.as_str() {
				Some(path) if path.trim().is_empty() => {
					Err("storage_path cannot be empty".to_string())
				},
				_ => Ok(()),
			})];

		Schema::new(vec![], optional_fields).validate(config)
	}
}

/// Factory function to create a storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for session files (default: "./data/session")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/session")
		.to_string();

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn storage_in(dir: &TempDir, extra: &str) -> Box<dyn StorageInterface> {
		let config: toml::Value = toml::from_str(&format!(
			"storage_path = \"{}\"\n{}",
			dir.path().display(),
			extra
		))
		.unwrap();
		create_storage(&config).unwrap()
	}

	#[tokio::test]
	async fn test_round_trip_and_delete() {
		let dir = TempDir::new().unwrap();
		let storage = storage_in(&dir, "");

		storage
			.set_bytes("refreshToken", b"refresh-1".to_vec())
			.await
			.unwrap();
		assert_eq!(
			storage.get_bytes("refreshToken").await.unwrap(),
			b"refresh-1".to_vec()
		);
		assert!(dir.path().join("refreshToken.bin").exists());

		storage.delete("refreshToken").await.unwrap();
		assert!(!storage.exists("refreshToken").await.unwrap());
		// Deleting twice is fine
		storage.delete("refreshToken").await.unwrap();
	}

	#[tokio::test]
	async fn test_session_survives_new_instance() {
		let dir = TempDir::new().unwrap();
		storage_in(&dir, "")
			.set_bytes("token", b"access-1".to_vec())
			.await
			.unwrap();

		let reopened = storage_in(&dir, "");
		assert_eq!(reopened.get_bytes("token").await.unwrap(), b"access-1".to_vec());
	}

	#[tokio::test]
	async fn test_file_holds_raw_value() {
		let dir = TempDir::new().unwrap();
		let storage = storage_in(&dir, "");

		storage.set_bytes("user", br#"{"id":"u-1"}"#.to_vec()).await.unwrap();

		let on_disk = std::fs::read(dir.path().join("user.bin")).unwrap();
		assert_eq!(on_disk, br#"{"id":"u-1"}"#.to_vec());
		assert!(!dir.path().join("user.tmp").exists());
	}

	#[test]
	fn test_schema_rejects_non_string_path() {
		let config: toml::Value = toml::from_str("storage_path = 900").unwrap();
		assert!(FileStorageSchema.validate(&config).is_err());
		assert!(matches!(
			create_storage(&config),
			Err(StorageError::Configuration(_))
		));
	}

	#[test]
	fn test_schema_rejects_empty_path() {
		let config: toml::Value = toml::from_str("storage_path = \"  \"").unwrap();
		assert!(matches!(
			create_storage(&config),
			Err(StorageError::Configuration(_))
		));
	}
}
