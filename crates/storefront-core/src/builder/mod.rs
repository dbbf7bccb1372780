//! Builder for assembling a storefront client.
//!
//! Provides a flexible way to compose a [`StorefrontClient`] from pluggable
//! storage, transport and cipher implementations using factory functions
//! keyed by the implementation names used in the configuration.

use crate::engine::{event_bus::EventBus, StorefrontClient};
use crate::session::SessionClient;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use storefront_config::Config;
use storefront_envelope::{CipherFactory, CipherInterface, EnvelopeError, EnvelopeService};
use storefront_storage::{StorageError, StorageFactory, StorageInterface, StorageService};
use storefront_transport::{
	TransportError, TransportFactory, TransportInterface, TransportService,
};
use thiserror::Error;

/// Capacity of the client event bus.
const EVENT_BUS_CAPACITY: usize = 256;

/// Errors that can occur during client construction.
///
/// These errors indicate problems with configuration or missing required components
/// when building a client instance.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Container for all factory functions needed to build a [`StorefrontClient`].
///
/// Each factory takes the TOML table of its implementation and returns the
/// implementation, validating the table first.
pub struct StorefrontFactories<SF, TF, CF> {
	pub storage_factories: HashMap<String, SF>,
	pub transport_factories: HashMap<String, TF>,
	pub cipher_factories: HashMap<String, CF>,
}

impl StorefrontFactories<StorageFactory, TransportFactory, CipherFactory> {
	/// Factories for every implementation shipped with the storefront crates.
	pub fn registered() -> Self {
		fn collect<F>(implementations: Vec<(&'static str, F)>) -> HashMap<String, F> {
			implementations
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect()
		}

		Self {
			storage_factories: collect(storefront_storage::get_all_implementations()),
			transport_factories: collect(storefront_transport::get_all_implementations()),
			cipher_factories: collect(storefront_envelope::get_all_implementations()),
		}
	}
}

/// Builder for constructing a [`StorefrontClient`] with pluggable implementations.
pub struct StorefrontBuilder {
	config: Config,
}

impl StorefrontBuilder {
	/// Creates a new StorefrontBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the client using factories for each component type.
	pub fn build<SF, TF, CF>(
		self,
		factories: StorefrontFactories<SF, TF, CF>,
	) -> Result<StorefrontClient, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		TF: Fn(&toml::Value) -> Result<Box<dyn TransportInterface>, TransportError>,
		CF: Fn(&toml::Value) -> Result<Box<dyn CipherInterface>, EnvelopeError>,
	{
		let storage_backend = load_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let transport_backend = load_primary(
			"transport",
			&self.config.transport.primary,
			&self.config.transport.implementations,
			&factories.transport_factories,
		)?;
		let transport = Arc::new(TransportService::new(transport_backend));

		let envelope = match &self.config.envelope {
			Some(envelope_config) => {
				let cipher = load_primary(
					"envelope",
					&envelope_config.primary,
					&envelope_config.implementations,
					&factories.cipher_factories,
				)?;
				EnvelopeService::new(Some(cipher), envelope_config.encrypt_auth_requests)
			},
			None => {
				tracing::info!(component = "envelope", "No cipher configured, bodies are sent plain");
				EnvelopeService::plain()
			},
		};

		let cancellation_window = i64::try_from(self.config.orders.cancellation_window_hours)
			.ok()
			.and_then(chrono::Duration::try_hours)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Cancellation window of {} hours is out of range",
					self.config.orders.cancellation_window_hours
				))
			})?;

		let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
		let session = Arc::new(SessionClient::new(
			transport,
			Arc::new(envelope),
			storage.clone(),
			event_bus.clone(),
		));

		tracing::info!(client_id = %self.config.client.id, "Storefront client assembled");
		Ok(StorefrontClient::new(
			self.config,
			storage,
			session,
			event_bus,
			cancellation_window,
		))
	}
}

/// Creates every configured implementation of a component and returns the primary one.
fn load_primary<T: ?Sized, E: Display, F>(
	component: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	let mut loaded = HashMap::new();
	for (name, config) in implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				// Validation already happened in the factory
				let is_primary = primary == name;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::MissingComponent(format!(
			"Primary {} '{}' failed to load or has no registered factory",
			component, primary
		))
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use storefront_config::builders::config::ConfigBuilder;

	#[test]
	fn test_build_with_registered_factories() {
		let config = ConfigBuilder::new()
			.envelope_key("11".repeat(32))
			.cancellation_window_hours(12)
			.build();

		let client = StorefrontBuilder::new(config)
			.build(StorefrontFactories::registered())
			.unwrap();

		assert!(client.session().envelope().encrypts_requests());
		assert!(!client.session().is_authenticated());
	}

	#[test]
	fn test_unregistered_primary_is_missing() {
		let config = ConfigBuilder::new().build();
		let mut factories = StorefrontFactories::registered();
		factories.transport_factories.clear();

		let result = StorefrontBuilder::new(config).build(factories);
		assert!(matches!(result, Err(BuilderError::MissingComponent(msg)) if msg.contains("transport")));
	}

	#[test]
	fn test_invalid_implementation_table_fails() {
		let config = ConfigBuilder::new().base_url("ftp://example.com").build();

		let result = StorefrontBuilder::new(config).build(StorefrontFactories::registered());
		assert!(matches!(result, Err(BuilderError::Config(msg)) if msg.contains("'http'")));
	}
}
