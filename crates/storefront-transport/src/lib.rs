//! Outbound HTTP transport for the storefront client.
//!
//! Transports perform a single [`ApiRequest`] against the REST API and hand
//! back the raw [`HttpResponse`]. They never interpret status codes: a 401 or
//! a 500 is a successful round trip at this layer. Authorization, token
//! refresh and envelope decoding are the session client's concern.

use async_trait::async_trait;
use storefront_types::{ApiRequest, ConfigSchema, HttpResponse, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Errors that can occur while performing a request.
#[derive(Debug, Error)]
pub enum TransportError {
	/// The request could not be sent or the response could not be read.
	#[error("Network error: {0}")]
	Network(String),
	/// The server did not answer within the configured timeout.
	#[error("Request timed out")]
	Timeout,
	/// The request descriptor cannot be turned into an HTTP request.
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for HTTP transports.
#[async_trait]
pub trait TransportInterface: Send + Sync {
	/// Returns the configuration schema for this transport implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Performs the request and returns the response, whatever its status.
	async fn send(&self, request: &ApiRequest) -> Result<HttpResponse, TransportError>;
}

/// Type alias for transport factory functions.
pub type TransportFactory =
	fn(&toml::Value) -> Result<Box<dyn TransportInterface>, TransportError>;

/// Registry trait for transport implementations.
pub trait TransportRegistry: ImplementationRegistry<Factory = TransportFactory> {}

/// Get all registered transport implementations.
pub fn get_all_implementations() -> Vec<(&'static str, TransportFactory)> {
	use implementations::http;

	vec![(http::Registry::NAME, http::Registry::factory())]
}

/// Service wrapping the configured transport.
pub struct TransportService {
	backend: Box<dyn TransportInterface>,
}

impl TransportService {
	/// Creates a new TransportService with the specified backend.
	pub fn new(backend: Box<dyn TransportInterface>) -> Self {
		Self { backend }
	}

	/// Performs a request through the backend.
	pub async fn send(&self, request: &ApiRequest) -> Result<HttpResponse, TransportError> {
		tracing::debug!(
			method = %request.method,
			path = %request.path,
			retried = request.retried,
			"Dispatching request"
		);
		let result = self.backend.send(request).await;
		match &result {
			Ok(response) => tracing::debug!(
				method = %request.method,
				path = %request.path,
				status = response.status,
				"Received response"
			),
			Err(e) => tracing::debug!(
				method = %request.method,
				path = %request.path,
				error = %e,
				"Request failed"
			),
		}
		result
	}
}
