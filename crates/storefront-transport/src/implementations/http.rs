//! HTTP transport backed by `reqwest`.
//!
//! Resolves request paths against a configured base URL and sends JSON
//! bodies. One pooled client is shared by every request of a session.

use crate::{TransportError, TransportFactory, TransportInterface, TransportRegistry};
use async_trait::async_trait;
use std::time::Duration;
use storefront_types::{
	ApiRequest, ConfigSchema, Field, FieldType, HttpMethod, HttpResponse, ImplementationRegistry,
	Schema, ValidationError,
};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// `reqwest`-based transport.
pub struct HttpTransport {
	client: reqwest::Client,
	/// Base URL without trailing slash, e.g. `https://api.example.com/api`.
	base_url: String,
}

impl HttpTransport {
	/// Creates a transport for `base_url` with the given per-request timeout.
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
		let client = reqwest::Client::builder()
			.pool_idle_timeout(Duration::from_secs(90))
			.pool_max_idle_per_host(10)
			.timeout(timeout)
			.build()
			.map_err(|e| TransportError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	/// Absolute URL of a request path.
	fn url_for(&self, path: &str) -> String {
		if path.starts_with('/') {
			format!("{}{}", self.base_url, path)
		} else {
			format!("{}/{}", self.base_url, path)
		}
	}
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
	match method {
		HttpMethod::Get => reqwest::Method::GET,
		HttpMethod::Post => reqwest::Method::POST,
		HttpMethod::Put => reqwest::Method::PUT,
		HttpMethod::Patch => reqwest::Method::PATCH,
		HttpMethod::Delete => reqwest::Method::DELETE,
	}
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
	if err.is_timeout() {
		TransportError::Timeout
	} else if err.is_builder() {
		TransportError::InvalidRequest(err.to_string())
	} else {
		TransportError::Network(err.to_string())
	}
}

#[async_trait]
impl TransportInterface for HttpTransport {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpTransportSchema)
	}

	async fn send(&self, request: &ApiRequest) -> Result<HttpResponse, TransportError> {
		let mut builder = self
			.client
			.request(to_reqwest_method(request.method), self.url_for(&request.path))
			.header(reqwest::header::ACCEPT, "application/json");

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		if let Some(body) = &request.body {
			builder = builder.json(body);
		}

		let response = builder.send().await.map_err(map_reqwest_error)?;
		let status = response.status().as_u16();
		let body = response.bytes().await.map_err(map_reqwest_error)?;

		Ok(HttpResponse::new(status, body.to_vec()))
	}
}

/// Configuration schema for HttpTransport.
pub struct HttpTransportSchema;

impl ConfigSchema for HttpTransportSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("base_url", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("base_url must start with http:// or https://".to_string()),
					}
				}),
			],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);

		schema.validate(config)
	}
}

/// Factory function to create an HTTP transport from configuration.
///
/// Configuration parameters:
/// - `base_url` (required): API root that request paths are appended to
/// - `timeout_seconds` (optional): per-request timeout, 1 to 300 (default: 30)
pub fn create_transport(
	config: &toml::Value,
) -> Result<Box<dyn TransportInterface>, TransportError> {
	HttpTransportSchema
		.validate(config)
		.map_err(|e| TransportError::Configuration(e.to_string()))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| TransportError::Configuration("base_url is required".to_string()))?;
	let timeout_seconds = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	let transport = HttpTransport::new(base_url, Duration::from_secs(timeout_seconds))?;
	Ok(Box::new(transport))
}

/// Registry for the HTTP transport implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = TransportFactory;

	fn factory() -> Self::Factory {
		create_transport
	}
}

impl TransportRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use storefront_types::{endpoints, AUTHORIZATION_HEADER};
	use wiremock::matchers::{body_json, header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn transport_for(server: &MockServer) -> Box<dyn TransportInterface> {
		let config: toml::Value = toml::from_str(&format!(
			"base_url = \"{}/api/\"\ntimeout_seconds = 5",
			server.uri()
		))
		.unwrap();
		create_transport(&config).unwrap()
	}

	#[tokio::test]
	async fn test_sends_method_path_headers_and_body() {
		let server = MockServer::start().await;

		Mock::given(method("PATCH"))
			.and(path("/api/orders/workspaces/ws-1/orders/42/status"))
			.and(header("authorization", "Bearer access-1"))
			.and(body_json(json!({ "status": "DELIVERY" })))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": "42" } })),
			)
			.expect(1)
			.mount(&server)
			.await;

		let transport = transport_for(&server);
		let request = ApiRequest::patch(endpoints::workspace_order_status("ws-1", "42"))
			.with_header(AUTHORIZATION_HEADER, "Bearer access-1")
			.with_body(json!({ "status": "DELIVERY" }));

		let response = transport.send(&request).await.unwrap();
		assert_eq!(response.status, 200);
		let body: serde_json::Value = response.json().unwrap();
		assert_eq!(body["data"]["id"], "42");
	}

	#[tokio::test]
	async fn test_error_status_is_not_a_transport_error() {
		let server = MockServer::start().await;

		Mock::given(method("GET"))
			.and(path("/api/auth/me"))
			.respond_with(
				ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })),
			)
			.mount(&server)
			.await;

		let transport = transport_for(&server);
		let response = transport.send(&ApiRequest::get(endpoints::ME)).await.unwrap();
		assert!(response.is_unauthorized());
		assert_eq!(response.error_message(), "jwt expired");
	}

	#[tokio::test]
	async fn test_unreachable_server_is_network_error() {
		let transport = HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
		let result = transport.send(&ApiRequest::get(endpoints::ORDERS)).await;
		assert!(matches!(
			result,
			Err(TransportError::Network(_)) | Err(TransportError::Timeout)
		));
	}

	#[test]
	fn test_schema_validation() {
		let missing: toml::Value = toml::from_str("timeout_seconds = 10").unwrap();
		assert!(matches!(
			create_transport(&missing),
			Err(TransportError::Configuration(_))
		));

		let bad_timeout: toml::Value =
			toml::from_str("base_url = \"http://localhost\"\ntimeout_seconds = 301").unwrap();
		assert!(HttpTransportSchema.validate(&bad_timeout).is_err());

		let bad_scheme: toml::Value = toml::from_str("base_url = \"localhost:8080\"").unwrap();
		assert!(HttpTransportSchema.validate(&bad_scheme).is_err());
	}

	#[test]
	fn test_url_joining() {
		let transport = HttpTransport::new("http://localhost/api/", Duration::from_secs(1)).unwrap();
		assert_eq!(transport.url_for("/orders"), "http://localhost/api/orders");
		assert_eq!(transport.url_for("orders"), "http://localhost/api/orders");
	}
}
