//! Request and response descriptors for the REST API.
//!
//! An [`ApiRequest`] describes one outbound call independently of the HTTP
//! library that eventually performs it, so it can be queued and replayed with
//! a fresh bearer token.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// Name of the header carrying the bearer token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// REST paths consumed by the client, relative to the configured base URL.
pub mod endpoints {
	pub const SIGN_IN: &str = "/auth/signin";
	pub const SIGN_UP: &str = "/auth/signup";
	pub const REFRESH_TOKEN: &str = "/auth/refresh-token";
	pub const ME: &str = "/auth/me";
	pub const ORDERS: &str = "/orders";

	pub fn order(order_id: &str) -> String {
		format!("{}/{}", ORDERS, order_id)
	}

	pub fn order_cancel(order_id: &str) -> String {
		format!("{}/{}/cancel", ORDERS, order_id)
	}

	pub fn workspace_orders(workspace_id: &str) -> String {
		format!("{}/workspaces/{}/orders", ORDERS, workspace_id)
	}

	pub fn workspace_order_status(workspace_id: &str, order_id: &str) -> String {
		format!(
			"{}/workspaces/{}/orders/{}/status",
			ORDERS, workspace_id, order_id
		)
	}
}

/// HTTP methods used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
	Get,
	Post,
	Put,
	Patch,
	Delete,
}

impl HttpMethod {
	pub fn as_str(&self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
			HttpMethod::Put => "PUT",
			HttpMethod::Patch => "PATCH",
			HttpMethod::Delete => "DELETE",
		}
	}
}

impl fmt::Display for HttpMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Descriptor of an outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
	pub method: HttpMethod,
	/// Path relative to the base URL, optionally with a query string.
	pub path: String,
	pub headers: Vec<(String, String)>,
	pub body: Option<Value>,
	/// Set once the request has been replayed after a token refresh.
	pub retried: bool,
}

impl ApiRequest {
	pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: Vec::new(),
			body: None,
			retried: false,
		}
	}

	pub fn get(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Get, path)
	}

	pub fn post(path: impl Into<String>, body: Value) -> Self {
		Self::new(HttpMethod::Post, path).with_body(body)
	}

	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Patch, path)
	}

	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);
		self
	}

	/// Sets a header, replacing any existing header of the same name.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		let name = name.into();
		self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
		self.headers.push((name, value.into()));
		self
	}

	/// Returns the value of a header, matched case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(n, _)| n.eq_ignore_ascii_case(name))
			.map(|(_, v)| v.as_str())
	}

	/// Path without query string or trailing slash.
	pub fn route(&self) -> &str {
		let path = self.path.split('?').next().unwrap_or_default();
		match path.trim_end_matches('/') {
			"" => "/",
			trimmed => trimmed,
		}
	}

	/// Whether this request targets the token refresh endpoint.
	pub fn is_refresh(&self) -> bool {
		self.route() == endpoints::REFRESH_TOKEN
	}
}

/// Response to an [`ApiRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
	pub status: u16,
	pub body: Vec<u8>,
}

impl HttpResponse {
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self {
			status,
			body: body.into(),
		}
	}

	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}

	/// Parses the body as JSON, treating an empty body as `null`.
	pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
		if self.body.iter().all(u8::is_ascii_whitespace) {
			return serde_json::from_value(Value::Null);
		}
		serde_json::from_slice(&self.body)
	}

	/// Extracts the server's `message` field, falling back to the raw body.
	pub fn error_message(&self) -> String {
		self.json::<Value>()
			.ok()
			.and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
			.unwrap_or_else(|| String::from_utf8_lossy(&self.body).trim().to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_refresh_endpoint_detection() {
		assert!(ApiRequest::post("/auth/refresh-token", json!({})).is_refresh());
		assert!(ApiRequest::post("/auth/refresh-token/?x=1", json!({})).is_refresh());
		assert!(!ApiRequest::get("/auth/me").is_refresh());
	}

	#[test]
	fn test_with_header_replaces_case_insensitively() {
		let request = ApiRequest::get(endpoints::ME)
			.with_header("authorization", "Bearer old")
			.with_header(AUTHORIZATION_HEADER, "Bearer new");
		assert_eq!(request.headers.len(), 1);
		assert_eq!(request.header("AUTHORIZATION"), Some("Bearer new"));
	}

	#[test]
	fn test_endpoint_paths() {
		assert_eq!(endpoints::order_cancel("42"), "/orders/42/cancel");
		assert_eq!(
			endpoints::workspace_order_status("ws-1", "42"),
			"/orders/workspaces/ws-1/orders/42/status"
		);
	}

	#[test]
	fn test_error_message_prefers_message_field() {
		let response = HttpResponse::new(422, r#"{"message":"Out of stock"}"#);
		assert_eq!(response.error_message(), "Out of stock");

		let response = HttpResponse::new(502, "Bad Gateway\n");
		assert_eq!(response.error_message(), "Bad Gateway");
	}
}
