//! In-process transport scripted by a closure, for driving the session
//! client through deterministic request interleavings.

use crate::engine::event_bus::EventBus;
use crate::session::SessionClient;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use storefront_envelope::EnvelopeService;
use storefront_storage::implementations::memory::MemoryStorage;
use storefront_storage::StorageService;
use storefront_transport::{TransportError, TransportInterface, TransportService};
use storefront_types::{
	ApiRequest, ConfigSchema, HttpResponse, Schema, ValidationError, AUTHORIZATION_HEADER,
};

/// Ordered record of what the transport saw.
///
/// Requests are logged as `"<METHOD> <path> <authorization or ->"` before
/// the handler runs; handlers may push their own markers.
#[derive(Clone, Default)]
pub(crate) struct RequestLog {
	entries: Arc<Mutex<Vec<String>>>,
}

impl RequestLog {
	pub(crate) fn push(&self, entry: impl Into<String>) {
		self.entries.lock().unwrap().push(entry.into());
	}

	pub(crate) fn entries(&self) -> Vec<String> {
		self.entries.lock().unwrap().clone()
	}
}

type Handler = Box<dyn Fn(ApiRequest, RequestLog) -> BoxFuture<'static, HttpResponse> + Send + Sync>;

struct ScriptedTransport {
	handler: Handler,
	log: RequestLog,
}

struct NoConfig;

impl ConfigSchema for NoConfig {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl TransportInterface for ScriptedTransport {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoConfig)
	}

	async fn send(&self, request: &ApiRequest) -> Result<HttpResponse, TransportError> {
		self.log.push(format!(
			"{} {} {}",
			request.method,
			request.path,
			request.header(AUTHORIZATION_HEADER).unwrap_or("-")
		));
		Ok((self.handler)(request.clone(), self.log.clone()).await)
	}
}

/// A session client over a scripted transport and in-memory store.
pub(crate) struct ScriptedSession {
	pub session: Arc<SessionClient>,
	pub storage: Arc<StorageService>,
	pub event_bus: EventBus,
	pub log: RequestLog,
}

impl ScriptedSession {
	pub(crate) fn new<F>(handler: F) -> Self
	where
		F: Fn(ApiRequest, RequestLog) -> BoxFuture<'static, HttpResponse> + Send + Sync + 'static,
	{
		Self::with_envelope(EnvelopeService::plain(), handler)
	}

	pub(crate) fn with_envelope<F>(envelope: EnvelopeService, handler: F) -> Self
	where
		F: Fn(ApiRequest, RequestLog) -> BoxFuture<'static, HttpResponse> + Send + Sync + 'static,
	{
		let log = RequestLog::default();
		let transport = TransportService::new(Box::new(ScriptedTransport {
			handler: Box::new(handler),
			log: log.clone(),
		}));
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let event_bus = EventBus::new(64);
		let session = Arc::new(SessionClient::new(
			Arc::new(transport),
			Arc::new(envelope),
			storage.clone(),
			event_bus.clone(),
		));

		Self {
			session,
			storage,
			event_bus,
			log,
		}
	}

	/// Puts the session in a signed-in state without any request.
	pub(crate) async fn sign_in(&self, access: &str, refresh: Option<&str>) {
		self.session
			.store_tokens(access.into(), refresh.map(Into::into))
			.await
			.unwrap();
	}
}

/// A response whose body is `body` serialized as JSON.
pub(crate) fn json_response(status: u16, body: Value) -> HttpResponse {
	HttpResponse::new(status, body.to_string())
}
