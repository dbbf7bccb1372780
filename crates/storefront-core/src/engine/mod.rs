//! Storefront client facade.
//!
//! This module contains the [`StorefrontClient`] struct which owns every
//! service of one user session (store, session client, status machine and
//! handlers) and exposes them to the application.

pub mod event_bus;
pub mod lifecycle;

use crate::handlers::{AuthError, AuthHandler, OrderError, OrderHandler};
use crate::session::{SessionClient, SessionError};
use crate::state::OrderStatusMachine;
use chrono::Duration;
use std::sync::Arc;
use storefront_config::Config;
use storefront_storage::StorageService;
use storefront_types::StorefrontEvent;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors that can occur while starting or stopping the client.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error(transparent)]
	Session(#[from] SessionError),
	#[error(transparent)]
	Auth(#[from] AuthError),
	#[error(transparent)]
	Order(#[from] OrderError),
}

/// One user's storefront client.
#[derive(Clone)]
pub struct StorefrontClient {
	/// Client configuration.
	pub(crate) config: Config,
	/// Client-side key-value store.
	pub(crate) storage: Arc<StorageService>,
	/// Authorized request issuer.
	pub(crate) session: Arc<SessionClient>,
	/// Event bus shared by every component.
	pub(crate) event_bus: event_bus::EventBus,
	/// Order status rules.
	pub(crate) state_machine: Arc<OrderStatusMachine>,
	/// Sign-in and session preferences.
	pub(crate) auth: Arc<AuthHandler>,
	/// Order queries and status changes.
	pub(crate) orders: Arc<OrderHandler>,
}

impl StorefrontClient {
	/// Creates a client around already constructed services.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		session: Arc<SessionClient>,
		event_bus: event_bus::EventBus,
		cancellation_window: Duration,
	) -> Self {
		let state_machine = Arc::new(OrderStatusMachine::new(
			session.clone(),
			storage.clone(),
			event_bus.clone(),
			cancellation_window,
		));

		let auth = Arc::new(AuthHandler::new(
			session.clone(),
			storage.clone(),
			event_bus.clone(),
		));

		let orders = Arc::new(OrderHandler::new(
			session.clone(),
			auth.clone(),
			state_machine.clone(),
		));

		Self {
			config,
			storage,
			session,
			event_bus,
			state_machine,
			auth,
			orders,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn session(&self) -> &Arc<SessionClient> {
		&self.session
	}

	pub fn auth(&self) -> &Arc<AuthHandler> {
		&self.auth
	}

	pub fn orders(&self) -> &Arc<OrderHandler> {
		&self.orders
	}

	pub fn state_machine(&self) -> &Arc<OrderStatusMachine> {
		&self.state_machine
	}

	/// Subscribes to session and order events.
	///
	/// [`SessionEvent::Invalidated`](storefront_types::SessionEvent::Invalidated)
	/// is the signal to send the user back to the login view.
	pub fn subscribe(&self) -> broadcast::Receiver<StorefrontEvent> {
		self.event_bus.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::EngineError;
	use crate::builder::{StorefrontBuilder, StorefrontFactories};
	use crate::handlers::OrderError;
	use crate::session::SessionError;
	use crate::state::OrderStateError;
	use crate::StorefrontClient;
	use serde_json::json;
	use storefront_config::builders::config::ConfigBuilder;
	use storefront_types::{OrderStatus, SessionEvent, SignInRequest, StorefrontEvent};
	use wiremock::matchers::{body_json, header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn client(server: &MockServer) -> StorefrontClient {
		let config = ConfigBuilder::new().base_url(server.uri()).build();
		StorefrontBuilder::new(config)
			.build(StorefrontFactories::registered())
			.unwrap()
	}

	async fn mount_sign_in(server: &MockServer) {
		Mock::given(method("POST"))
			.and(path("/auth/signin"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"data": {
					"token": "access-1",
					"refreshToken": "refresh-1",
					"user": {
						"id": "staff-1",
						"email": "sam@example.com",
						"roles": ["STAFF"],
						"workspaceId": "ws-1"
					}
				}
			})))
			.expect(1)
			.mount(server)
			.await;
	}

	#[test]
	fn test_engine_error_is_transparent() {
		let err = EngineError::from(SessionError::RefreshAborted);
		assert_eq!(err.to_string(), SessionError::RefreshAborted.to_string());
		assert!(matches!(err, EngineError::Session(SessionError::RefreshAborted)));
	}

	#[tokio::test]
	async fn test_expired_token_is_refreshed_end_to_end() {
		let server = MockServer::start().await;
		mount_sign_in(&server).await;

		Mock::given(method("GET"))
			.and(path("/orders/workspaces/ws-1/orders"))
			.and(header("Authorization", "Bearer access-1"))
			.respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/auth/refresh-token"))
			.and(body_json(json!({ "refreshToken": "refresh-1" })))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"data": { "accessToken": "access-2", "refreshToken": "refresh-2" }
			})))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/orders/workspaces/ws-1/orders"))
			.and(header("Authorization", "Bearer access-2"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"data": [{
					"id": "ord-1",
					"status": "PENDING",
					"createdAt": "2026-10-19T08:00:00Z"
				}]
			})))
			.expect(1)
			.mount(&server)
			.await;

		let client = client(&server);
		client.initialize().await.unwrap();
		client
			.auth()
			.sign_in(&SignInRequest::new("sam@example.com", "hunter2"))
			.await
			.unwrap();

		let orders = client.orders().list_workspace_orders("ws-1").await.unwrap();

		assert_eq!(orders.len(), 1);
		assert_eq!(orders[0].status, OrderStatus::Pending);
	}

	#[tokio::test]
	async fn test_failed_refresh_signals_invalidation() {
		let server = MockServer::start().await;
		mount_sign_in(&server).await;

		Mock::given(method("GET"))
			.and(path("/auth/me"))
			.respond_with(ResponseTemplate::new(401))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/auth/refresh-token"))
			.respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "refresh token revoked" })))
			.expect(1)
			.mount(&server)
			.await;

		let client = client(&server);
		client
			.auth()
			.sign_in(&SignInRequest::new("sam@example.com", "hunter2"))
			.await
			.unwrap();
		let mut events = client.subscribe();

		let err = client.auth().me().await.unwrap_err();

		assert!(err.to_string().contains("refresh token revoked"), "{}", err);
		assert!(!client.session().is_authenticated());
		assert!(matches!(
			events.recv().await.unwrap(),
			StorefrontEvent::Session(SessionEvent::Invalidated { .. })
		));
	}

	#[tokio::test]
	async fn test_staff_confirm_never_reaches_server() {
		let server = MockServer::start().await;
		mount_sign_in(&server).await;

		Mock::given(method("GET"))
			.and(path("/orders/ord-1"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"data": { "id": "ord-1", "status": "PENDING", "createdAt": "2026-10-19T08:00:00Z" }
			})))
			.mount(&server)
			.await;
		Mock::given(method("PATCH"))
			.respond_with(ResponseTemplate::new(200))
			.expect(0)
			.mount(&server)
			.await;

		let client = client(&server);
		client
			.auth()
			.sign_in(&SignInRequest::new("sam@example.com", "hunter2"))
			.await
			.unwrap();

		let err = client
			.orders()
			.change_status_by_id("ord-1", OrderStatus::Confirmed)
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			OrderError::State(OrderStateError::InvalidTransition { .. })
		));
	}
}
