//! Order handler.
//!
//! Reads orders through the session client and routes status changes
//! through the order status machine with the signed-in actor.

use crate::handlers::auth::{AuthError, AuthHandler};
use crate::session::{SessionClient, SessionError};
use crate::state::{OrderStateError, OrderStatusMachine};
use serde_json::Value;
use std::sync::Arc;
use storefront_types::{endpoints, truncate_id, ApiRequest, Order, OrderStatus, PlainEnvelope};
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur while reading or updating orders.
#[derive(Debug, Error)]
pub enum OrderError {
	#[error(transparent)]
	Session(#[from] SessionError),
	#[error(transparent)]
	State(#[from] OrderStateError),
	#[error(transparent)]
	Auth(#[from] AuthError),
	#[error("Unexpected response: {0}")]
	InvalidResponse(String),
}

/// Handler for order queries and status changes.
pub struct OrderHandler {
	session: Arc<SessionClient>,
	auth: Arc<AuthHandler>,
	state_machine: Arc<OrderStatusMachine>,
}

impl OrderHandler {
	pub fn new(
		session: Arc<SessionClient>,
		auth: Arc<AuthHandler>,
		state_machine: Arc<OrderStatusMachine>,
	) -> Self {
		Self {
			session,
			auth,
			state_machine,
		}
	}

	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderError> {
		let envelope = self
			.session
			.request_envelope(ApiRequest::get(endpoints::order(order_id)))
			.await?;
		decode_order(&envelope)
	}

	/// Orders of the signed-in customer.
	pub async fn list_orders(&self) -> Result<Vec<Order>, OrderError> {
		let envelope = self
			.session
			.request_envelope(ApiRequest::get(endpoints::ORDERS))
			.await?;
		decode_orders(&envelope)
	}

	/// Orders of a workspace, for staff, managers and admins.
	pub async fn list_workspace_orders(&self, workspace_id: &str) -> Result<Vec<Order>, OrderError> {
		let envelope = self
			.session
			.request_envelope(ApiRequest::get(endpoints::workspace_orders(workspace_id)))
			.await?;
		decode_orders(&envelope)
	}

	/// Moves `order` to `target` as the signed-in actor.
	#[instrument(skip_all, fields(order_id = %truncate_id(&order.id)))]
	pub async fn change_status(&self, order: &Order, target: OrderStatus) -> Result<Order, OrderError> {
		let actor = self.auth.actor().await?;
		Ok(self.state_machine.apply_transition(order, target, &actor).await?)
	}

	/// Fetches the order, then moves it to `target` as the signed-in actor.
	pub async fn change_status_by_id(
		&self,
		order_id: &str,
		target: OrderStatus,
	) -> Result<Order, OrderError> {
		let order = self.get_order(order_id).await?;
		self.change_status(&order, target).await
	}
}

fn decode_order(envelope: &PlainEnvelope) -> Result<Order, OrderError> {
	let data = match envelope.data.get("order") {
		Some(order) if order.is_object() => order,
		_ => &envelope.data,
	};
	serde_json::from_value(data.clone()).map_err(|e| OrderError::InvalidResponse(e.to_string()))
}

/// Lists come back either as `data` itself or as `data.orders`.
fn decode_orders(envelope: &PlainEnvelope) -> Result<Vec<Order>, OrderError> {
	let list = match &envelope.data {
		Value::Array(_) => Some(&envelope.data),
		data => data.get("orders").filter(|orders| !orders.is_null()),
	};
	match list {
		Some(list) => serde_json::from_value(list.clone())
			.map_err(|e| OrderError::InvalidResponse(e.to_string())),
		None => Ok(Vec::new()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::state::DEFAULT_CANCELLATION_WINDOW_HOURS;
	use crate::test_support::{json_response, ScriptedSession};
	use chrono::{Duration, Utc};
	use serde_json::json;
	use storefront_types::{Role, SessionKey, UserProfile};

	fn order_json(id: &str, status: &str) -> Value {
		json!({
			"id": id,
			"status": status,
			"paymentStatus": "PENDING",
			"workspaceId": "ws-1",
			"createdAt": (Utc::now() - Duration::hours(1)).to_rfc3339()
		})
	}

	fn order_server() -> ScriptedSession {
		ScriptedSession::new(|request, _log| {
			Box::pin(async move {
				match request.route() {
					"/orders" => json_response(
						200,
						json!({ "data": [order_json("a", "PENDING"), order_json("b", "SHIPPED")] }),
					),
					"/orders/workspaces/ws-1/orders" => json_response(
						200,
						json!({ "data": { "orders": [order_json("c", "CONFIRMED")], "total": 1 } }),
					),
					"/orders/a" => json_response(200, json!({ "data": order_json("a", "PENDING") })),
					"/orders/workspaces/ws-1/orders/a/status" => json_response(
						200,
						json!({ "data": { "order": order_json("a", "DELIVERY") } }),
					),
					_ => json_response(404, json!({ "message": "Order not found" })),
				}
			})
		})
	}

	async fn handler(harness: &ScriptedSession, role: Role) -> OrderHandler {
		harness.sign_in("token", Some("refresh")).await;
		let user = UserProfile {
			id: "user-1".to_string(),
			email: "sam@example.com".to_string(),
			name: None,
			roles: vec![role],
			workspace_id: None,
		};
		harness.storage.store(SessionKey::User, &user).await.unwrap();
		harness.storage.store(SessionKey::ActiveRole, &role).await.unwrap();

		let auth = Arc::new(AuthHandler::new(
			harness.session.clone(),
			harness.storage.clone(),
			harness.event_bus.clone(),
		));
		let state_machine = Arc::new(OrderStatusMachine::new(
			harness.session.clone(),
			harness.storage.clone(),
			harness.event_bus.clone(),
			Duration::hours(DEFAULT_CANCELLATION_WINDOW_HOURS),
		));
		OrderHandler::new(harness.session.clone(), auth, state_machine)
	}

	#[tokio::test]
	async fn test_list_shapes() {
		let harness = order_server();
		let orders = handler(&harness, Role::Customer).await;

		let own = orders.list_orders().await.unwrap();
		assert_eq!(own.len(), 2);
		assert_eq!(own[1].status, OrderStatus::Delivery);

		let workspace = orders.list_workspace_orders("ws-1").await.unwrap();
		assert_eq!(workspace.len(), 1);
		assert_eq!(workspace[0].id, "c");
	}

	#[tokio::test]
	async fn test_change_status_by_id_as_staff() {
		let harness = order_server();
		let orders = handler(&harness, Role::Staff).await;

		let updated = orders
			.change_status_by_id("a", OrderStatus::Delivery)
			.await
			.unwrap();

		assert_eq!(updated.status, OrderStatus::Delivery);
		assert_eq!(
			harness.log.entries(),
			vec![
				"GET /orders/a Bearer token",
				"PATCH /orders/workspaces/ws-1/orders/a/status Bearer token",
			]
		);
	}

	#[tokio::test]
	async fn test_unknown_order_propagates_status() {
		let harness = order_server();
		let orders = handler(&harness, Role::Staff).await;

		let err = orders.get_order("zzz").await.unwrap_err();
		assert!(matches!(err, OrderError::Session(SessionError::Status { status: 404, .. })));
	}

	#[test]
	fn test_decode_orders_without_list() {
		let envelope = PlainEnvelope {
			data: json!({ "total": 0 }),
			message: None,
		};
		assert!(decode_orders(&envelope).unwrap().is_empty());
	}
}
