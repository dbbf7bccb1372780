//! Order status machine.
//!
//! Decides which status changes an actor may make and persists accepted
//! changes through the session client. Orders move
//! Pending -> Processing -> Confirmed -> Delivery -> Delivered, may be
//! cancelled on the way, and never leave Delivered or Cancelled.

use crate::engine::event_bus::EventBus;
use crate::session::{SessionClient, SessionError};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use storefront_storage::StorageService;
use storefront_types::{
	endpoints, truncate_id, Actor, ApiRequest, Order, OrderEvent, OrderStatus, PlainEnvelope, Role,
	SessionKey, StorefrontEvent,
};
use thiserror::Error;
use tracing::instrument;

/// Hours after placement during which a customer may cancel.
pub const DEFAULT_CANCELLATION_WINDOW_HOURS: i64 = 8;

/// Errors that can occur while changing an order's status.
#[derive(Debug, Error)]
pub enum OrderStateError {
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Order is in terminal state {0}")]
	TerminalState(OrderStatus),
	#[error("Cancellation window has expired")]
	CancellationWindowExpired,
	#[error("Order {0} belongs to another customer")]
	NotOrderOwner(String),
	#[error("No workspace known for order {0}")]
	MissingWorkspace(String),
	#[error("Storage error: {0}")]
	Storage(String),
	#[error(transparent)]
	Session(#[from] SessionError),
}

/// Transitions available to staff.
static STAFF_TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	use OrderStatus::*;

	let mut m = HashMap::new();
	m.insert(Pending, HashSet::from([Delivery, Delivered, Cancelled]));
	m.insert(Processing, HashSet::from([Delivery, Delivered, Cancelled]));
	m.insert(Confirmed, HashSet::new());
	m.insert(Delivery, HashSet::from([Delivered, Cancelled]));
	m.insert(Delivered, HashSet::new());
	m.insert(Cancelled, HashSet::new());
	m
});

/// Transitions managers and admins have on top of the staff ones.
static MANAGER_TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	use OrderStatus::*;

	let mut m = HashMap::new();
	m.insert(Pending, HashSet::from([Processing, Confirmed]));
	m.insert(Processing, HashSet::from([Confirmed]));
	m.insert(Confirmed, HashSet::from([Delivery, Delivered, Cancelled]));
	m
});

/// Statuses staff may move an order to from `status`.
pub fn allowed_transitions(status: OrderStatus) -> HashSet<OrderStatus> {
	STAFF_TRANSITIONS.get(&status).cloned().unwrap_or_default()
}

/// Statuses `role` may move an order to from `status`.
///
/// Customers get none: they can only cancel, under [`can_cancel`].
pub fn allowed_transitions_for(status: OrderStatus, role: Role) -> HashSet<OrderStatus> {
	match role {
		Role::Customer => HashSet::new(),
		Role::Staff => allowed_transitions(status),
		Role::Manager | Role::Admin => {
			let mut allowed = allowed_transitions(status);
			if let Some(extra) = MANAGER_TRANSITIONS.get(&status) {
				allowed.extend(extra.iter().copied());
			}
			allowed
		},
	}
}

/// Whether a customer may still cancel `order` at `now` under the default window.
pub fn can_cancel(order: &Order, now: DateTime<Utc>) -> bool {
	can_cancel_within(order, now, Duration::hours(DEFAULT_CANCELLATION_WINDOW_HOURS))
}

/// Whether `order` is not cancelled and was placed at most `window` before `now`.
pub fn can_cancel_within(order: &Order, now: DateTime<Utc>, window: Duration) -> bool {
	order.status != OrderStatus::Cancelled && now - order.created_at <= window
}

/// Validates and persists order status changes.
pub struct OrderStatusMachine {
	session: Arc<SessionClient>,
	storage: Arc<StorageService>,
	event_bus: EventBus,
	cancellation_window: Duration,
}

impl OrderStatusMachine {
	pub fn new(
		session: Arc<SessionClient>,
		storage: Arc<StorageService>,
		event_bus: EventBus,
		cancellation_window: Duration,
	) -> Self {
		Self {
			session,
			storage,
			event_bus,
			cancellation_window,
		}
	}

	/// Whether a customer may still cancel `order` at `now`.
	pub fn can_cancel(&self, order: &Order, now: DateTime<Utc>) -> bool {
		can_cancel_within(order, now, self.cancellation_window)
	}

	/// Checks whether `actor` may move `order` to `target` at `now`.
	pub fn validate(
		&self,
		order: &Order,
		target: OrderStatus,
		actor: &Actor,
		now: DateTime<Utc>,
	) -> Result<(), OrderStateError> {
		if order.status.is_terminal() {
			return Err(OrderStateError::TerminalState(order.status));
		}

		if actor.role == Role::Customer {
			if target != OrderStatus::Cancelled {
				return Err(OrderStateError::InvalidTransition {
					from: order.status,
					to: target,
				});
			}
			if let Some(owner) = &order.customer_id {
				if *owner != actor.user_id {
					return Err(OrderStateError::NotOrderOwner(order.id.clone()));
				}
			}
			if !self.can_cancel(order, now) {
				return Err(OrderStateError::CancellationWindowExpired);
			}
			return Ok(());
		}

		if !allowed_transitions_for(order.status, actor.role).contains(&target) {
			return Err(OrderStateError::InvalidTransition {
				from: order.status,
				to: target,
			});
		}
		Ok(())
	}

	/// Validates the change locally, then persists it.
	///
	/// Returns the order as reported by the server, or the local order with
	/// the new status when the response carries none.
	#[instrument(skip_all, fields(order_id = %truncate_id(&order.id), to = %target))]
	pub async fn apply_transition(
		&self,
		order: &Order,
		target: OrderStatus,
		actor: &Actor,
	) -> Result<Order, OrderStateError> {
		if let Err(e) = self.validate(order, target, actor, Utc::now()) {
			tracing::warn!(from = %order.status, role = %actor.role, error = %e, "Rejected status change");
			return Err(e);
		}

		let request = match actor.role {
			Role::Customer => ApiRequest::patch(endpoints::order_cancel(&order.id)),
			_ => {
				let workspace_id = self.workspace_for(order).await?;
				ApiRequest::patch(endpoints::workspace_order_status(&workspace_id, &order.id))
					.with_body(json!({ "status": target }))
			},
		};

		let envelope = self.session.request_envelope(request).await?;
		let updated = updated_order(&envelope).unwrap_or_else(|| order.with_status(target));

		tracing::info!(
			from = %order.status,
			stored = %updated.status,
			role = %actor.role,
			"Order status changed"
		);
		self.event_bus
			.publish(StorefrontEvent::Order(OrderEvent::StatusChanged {
				order_id: order.id.clone(),
				from: order.status,
				to: updated.status,
				role: actor.role,
			}))
			.ok();

		Ok(updated)
	}

	/// The order's workspace, else the session's active one.
	async fn workspace_for(&self, order: &Order) -> Result<String, OrderStateError> {
		if let Some(workspace_id) = &order.workspace_id {
			return Ok(workspace_id.clone());
		}
		self.storage
			.retrieve::<String>(SessionKey::WorkspaceId)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))?
			.ok_or_else(|| OrderStateError::MissingWorkspace(order.id.clone()))
	}
}

/// Reads the order from `data` or `data.order`.
fn updated_order(envelope: &PlainEnvelope) -> Option<Order> {
	envelope.data_as::<Order>().ok().or_else(|| {
		envelope
			.data
			.get("order")
			.and_then(|order| serde_json::from_value(order.clone()).ok())
	})
}
