//! Order types for the storefront client.
//!
//! Defines orders as returned by the REST API together with the closed set of
//! order statuses, payment statuses and acting roles used by the order status
//! machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a status or role name cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseEnumError {
	/// What was being parsed ("order status", "role", ...).
	pub kind: &'static str,
	/// The rejected input.
	pub value: String,
}

/// Status of an order.
///
/// `Delivery` is reported as `SHIPPED` by some views; both names decode to the
/// same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	/// Order has been placed and awaits handling.
	Pending,
	/// Order is being prepared.
	Processing,
	/// Order has been confirmed by a manager.
	Confirmed,
	/// Order is out for delivery.
	#[serde(alias = "SHIPPED")]
	Delivery,
	/// Order has reached the customer.
	Delivered,
	/// Order has been cancelled.
	Cancelled,
}

impl OrderStatus {
	/// Every status, in lifecycle order.
	pub const ALL: [OrderStatus; 6] = [
		OrderStatus::Pending,
		OrderStatus::Processing,
		OrderStatus::Confirmed,
		OrderStatus::Delivery,
		OrderStatus::Delivered,
		OrderStatus::Cancelled,
	];

	/// Returns the wire name of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "PENDING",
			OrderStatus::Processing => "PROCESSING",
			OrderStatus::Confirmed => "CONFIRMED",
			OrderStatus::Delivery => "DELIVERY",
			OrderStatus::Delivered => "DELIVERED",
			OrderStatus::Cancelled => "CANCELLED",
		}
	}

	/// Terminal statuses have no outgoing transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"PENDING" => Ok(OrderStatus::Pending),
			"PROCESSING" => Ok(OrderStatus::Processing),
			"CONFIRMED" => Ok(OrderStatus::Confirmed),
			"DELIVERY" | "SHIPPED" => Ok(OrderStatus::Delivery),
			"DELIVERED" => Ok(OrderStatus::Delivered),
			"CANCELLED" => Ok(OrderStatus::Cancelled),
			_ => Err(ParseEnumError {
				kind: "order status",
				value: s.to_string(),
			}),
		}
	}
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
	#[default]
	Pending,
	Paid,
	Failed,
	Refunded,
}

/// Role a user acts under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
	#[serde(alias = "admin")]
	Admin,
	#[serde(alias = "manager")]
	Manager,
	#[serde(alias = "staff")]
	Staff,
	#[serde(alias = "customer")]
	Customer,
}

impl Role {
	/// Returns the wire name of the role.
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Admin => "ADMIN",
			Role::Manager => "MANAGER",
			Role::Staff => "STAFF",
			Role::Customer => "CUSTOMER",
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"ADMIN" => Ok(Role::Admin),
			"MANAGER" => Ok(Role::Manager),
			"STAFF" => Ok(Role::Staff),
			"CUSTOMER" => Ok(Role::Customer),
			_ => Err(ParseEnumError {
				kind: "role",
				value: s.to_string(),
			}),
		}
	}
}

/// The user performing an order mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
	/// Identifier of the acting user.
	pub user_id: String,
	/// Role the user is currently acting under.
	pub role: Role,
}

impl Actor {
	pub fn new(user_id: impl Into<String>, role: Role) -> Self {
		Self {
			user_id: user_id.into(),
			role,
		}
	}
}

/// An order as exchanged with the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Unique identifier for this order.
	#[serde(alias = "_id")]
	pub id: String,
	/// Current status of the order.
	pub status: OrderStatus,
	/// Payment state of the order.
	#[serde(default)]
	pub payment_status: PaymentStatus,
	/// Staff member the order is assigned to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub assigned_staff_id: Option<String>,
	/// Customer who placed the order.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_id: Option<String>,
	/// Workspace the order belongs to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub workspace_id: Option<String>,
	/// When the order was placed.
	pub created_at: DateTime<Utc>,
	/// When the order was last modified.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
	/// Returns a copy of this order moved to `status`.
	pub fn with_status(&self, status: OrderStatus) -> Order {
		Order {
			status,
			updated_at: Some(Utc::now()),
			..self.clone()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_shipped_alias_decodes_to_delivery() {
		let status: OrderStatus = serde_json::from_value(json!("SHIPPED")).unwrap();
		assert_eq!(status, OrderStatus::Delivery);
		assert_eq!(serde_json::to_value(status).unwrap(), json!("DELIVERY"));
		assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Delivery);
	}

	#[test]
	fn test_terminal_statuses() {
		let terminal: Vec<_> = OrderStatus::ALL
			.iter()
			.filter(|s| s.is_terminal())
			.collect();
		assert_eq!(terminal, vec![&OrderStatus::Delivered, &OrderStatus::Cancelled]);
	}

	#[test]
	fn test_order_from_api_json() {
		let order: Order = serde_json::from_value(json!({
			"_id": "ord-1",
			"status": "PROCESSING",
			"paymentStatus": "PAID",
			"assignedStaffId": "staff-9",
			"createdAt": "2026-10-19T08:00:00Z"
		}))
		.unwrap();

		assert_eq!(order.id, "ord-1");
		assert_eq!(order.status, OrderStatus::Processing);
		assert_eq!(order.payment_status, PaymentStatus::Paid);
		assert_eq!(order.assigned_staff_id.as_deref(), Some("staff-9"));
		assert!(order.customer_id.is_none());
	}

	#[test]
	fn test_role_parsing() {
		assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
		let role: Role = serde_json::from_value(json!("staff")).unwrap();
		assert_eq!(role, Role::Staff);

		let err = "owner".parse::<Role>().unwrap_err();
		assert_eq!(err.to_string(), "Unknown role: owner");
	}
}
