//! Event types published by the storefront client.
//!
//! Events flow through the client's event bus so that the surrounding
//! application (navigation, notifications, views) can react to session and
//! order changes without being called directly by the core.

use crate::{OrderStatus, Role};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StorefrontEvent {
	/// Events from the session client and authentication handler.
	Session(SessionEvent),
	/// Events from the order handler.
	Order(OrderEvent),
}

/// Events related to the authenticated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
	/// A user signed in or registered.
	SignedIn { user_id: Option<String> },
	/// The access token was refreshed.
	TokensRefreshed,
	/// The session could not be recovered and was torn down.
	///
	/// The application is expected to navigate to its login view.
	Invalidated { reason: String },
	/// The user signed out.
	SignedOut,
}

/// Events related to orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderEvent {
	/// An order moved to a new status.
	StatusChanged {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
		role: Role,
	},
}
