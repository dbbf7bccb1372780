//! Order status rules.
//!
//! Every place an order status can change goes through the
//! [`OrderStatusMachine`], which enforces the legal transitions per acting
//! role before anything is sent to the server.

pub mod order;

pub use order::{
	allowed_transitions, allowed_transitions_for, can_cancel, can_cancel_within, OrderStateError,
	OrderStatusMachine, DEFAULT_CANCELLATION_WINDOW_HOURS,
};
