//! Handlers for the operations the client exposes.
//!
//! Authentication keeps the signed-in user and their session preferences;
//! the order handler reads orders and routes status changes through the
//! order status machine.

pub mod auth;
pub mod order;

pub use auth::{AuthError, AuthHandler};
pub use order::{OrderError, OrderHandler};
