//! Core of the storefront client.
//!
//! This crate ties the storefront services together: the session client that
//! authorizes every request and refreshes expired tokens with a single call
//! no matter how many requests failed, the order status machine that guards
//! every status change, and the handlers the application calls. The
//! [`StorefrontBuilder`] assembles a [`StorefrontClient`] from configuration.

pub mod builder;
pub mod engine;
pub mod handlers;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use builder::{BuilderError, StorefrontBuilder, StorefrontFactories};
pub use engine::{event_bus::EventBus, EngineError, StorefrontClient};
pub use handlers::{AuthError, AuthHandler, OrderError, OrderHandler};
pub use session::{SessionClient, SessionCoordinator, SessionError};
pub use state::{OrderStateError, OrderStatusMachine};
