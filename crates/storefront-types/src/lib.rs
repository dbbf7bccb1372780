//! Common types module for the storefront client.
//!
//! This module defines the data types shared by every storefront crate:
//! orders and their statuses, roles, session keys, request and response
//! descriptors, body envelopes, events and the configuration validation
//! framework used by pluggable implementations.

/// Request and response descriptors plus the REST paths consumed by the client.
pub mod api;
/// Encrypted and plain response body envelopes.
pub mod envelope;
/// Event types published on the client event bus.
pub mod events;
/// Order, status, payment and role types.
pub mod order;
/// Registry trait for named implementations.
pub mod registry;
/// Redacting wrapper for tokens and passwords.
pub mod secret_string;
/// Session keys, token payloads and user profiles.
pub mod session;
/// Formatting helpers for log output.
pub mod utils;
/// Configuration validation types for implementation-specific TOML tables.
pub mod validation;

pub use api::*;
pub use envelope::*;
pub use events::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use session::*;
pub use utils::truncate_id;
pub use validation::*;
