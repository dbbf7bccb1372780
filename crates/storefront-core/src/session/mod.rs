//! Authenticated session handling.
//!
//! The [`SessionClient`] attaches the bearer token to every outbound request
//! and recovers from an expired token once per request. Concurrent
//! expirations share a single refresh call, coordinated by the
//! [`SessionCoordinator`]: the first request to see a 401 performs the
//! refresh, later ones wait for its outcome and replay with the new token.

pub mod client;
pub mod coordinator;
pub mod tokens;

pub use client::SessionClient;
pub use coordinator::SessionCoordinator;
pub use tokens::TokenStore;

use thiserror::Error;

/// Errors surfaced by the session client.
///
/// Cloneable so that one refresh outcome can be handed to every queued
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
	/// The refresh endpoint is managed by the client itself.
	#[error("Requests to the refresh endpoint cannot be issued through the session")]
	RefreshEndpoint,
	/// The server rejected the access token. Triggers a refresh.
	#[error("Authorization expired")]
	AuthorizationExpired,
	/// The session could not be recovered and has been torn down.
	#[error("Authorization failed: {0}")]
	AuthorizationFailed(String),
	/// The refreshing task was dropped before the refresh settled.
	#[error("Token refresh was aborted")]
	RefreshAborted,
	/// The server answered with a non-success status other than 401.
	#[error("Request failed with status {status}: {message}")]
	Status { status: u16, message: String },
	/// The request could not be performed.
	#[error("Transport error: {0}")]
	Transport(String),
	/// A response body could not be decoded.
	#[error("Envelope error: {0}")]
	Envelope(String),
	/// The client store failed.
	#[error("Storage error: {0}")]
	Storage(String),
}
