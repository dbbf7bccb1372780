//! Lifecycle management for the storefront client.
//!
//! Handles startup and shutdown of a client: restoring a persisted session
//! and noting a refresh that is still in flight on the way out.

use super::{EngineError, StorefrontClient};

impl StorefrontClient {
	/// Restores a persisted session.
	///
	/// Returns whether a signed-in session was restored.
	pub async fn initialize(&self) -> Result<bool, EngineError> {
		tracing::info!(client_id = %self.config.client.id, "Initializing storefront client");

		let restored = self.session.restore().await?;
		if restored {
			tracing::info!("Restored persisted session");
		}
		Ok(restored)
	}

	/// Performs cleanup operations.
	pub async fn shutdown(&self) -> Result<(), EngineError> {
		tracing::info!(client_id = %self.config.client.id, "Shutting down storefront client");
		if self.session.is_refreshing() {
			tracing::warn!("Shutting down while a token refresh is in flight");
		}
		Ok(())
	}
}
