//! Authentication handler.
//!
//! Signs users in and out and keeps the non-credential session keys
//! (`user`, `activeRole`, `workspaceId`) in the client store. Tokens are
//! handed to the session client, which owns them from then on.

use crate::engine::event_bus::EventBus;
use crate::session::{SessionClient, SessionError};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use storefront_envelope::EnvelopeError;
use storefront_storage::{StorageError, StorageService};
use storefront_types::{
	endpoints, Actor, ApiRequest, AuthPayload, PlainEnvelope, Role, SessionEvent, SessionKey,
	SignInRequest, SignUpRequest, StorefrontEvent, UserProfile,
};
use thiserror::Error;

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
	#[error(transparent)]
	Session(#[from] SessionError),
	#[error("Envelope error: {0}")]
	Envelope(#[from] EnvelopeError),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	#[error("Unexpected response: {0}")]
	InvalidResponse(String),
	#[error("Authentication response carried no access token")]
	MissingToken,
	#[error("Not signed in")]
	NotSignedIn,
	#[error("No active role")]
	NoActiveRole,
	#[error("Role {0} is not granted to the signed-in user")]
	RoleNotGranted(Role),
}

/// Handles sign-in, sign-up, sign-out and the user's session preferences.
pub struct AuthHandler {
	session: Arc<SessionClient>,
	storage: Arc<StorageService>,
	event_bus: EventBus,
}

impl AuthHandler {
	pub fn new(session: Arc<SessionClient>, storage: Arc<StorageService>, event_bus: EventBus) -> Self {
		Self {
			session,
			storage,
			event_bus,
		}
	}

	/// Signs in with email and password.
	pub async fn sign_in(&self, credentials: &SignInRequest) -> Result<Option<UserProfile>, AuthError> {
		tracing::info!(email = %credentials.email, "Signing in");
		self.authenticate(endpoints::SIGN_IN, credentials.to_body()).await
	}

	/// Registers a new user and signs them in.
	pub async fn sign_up(&self, registration: &SignUpRequest) -> Result<Option<UserProfile>, AuthError> {
		tracing::info!(email = %registration.email, "Signing up");
		self.authenticate(endpoints::SIGN_UP, registration.to_body()).await
	}

	async fn authenticate(&self, path: &str, body: Value) -> Result<Option<UserProfile>, AuthError> {
		let body = self.session.envelope().seal_body(&body)?;
		let response = self.session.request_public(ApiRequest::post(path, body)).await?;
		let envelope = self.session.decode(&response)?;

		let payload: AuthPayload = envelope
			.data_as()
			.map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
		let token = payload
			.token
			.filter(|token| !token.is_empty())
			.ok_or(AuthError::MissingToken)?;
		self.session.store_tokens(token, payload.refresh_token).await?;

		if let Some(user) = &payload.user {
			self.remember_user(user).await?;
		}

		let user_id = payload.user.as_ref().map(|user| user.id.clone());
		tracing::info!(user_id = user_id.as_deref().unwrap_or("-"), "Signed in");
		self.event_bus
			.publish(StorefrontEvent::Session(SessionEvent::SignedIn { user_id }))
			.ok();
		Ok(payload.user)
	}

	/// Fetches the signed-in user's profile and stores it.
	pub async fn me(&self) -> Result<UserProfile, AuthError> {
		let envelope = self.session.request_envelope(ApiRequest::get(endpoints::ME)).await?;
		let user = profile_from(&envelope)?;
		self.remember_user(&user).await?;
		Ok(user)
	}

	/// Stores `user`, and defaults the active role and workspace from it.
	///
	/// An active role the user still holds is kept.
	async fn remember_user(&self, user: &UserProfile) -> Result<(), AuthError> {
		self.storage.store(SessionKey::User, user).await?;

		let active = self.active_role().await?;
		if !active.is_some_and(|role| user.has_role(role)) {
			match user.roles.first() {
				Some(role) => self.storage.store(SessionKey::ActiveRole, role).await?,
				None => self.storage.remove(SessionKey::ActiveRole).await?,
			}
		}

		if let Some(workspace_id) = &user.workspace_id {
			self.storage.store(SessionKey::WorkspaceId, workspace_id).await?;
		}
		Ok(())
	}

	/// Forgets every session key.
	pub async fn sign_out(&self) -> Result<(), AuthError> {
		self.session.clear().await?;
		self.storage.clear(SessionKey::all()).await?;

		tracing::info!("Signed out");
		self.event_bus
			.publish(StorefrontEvent::Session(SessionEvent::SignedOut))
			.ok();
		Ok(())
	}

	/// The stored profile of the signed-in user.
	pub async fn current_user(&self) -> Result<Option<UserProfile>, AuthError> {
		Ok(self.storage.retrieve(SessionKey::User).await?)
	}

	/// Makes `role` the active one. The user must hold it.
	pub async fn switch_role(&self, role: Role) -> Result<(), AuthError> {
		let user = self.current_user().await?.ok_or(AuthError::NotSignedIn)?;
		if !user.has_role(role) {
			return Err(AuthError::RoleNotGranted(role));
		}

		self.storage.store(SessionKey::ActiveRole, &role).await?;
		tracing::info!(role = %role, "Switched active role");
		Ok(())
	}

	pub async fn active_role(&self) -> Result<Option<Role>, AuthError> {
		Ok(self.storage.retrieve(SessionKey::ActiveRole).await?)
	}

	pub async fn set_workspace(&self, workspace_id: &str) -> Result<(), AuthError> {
		self.storage
			.store(SessionKey::WorkspaceId, &workspace_id.to_string())
			.await?;
		Ok(())
	}

	pub async fn active_workspace(&self) -> Result<Option<String>, AuthError> {
		Ok(self.storage.retrieve(SessionKey::WorkspaceId).await?)
	}

	/// The signed-in user acting under the active role.
	pub async fn actor(&self) -> Result<Actor, AuthError> {
		let user = self.current_user().await?.ok_or(AuthError::NotSignedIn)?;
		let role = self.active_role().await?.ok_or(AuthError::NoActiveRole)?;
		Ok(Actor::new(user.id, role))
	}
}

/// Reads the profile from `data` or `data.user`.
fn profile_from(envelope: &PlainEnvelope) -> Result<UserProfile, AuthError> {
	match envelope.data.get("user") {
		Some(user) if user.is_object() => UserProfile::deserialize(user),
		_ => envelope.data_as(),
	}
	.map_err(|e| AuthError::InvalidResponse(e.to_string()))
}
