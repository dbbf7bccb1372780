//! Request-issuing side of the session.

use super::coordinator::RefreshTicket;
use super::{SessionCoordinator, SessionError, TokenStore};
use crate::engine::event_bus::EventBus;
use serde_json::json;
use std::sync::Arc;
use storefront_envelope::EnvelopeService;
use storefront_storage::StorageService;
use storefront_transport::TransportService;
use storefront_types::{
	endpoints, ApiRequest, AuthPayload, HttpResponse, PlainEnvelope, SecretString, SessionEvent,
	StorefrontEvent, AUTHORIZATION_HEADER,
};

/// Issues API requests on behalf of the signed-in user.
///
/// Every request carries `Authorization: Bearer <token>` when a token is
/// held. A 401 triggers at most one refresh per request; concurrent 401s
/// share a single refresh call. When the session cannot be recovered both
/// tokens are cleared and [`SessionEvent::Invalidated`] is published.
pub struct SessionClient {
	transport: Arc<TransportService>,
	envelope: Arc<EnvelopeService>,
	tokens: TokenStore,
	coordinator: SessionCoordinator,
	event_bus: EventBus,
}

impl SessionClient {
	pub fn new(
		transport: Arc<TransportService>,
		envelope: Arc<EnvelopeService>,
		storage: Arc<StorageService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			transport,
			envelope,
			tokens: TokenStore::new(storage),
			coordinator: SessionCoordinator::new(),
			event_bus,
		}
	}

	/// Loads a persisted session. Returns whether an access token was found.
	pub async fn restore(&self) -> Result<bool, SessionError> {
		self.tokens.restore().await
	}

	/// Whether an access token is held.
	pub fn is_authenticated(&self) -> bool {
		self.tokens.access_token().is_some()
	}

	/// The envelope service used for request and response bodies.
	pub fn envelope(&self) -> &EnvelopeService {
		&self.envelope
	}

	/// Whether a token refresh is currently in flight.
	pub fn is_refreshing(&self) -> bool {
		self.coordinator.is_refreshing()
	}

	/// Stores the token pair returned by sign-in or sign-up.
	pub async fn store_tokens(
		&self,
		access: SecretString,
		refresh: Option<SecretString>,
	) -> Result<(), SessionError> {
		self.tokens.store(access, refresh).await
	}

	/// Forgets both tokens without publishing an event.
	pub async fn clear(&self) -> Result<(), SessionError> {
		self.tokens.clear().await
	}

	/// Performs an authorized request.
	///
	/// Returns the response for 2xx statuses. A 401 is recovered from once
	/// through a token refresh; any other status is
	/// [`SessionError::Status`].
	pub async fn request(&self, request: ApiRequest) -> Result<HttpResponse, SessionError> {
		if request.is_refresh() {
			return Err(SessionError::RefreshEndpoint);
		}

		let sent_with = self.tokens.access_token();
		match self.dispatch(&request, sent_with.as_ref()).await {
			Err(SessionError::AuthorizationExpired) if !request.retried => {
				self.recover(request, sent_with).await
			},
			Err(SessionError::AuthorizationExpired) => {
				Err(self.invalidate("retried request was rejected").await)
			},
			other => other,
		}
	}

	/// Performs an authorized request and decodes its body.
	pub async fn request_envelope(&self, request: ApiRequest) -> Result<PlainEnvelope, SessionError> {
		let response = self.request(request).await?;
		self.decode(&response)
	}

	/// Performs a request without token or refresh handling.
	///
	/// Used for sign-in and sign-up, where a 401 means bad credentials.
	pub async fn request_public(&self, request: ApiRequest) -> Result<HttpResponse, SessionError> {
		if request.is_refresh() {
			return Err(SessionError::RefreshEndpoint);
		}
		let response = self.send(&request).await?;
		if response.is_success() {
			Ok(response)
		} else {
			Err(self.status_error(&response))
		}
	}

	/// Decodes a response body through the envelope service.
	pub fn decode(&self, response: &HttpResponse) -> Result<PlainEnvelope, SessionError> {
		self.envelope
			.decode_response(response)
			.map_err(|e| SessionError::Envelope(e.to_string()))
	}

	/// Sends `request` with `token` and classifies the response.
	async fn dispatch(
		&self,
		request: &ApiRequest,
		token: Option<&SecretString>,
	) -> Result<HttpResponse, SessionError> {
		let outbound = match token {
			Some(token) => request
				.clone()
				.with_header(AUTHORIZATION_HEADER, token.bearer()),
			None => request.clone(),
		};

		let response = self.send(&outbound).await?;
		if response.is_success() {
			Ok(response)
		} else if response.is_unauthorized() {
			tracing::debug!(method = %request.method, path = %request.path, "Access token rejected");
			Err(SessionError::AuthorizationExpired)
		} else {
			Err(self.status_error(&response))
		}
	}

	async fn send(&self, request: &ApiRequest) -> Result<HttpResponse, SessionError> {
		self.transport
			.send(request)
			.await
			.map_err(|e| SessionError::Transport(e.to_string()))
	}

	fn status_error(&self, response: &HttpResponse) -> SessionError {
		let message = self
			.envelope
			.decode_response(response)
			.ok()
			.and_then(|envelope| envelope.message)
			.unwrap_or_else(|| response.error_message());
		SessionError::Status {
			status: response.status,
			message,
		}
	}

	/// Obtains a usable token after a 401 and replays `request` once with it.
	async fn recover(
		&self,
		request: ApiRequest,
		sent_with: Option<SecretString>,
	) -> Result<HttpResponse, SessionError> {
		let token = match self.coordinator.join(sent_with.as_ref(), &self.tokens) {
			RefreshTicket::Current(token) => token,
			RefreshTicket::Follower(wait) => wait.await.map_err(|_| SessionError::RefreshAborted)??,
			RefreshTicket::Leader(guard) => {
				let outcome = self.refresh().await;
				guard.settle(&outcome);
				outcome?
			},
		};

		let replay = ApiRequest {
			retried: true,
			..request
		};
		match self.dispatch(&replay, Some(&token)).await {
			Err(SessionError::AuthorizationExpired) => {
				Err(self.invalidate("replayed request was rejected").await)
			},
			other => other,
		}
	}

	/// Exchanges the refresh token for a new access token.
	///
	/// On failure the session is torn down before the outcome is returned,
	/// so queued requests observe the cleared state.
	async fn refresh(&self) -> Result<SecretString, SessionError> {
		let Some(refresh_token) = self.tokens.refresh_token() else {
			return Err(self.invalidate("no refresh token").await);
		};

		tracing::info!("Refreshing access token");
		let (access, rotated) = match self.exchange(&refresh_token).await {
			Ok(tokens) => tokens,
			Err(reason) => return Err(self.invalidate(&reason).await),
		};

		if let Err(e) = self
			.tokens
			.store(access.clone(), Some(rotated.unwrap_or(refresh_token)))
			.await
		{
			tracing::warn!(error = %e, "Refreshed tokens could not be persisted");
		}

		tracing::info!("Access token refreshed");
		self.event_bus
			.publish(StorefrontEvent::Session(SessionEvent::TokensRefreshed))
			.ok();
		Ok(access)
	}

	/// Calls the refresh endpoint; the error is the teardown reason.
	async fn exchange(
		&self,
		refresh_token: &SecretString,
	) -> Result<(SecretString, Option<SecretString>), String> {
		let request = ApiRequest::post(
			endpoints::REFRESH_TOKEN,
			json!({ "refreshToken": refresh_token.expose_secret() }),
		);

		let response = self
			.send(&request)
			.await
			.map_err(|e| format!("refresh request failed: {}", e))?;
		if !response.is_success() {
			return Err(format!(
				"refresh rejected with status {}: {}",
				response.status,
				response.error_message()
			));
		}

		let payload: AuthPayload = self
			.decode(&response)
			.and_then(|envelope| {
				envelope
					.data_as()
					.map_err(|e| SessionError::Envelope(e.to_string()))
			})
			.map_err(|e| format!("refresh response unreadable: {}", e))?;

		let access = payload
			.token
			.filter(|token| !token.is_empty())
			.ok_or_else(|| "refresh response carried no access token".to_string())?;
		Ok((access, payload.refresh_token.filter(|token| !token.is_empty())))
	}

	/// Tears the session down and returns the error to report.
	async fn invalidate(&self, reason: &str) -> SessionError {
		tracing::warn!(reason, "Session invalidated");
		if let Err(e) = self.tokens.clear().await {
			tracing::warn!(error = %e, "Failed to clear session tokens");
		}
		self.event_bus
			.publish(StorefrontEvent::Session(SessionEvent::Invalidated {
				reason: reason.to_string(),
			}))
			.ok();
		SessionError::AuthorizationFailed(reason.to_string())
	}
}
