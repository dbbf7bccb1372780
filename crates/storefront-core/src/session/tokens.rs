//! Access and refresh token holder.
//!
//! Tokens are cached in memory for synchronous reads and persisted to the
//! client store under `token` and `refreshToken` so that a session outlives
//! the process when the store does.

use super::SessionError;
use std::sync::{Arc, PoisonError, RwLock};
use storefront_storage::StorageService;
use storefront_types::{SecretString, SessionKey};

#[derive(Default)]
struct TokenPair {
	access: Option<SecretString>,
	refresh: Option<SecretString>,
}

/// Current token pair of the session.
pub struct TokenStore {
	storage: Arc<StorageService>,
	cache: RwLock<TokenPair>,
}

impl TokenStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			cache: RwLock::new(TokenPair::default()),
		}
	}

	/// Loads persisted tokens into memory. Returns whether an access token was found.
	pub async fn restore(&self) -> Result<bool, SessionError> {
		let access = self
			.storage
			.retrieve_secret(SessionKey::Token)
			.await
			.map_err(|e| SessionError::Storage(e.to_string()))?;
		let refresh = self
			.storage
			.retrieve_secret(SessionKey::RefreshToken)
			.await
			.map_err(|e| SessionError::Storage(e.to_string()))?;

		let found = access.is_some();
		*self.cache.write().unwrap_or_else(PoisonError::into_inner) = TokenPair { access, refresh };
		Ok(found)
	}

	pub fn access_token(&self) -> Option<SecretString> {
		self.cache
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.access
			.clone()
	}

	pub fn refresh_token(&self) -> Option<SecretString> {
		self.cache
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.refresh
			.clone()
	}

	/// Replaces the token pair in memory, then persists it.
	///
	/// A `None` refresh token removes the stored one.
	pub async fn store(
		&self,
		access: SecretString,
		refresh: Option<SecretString>,
	) -> Result<(), SessionError> {
		{
			let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
			cache.access = Some(access.clone());
			cache.refresh = refresh.clone();
		}

		self.storage
			.store_secret(SessionKey::Token, &access)
			.await
			.map_err(|e| SessionError::Storage(e.to_string()))?;
		let persisted = match &refresh {
			Some(refresh) => self.storage.store_secret(SessionKey::RefreshToken, refresh).await,
			None => self.storage.remove(SessionKey::RefreshToken).await,
		};
		persisted.map_err(|e| SessionError::Storage(e.to_string()))
	}

	/// Forgets both tokens in memory and in the store.
	pub async fn clear(&self) -> Result<(), SessionError> {
		*self.cache.write().unwrap_or_else(PoisonError::into_inner) = TokenPair::default();
		self.storage
			.clear(SessionKey::tokens())
			.await
			.map_err(|e| SessionError::Storage(e.to_string()))
	}
}
