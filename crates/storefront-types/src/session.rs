//! Session types for the storefront client.
//!
//! Covers the keys the client store is addressed by, the token payloads the
//! authentication endpoints return, and the profile of the signed-in user.

use crate::{Role, SecretString};
use serde::{Deserialize, Serialize};

/// Keys of the client-side key-value store.
///
/// Only `Token` and `RefreshToken` are written by the session client; the
/// remaining keys belong to the authentication handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
	/// Current access token.
	Token,
	/// Refresh token used to obtain a new access token.
	RefreshToken,
	/// Profile of the signed-in user.
	User,
	/// Role the user currently acts under.
	ActiveRole,
	/// Workspace the user currently operates in.
	WorkspaceId,
}

impl SessionKey {
	/// Returns the string representation of the key.
	pub fn as_str(&self) -> &'static str {
		match self {
			SessionKey::Token => "token",
			SessionKey::RefreshToken => "refreshToken",
			SessionKey::User => "user",
			SessionKey::ActiveRole => "activeRole",
			SessionKey::WorkspaceId => "workspaceId",
		}
	}

	/// Returns an iterator over every key.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Token,
			Self::RefreshToken,
			Self::User,
			Self::ActiveRole,
			Self::WorkspaceId,
		]
		.into_iter()
	}

	/// Keys holding credentials.
	pub fn tokens() -> [SessionKey; 2] {
		[Self::Token, Self::RefreshToken]
	}
}

/// Token-bearing payload returned by sign-in, sign-up and refresh.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
	/// New access token.
	#[serde(default, alias = "accessToken")]
	pub token: Option<SecretString>,
	/// New refresh token, when the server rotates it.
	#[serde(default)]
	pub refresh_token: Option<SecretString>,
	/// Profile of the authenticated user, when included.
	#[serde(default)]
	pub user: Option<UserProfile>,
}

/// The signed-in user as reported by `/auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
	#[serde(alias = "_id")]
	pub id: String,
	pub email: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Roles granted to the user.
	#[serde(default)]
	pub roles: Vec<Role>,
	/// Default workspace of the user.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub workspace_id: Option<String>,
}

impl UserProfile {
	pub fn has_role(&self, role: Role) -> bool {
		self.roles.contains(&role)
	}
}

/// Credentials submitted to `/auth/signin`.
#[derive(Debug, Clone)]
pub struct SignInRequest {
	pub email: String,
	pub password: SecretString,
}

impl SignInRequest {
	pub fn new(email: impl Into<String>, password: impl Into<SecretString>) -> Self {
		Self {
			email: email.into(),
			password: password.into(),
		}
	}

	/// Builds the JSON body sent to the server.
	pub fn to_body(&self) -> serde_json::Value {
		serde_json::json!({
			"email": self.email,
			"password": self.password.expose_secret(),
		})
	}
}

/// Registration submitted to `/auth/signup`.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
	pub name: String,
	pub email: String,
	pub password: SecretString,
	/// Role requested at registration, customers when absent.
	pub role: Option<Role>,
}

impl SignUpRequest {
	/// Builds the JSON body sent to the server.
	pub fn to_body(&self) -> serde_json::Value {
		let mut body = serde_json::json!({
			"name": self.name,
			"email": self.email,
			"password": self.password.expose_secret(),
		});
		if let Some(role) = self.role {
			body["role"] = serde_json::Value::String(role.as_str().to_string());
		}
		body
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_session_key_names() {
		let names: Vec<_> = SessionKey::all().map(|k| k.as_str()).collect();
		assert_eq!(
			names,
			vec!["token", "refreshToken", "user", "activeRole", "workspaceId"]
		);
	}

	#[test]
	fn test_auth_payload_accepts_access_token_alias() {
		let payload: AuthPayload = serde_json::from_value(json!({
			"accessToken": "access-2",
			"refreshToken": "refresh-2"
		}))
		.unwrap();
		assert_eq!(payload.token.unwrap().expose_secret(), "access-2");
		assert_eq!(payload.refresh_token.unwrap().expose_secret(), "refresh-2");
		assert!(payload.user.is_none());
	}

	#[test]
	fn test_sign_in_body_carries_password() {
		let request = SignInRequest::new("ana@example.com", "hunter2");
		assert_eq!(
			request.to_body(),
			json!({ "email": "ana@example.com", "password": "hunter2" })
		);
		assert!(!format!("{:?}", request).contains("hunter2"));
	}
}
