//! Body envelopes for the storefront API.
//!
//! Authentication requests may be sent encrypted, and any response may come
//! back either encrypted (`{iv, encryptedData}`) or plain (`{data, message}`).
//! [`EnvelopeService::decode`] is the one place where a response body is
//! turned into a [`PlainEnvelope`]; everything above it works with plain
//! payloads only.

use serde_json::Value;
use storefront_types::{
	ConfigSchema, EncryptedEnvelope, HttpResponse, ImplementationRegistry, PlainEnvelope,
	ResponseEnvelope,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod aes;
}

/// Errors that can occur while sealing or opening envelopes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
	/// An encrypted body arrived but no cipher is configured.
	#[error("Encrypted body received but no cipher is configured")]
	CipherUnavailable,
	/// The configured key is unusable.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Encryption failed.
	#[error("Encryption failed: {0}")]
	EncryptFailed(String),
	/// Decryption failed, e.g. wrong key or tampered ciphertext.
	#[error("Decryption failed: {0}")]
	DecryptFailed(String),
	/// The body is not a JSON envelope.
	#[error("Malformed envelope: {0}")]
	Malformed(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for body ciphers.
pub trait CipherInterface: Send + Sync {
	/// Returns the configuration schema for this cipher implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Encrypts `plaintext` under a fresh nonce.
	fn seal(&self, plaintext: &[u8]) -> Result<EncryptedEnvelope, EnvelopeError>;

	/// Decrypts an envelope produced by the server or by [`seal`](Self::seal).
	fn open(&self, envelope: &EncryptedEnvelope) -> Result<Vec<u8>, EnvelopeError>;
}

/// Type alias for cipher factory functions.
pub type CipherFactory = fn(&toml::Value) -> Result<Box<dyn CipherInterface>, EnvelopeError>;

/// Registry trait for cipher implementations.
pub trait CipherRegistry: ImplementationRegistry<Factory = CipherFactory> {}

/// Get all registered cipher implementations.
pub fn get_all_implementations() -> Vec<(&'static str, CipherFactory)> {
	use implementations::aes;

	vec![(aes::Registry::NAME, aes::Registry::factory())]
}

/// Seals outgoing bodies and decodes incoming ones.
pub struct EnvelopeService {
	cipher: Option<Box<dyn CipherInterface>>,
	encrypt_requests: bool,
}

impl EnvelopeService {
	/// Creates a service around an optional cipher.
	///
	/// Request bodies are only sealed when a cipher is present and
	/// `encrypt_requests` is set.
	pub fn new(cipher: Option<Box<dyn CipherInterface>>, encrypt_requests: bool) -> Self {
		Self {
			cipher,
			encrypt_requests,
		}
	}

	/// A service without cipher: requests go out plain, encrypted responses fail.
	pub fn plain() -> Self {
		Self::new(None, false)
	}

	/// Whether [`seal_body`](Self::seal_body) encrypts.
	pub fn encrypts_requests(&self) -> bool {
		self.encrypt_requests && self.cipher.is_some()
	}

	/// Prepares a request body, encrypting it when configured to.
	pub fn seal_body(&self, body: &Value) -> Result<Value, EnvelopeError> {
		let cipher = match &self.cipher {
			Some(cipher) if self.encrypt_requests => cipher,
			_ => return Ok(body.clone()),
		};

		let plaintext =
			serde_json::to_vec(body).map_err(|e| EnvelopeError::EncryptFailed(e.to_string()))?;
		let envelope = cipher.seal(&plaintext)?;
		serde_json::to_value(envelope).map_err(|e| EnvelopeError::EncryptFailed(e.to_string()))
	}

	/// Decodes a response body into its plain payload.
	///
	/// An empty body decodes to a `null` payload. Encrypted bodies are
	/// decrypted and their plaintext decoded once more; a plaintext that is
	/// itself encrypted is rejected.
	pub fn decode(&self, body: &[u8]) -> Result<PlainEnvelope, EnvelopeError> {
		let value = parse_json(body)?;
		match ResponseEnvelope::classify(value) {
			ResponseEnvelope::Plain(plain) => Ok(plain),
			ResponseEnvelope::Encrypted(encrypted) => {
				let cipher = self.cipher.as_ref().ok_or(EnvelopeError::CipherUnavailable)?;
				let plaintext = cipher.open(&encrypted)?;
				tracing::debug!(size = plaintext.len(), "Decrypted response envelope");
				match ResponseEnvelope::classify(parse_json(&plaintext)?) {
					ResponseEnvelope::Plain(plain) => Ok(plain),
					ResponseEnvelope::Encrypted(_) => Err(EnvelopeError::Malformed(
						"decrypted body is itself encrypted".to_string(),
					)),
				}
			},
		}
	}

	/// Decodes the body of a response.
	pub fn decode_response(&self, response: &HttpResponse) -> Result<PlainEnvelope, EnvelopeError> {
		self.decode(&response.body)
	}
}

fn parse_json(body: &[u8]) -> Result<Value, EnvelopeError> {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(Value::Null);
	}
	serde_json::from_slice(body).map_err(|e| EnvelopeError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::aes::AesGcmCipher;
	use serde_json::json;

	const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

	fn encrypted_service() -> EnvelopeService {
		let cipher = AesGcmCipher::from_hex(KEY_HEX).unwrap();
		EnvelopeService::new(Some(Box::new(cipher)), true)
	}

	#[test]
	fn test_decode_plain_body() {
		let service = EnvelopeService::plain();
		let plain = service
			.decode(br#"{"data":{"token":"access-1"},"message":"Signed in"}"#)
			.unwrap();
		assert_eq!(plain.data["token"], "access-1");
		assert_eq!(plain.message.as_deref(), Some("Signed in"));
	}

	#[test]
	fn test_decode_bare_and_empty_bodies() {
		let service = EnvelopeService::plain();
		assert_eq!(service.decode(b"[1,2]").unwrap().data, json!([1, 2]));
		assert_eq!(service.decode(b"").unwrap().data, Value::Null);
		assert!(matches!(
			service.decode(b"<html>"),
			Err(EnvelopeError::Malformed(_))
		));
	}

	#[test]
	fn test_encrypted_body_without_cipher() {
		let service = EnvelopeService::plain();
		let result = service.decode(br#"{"iv":"AAAA","encryptedData":"BBBB"}"#);
		assert!(matches!(result, Err(EnvelopeError::CipherUnavailable)));
	}

	#[test]
	fn test_sealed_body_decodes_to_inner_envelope() {
		let service = encrypted_service();
		let inner = json!({ "data": { "token": "access-9" }, "message": "ok" });

		let sealed = service.seal_body(&inner).unwrap();
		assert!(sealed.get("iv").is_some());
		assert!(sealed.get("encryptedData").is_some());
		assert!(!sealed.to_string().contains("access-9"));

		let body = serde_json::to_vec(&sealed).unwrap();
		let plain = service.decode(&body).unwrap();
		assert_eq!(plain.data["token"], "access-9");
		assert_eq!(plain.message.as_deref(), Some("ok"));
	}

	#[test]
	fn test_seal_is_passthrough_when_disabled() {
		let cipher = AesGcmCipher::from_hex(KEY_HEX).unwrap();
		let service = EnvelopeService::new(Some(Box::new(cipher)), false);
		let body = json!({ "email": "a@example.com" });

		assert!(!service.encrypts_requests());
		assert_eq!(service.seal_body(&body).unwrap(), body);
	}
}
