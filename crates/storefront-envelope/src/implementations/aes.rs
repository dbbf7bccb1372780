//! AES-256-GCM body cipher.
//!
//! The wire form is `{iv, encryptedData}` where `iv` is the base64 12-byte
//! nonce and `encryptedData` the base64 ciphertext including the 16-byte
//! authentication tag.

use crate::{CipherFactory, CipherInterface, CipherRegistry, EnvelopeError};
use aes_gcm::{
	aead::{Aead, KeyInit},
	Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use storefront_types::{
	ConfigSchema, EncryptedEnvelope, Field, FieldType, ImplementationRegistry, Schema,
	ValidationError,
};
use zeroize::Zeroizing;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// AES-256-GCM cipher holding one shared key.
pub struct AesGcmCipher {
	cipher: Aes256Gcm,
}

impl AesGcmCipher {
	/// Creates a cipher from raw key bytes.
	pub fn new(key: &[u8]) -> Result<Self, EnvelopeError> {
		if key.len() != KEY_LEN {
			return Err(EnvelopeError::InvalidKey(format!(
				"expected {} bytes, got {}",
				KEY_LEN,
				key.len()
			)));
		}
		let cipher =
			Aes256Gcm::new_from_slice(key).map_err(|e| EnvelopeError::InvalidKey(e.to_string()))?;
		Ok(Self { cipher })
	}

	/// Creates a cipher from a 64-character hex key.
	pub fn from_hex(key_hex: &str) -> Result<Self, EnvelopeError> {
		let key = Zeroizing::new(
			hex::decode(key_hex.trim()).map_err(|e| EnvelopeError::InvalidKey(e.to_string()))?,
		);
		Self::new(&key)
	}
}

impl CipherInterface for AesGcmCipher {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AesGcmCipherSchema)
	}

	fn seal(&self, plaintext: &[u8]) -> Result<EncryptedEnvelope, EnvelopeError> {
		let mut nonce_bytes = [0u8; NONCE_LEN];
		rand::thread_rng().fill_bytes(&mut nonce_bytes);
		let nonce = Nonce::from_slice(&nonce_bytes);

		let ciphertext = self
			.cipher
			.encrypt(nonce, plaintext)
			.map_err(|e| EnvelopeError::EncryptFailed(e.to_string()))?;

		Ok(EncryptedEnvelope {
			iv: STANDARD.encode(nonce_bytes),
			encrypted_data: STANDARD.encode(ciphertext),
		})
	}

	fn open(&self, envelope: &EncryptedEnvelope) -> Result<Vec<u8>, EnvelopeError> {
		let nonce_bytes = STANDARD
			.decode(&envelope.iv)
			.map_err(|e| EnvelopeError::DecryptFailed(format!("iv: {}", e)))?;
		if nonce_bytes.len() != NONCE_LEN {
			return Err(EnvelopeError::DecryptFailed(format!(
				"iv must be {} bytes, got {}",
				NONCE_LEN,
				nonce_bytes.len()
			)));
		}
		let ciphertext = STANDARD
			.decode(&envelope.encrypted_data)
			.map_err(|e| EnvelopeError::DecryptFailed(format!("encryptedData: {}", e)))?;

		self.cipher
			.decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
			.map_err(|e| EnvelopeError::DecryptFailed(e.to_string()))
	}
}

/// Configuration schema for AesGcmCipher.
pub struct AesGcmCipherSchema;

impl ConfigSchema for AesGcmCipherSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("key", FieldType::String).with_validator(|value| {
				let key = value.as_str().unwrap_or_default().trim();
				if key.len() != KEY_LEN * 2 {
					return Err(format!("key must be {} hex characters", KEY_LEN * 2));
				}
				if !key.chars().all(|c| c.is_ascii_hexdigit()) {
					return Err("key must be hex encoded".to_string());
				}
				Ok(())
			})],
			vec![],
		);

		schema.validate(config)
	}
}

/// Factory function to create an AES-256-GCM cipher from configuration.
///
/// Configuration parameters:
/// - `key` (required): 32-byte key as 64 hex characters
pub fn create_cipher(config: &toml::Value) -> Result<Box<dyn CipherInterface>, EnvelopeError> {
	AesGcmCipherSchema
		.validate(config)
		.map_err(|e| EnvelopeError::Configuration(e.to_string()))?;

	let key_hex = config
		.get("key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| EnvelopeError::Configuration("key is required".to_string()))?;

	Ok(Box::new(AesGcmCipher::from_hex(key_hex)?))
}

/// Registry for the AES-256-GCM cipher implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "aes_gcm";
	type Factory = CipherFactory;

	fn factory() -> Self::Factory {
		create_cipher
	}
}

impl CipherRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

	#[test]
	fn test_seal_open() {
		let cipher = AesGcmCipher::from_hex(KEY_HEX).unwrap();
		let envelope = cipher.seal(br#"{"password":"hunter2"}"#).unwrap();

		assert_eq!(STANDARD.decode(&envelope.iv).unwrap().len(), NONCE_LEN);
		assert_eq!(
			cipher.open(&envelope).unwrap(),
			br#"{"password":"hunter2"}"#.to_vec()
		);
	}

	#[test]
	fn test_fresh_nonce_per_seal() {
		let cipher = AesGcmCipher::from_hex(KEY_HEX).unwrap();
		let first = cipher.seal(b"same").unwrap();
		let second = cipher.seal(b"same").unwrap();
		assert_ne!(first.iv, second.iv);
	}

	#[test]
	fn test_wrong_key_fails() {
		let sealed = AesGcmCipher::from_hex(KEY_HEX).unwrap().seal(b"secret").unwrap();
		let other = AesGcmCipher::new(&[7u8; KEY_LEN]).unwrap();
		assert!(matches!(
			other.open(&sealed),
			Err(EnvelopeError::DecryptFailed(_))
		));
	}

	#[test]
	fn test_tampered_ciphertext_fails() {
		let cipher = AesGcmCipher::from_hex(KEY_HEX).unwrap();
		let mut envelope = cipher.seal(b"tamper test").unwrap();
		let mut bytes = STANDARD.decode(&envelope.encrypted_data).unwrap();
		if let Some(last) = bytes.last_mut() {
			*last ^= 0xFF;
		}
		envelope.encrypted_data = STANDARD.encode(&bytes);
		assert!(cipher.open(&envelope).is_err());
	}

	#[test]
	fn test_short_iv_rejected() {
		let cipher = AesGcmCipher::from_hex(KEY_HEX).unwrap();
		let envelope = EncryptedEnvelope {
			iv: STANDARD.encode([0u8; 8]),
			encrypted_data: STANDARD.encode([0u8; 32]),
		};
		assert!(matches!(
			cipher.open(&envelope),
			Err(EnvelopeError::DecryptFailed(_))
		));
	}

	#[test]
	fn test_factory_validates_key() {
		let short: toml::Value = toml::from_str("key = \"abcd\"").unwrap();
		assert!(matches!(
			create_cipher(&short),
			Err(EnvelopeError::Configuration(_))
		));

		let valid: toml::Value = toml::from_str(&format!("key = \"{}\"", KEY_HEX)).unwrap();
		assert!(create_cipher(&valid).is_ok());
	}
}
