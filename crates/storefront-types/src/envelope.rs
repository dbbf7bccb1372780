//! Response and request body envelopes.
//!
//! The API answers either with an encrypted body `{iv, encryptedData}` or with
//! a plain `{data, message}` object. Both shapes are captured by
//! [`ResponseEnvelope`]; decryption itself lives in the envelope crate.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Encrypted body: a base64 nonce and base64 ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
	pub iv: String,
	pub encrypted_data: String,
}

/// Plain body: the payload and an optional human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlainEnvelope {
	pub data: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl PlainEnvelope {
	/// Wraps a bare JSON value that carries no envelope.
	pub fn bare(data: Value) -> Self {
		Self {
			data,
			message: None,
		}
	}

	/// Deserializes the payload into `T`.
	pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
		T::deserialize(&self.data)
	}
}

/// Either shape a response body may take.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
	Encrypted(EncryptedEnvelope),
	Plain(PlainEnvelope),
}

impl ResponseEnvelope {
	/// Classifies a JSON body.
	///
	/// Bodies matching neither shape are treated as a bare plain payload.
	pub fn classify(value: Value) -> Self {
		// Arrays would otherwise deserialize positionally into either struct
		if !value.is_object() {
			return ResponseEnvelope::Plain(PlainEnvelope::bare(value));
		}
		match ResponseEnvelope::deserialize(&value) {
			Ok(envelope) => envelope,
			Err(_) => ResponseEnvelope::Plain(PlainEnvelope::bare(value)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_classify_encrypted() {
		let envelope = ResponseEnvelope::classify(json!({
			"iv": "AAAA",
			"encryptedData": "BBBB"
		}));
		assert_eq!(
			envelope,
			ResponseEnvelope::Encrypted(EncryptedEnvelope {
				iv: "AAAA".into(),
				encrypted_data: "BBBB".into(),
			})
		);
	}

	#[test]
	fn test_classify_plain_with_message() {
		let envelope = ResponseEnvelope::classify(json!({
			"data": { "id": "1" },
			"message": "ok"
		}));
		match envelope {
			ResponseEnvelope::Plain(plain) => {
				assert_eq!(plain.data, json!({ "id": "1" }));
				assert_eq!(plain.message.as_deref(), Some("ok"));
			},
			other => panic!("expected plain envelope, got {:?}", other),
		}
	}

	#[test]
	fn test_classify_bare_value() {
		let envelope = ResponseEnvelope::classify(json!(["iv", "data"]));
		assert_eq!(
			envelope,
			ResponseEnvelope::Plain(PlainEnvelope::bare(json!(["iv", "data"])))
		);
	}
}
