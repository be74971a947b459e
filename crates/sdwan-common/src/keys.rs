// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Curve25519 key types in the base64 form `wg(8)` reads and prints.

use base64::prelude::*;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

pub const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum KeyError {
	#[error("invalid base64: {0}")]
	Base64(#[from] base64::DecodeError),

	#[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
	Length(usize),
}

fn decode_key(s: &str) -> Result<[u8; KEY_LEN], KeyError> {
	let bytes = BASE64_STANDARD.decode(s.trim())?;
	let len = bytes.len();
	bytes.try_into().map_err(|_| KeyError::Length(len))
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WgPublicKey([u8; KEY_LEN]);

impl WgPublicKey {
	pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
		&self.0
	}

	pub fn from_base64(s: &str) -> Result<Self, KeyError> {
		decode_key(s).map(Self)
	}

	pub fn to_base64(&self) -> String {
		BASE64_STANDARD.encode(self.0)
	}

	/// Short display identifier: the first `len` characters of the base64 form.
	pub fn short_id(&self, len: usize) -> String {
		self.to_base64().chars().take(len).collect()
	}
}

impl fmt::Display for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_base64())
	}
}

impl fmt::Debug for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "WgPublicKey({})", self.to_base64())
	}
}

impl std::str::FromStr for WgPublicKey {
	type Err = KeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_base64(s)
	}
}

impl Serialize for WgPublicKey {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_base64())
	}
}

impl<'de> Deserialize<'de> for WgPublicKey {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		Self::from_base64(&s).map_err(serde::de::Error::custom)
	}
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WgPrivateKey([u8; KEY_LEN]);

impl WgPrivateKey {
	pub fn generate() -> Self {
		let secret = StaticSecret::random_from_rng(OsRng);
		Self(secret.to_bytes())
	}

	pub fn from_base64(s: &str) -> Result<Self, KeyError> {
		decode_key(s).map(Self)
	}

	pub fn to_base64(&self) -> Zeroizing<String> {
		Zeroizing::new(BASE64_STANDARD.encode(self.0))
	}

	pub fn public_key(&self) -> WgPublicKey {
		let secret = StaticSecret::from(self.0);
		WgPublicKey(PublicKey::from(&secret).to_bytes())
	}
}

impl fmt::Debug for WgPrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("WgPrivateKey([REDACTED])")
	}
}

#[derive(Clone)]
pub struct WgKeyPair {
	private: WgPrivateKey,
	public: WgPublicKey,
}

impl WgKeyPair {
	pub fn generate() -> Self {
		Self::from_private_key(WgPrivateKey::generate())
	}

	pub fn from_private_key(private: WgPrivateKey) -> Self {
		let public = private.public_key();
		Self { private, public }
	}

	pub fn public_key(&self) -> &WgPublicKey {
		&self.public
	}

	pub fn private_key(&self) -> &WgPrivateKey {
		&self.private
	}
}

impl fmt::Debug for WgKeyPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WgKeyPair")
			.field("public", &self.public)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_generated_keys_differ() {
		let a = WgKeyPair::generate();
		let b = WgKeyPair::generate();
		assert_ne!(a.public_key(), b.public_key());
	}

	#[test]
	fn test_public_key_base64_roundtrip() {
		let keypair = WgKeyPair::generate();
		let encoded = keypair.public_key().to_base64();
		assert_eq!(encoded.len(), 44);
		let decoded = WgPublicKey::from_base64(&encoded).unwrap();
		assert_eq!(&decoded, keypair.public_key());
	}

	#[test]
	fn test_private_key_derives_same_public_key() {
		let keypair = WgKeyPair::generate();
		let restored = WgPrivateKey::from_base64(&keypair.private_key().to_base64()).unwrap();
		assert_eq!(&restored.public_key(), keypair.public_key());
	}

	#[test]
	fn test_rejects_wrong_length() {
		let err = WgPublicKey::from_base64("AAAA").unwrap_err();
		assert!(matches!(err, KeyError::Length(3)));
	}

	#[test]
	fn test_rejects_invalid_base64() {
		assert!(matches!(
			WgPublicKey::from_base64("not base64!"),
			Err(KeyError::Base64(_))
		));
	}

	#[test]
	fn test_debug_does_not_leak_private_key() {
		let keypair = WgKeyPair::generate();
		let secret = keypair.private_key().to_base64();
		let debug = format!("{:?} {:?}", keypair, keypair.private_key());
		assert!(!debug.contains(secret.as_str()));
		assert!(debug.contains("REDACTED"));
	}

	#[test]
	fn test_short_id_takes_prefix() {
		let key = WgPublicKey::from_bytes([0u8; KEY_LEN]);
		assert_eq!(key.short_id(8), "AAAAAAAA");
	}

	#[test]
	fn test_serde_uses_base64_string() {
		let key = WgPublicKey::from_bytes([0u8; KEY_LEN]);
		let json = serde_json::to_string(&key).unwrap();
		assert_eq!(json, format!("\"{}\"", "A".repeat(43) + "="));
		let back: WgPublicKey = serde_json::from_str(&json).unwrap();
		assert_eq!(back, key);
		assert!(serde_json::from_str::<WgPublicKey>("\"short\"").is_err());
	}
}
