// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request and response bodies of the hub's HTTP API.

use crate::keys::WgPublicKey;
use crate::peer::Peer;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

pub const TOKEN_PATH: &str = "/api/token";
pub const REGISTER_PATH: &str = "/api/register";
pub const PEERS_PATH: &str = "/api/peers";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
	pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
	pub token: String,
	pub public_key: WgPublicKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
	pub assigned_address: Ipv4Net,
	pub hub_public_key: WgPublicKey,
	pub hub_endpoint: String,
	pub peers: Vec<Peer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_register_request_uses_camel_case() {
		let json = format!(r#"{{"token":"abc","publicKey":"{}="}}"#, "A".repeat(43));
		let req: RegisterRequest = serde_json::from_str(&json).unwrap();
		assert_eq!(req.token, "abc");
		assert_eq!(req.public_key.as_bytes(), &[0u8; 32]);
	}

	#[test]
	fn test_register_request_rejects_missing_fields() {
		assert!(serde_json::from_str::<RegisterRequest>(r#"{"token":"abc"}"#).is_err());
		let bad_key = r#"{"token":"abc","publicKey":"xyz"}"#;
		assert!(serde_json::from_str::<RegisterRequest>(bad_key).is_err());
	}

	#[test]
	fn test_register_response_field_names() {
		let resp = RegisterResponse {
			assigned_address: "10.42.0.2/24".parse().unwrap(),
			hub_public_key: WgPublicKey::from_bytes([1u8; 32]),
			hub_endpoint: "hub.example.com:51820".to_string(),
			peers: Vec::new(),
		};
		let value = serde_json::to_value(&resp).unwrap();
		assert_eq!(value["assignedAddress"], "10.42.0.2/24");
		assert_eq!(value["hubEndpoint"], "hub.example.com:51820");
		assert!(value["hubPublicKey"].is_string());
		assert!(value["peers"].as_array().unwrap().is_empty());
	}
}
