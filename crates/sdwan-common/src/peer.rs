// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::keys::WgPublicKey;
use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Number of public key characters used for [`Peer::id`].
pub const PEER_ID_LEN: usize = 8;

/// A mesh member as the hub knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
	pub id: String,
	pub public_key: WgPublicKey,
	pub address: Ipv4Net,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub endpoint: Option<SocketAddr>,
	pub last_seen: DateTime<Utc>,
}

impl Peer {
	pub fn new(public_key: WgPublicKey, address: Ipv4Net, now: DateTime<Utc>) -> Self {
		Self {
			id: public_key.short_id(PEER_ID_LEN),
			public_key,
			address,
			endpoint: None,
			last_seen: now,
		}
	}

	/// Advances `last_seen`, never moving it backwards.
	pub fn touch(&mut self, now: DateTime<Utc>) {
		if now > self.last_seen {
			self.last_seen = now;
		}
	}

	pub fn update_endpoint(&mut self, endpoint: SocketAddr, now: DateTime<Utc>) {
		self.endpoint = Some(endpoint);
		self.touch(now);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::keys::WgKeyPair;
	use chrono::Duration;

	fn test_peer() -> Peer {
		let keypair = WgKeyPair::generate();
		Peer::new(
			*keypair.public_key(),
			"10.42.0.2/24".parse().unwrap(),
			Utc::now(),
		)
	}

	#[test]
	fn test_id_is_key_prefix() {
		let peer = test_peer();
		assert_eq!(peer.id.len(), PEER_ID_LEN);
		assert!(peer.public_key.to_base64().starts_with(&peer.id));
	}

	#[test]
	fn test_json_shape() {
		let mut peer = test_peer();
		let value = serde_json::to_value(&peer).unwrap();
		assert_eq!(value["address"], "10.42.0.2/24");
		assert_eq!(value["publicKey"], peer.public_key.to_base64());
		assert!(value.get("endpoint").is_none());
		assert!(value.get("lastSeen").is_some());

		peer.update_endpoint("1.2.3.4:51820".parse().unwrap(), Utc::now());
		let value = serde_json::to_value(&peer).unwrap();
		assert_eq!(value["endpoint"], "1.2.3.4:51820");

		let back: Peer = serde_json::from_value(value).unwrap();
		assert_eq!(back, peer);
	}

	#[test]
	fn test_touch_is_monotonic() {
		let mut peer = test_peer();
		let seen = peer.last_seen;

		peer.touch(seen - Duration::seconds(5));
		assert_eq!(peer.last_seen, seen);

		peer.touch(seen + Duration::seconds(5));
		assert_eq!(peer.last_seen, seen + Duration::seconds(5));
	}

	#[test]
	fn test_update_endpoint_overwrites() {
		let mut peer = test_peer();
		peer.update_endpoint("1.2.3.4:1000".parse().unwrap(), Utc::now());
		peer.update_endpoint("5.6.7.8:2000".parse().unwrap(), Utc::now());
		assert_eq!(peer.endpoint, Some("5.6.7.8:2000".parse().unwrap()));
	}
}
