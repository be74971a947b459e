// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The hub's own tunnel interface.
//!
//! Bring-up sets the private key, listen port and hub overlay address. Every
//! registered peer is then installed with its overlay address as the only
//! allowed IP. Errors are returned to the caller, which logs and carries on.

use crate::coordinator::HubIdentity;
use crate::error::Result;
use ipnet::Ipv4Net;
use sdwan_common::{Peer, PeerConfig, WgCommand};
use std::net::Ipv4Addr;
use tracing::{info, instrument};

pub struct HubInterface {
	wg: WgCommand,
}

impl HubInterface {
	pub fn new(interface: impl Into<String>) -> Self {
		Self {
			wg: WgCommand::new(interface),
		}
	}

	pub fn name(&self) -> &str {
		self.wg.interface()
	}

	#[instrument(skip(self, identity), fields(interface = %self.name()))]
	pub async fn bring_up(
		&self,
		identity: &HubIdentity,
		listen_port: u16,
		address: Ipv4Net,
	) -> Result<()> {
		self
			.wg
			.set_private_key(identity.keypair().private_key(), Some(listen_port))
			.await?;
		self.wg.set_address(address).await?;
		info!(%address, listen_port, "hub interface configured");
		Ok(())
	}

	#[instrument(skip(self, peer), fields(interface = %self.name(), public_key = %peer.public_key))]
	pub async fn install_peer(&self, peer: &Peer) -> Result<()> {
		self.wg.set_peer(&peer_config(peer)).await?;
		Ok(())
	}
}

/// Hub-side view of a peer: no keepalive, the peer keeps the NAT mapping open.
///
/// The endpoint is the source address of the peer's registration request, so
/// its port is the TCP client port rather than the WireGuard listen port. It is
/// only a starting hint: once the peer's keepalives arrive WireGuard roams the
/// endpoint to the real UDP source.
fn peer_config(peer: &Peer) -> PeerConfig {
	PeerConfig {
		public_key: peer.public_key,
		endpoint: peer.endpoint.map(|e| e.to_string()),
		allowed_ips: vec![host_route(peer.address.addr())],
		persistent_keepalive: None,
	}
}

pub fn host_route(addr: Ipv4Addr) -> Ipv4Net {
	Ipv4Net::from(addr)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use sdwan_common::WgPublicKey;

	#[test]
	fn test_peer_config_routes_only_the_overlay_host() {
		let mut peer = Peer::new(
			WgPublicKey::from_bytes([3u8; 32]),
			"10.42.0.7/24".parse().unwrap(),
			Utc::now(),
		);
		peer.endpoint = Some("198.51.100.20:41000".parse().unwrap());

		let config = peer_config(&peer);
		assert_eq!(
			config.allowed_ips,
			vec!["10.42.0.7/32".parse::<Ipv4Net>().unwrap()]
		);
		assert_eq!(config.endpoint.as_deref(), Some("198.51.100.20:41000"));
		assert_eq!(config.persistent_keepalive, None);
	}

	#[test]
	fn test_host_route_is_slash_32() {
		assert_eq!(
			host_route(Ipv4Addr::new(10, 42, 0, 1)).to_string(),
			"10.42.0.1/32"
		);
	}
}
