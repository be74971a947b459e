// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The registration protocol: token check, address allocation, endpoint
//! recording and peer set publication.

use crate::config::HubConfig;
use crate::directory::PeerDirectory;
use crate::error::{HubError, Result};
use crate::ip_allocator::AddressAllocator;
use crate::tokens::TokenAuthority;
use ipnet::Ipv4Net;
use sdwan_common::{Peer, RegisterRequest, RegisterResponse, WgKeyPair, WgPublicKey};
use std::net::{IpAddr, SocketAddr};
use tracing::{info, instrument, warn};

/// The hub's tunnel identity. Generated at startup and never persisted.
pub struct HubIdentity {
	keypair: WgKeyPair,
}

impl HubIdentity {
	pub fn generate() -> Self {
		Self {
			keypair: WgKeyPair::generate(),
		}
	}

	pub fn public_key(&self) -> &WgPublicKey {
		self.keypair.public_key()
	}

	pub fn keypair(&self) -> &WgKeyPair {
		&self.keypair
	}
}

impl std::fmt::Debug for HubIdentity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HubIdentity")
			.field("public_key", self.public_key())
			.finish()
	}
}

pub struct HubCoordinator {
	tokens: TokenAuthority,
	directory: PeerDirectory,
	identity: HubIdentity,
	wg_port: u16,
	public_host: Option<String>,
	fallback_host: String,
}

impl HubCoordinator {
	pub fn new(config: &HubConfig) -> Result<Self> {
		Self::with_identity(config, HubIdentity::generate())
	}

	pub fn with_identity(config: &HubConfig, identity: HubIdentity) -> Result<Self> {
		let allocator = AddressAllocator::new(config.subnet)?;

		let fallback_host = if config.listen.ip().is_unspecified() {
			"localhost".to_string()
		} else {
			format_host(config.listen.ip())
		};

		Ok(Self {
			tokens: TokenAuthority::new(config.token_ttl),
			directory: PeerDirectory::new(allocator),
			identity,
			wg_port: config.wg_port,
			public_host: config.public_host.clone(),
			fallback_host,
		})
	}

	pub fn identity(&self) -> &HubIdentity {
		&self.identity
	}

	pub fn directory(&self) -> &PeerDirectory {
		&self.directory
	}

	pub async fn issue_token(&self) -> String {
		self.tokens.issue().await
	}

	pub async fn peers(&self) -> Vec<Peer> {
		self.directory.list().await
	}

	pub async fn hub_address(&self) -> Ipv4Net {
		self.directory.hub_address().await
	}

	/// Runs one registration.
	///
	/// `observed` is the transport source address of the request; the client
	/// never gets to assert its own endpoint. `request_host` is the host the
	/// client used to reach us, from which the advertised tunnel endpoint is
	/// derived.
	#[instrument(skip(self, request), fields(public_key = %request.public_key, %observed))]
	pub async fn register(
		&self,
		request: RegisterRequest,
		observed: SocketAddr,
		request_host: Option<&str>,
	) -> Result<RegisterResponse> {
		if !self.tokens.validate(&request.token).await {
			warn!("rejected registration with invalid token");
			return Err(HubError::Unauthorized);
		}

		let peer = self.directory.upsert(&request.public_key).await?;
		self.directory.set_endpoint(&request.public_key, observed).await;

		let hub_endpoint = self.hub_endpoint(request_host);
		let peers = self.directory.list().await;

		info!(address = %peer.address, %hub_endpoint, peers = peers.len(), "peer registered");

		Ok(RegisterResponse {
			assigned_address: peer.address,
			hub_public_key: *self.identity.public_key(),
			hub_endpoint,
			peers,
		})
	}

	/// `host:port` where peers reach the hub's tunnel.
	pub fn hub_endpoint(&self, request_host: Option<&str>) -> String {
		let host = self
			.public_host
			.as_deref()
			.or_else(|| request_host.map(strip_port).filter(|h| !h.is_empty()))
			.unwrap_or(&self.fallback_host);
		format!("{}:{}", host, self.wg_port)
	}
}

/// Drops a trailing `:port` from a Host header value, keeping IPv6 brackets.
fn strip_port(host: &str) -> &str {
	let host = host.trim();
	if host.starts_with('[') {
		return match host.find(']') {
			Some(end) => &host[..=end],
			None => host,
		};
	}
	match host.rsplit_once(':') {
		Some((name, _)) if !name.contains(':') => name,
		_ => host,
	}
}

fn format_host(ip: IpAddr) -> String {
	match ip {
		IpAddr::V4(v4) => v4.to_string(),
		IpAddr::V6(v6) => format!("[{v6}]"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn key_of(c: char) -> WgPublicKey {
		WgPublicKey::from_base64(&format!("{}A=", c.to_string().repeat(42))).unwrap()
	}

	fn coordinator() -> HubCoordinator {
		HubCoordinator::new(&HubConfig::default()).unwrap()
	}

	fn observed(port: u16) -> SocketAddr {
		SocketAddr::from(([203, 0, 113, 10], port))
	}

	#[tokio::test]
	async fn test_register_end_to_end() {
		let hub = coordinator();
		let key_a = key_of('A');
		let key_b = key_of('B');

		let token = hub.issue_token().await;
		let first = hub
			.register(
				RegisterRequest {
					token: token.clone(),
					public_key: key_a,
				},
				observed(40000),
				Some("hub.example.com:8080"),
			)
			.await
			.unwrap();
		assert_eq!(first.assigned_address.to_string(), "10.42.0.2/24");
		assert_eq!(first.hub_endpoint, "hub.example.com:51820");
		assert_eq!(&first.hub_public_key, hub.identity().public_key());
		assert_eq!(first.peers.len(), 1);
		assert_eq!(first.peers[0].endpoint, Some(observed(40000)));
		let first_seen = first.peers[0].last_seen;

		let again = hub
			.register(
				RegisterRequest {
					token: hub.issue_token().await,
					public_key: key_a,
				},
				observed(40001),
				Some("hub.example.com"),
			)
			.await
			.unwrap();
		assert_eq!(again.assigned_address.to_string(), "10.42.0.2/24");
		assert_eq!(again.peers[0].endpoint, Some(observed(40001)));
		assert!(again.peers[0].last_seen >= first_seen);

		let second = hub
			.register(
				RegisterRequest {
					token: hub.issue_token().await,
					public_key: key_b,
				},
				observed(40002),
				None,
			)
			.await
			.unwrap();
		assert_eq!(second.assigned_address.to_string(), "10.42.0.3/24");
		assert_eq!(second.peers.len(), 2);

		let reused = hub
			.register(
				RegisterRequest {
					token,
					public_key: key_of('C'),
				},
				observed(40003),
				None,
			)
			.await;
		assert!(matches!(reused, Err(HubError::Unauthorized)));
		assert_eq!(hub.peers().await.len(), 2);
	}

	#[tokio::test]
	async fn test_rejected_token_does_not_touch_directory() {
		let hub = coordinator();
		let result = hub
			.register(
				RegisterRequest {
					token: "forged".to_string(),
					public_key: key_of('A'),
				},
				observed(1),
				None,
			)
			.await;
		assert!(matches!(result, Err(HubError::Unauthorized)));
		assert!(hub.directory().is_empty().await);
	}

	#[tokio::test]
	async fn test_pool_exhaustion_is_reported() {
		let config = HubConfig {
			subnet: "10.0.0.0/30".parse().unwrap(),
			..HubConfig::default()
		};
		let hub = HubCoordinator::new(&config).unwrap();

		for (c, expect_ok) in [('A', true), ('B', false)] {
			let result = hub
				.register(
					RegisterRequest {
						token: hub.issue_token().await,
						public_key: key_of(c),
					},
					observed(2),
					None,
				)
				.await;
			assert_eq!(result.is_ok(), expect_ok);
			if !expect_ok {
				assert!(matches!(result, Err(HubError::PoolExhausted)));
			}
		}
		assert_eq!(hub.peers().await.len(), 1);
	}

	#[test]
	fn test_hub_endpoint_host_selection() {
		let hub = coordinator();
		assert_eq!(hub.hub_endpoint(Some("10.1.1.1:8080")), "10.1.1.1:51820");
		assert_eq!(
			hub.hub_endpoint(Some("[2001:db8::1]:8080")),
			"[2001:db8::1]:51820"
		);
		assert_eq!(hub.hub_endpoint(Some("hub.internal")), "hub.internal:51820");
		assert_eq!(hub.hub_endpoint(None), "localhost:51820");
		assert_eq!(hub.hub_endpoint(Some("")), "localhost:51820");

		let config = HubConfig {
			public_host: Some("vpn.example.net".to_string()),
			..HubConfig::default()
		};
		let pinned = HubCoordinator::new(&config).unwrap();
		assert_eq!(
			pinned.hub_endpoint(Some("10.1.1.1:8080")),
			"vpn.example.net:51820"
		);
	}

	#[test]
	fn test_strip_port_variants() {
		assert_eq!(strip_port("example.com:80"), "example.com");
		assert_eq!(strip_port("example.com"), "example.com");
		assert_eq!(strip_port("[::1]:8080"), "[::1]");
		assert_eq!(strip_port("[::1]"), "[::1]");
		assert_eq!(strip_port("::1"), "::1");
	}
}
