// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use crate::ip_allocator::AddressAllocator;
use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;
use sdwan_common::{Peer, WgPublicKey};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

struct DirectoryInner {
	peers: HashMap<WgPublicKey, Peer>,
	allocator: AddressAllocator,
}

/// Authoritative public key -> peer mapping.
///
/// The allocator lives under the same lock as the peer map, so an address is
/// only ever handed out together with the record that holds it.
pub struct PeerDirectory {
	inner: RwLock<DirectoryInner>,
}

impl PeerDirectory {
	pub fn new(allocator: AddressAllocator) -> Self {
		Self {
			inner: RwLock::new(DirectoryInner {
				peers: HashMap::new(),
				allocator,
			}),
		}
	}

	pub async fn upsert(&self, public_key: &WgPublicKey) -> Result<Peer> {
		self.upsert_at(public_key, Utc::now()).await
	}

	/// Creates the peer (allocating its address) or refreshes `last_seen` on an
	/// existing one. Nothing is recorded when allocation fails.
	#[instrument(skip(self, public_key), fields(public_key = %public_key))]
	pub async fn upsert_at(&self, public_key: &WgPublicKey, now: DateTime<Utc>) -> Result<Peer> {
		let mut inner = self.inner.write().await;

		if let Some(peer) = inner.peers.get_mut(public_key) {
			peer.touch(now);
			debug!(address = %peer.address, "refreshed existing peer");
			return Ok(peer.clone());
		}

		let address = inner.allocator.allocate(public_key)?;
		let peer = Peer::new(*public_key, address, now);
		inner.peers.insert(*public_key, peer.clone());

		info!(%address, id = %peer.id, "added peer");

		Ok(peer)
	}

	pub async fn set_endpoint(&self, public_key: &WgPublicKey, endpoint: SocketAddr) -> bool {
		self.set_endpoint_at(public_key, endpoint, Utc::now()).await
	}

	/// Records the observed transport endpoint. Returns false, and records
	/// nothing, when the peer is unknown.
	#[instrument(skip(self, public_key), fields(public_key = %public_key, %endpoint))]
	pub async fn set_endpoint_at(
		&self,
		public_key: &WgPublicKey,
		endpoint: SocketAddr,
		now: DateTime<Utc>,
	) -> bool {
		let mut inner = self.inner.write().await;

		match inner.peers.get_mut(public_key) {
			Some(peer) => {
				peer.update_endpoint(endpoint, now);
				true
			}
			None => {
				debug!("ignoring endpoint update for unknown peer");
				false
			}
		}
	}

	pub async fn get(&self, public_key: &WgPublicKey) -> Option<Peer> {
		self.inner.read().await.peers.get(public_key).cloned()
	}

	/// Point-in-time copy of every peer, ordered by address.
	pub async fn list(&self) -> Vec<Peer> {
		let inner = self.inner.read().await;
		let mut peers: Vec<Peer> = inner.peers.values().cloned().collect();
		peers.sort_by_key(|p| p.address.addr());
		peers
	}

	pub async fn len(&self) -> usize {
		self.inner.read().await.peers.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}

	pub async fn remaining_addresses(&self) -> usize {
		self.inner.read().await.allocator.remaining()
	}

	pub async fn hub_address(&self) -> Ipv4Net {
		self.inner.read().await.allocator.hub_address()
	}
}
