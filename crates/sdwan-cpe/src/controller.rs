// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local tunnel interface configuration.

use crate::error::InterfaceError;
use async_trait::async_trait;
use ipnet::Ipv4Net;
use sdwan_common::{PeerConfig, WgCommand, WgPrivateKey, WgPublicKey};
use tracing::{debug, info, instrument};

/// Changes to push to the interface in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerUpdate {
	pub upsert: Vec<PeerConfig>,
	pub remove: Vec<WgPublicKey>,
}

impl PeerUpdate {
	pub fn is_empty(&self) -> bool {
		self.upsert.is_empty() && self.remove.is_empty()
	}
}

/// Applies tunnel configuration. Applying the same peer twice must leave the
/// tunnel untouched.
#[async_trait]
pub trait InterfaceController: Send + Sync {
	async fn initialize(
		&self,
		private_key: &WgPrivateKey,
		address: Ipv4Net,
	) -> Result<(), InterfaceError>;

	async fn apply(&self, update: &PeerUpdate) -> Result<(), InterfaceError>;
}

/// Drives a kernel WireGuard interface through `wg` and `ip`.
#[derive(Debug)]
pub struct WgCommandController {
	wg: WgCommand,
}

impl WgCommandController {
	pub fn new(interface: impl Into<String>) -> Self {
		Self {
			wg: WgCommand::new(interface),
		}
	}
}

#[async_trait]
impl InterfaceController for WgCommandController {
	#[instrument(skip(self, private_key), fields(interface = %self.wg.interface()))]
	async fn initialize(
		&self,
		private_key: &WgPrivateKey,
		address: Ipv4Net,
	) -> Result<(), InterfaceError> {
		self.wg.set_private_key(private_key, None).await?;
		self.wg.set_address(address).await?;
		info!(%address, "interface initialized");
		Ok(())
	}

	#[instrument(
		skip(self, update),
		fields(
			interface = %self.wg.interface(),
			upsert = update.upsert.len(),
			remove = update.remove.len()
		)
	)]
	async fn apply(&self, update: &PeerUpdate) -> Result<(), InterfaceError> {
		for peer in &update.upsert {
			self.wg.set_peer(peer).await?;
		}
		for public_key in &update.remove {
			self.wg.remove_peer(public_key).await?;
		}
		debug!("peer update applied");
		Ok(())
	}
}

/// Logs intended changes without touching any interface.
#[derive(Debug, Default)]
pub struct LoggingController;

#[async_trait]
impl InterfaceController for LoggingController {
	async fn initialize(
		&self,
		private_key: &WgPrivateKey,
		address: Ipv4Net,
	) -> Result<(), InterfaceError> {
		info!(public_key = %private_key.public_key(), %address, "would initialize interface");
		Ok(())
	}

	async fn apply(&self, update: &PeerUpdate) -> Result<(), InterfaceError> {
		for peer in &update.upsert {
			info!(
				public_key = %peer.public_key,
				endpoint = peer.endpoint.as_deref().unwrap_or("-"),
				allowed_ips = ?peer.allowed_ips,
				"would configure peer"
			);
		}
		for public_key in &update.remove {
			info!(%public_key, "would remove peer");
		}
		Ok(())
	}
}
