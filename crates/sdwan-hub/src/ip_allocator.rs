// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sequential overlay address assignment.
//!
//! Host 1 of the subnet belongs to the hub. Peers get host 2, 3, ... in
//! registration order, up to the host before the broadcast address. Addresses
//! are never reclaimed while the process runs.

use crate::config::ConfigError;
use crate::error::{HubError, Result};
use ipnet::Ipv4Net;
use sdwan_common::WgPublicKey;
use std::collections::HashMap;
use std::net::Ipv4Addr;

pub const DEFAULT_SUBNET: &str = "10.42.0.0/24";

const HUB_HOST: u32 = 1;
const FIRST_PEER_HOST: u32 = 2;

/// Largest prefix that still leaves room for the hub and one peer.
pub const MAX_PREFIX_LEN: u8 = 30;

#[derive(Debug)]
pub struct AddressAllocator {
	subnet: Ipv4Net,
	next_host: u32,
	last_host: u32,
	assigned: HashMap<WgPublicKey, Ipv4Net>,
}

impl AddressAllocator {
	pub fn new(subnet: Ipv4Net) -> std::result::Result<Self, ConfigError> {
		if subnet.prefix_len() > MAX_PREFIX_LEN {
			return Err(ConfigError::InvalidSubnet(format!(
				"{subnet} is too small, need at least a /{MAX_PREFIX_LEN}"
			)));
		}
		let subnet = subnet.trunc();
		let host_span = u32::from(subnet.broadcast()) - u32::from(subnet.network());

		Ok(Self {
			subnet,
			next_host: FIRST_PEER_HOST,
			last_host: host_span - 1,
			assigned: HashMap::new(),
		})
	}

	pub fn subnet(&self) -> Ipv4Net {
		self.subnet
	}

	pub fn hub_address(&self) -> Ipv4Net {
		self.host(HUB_HOST)
	}

	/// Returns the address already held by `public_key`, or assigns the next
	/// free one.
	pub fn allocate(&mut self, public_key: &WgPublicKey) -> Result<Ipv4Net> {
		if let Some(address) = self.assigned.get(public_key) {
			return Ok(*address);
		}

		if self.next_host > self.last_host {
			return Err(HubError::PoolExhausted);
		}

		let address = self.host(self.next_host);
		self.next_host += 1;
		self.assigned.insert(*public_key, address);

		Ok(address)
	}

	pub fn get(&self, public_key: &WgPublicKey) -> Option<Ipv4Net> {
		self.assigned.get(public_key).copied()
	}

	pub fn capacity(&self) -> usize {
		(self.last_host + 1 - FIRST_PEER_HOST) as usize
	}

	pub fn remaining(&self) -> usize {
		(self.last_host + 1).saturating_sub(self.next_host) as usize
	}

	fn host(&self, host: u32) -> Ipv4Net {
		let addr = Ipv4Addr::from(u32::from(self.subnet.network()) + host);
		Ipv4Net::new(addr, self.subnet.prefix_len()).unwrap_or(self.subnet)
	}
}
