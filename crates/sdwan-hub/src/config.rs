// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::ip_allocator::{DEFAULT_SUBNET, MAX_PREFIX_LEN};
use crate::tokens::DEFAULT_TOKEN_TTL;
use ipnet::Ipv4Net;
use sdwan_common::DEFAULT_INTERFACE;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
pub const DEFAULT_WG_PORT: u16 = 51820;

#[derive(Debug, Clone)]
pub struct HubConfig {
	pub listen: SocketAddr,
	pub wg_port: u16,
	pub subnet: Ipv4Net,
	pub token_ttl: Duration,
	pub public_host: Option<String>,
	pub interface: String,
	pub configure_interface: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("invalid listen address: {0}")]
	InvalidListen(String),

	#[error("invalid WireGuard port: {0}")]
	InvalidPort(String),

	#[error("invalid subnet: {0}")]
	InvalidSubnet(String),

	#[error("invalid token TTL: {0}")]
	InvalidTokenTtl(String),
}

impl Default for HubConfig {
	fn default() -> Self {
		Self {
			listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
			wg_port: DEFAULT_WG_PORT,
			subnet: Ipv4Net::new([10, 42, 0, 0].into(), 24).unwrap_or_default(),
			token_ttl: DEFAULT_TOKEN_TTL,
			public_host: None,
			interface: DEFAULT_INTERFACE.to_string(),
			configure_interface: true,
		}
	}
}

impl HubConfig {
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds a config from an arbitrary variable source. Unset or empty
	/// variables fall back to defaults.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

		let listen = get("SDWAN_LISTEN")
			.unwrap_or_else(|| DEFAULT_LISTEN.to_string())
			.parse()
			.map_err(|e| ConfigError::InvalidListen(format!("{e}")))?;

		let wg_port = match get("SDWAN_WG_PORT") {
			Some(v) => v
				.trim()
				.parse()
				.map_err(|e| ConfigError::InvalidPort(format!("{v}: {e}")))?,
			None => DEFAULT_WG_PORT,
		};

		let subnet: Ipv4Net = get("SDWAN_SUBNET")
			.unwrap_or_else(|| DEFAULT_SUBNET.to_string())
			.trim()
			.parse()
			.map_err(|e| ConfigError::InvalidSubnet(format!("{e}")))?;
		if subnet.prefix_len() > MAX_PREFIX_LEN {
			return Err(ConfigError::InvalidSubnet(format!(
				"{subnet} is too small, need at least a /{MAX_PREFIX_LEN}"
			)));
		}

		let token_ttl = match get("SDWAN_TOKEN_TTL_SECS") {
			Some(v) => {
				let secs: u64 = v
					.trim()
					.parse()
					.map_err(|e| ConfigError::InvalidTokenTtl(format!("{v}: {e}")))?;
				if secs == 0 {
					return Err(ConfigError::InvalidTokenTtl("must be positive".to_string()));
				}
				Duration::from_secs(secs)
			}
			None => DEFAULT_TOKEN_TTL,
		};

		let public_host = get("SDWAN_PUBLIC_HOST").map(|v| v.trim().to_string());

		let interface = get("SDWAN_WG_INTERFACE").unwrap_or_else(|| DEFAULT_INTERFACE.to_string());

		let configure_interface = get("SDWAN_NO_WG")
			.map(|v| v == "0" || v.to_lowercase() == "false")
			.unwrap_or(true);

		Ok(Self {
			listen,
			wg_port,
			subnet,
			token_ttl,
			public_host,
			interface,
			configure_interface,
		})
	}
}
