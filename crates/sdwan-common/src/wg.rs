// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Thin driver for the `wg(8)` and `ip(8)` tools.
//!
//! The tunnel itself lives in the kernel (or a userspace implementation
//! behind the same tools); this module only pushes configuration to it.

use crate::keys::{WgPrivateKey, WgPublicKey};
use ipnet::Ipv4Net;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

pub const DEFAULT_INTERFACE: &str = "wg0";

#[derive(Debug, Error)]
pub enum WgCommandError {
	#[error("failed to run {program}: {source}")]
	Spawn {
		program: &'static str,
		#[source]
		source: std::io::Error,
	},

	#[error("{program} exited with {status}: {stderr}")]
	Failed {
		program: &'static str,
		status: std::process::ExitStatus,
		stderr: String,
	},
}

/// Desired state of one peer on the local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
	pub public_key: WgPublicKey,
	pub endpoint: Option<String>,
	pub allowed_ips: Vec<Ipv4Net>,
	pub persistent_keepalive: Option<u16>,
}

impl PeerConfig {
	fn wg_args(&self) -> Vec<String> {
		let mut args = vec!["peer".to_string(), self.public_key.to_base64()];

		if let Some(ref endpoint) = self.endpoint {
			args.push("endpoint".to_string());
			args.push(endpoint.clone());
		}

		args.push("allowed-ips".to_string());
		args.push(
			self
				.allowed_ips
				.iter()
				.map(|net| net.to_string())
				.collect::<Vec<_>>()
				.join(","),
		);

		if let Some(keepalive) = self.persistent_keepalive {
			args.push("persistent-keepalive".to_string());
			args.push(keepalive.to_string());
		}

		args
	}
}

#[derive(Debug, Clone)]
pub struct WgCommand {
	interface: String,
}

impl WgCommand {
	pub fn new(interface: impl Into<String>) -> Self {
		Self {
			interface: interface.into(),
		}
	}

	pub fn interface(&self) -> &str {
		&self.interface
	}

	/// Sets the interface private key (fed through stdin so it never shows up
	/// in the process list) and optionally the listen port.
	#[instrument(skip(self, key), fields(interface = %self.interface))]
	pub async fn set_private_key(
		&self,
		key: &WgPrivateKey,
		listen_port: Option<u16>,
	) -> Result<(), WgCommandError> {
		let mut args = vec![
			"set".to_string(),
			self.interface.clone(),
			"private-key".to_string(),
			"/dev/stdin".to_string(),
		];
		if let Some(port) = listen_port {
			args.push("listen-port".to_string());
			args.push(port.to_string());
		}

		let encoded = key.to_base64();
		run("wg", &args, Some(encoded.as_bytes())).await
	}

	#[instrument(
		skip(self, peer),
		fields(interface = %self.interface, public_key = %peer.public_key)
	)]
	pub async fn set_peer(&self, peer: &PeerConfig) -> Result<(), WgCommandError> {
		let mut args = vec!["set".to_string(), self.interface.clone()];
		args.extend(peer.wg_args());
		run("wg", &args, None).await
	}

	#[instrument(skip(self), fields(interface = %self.interface))]
	pub async fn remove_peer(&self, public_key: &WgPublicKey) -> Result<(), WgCommandError> {
		let args = vec![
			"set".to_string(),
			self.interface.clone(),
			"peer".to_string(),
			public_key.to_base64(),
			"remove".to_string(),
		];
		run("wg", &args, None).await
	}

	/// Assigns the overlay address; `replace` keeps this idempotent.
	#[instrument(skip(self), fields(interface = %self.interface, %address))]
	pub async fn set_address(&self, address: Ipv4Net) -> Result<(), WgCommandError> {
		let args = vec![
			"address".to_string(),
			"replace".to_string(),
			address.to_string(),
			"dev".to_string(),
			self.interface.clone(),
		];
		run("ip", &args, None).await
	}
}

async fn run(
	program: &'static str,
	args: &[String],
	stdin: Option<&[u8]>,
) -> Result<(), WgCommandError> {
	debug!(program, ?args, "running interface command");

	let mut child = Command::new(program)
		.args(args)
		.stdin(if stdin.is_some() {
			Stdio::piped()
		} else {
			Stdio::null()
		})
		.stdout(Stdio::null())
		.stderr(Stdio::piped())
		.spawn()
		.map_err(|source| WgCommandError::Spawn { program, source })?;

	if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
		pipe
			.write_all(input)
			.await
			.map_err(|source| WgCommandError::Spawn { program, source })?;
		drop(pipe);
	}

	let output = child
		.wait_with_output()
		.await
		.map_err(|source| WgCommandError::Spawn { program, source })?;

	if !output.status.success() {
		return Err(WgCommandError::Failed {
			program,
			status: output.status,
			stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		});
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_peer_args_include_optional_fields() {
		let peer = PeerConfig {
			public_key: WgPublicKey::from_bytes([0u8; 32]),
			endpoint: Some("203.0.113.7:51820".to_string()),
			allowed_ips: vec!["10.42.0.2/32".parse().unwrap()],
			persistent_keepalive: Some(15),
		};
		let key = format!("{}=", "A".repeat(43));
		assert_eq!(
			peer.wg_args(),
			vec![
				"peer",
				key.as_str(),
				"endpoint",
				"203.0.113.7:51820",
				"allowed-ips",
				"10.42.0.2/32",
				"persistent-keepalive",
				"15",
			]
		);
	}

	#[test]
	fn test_peer_args_without_endpoint() {
		let peer = PeerConfig {
			public_key: WgPublicKey::from_bytes([0u8; 32]),
			endpoint: None,
			allowed_ips: vec![
				"10.42.0.3/32".parse().unwrap(),
				"10.42.0.4/32".parse().unwrap(),
			],
			persistent_keepalive: None,
		};
		let args = peer.wg_args();
		assert!(!args.iter().any(|a| a == "endpoint"));
		assert!(!args.iter().any(|a| a == "persistent-keepalive"));
		assert_eq!(args.last().unwrap(), "10.42.0.3/32,10.42.0.4/32");
	}

	#[tokio::test]
	async fn test_missing_program_is_spawn_error() {
		let err = run("sdwan-definitely-not-a-binary", &[], None)
			.await
			.unwrap_err();
		assert!(matches!(err, WgCommandError::Spawn { .. }));
	}
}
