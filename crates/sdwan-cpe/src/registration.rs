// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::RegistrationError;
use reqwest::{Client, Response, StatusCode};
use sdwan_common::{ErrorResponse, Peer, RegisterRequest, RegisterResponse, WgPublicKey};
use sdwan_common::{PEERS_PATH, REGISTER_PATH};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Client for the hub's registration API.
pub struct Registration {
	hub_url: Url,
	http_client: Client,
}

impl Registration {
	pub fn new(hub_url: Url, timeout: Duration) -> Result<Self, RegistrationError> {
		let http_client = sdwan_common::http::new_client_with_timeout(timeout)?;

		Ok(Self {
			hub_url,
			http_client,
		})
	}

	#[instrument(
		skip(self, token, public_key),
		fields(hub = %self.hub_url, public_key = %public_key)
	)]
	pub async fn register(
		&self,
		token: &str,
		public_key: &WgPublicKey,
	) -> Result<RegisterResponse, RegistrationError> {
		let url = self.hub_url.join(REGISTER_PATH)?;

		debug!(%url, "registering with hub");

		let resp = self
			.http_client
			.post(url)
			.json(&RegisterRequest {
				token: token.to_string(),
				public_key: *public_key,
			})
			.send()
			.await?;

		let resp = check_status(resp)
			.await?
			.json::<RegisterResponse>()
			.await?;

		info!(
			assigned_address = %resp.assigned_address,
			hub_endpoint = %resp.hub_endpoint,
			peers = resp.peers.len(),
			"registered with hub"
		);

		Ok(resp)
	}

	#[instrument(skip(self), fields(hub = %self.hub_url))]
	pub async fn fetch_peers(&self) -> Result<Vec<Peer>, RegistrationError> {
		let url = self.hub_url.join(PEERS_PATH)?;

		let resp = self.http_client.get(url).send().await?;
		let peers = check_status(resp).await?.json::<Vec<Peer>>().await?;

		debug!(count = peers.len(), "fetched peer list");

		Ok(peers)
	}

}

impl std::fmt::Debug for Registration {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Registration")
			.field("hub_url", &self.hub_url.as_str())
			.finish()
	}
}

/// Maps non-success statuses to typed errors, keeping the hub's message.
async fn check_status(resp: Response) -> Result<Response, RegistrationError> {
	let status = resp.status();
	if status.is_success() {
		return Ok(resp);
	}
	if status == StatusCode::FORBIDDEN {
		return Err(RegistrationError::Unauthorized);
	}

	let body = resp.text().await.unwrap_or_default();
	let message = serde_json::from_str::<ErrorResponse>(&body)
		.map(|e| e.message)
		.unwrap_or(body);

	Err(RegistrationError::Api {
		status: status.as_u16(),
		message,
	})
}
