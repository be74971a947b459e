// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use super::AppState;
use crate::error::HubError;
use axum::{
	extract::{rejection::JsonRejection, ConnectInfo, State},
	http::{header, HeaderMap, Uri},
	Json,
};
use sdwan_common::{Peer, RegisterRequest, RegisterResponse, TokenResponse};
use std::net::SocketAddr;

pub async fn issue_token(State(state): State<AppState>) -> Json<TokenResponse> {
	let token = state.coordinator.issue_token().await;
	state.metrics.tokens_issued.inc();
	tracing::info!("issued enrollment token");
	Json(TokenResponse { token })
}

pub async fn register(
	State(state): State<AppState>,
	ConnectInfo(observed): ConnectInfo<SocketAddr>,
	headers: HeaderMap,
	uri: Uri,
	payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, HubError> {
	let result = match payload {
		Ok(Json(request)) => {
			let host = request_host(&headers, &uri);
			state
				.coordinator
				.register(request, observed, host.as_deref())
				.await
		}
		Err(rejection) => Err(HubError::BadRequest(rejection.body_text())),
	};

	match result {
		Ok(response) => {
			state.metrics.registrations.inc();
			state.sync_gauges().await;

			if let Some(interface) = &state.interface {
				if let Some(peer) = response
					.peers
					.iter()
					.find(|p| p.address == response.assigned_address)
				{
					if let Err(e) = interface.install_peer(peer).await {
						tracing::warn!(error = %e, "failed to install peer on hub interface");
					}
				}
			}

			Ok(Json(response))
		}
		Err(e) => {
			state.metrics.record_failure(e.code());
			tracing::debug!(error = %e, %observed, "registration failed");
			Err(e)
		}
	}
}

pub async fn list_peers(State(state): State<AppState>) -> Json<Vec<Peer>> {
	Json(state.coordinator.peers().await)
}

/// Host the client addressed, from the Host header or an absolute request URI.
fn request_host(headers: &HeaderMap, uri: &Uri) -> Option<String> {
	headers
		.get(header::HOST)
		.and_then(|v| v.to_str().ok())
		.map(str::to_string)
		.or_else(|| uri.authority().map(|a| a.as_str().to_string()))
}
