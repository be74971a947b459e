// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use super::AppState;
use crate::error::HubError;
use crate::metrics::CONTENT_TYPE;
use axum::{
	extract::State,
	http::{header, StatusCode},
	response::IntoResponse,
	Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	pub peers: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok",
		peers: state.coordinator.directory().len().await,
	})
}

pub async fn prometheus_metrics(
	State(state): State<AppState>,
) -> Result<impl IntoResponse, HubError> {
	state.sync_gauges().await;
	match state.metrics.encode() {
		Ok(metrics) => Ok((StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], metrics)),
		Err(e) => {
			tracing::error!(error = %e, "failed to encode metrics");
			Err(HubError::Metrics(e))
		}
	}
}
