// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use sdwan_common::ErrorResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
	#[error("enrollment token is invalid, expired or already used")]
	Unauthorized,

	#[error("malformed request: {0}")]
	BadRequest(String),

	#[error("address pool exhausted")]
	PoolExhausted,

	#[error("configuration error: {0}")]
	Config(#[from] crate::config::ConfigError),

	#[error("interface configuration failed: {0}")]
	Interface(#[from] sdwan_common::WgCommandError),

	#[error("metrics error: {0}")]
	Metrics(#[from] prometheus::Error),
}

impl HubError {
	/// Stable machine-readable code, also used as the failure metric label.
	pub fn code(&self) -> &'static str {
		match self {
			HubError::Unauthorized => "unauthorized",
			HubError::BadRequest(_) => "bad_request",
			HubError::PoolExhausted => "pool_exhausted",
			HubError::Config(_) => "config_error",
			HubError::Interface(_) => "interface_error",
			HubError::Metrics(_) => "internal_error",
		}
	}

	pub fn status(&self) -> StatusCode {
		match self {
			HubError::Unauthorized => StatusCode::FORBIDDEN,
			HubError::BadRequest(_) => StatusCode::BAD_REQUEST,
			HubError::PoolExhausted
			| HubError::Config(_)
			| HubError::Interface(_)
			| HubError::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for HubError {
	fn into_response(self) -> Response {
		let body = ErrorResponse {
			error: self.code().to_string(),
			message: self.to_string(),
		};
		(self.status(), Json(body)).into_response()
	}
}

pub type Result<T> = std::result::Result<T, HubError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_codes_match_api_contract() {
		assert_eq!(HubError::Unauthorized.status(), StatusCode::FORBIDDEN);
		assert_eq!(
			HubError::BadRequest("x".into()).status(),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(
			HubError::PoolExhausted.status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}

	#[test]
	fn test_codes_are_stable() {
		assert_eq!(HubError::Unauthorized.code(), "unauthorized");
		assert_eq!(HubError::PoolExhausted.code(), "pool_exhausted");
		assert_eq!(HubError::BadRequest("x".into()).code(), "bad_request");
	}
}
