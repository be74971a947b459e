// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One-time enrollment tokens.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(10 * 60);
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const TOKEN_BYTES: usize = 16;

pub struct TokenAuthority {
	ttl: chrono::Duration,
	tokens: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Default for TokenAuthority {
	fn default() -> Self {
		Self::new(DEFAULT_TOKEN_TTL)
	}
}

impl TokenAuthority {
	pub fn new(ttl: Duration) -> Self {
		Self {
			ttl: chrono::Duration::milliseconds(ttl.min(MAX_TOKEN_TTL).as_millis() as i64),
			tokens: Mutex::new(HashMap::new()),
		}
	}

	pub async fn issue(&self) -> String {
		self.issue_at(Utc::now()).await
	}

	/// Issues a token that expires `ttl` after `now`. Tokens that expired
	/// before `now` are dropped on the way.
	#[instrument(skip(self))]
	pub async fn issue_at(&self, now: DateTime<Utc>) -> String {
		let mut bytes = [0u8; TOKEN_BYTES];
		OsRng.fill_bytes(&mut bytes);
		let token = BASE64_URL_SAFE_NO_PAD.encode(bytes);

		let mut tokens = self.tokens.lock().await;
		tokens.retain(|_, expires_at| *expires_at >= now);
		tokens.insert(token.clone(), now + self.ttl);

		debug!(outstanding = tokens.len(), "issued enrollment token");

		token
	}

	pub async fn validate(&self, token: &str) -> bool {
		self.validate_at(token, Utc::now()).await
	}

	/// Consumes `token`. Returns true only for a known token that has not
	/// expired at `now`; a token is never accepted twice.
	pub async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> bool {
		let mut tokens = self.tokens.lock().await;

		match tokens.get(token) {
			Some(expires_at) if now <= *expires_at => {
				tokens.remove(token);
				true
			}
			_ => false,
		}
	}

	pub async fn outstanding(&self) -> usize {
		self.tokens.lock().await.len()
	}
}
