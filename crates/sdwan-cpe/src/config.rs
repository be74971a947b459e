// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::ConfigError;
use sdwan_common::DEFAULT_INTERFACE;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HUB_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_KEEPALIVE_SECS: u16 = 15;

#[derive(Clone)]
pub struct CpeConfig {
	pub hub_url: Url,
	pub token: String,
	pub reconcile_interval: Duration,
	pub request_timeout: Duration,
	pub interface: String,
	pub keepalive_secs: u16,
	pub configure_interface: bool,
}

impl CpeConfig {
	pub fn new(hub_url: Url, token: impl Into<String>) -> Result<Self, ConfigError> {
		validate_hub_url(&hub_url)?;
		let token = token.into();
		if token.trim().is_empty() {
			return Err(ConfigError::MissingEnv("SDWAN_TOKEN".to_string()));
		}
		Ok(Self {
			hub_url,
			token,
			reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			interface: DEFAULT_INTERFACE.to_string(),
			keepalive_secs: DEFAULT_KEEPALIVE_SECS,
			configure_interface: true,
		})
	}

	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads `SDWAN_*` settings from `lookup`. Unset or empty values fall back
	/// to defaults, except the token which is required.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

		let hub_url: Url = get("SDWAN_HUB_URL")
			.unwrap_or_else(|| DEFAULT_HUB_URL.to_string())
			.trim()
			.parse()
			.map_err(|e| ConfigError::Parse(format!("invalid SDWAN_HUB_URL: {e}")))?;

		let token =
			get("SDWAN_TOKEN").ok_or_else(|| ConfigError::MissingEnv("SDWAN_TOKEN".to_string()))?;

		let mut config = Self::new(hub_url, token.trim())?;

		if let Some(secs) = get("SDWAN_RECONCILE_INTERVAL_SECS") {
			config.reconcile_interval = positive_secs("SDWAN_RECONCILE_INTERVAL_SECS", &secs)?;
		}
		if let Some(secs) = get("SDWAN_REQUEST_TIMEOUT_SECS") {
			config.request_timeout = positive_secs("SDWAN_REQUEST_TIMEOUT_SECS", &secs)?;
		}
		if let Some(interface) = get("SDWAN_WG_INTERFACE") {
			config.interface = interface;
		}
		if let Some(keepalive) = get("SDWAN_KEEPALIVE_SECS") {
			config.keepalive_secs = keepalive
				.trim()
				.parse()
				.map_err(|e| ConfigError::Parse(format!("invalid SDWAN_KEEPALIVE_SECS: {e}")))?;
		}
		config.configure_interface = get("SDWAN_NO_WG")
			.map(|v| v == "0" || v.to_lowercase() == "false")
			.unwrap_or(true);

		Ok(config)
	}

	/// Persistent keepalive for tunnel peers; zero disables it.
	pub fn keepalive(&self) -> Option<u16> {
		(self.keepalive_secs > 0).then_some(self.keepalive_secs)
	}

	#[cfg(test)]
	pub fn new_for_test(hub_url: Url, token: &str) -> Self {
		Self {
			hub_url,
			token: token.to_string(),
			reconcile_interval: Duration::from_millis(20),
			request_timeout: Duration::from_secs(2),
			interface: "wgtest0".to_string(),
			keepalive_secs: DEFAULT_KEEPALIVE_SECS,
			configure_interface: false,
		}
	}
}

impl std::fmt::Debug for CpeConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CpeConfig")
			.field("hub_url", &self.hub_url.as_str())
			.field("token", &"[REDACTED]")
			.field("reconcile_interval", &self.reconcile_interval)
			.field("request_timeout", &self.request_timeout)
			.field("interface", &self.interface)
			.field("keepalive_secs", &self.keepalive_secs)
			.field("configure_interface", &self.configure_interface)
			.finish()
	}
}

fn validate_hub_url(url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"http" | "https" => Ok(()),
		other => Err(ConfigError::Parse(format!(
			"hub URL must use http:// or https://, got {other}://"
		))),
	}
}

fn positive_secs(name: &str, value: &str) -> Result<Duration, ConfigError> {
	let secs: u64 = value
		.trim()
		.parse()
		.map_err(|e| ConfigError::Parse(format!("invalid {name}: {e}")))?;
	if secs == 0 {
		return Err(ConfigError::Parse(format!("{name} must be positive")));
	}
	Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn test_defaults_with_token() {
		let config = CpeConfig::from_lookup(lookup(&[("SDWAN_TOKEN", "tok")])).unwrap();
		assert_eq!(config.hub_url.as_str(), "http://127.0.0.1:8080/");
		assert_eq!(config.token, "tok");
		assert_eq!(config.reconcile_interval, Duration::from_secs(30));
		assert_eq!(config.request_timeout, Duration::from_secs(10));
		assert_eq!(config.interface, "wg0");
		assert_eq!(config.keepalive(), Some(15));
		assert!(config.configure_interface);
	}

	#[test]
	fn test_missing_token_is_an_error() {
		let result = CpeConfig::from_lookup(lookup(&[]));
		assert!(matches!(
			result,
			Err(ConfigError::MissingEnv(ref v)) if v == "SDWAN_TOKEN"
		));

		let blank = CpeConfig::from_lookup(lookup(&[("SDWAN_TOKEN", "  ")]));
		assert!(blank.is_err());
	}

	#[test]
	fn test_overrides() {
		let config = CpeConfig::from_lookup(lookup(&[
			("SDWAN_TOKEN", "tok"),
			("SDWAN_HUB_URL", "https://hub.example.com"),
			("SDWAN_RECONCILE_INTERVAL_SECS", "5"),
			("SDWAN_REQUEST_TIMEOUT_SECS", "3"),
			("SDWAN_WG_INTERFACE", "sdwan1"),
			("SDWAN_KEEPALIVE_SECS", "0"),
			("SDWAN_NO_WG", "true"),
		]))
		.unwrap();
		assert_eq!(config.hub_url.host_str(), Some("hub.example.com"));
		assert_eq!(config.reconcile_interval, Duration::from_secs(5));
		assert_eq!(config.request_timeout, Duration::from_secs(3));
		assert_eq!(config.interface, "sdwan1");
		assert_eq!(config.keepalive(), None);
		assert!(!config.configure_interface);
	}

	#[test]
	fn test_rejects_bad_values() {
		assert!(CpeConfig::from_lookup(lookup(&[
			("SDWAN_TOKEN", "tok"),
			("SDWAN_HUB_URL", "ftp://hub"),
		]))
		.is_err());
		assert!(CpeConfig::from_lookup(lookup(&[
			("SDWAN_TOKEN", "tok"),
			("SDWAN_RECONCILE_INTERVAL_SECS", "0"),
		]))
		.is_err());
		assert!(CpeConfig::from_lookup(lookup(&[
			("SDWAN_TOKEN", "tok"),
			("SDWAN_KEEPALIVE_SECS", "-1"),
		]))
		.is_err());
	}

	#[test]
	fn test_debug_redacts_token() {
		let config = CpeConfig::new("http://hub:8080".parse().unwrap(), "super-secret").unwrap();
		let debug = format!("{config:?}");
		assert!(debug.contains("[REDACTED]"));
		assert!(!debug.contains("super-secret"));
	}
}
