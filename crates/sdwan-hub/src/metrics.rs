// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub struct HubMetrics {
	registry: Registry,

	pub registrations: IntCounter,
	pub registration_failures: IntCounterVec,
	pub tokens_issued: IntCounter,
	pub peers: IntGauge,
	pub addresses_free: IntGauge,
}

impl HubMetrics {
	pub fn new() -> prometheus::Result<Self> {
		let registry = Registry::new();

		let registrations = IntCounter::new(
			"sdwan_registrations_total",
			"Total successful peer registrations",
		)?;
		registry.register(Box::new(registrations.clone()))?;

		let registration_failures = IntCounterVec::new(
			Opts::new(
				"sdwan_registration_failures_total",
				"Total rejected or failed peer registrations",
			),
			&["reason"],
		)?;
		registry.register(Box::new(registration_failures.clone()))?;

		let tokens_issued = IntCounter::new(
			"sdwan_tokens_issued_total",
			"Total enrollment tokens issued",
		)?;
		registry.register(Box::new(tokens_issued.clone()))?;

		let peers = IntGauge::new("sdwan_peers", "Peers currently known to the hub")?;
		registry.register(Box::new(peers.clone()))?;

		let addresses_free = IntGauge::new(
			"sdwan_addresses_free",
			"Overlay addresses still available for new peers",
		)?;
		registry.register(Box::new(addresses_free.clone()))?;

		Ok(Self {
			registry,
			registrations,
			registration_failures,
			tokens_issued,
			peers,
			addresses_free,
		})
	}

	pub fn record_failure(&self, reason: &str) {
		self.registration_failures.with_label_values(&[reason]).inc();
	}

	pub fn set_pool(&self, peers: usize, free: usize) {
		self.peers.set(peers as i64);
		self.addresses_free.set(free as i64);
	}

	pub fn encode(&self) -> prometheus::Result<String> {
		let encoder = TextEncoder::new();
		let families = self.registry.gather();
		let mut buffer = Vec::new();
		encoder.encode(&families, &mut buffer)?;
		String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_encodes_registered_series() {
		let metrics = HubMetrics::new().unwrap();
		metrics.registrations.inc();
		metrics.tokens_issued.inc_by(3);
		metrics.record_failure("unauthorized");
		metrics.set_pool(1, 252);

		let text = metrics.encode().unwrap();
		assert!(text.contains("sdwan_registrations_total 1"));
		assert!(text.contains("sdwan_tokens_issued_total 3"));
		assert!(text.contains(r#"sdwan_registration_failures_total{reason="unauthorized"} 1"#));
		assert!(text.contains("sdwan_peers 1"));
		assert!(text.contains("sdwan_addresses_free 252"));
	}

	#[test]
	fn test_registries_are_independent() {
		let a = HubMetrics::new().unwrap();
		let b = HubMetrics::new().unwrap();
		a.registrations.inc();
		assert!(b.encode().unwrap().contains("sdwan_registrations_total 0"));
	}
}
