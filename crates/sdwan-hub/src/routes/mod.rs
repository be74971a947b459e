// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod api;
pub mod dashboard;
pub mod health;

use crate::coordinator::HubCoordinator;
use crate::interface::HubInterface;
use crate::metrics::HubMetrics;
use axum::{
	routing::{get, post},
	Router,
};
use sdwan_common::{PEERS_PATH, REGISTER_PATH, TOKEN_PATH};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
	pub coordinator: Arc<HubCoordinator>,
	pub metrics: Arc<HubMetrics>,
	/// Present when the hub manages its own tunnel interface.
	pub interface: Option<Arc<HubInterface>>,
}

impl AppState {
	pub fn new(coordinator: HubCoordinator, metrics: HubMetrics) -> Self {
		Self {
			coordinator: Arc::new(coordinator),
			metrics: Arc::new(metrics),
			interface: None,
		}
	}

	pub fn with_interface(mut self, interface: HubInterface) -> Self {
		self.interface = Some(Arc::new(interface));
		self
	}

	/// Refreshes the pool gauges from the directory.
	pub async fn sync_gauges(&self) {
		let directory = self.coordinator.directory();
		self
			.metrics
			.set_pool(directory.len().await, directory.remaining_addresses().await);
	}
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route(TOKEN_PATH, post(api::issue_token))
		.route(REGISTER_PATH, post(api::register))
		.route(PEERS_PATH, get(api::list_peers))
		.route("/dashboard", get(dashboard::dashboard))
		.route("/metrics", get(health::prometheus_metrics))
		.route("/health", get(health::health_check))
		.with_state(state)
}
