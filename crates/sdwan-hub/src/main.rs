// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SD-WAN hub binary.

use anyhow::Context;
use clap::Parser;
use sdwan_hub::{create_router, AppState, HubConfig, HubCoordinator, HubInterface, HubMetrics};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// SD-WAN hub - enrollment and peer coordination for the overlay mesh.
#[derive(Parser, Debug)]
#[command(name = "sdwan-hub", about = "SD-WAN enrollment and peer coordination hub", version)]
struct Args {
	/// Skip configuring the hub's WireGuard interface (local testing)
	#[arg(long)]
	no_wg: bool,

	/// HTTP listen address, overrides SDWAN_LISTEN
	#[arg(long)]
	listen: Option<SocketAddr>,

	/// Emit logs as JSON
	#[arg(long, env = "SDWAN_LOG_JSON")]
	log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	init_tracing(args.log_json);

	let mut config = HubConfig::from_env().context("failed to load hub configuration")?;
	if args.no_wg {
		config.configure_interface = false;
	}
	if let Some(listen) = args.listen {
		config.listen = listen;
	}

	let coordinator = HubCoordinator::new(&config)?;
	let metrics = HubMetrics::new().context("failed to register metrics")?;
	let hub_address = coordinator.hub_address().await;

	tracing::info!(
		listen = %config.listen,
		wg_port = config.wg_port,
		subnet = %config.subnet,
		hub_address = %hub_address,
		public_key = %coordinator.identity().public_key(),
		"starting sdwan-hub"
	);

	let mut state = AppState::new(coordinator, metrics);

	if config.configure_interface {
		let interface = HubInterface::new(&config.interface);
		let result = interface
			.bring_up(state.coordinator.identity(), config.wg_port, hub_address)
			.await;
		match result {
			Ok(()) => state = state.with_interface(interface),
			Err(e) => tracing::warn!(
				error = %e,
				interface = %config.interface,
				"failed to configure WireGuard interface, continuing without it"
			),
		}
	} else {
		tracing::info!("skipping WireGuard interface setup (--no-wg)");
	}

	state.sync_gauges().await;

	let app = create_router(state).layer(TraceLayer::new_for_http());

	let listener = tokio::net::TcpListener::bind(config.listen)
		.await
		.with_context(|| format!("failed to bind {}", config.listen))?;
	tracing::info!("listening on {}", config.listen);

	tokio::select! {
		result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
		}
	}

	tracing::info!("hub shutdown complete");
	Ok(())
}

fn init_tracing(json: bool) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| "info,tower_http=debug".into());

	let registry = tracing_subscriber::registry().with(filter);
	if json {
		registry.with(tracing_subscriber::fmt::layer().json()).init();
	} else {
		registry.with(tracing_subscriber::fmt::layer()).init();
	}
}
