// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SD-WAN CPE node binary.

use anyhow::Context;
use clap::Parser;
use sdwan_cpe::{
	CpeConfig, InterfaceController, LoggingController, NodeReconciler, WgCommandController,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// SD-WAN CPE - enrolls with the hub and keeps the local tunnel in sync.
#[derive(Parser)]
#[command(name = "sdwan-cpe", about = "SD-WAN CPE node agent", version)]
struct Args {
	/// Hub base URL
	#[arg(long, env = "SDWAN_HUB_URL")]
	hub: Option<String>,

	/// One-time enrollment token
	#[arg(long, env = "SDWAN_TOKEN", hide_env_values = true)]
	token: Option<String>,

	/// Log intended interface changes instead of applying them
	#[arg(long)]
	no_wg: bool,

	/// Emit logs as JSON
	#[arg(long, env = "SDWAN_LOG_JSON")]
	log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	init_tracing(args.log_json);

	let mut config = CpeConfig::from_lookup(|key| match key {
		"SDWAN_HUB_URL" => args.hub.clone(),
		"SDWAN_TOKEN" => args.token.clone(),
		_ => std::env::var(key).ok(),
	})
	.context("invalid CPE configuration (is --token set?)")?;
	if args.no_wg {
		config.configure_interface = false;
	}

	tracing::info!(?config, "starting sdwan-cpe");

	let controller: Arc<dyn InterfaceController> = if config.configure_interface {
		Arc::new(WgCommandController::new(&config.interface))
	} else {
		tracing::info!("skipping WireGuard interface setup (--no-wg)");
		Arc::new(LoggingController)
	};

	let mut node = NodeReconciler::new(config, controller)?;

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			tracing::info!("received shutdown signal");
			let _ = shutdown_tx.send(true);
		}
	});

	node.run(shutdown_rx).await.context("CPE node failed")?;

	tracing::info!("cpe shutdown complete");
	Ok(())
}

fn init_tracing(json: bool) {
	let filter =
		tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

	let registry = tracing_subscriber::registry().with(filter);
	if json {
		registry.with(tracing_subscriber::fmt::layer().json()).init();
	} else {
		registry.with(tracing_subscriber::fmt::layer()).init();
	}
}
