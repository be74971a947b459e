// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Enrollment and the periodic peer reconciliation loop.
//!
//! After a one-shot registration the node polls the hub's peer list on a
//! fixed interval, diffs it against what the interface last accepted, and
//! pushes only the difference. Hub and interface failures during the loop are
//! logged and retried on the next tick.

use crate::config::CpeConfig;
use crate::controller::{InterfaceController, PeerUpdate};
use crate::error::{DaemonError, Result};
use crate::registration::Registration;
use ipnet::Ipv4Net;
use sdwan_common::{Peer, PeerConfig, RegisterResponse, WgKeyPair, WgPublicKey};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
	Unregistered,
	Registered,
	Reconciling,
	Idle,
}

/// What the hub told us at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
	pub address: Ipv4Net,
	pub hub_public_key: WgPublicKey,
	pub hub_endpoint: String,
	pub hub_address: Ipv4Addr,
}

impl Assignment {
	fn from_response(resp: &RegisterResponse) -> Self {
		Self {
			address: resp.assigned_address,
			hub_public_key: resp.hub_public_key,
			hub_endpoint: resp.hub_endpoint.clone(),
			hub_address: hub_address(resp.assigned_address),
		}
	}
}

/// The hub holds host 1 of the overlay subnet.
fn hub_address(assigned: Ipv4Net) -> Ipv4Addr {
	Ipv4Addr::from(u32::from(assigned.network()) + 1)
}

type PeerSet = BTreeMap<WgPublicKey, PeerConfig>;

/// Difference between the applied and the desired peer set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerSetDiff {
	pub added: Vec<PeerConfig>,
	pub changed: Vec<PeerConfig>,
	pub removed: Vec<WgPublicKey>,
}

impl PeerSetDiff {
	pub fn between(applied: &PeerSet, desired: &PeerSet) -> Self {
		let mut diff = Self::default();

		for (key, peer) in desired {
			match applied.get(key) {
				None => diff.added.push(peer.clone()),
				Some(current) if current != peer => diff.changed.push(peer.clone()),
				Some(_) => {}
			}
		}
		diff.removed = applied
			.keys()
			.filter(|key| !desired.contains_key(*key))
			.copied()
			.collect();

		diff
	}

	pub fn is_empty(&self) -> bool {
		self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
	}

	pub fn to_update(&self) -> PeerUpdate {
		PeerUpdate {
			upsert: self.added.iter().chain(&self.changed).cloned().collect(),
			remove: self.removed.clone(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
	/// The interface already matches the desired set.
	Unchanged,
	Applied(PeerSetDiff),
}

pub struct NodeReconciler {
	registration: Registration,
	controller: Arc<dyn InterfaceController>,
	config: CpeConfig,
	keypair: WgKeyPair,
	state: NodeState,
	assignment: Option<Assignment>,
	interface_ready: bool,
	desired: PeerSet,
	applied: PeerSet,
}

impl NodeReconciler {
	/// Creates a node with a fresh keypair. Keys are never reused across runs.
	pub fn new(config: CpeConfig, controller: Arc<dyn InterfaceController>) -> Result<Self> {
		let registration = Registration::new(config.hub_url.clone(), config.request_timeout)?;
		let keypair = WgKeyPair::generate();

		info!(public_key = %keypair.public_key(), "generated node keypair");

		Ok(Self {
			registration,
			controller,
			config,
			keypair,
			state: NodeState::Unregistered,
			assignment: None,
			interface_ready: false,
			desired: PeerSet::new(),
			applied: PeerSet::new(),
		})
	}

	pub fn state(&self) -> NodeState {
		self.state
	}

	pub fn public_key(&self) -> &WgPublicKey {
		self.keypair.public_key()
	}

	pub fn assignment(&self) -> Option<&Assignment> {
		self.assignment.as_ref()
	}

	/// Peers last accepted by the interface controller.
	pub fn applied_peers(&self) -> impl Iterator<Item = &PeerConfig> {
		self.applied.values()
	}

	/// Enrolls with the hub. Any failure here is fatal: the token is one-time
	/// and cannot be blindly retried.
	#[instrument(skip(self), fields(public_key = %self.keypair.public_key()))]
	pub async fn register(&mut self) -> Result<&Assignment> {
		if self.state != NodeState::Unregistered {
			warn!("register called on an already registered node");
		}

		let resp = self
			.registration
			.register(&self.config.token, self.keypair.public_key())
			.await?;

		let assignment = Assignment::from_response(&resp);
		self.desired = self.desired_set(&resp.peers, &assignment);
		self.state = NodeState::Registered;

		info!(
			address = %assignment.address,
			hub_endpoint = %assignment.hub_endpoint,
			peers = self.desired.len(),
			"node registered"
		);

		Ok(&*self.assignment.insert(assignment))
	}

	/// One reconciliation tick: refresh the peer list from the hub, then push
	/// whatever differs from the applied set.
	///
	/// A failed hub fetch keeps the last-known set. A failed apply leaves the
	/// applied set untouched so the same changes are retried next tick.
	#[instrument(skip(self))]
	pub async fn reconcile_once(&mut self) -> Result<ReconcileOutcome> {
		let assignment = self.assignment.clone().ok_or(DaemonError::NotRegistered)?;
		self.state = NodeState::Reconciling;
		let outcome = self.reconcile_with(&assignment).await;
		self.state = NodeState::Idle;
		outcome
	}

	async fn reconcile_with(&mut self, assignment: &Assignment) -> Result<ReconcileOutcome> {
		if !self.interface_ready {
			self
				.controller
				.initialize(self.keypair.private_key(), assignment.address)
				.await?;
			self.interface_ready = true;
		}

		match self.registration.fetch_peers().await {
			Ok(peers) => self.desired = self.desired_set(&peers, assignment),
			Err(e) => warn!(error = %e, "failed to refresh peer list, keeping last known set"),
		}

		let diff = PeerSetDiff::between(&self.applied, &self.desired);
		if diff.is_empty() {
			debug!(peers = self.applied.len(), "peer set unchanged");
			return Ok(ReconcileOutcome::Unchanged);
		}

		self.controller.apply(&diff.to_update()).await?;
		self.applied = self.desired.clone();

		info!(
			added = diff.added.len(),
			changed = diff.changed.len(),
			removed = diff.removed.len(),
			"peer set applied"
		);

		Ok(ReconcileOutcome::Applied(diff))
	}

	/// Every peer except ourselves, plus the hub.
	///
	/// Peer endpoints are the addresses the hub observed on their HTTP
	/// requests. Treat them as hints: WireGuard replaces them with the real UDP
	/// source as soon as that peer sends a handshake.
	fn desired_set(&self, peers: &[Peer], assignment: &Assignment) -> PeerSet {
		let keepalive = self.config.keepalive();
		let own_key = self.keypair.public_key();

		let mut set: PeerSet = peers
			.iter()
			.filter(|p| &p.public_key != own_key && p.public_key != assignment.hub_public_key)
			.map(|p| {
				(
					p.public_key,
					PeerConfig {
						public_key: p.public_key,
						endpoint: p.endpoint.map(|e| e.to_string()),
						allowed_ips: vec![Ipv4Net::from(p.address.addr())],
						persistent_keepalive: keepalive,
					},
				)
			})
			.collect();

		set.insert(
			assignment.hub_public_key,
			PeerConfig {
				public_key: assignment.hub_public_key,
				endpoint: Some(assignment.hub_endpoint.clone()),
				allowed_ips: vec![Ipv4Net::from(assignment.hub_address)],
				persistent_keepalive: keepalive,
			},
		);

		set
	}

	/// Registers if needed, then reconciles on every tick until `shutdown`
	/// flips to true or its sender goes away.
	pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
		if self.state == NodeState::Unregistered {
			self.register().await?;
		}

		let mut ticker = tokio::time::interval(self.config.reconcile_interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

		info!(interval = ?self.config.reconcile_interval, "starting reconciliation loop");

		loop {
			tokio::select! {
				biased;

				changed = shutdown.changed() => {
					if changed.is_err() || *shutdown.borrow() {
						info!("shutdown signal received");
						break;
					}
				}

				_ = ticker.tick() => {
					if let Err(e) = self.reconcile_once().await {
						error!(error = %e, "reconciliation failed, retrying next tick");
					}
				}
			}
		}

		Ok(())
	}
}

impl std::fmt::Debug for NodeReconciler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NodeReconciler")
			.field("public_key", self.keypair.public_key())
			.field("state", &self.state)
			.field("assignment", &self.assignment)
			.field("applied", &self.applied.len())
			.finish()
	}
}
