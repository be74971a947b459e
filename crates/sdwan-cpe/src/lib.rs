// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! CPE node agent for the SD-WAN mesh.
//!
//! A node generates a fresh keypair, enrolls with the hub using a one-time
//! token, then keeps its tunnel interface in line with the hub's peer list.

pub mod config;
pub mod controller;
pub mod error;
pub mod reconciler;
pub mod registration;

pub use config::CpeConfig;
pub use controller::{InterfaceController, LoggingController, PeerUpdate, WgCommandController};
pub use error::{ConfigError, DaemonError, InterfaceError, RegistrationError, Result};
pub use reconciler::{Assignment, NodeReconciler, NodeState, PeerSetDiff, ReconcileOutcome};
pub use registration::Registration;
