// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Types shared by the SD-WAN hub and its CPE nodes.
//!
//! - WireGuard key types in base64 wire form
//! - The [`Peer`] record the hub publishes
//! - Request/response schemas of the hub HTTP API
//! - A pre-configured HTTP client builder
//! - A driver for the `wg`/`ip` tools that configure the tunnel interface

pub mod api;
pub mod http;
pub mod keys;
pub mod peer;
pub mod wg;

pub use api::{
	ErrorResponse, RegisterRequest, RegisterResponse, TokenResponse, PEERS_PATH, REGISTER_PATH,
	TOKEN_PATH,
};
pub use keys::{KeyError, WgKeyPair, WgPrivateKey, WgPublicKey, KEY_LEN};
pub use peer::{Peer, PEER_ID_LEN};
pub use wg::{PeerConfig, WgCommand, WgCommandError, DEFAULT_INTERFACE};
