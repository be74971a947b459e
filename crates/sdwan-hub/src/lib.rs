// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SD-WAN hub: enrollment tokens, overlay address allocation and the peer
//! directory behind the registration API.
//!
//! - [`TokenAuthority`] issues and consumes one-time enrollment tokens
//! - [`AddressAllocator`] hands out overlay addresses from the configured subnet
//! - [`PeerDirectory`] is the concurrent public key to peer mapping
//! - [`HubCoordinator`] composes them into the registration protocol
//! - [`create_router`] exposes everything over HTTP

pub mod config;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod interface;
pub mod ip_allocator;
pub mod metrics;
pub mod routes;
pub mod tokens;

pub use config::{ConfigError, HubConfig};
pub use coordinator::{HubCoordinator, HubIdentity};
pub use directory::PeerDirectory;
pub use error::{HubError, Result};
pub use interface::HubInterface;
pub use ip_allocator::AddressAllocator;
pub use metrics::HubMetrics;
pub use routes::{create_router, AppState};
pub use tokens::TokenAuthority;
