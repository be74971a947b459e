// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
	#[error("registration error: {0}")]
	Registration(#[from] RegistrationError),

	#[error("interface error: {0}")]
	Interface(#[from] InterfaceError),

	#[error("node is not registered with the hub")]
	NotRegistered,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("hub rejected the enrollment token")]
	Unauthorized,

	#[error("hub returned {status}: {message}")]
	Api { status: u16, message: String },

	#[error("URL parse error: {0}")]
	Url(#[from] url::ParseError),
}

impl RegistrationError {
	/// True for failures of the transport itself (connect, timeout, body).
	pub fn is_transport(&self) -> bool {
		matches!(self, RegistrationError::Http(_))
	}
}

#[derive(Debug, Error)]
pub enum InterfaceError {
	#[error(transparent)]
	Command(#[from] sdwan_common::WgCommandError),

	#[error("interface rejected configuration: {0}")]
	Rejected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("missing environment variable: {0}")]
	MissingEnv(String),

	#[error("parse error: {0}")]
	Parse(String),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
