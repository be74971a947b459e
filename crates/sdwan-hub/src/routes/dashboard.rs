// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-only HTML overview of the mesh.

use super::AppState;
use axum::{extract::State, response::Html};
use chrono::{DateTime, Utc};
use sdwan_common::{Peer, TOKEN_PATH};
use std::fmt::Write;
use std::time::Duration;

pub async fn dashboard(State(state): State<AppState>) -> Html<String> {
	let peers = state.coordinator.peers().await;
	let hub_key = state.coordinator.identity().public_key().to_base64();
	let hub_address = state.coordinator.hub_address().await;
	Html(render(&hub_key, &hub_address.to_string(), peers, Utc::now()))
}

fn render(hub_key: &str, hub_address: &str, mut peers: Vec<Peer>, now: DateTime<Utc>) -> String {
	peers.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));

	let mut rows = String::new();
	for peer in &peers {
		let endpoint = peer
			.endpoint
			.map(|e| e.to_string())
			.unwrap_or_else(|| "-".to_string());
		let _ = write!(
			rows,
			"<tr><td>{}</td><td><code>{}</code></td><td>{}</td><td>{}</td><td>{} ago</td></tr>",
			escape_html(&peer.id),
			escape_html(&peer.public_key.to_base64()),
			peer.address,
			escape_html(&endpoint),
			since(peer.last_seen, now),
		);
	}
	if peers.is_empty() {
		rows.push_str("<tr><td colspan=\"5\">no peers registered</td></tr>");
	}

	format!(
		r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>SD-WAN hub</title></head>
<body>
<h1>SD-WAN hub</h1>
<p>Hub public key: <code>{hub_key}</code> ({hub_address})</p>
<form method="post" action="{token_path}"><button type="submit">Issue enrollment token</button></form>
<h2>Peers ({count})</h2>
<table>
<thead><tr><th>ID</th><th>Public key</th><th>Address</th><th>Endpoint</th><th>Last seen</th></tr></thead>
<tbody>
{rows}
</tbody>
</table>
</body>
</html>
"#,
		hub_key = escape_html(hub_key),
		hub_address = escape_html(hub_address),
		token_path = TOKEN_PATH,
		count = peers.len(),
		rows = rows,
	)
}

fn since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
	let elapsed = (now - then).to_std().unwrap_or_default();
	humantime::format_duration(Duration::from_secs(elapsed.as_secs())).to_string()
}

pub fn escape_html(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	for c in s.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			c => out.push(c),
		}
	}
	out
}
