// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const NOISY_MODULES: [&str; 5] = ["h2", "hyper", "hyper_util", "reqwest", "alloy_transport_http"];

/// Bare levels get quiet HTTP/RPC internals; full directive strings pass through.
fn filter_spec(log_level: &str) -> String {
    let normalized = log_level.trim();
    if normalized.contains(',') || normalized.contains('=') {
        return normalized.to_string();
    }
    let base = if normalized.is_empty() { "info" } else { normalized };
    std::iter::once(base.to_string())
        .chain(NOISY_MODULES.iter().map(|m| format!("{m}=info")))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn setup_logging(log_level: &str, json_format: bool) {
    // RUST_LOG wins over the configured level.
    let spec = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| filter_spec(log_level));
    let filter = EnvFilter::from_str(&spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    if json_format {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false);
        subscriber.with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer().with_target(true).compact();
        subscriber.with(fmt_layer).init();
    }

    let base = spec
        .split(',')
        .map(str::trim)
        .find(|part| !part.is_empty())
        .unwrap_or("info");
    tracing::info!(
        target: "config",
        base,
        format = if json_format { "json" } else { "compact" },
        "Logging initialized"
    );
}
