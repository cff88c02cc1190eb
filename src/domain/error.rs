// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::primitives::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Connection failed to endpoint: {0}")]
    Connection(String),

    #[error("RPC error response: {0}")]
    Rpc(String),

    #[error("Fetch error: {provider} responded with {status}: {message}")]
    Fetch {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Calldata does not match a known function: {0}")]
    Decode(String),

    #[error("{call} on {address:#x} failed: {reason}")]
    ContractRead {
        address: Address,
        call: &'static str,
        reason: String,
    },

    #[error("Metadata resolution failed for strategy {strategy:#x}: {reason}")]
    MetadataResolution { strategy: Address, reason: String },

    #[error("Price not found for token {token:#x} on chain {chain_id}")]
    PriceNotFound { token: Address, chain_id: u64 },

    #[error("Unsupported exchange type: {0}")]
    UnsupportedExchangeType(String),

    #[error("Timed out after {ms}ms: {context}")]
    Timeout { ms: u64, context: String },

    #[error("Discord API error: {status}: {message}")]
    Discord { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    pub fn is_price_not_found(&self) -> bool {
        matches!(self, AppError::PriceNotFound { .. })
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
