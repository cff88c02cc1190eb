// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::AppError;

/// A transaction as listed by the block explorer. Read-only to the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTransaction {
    pub to: Option<Address>,
    pub input: Option<Bytes>,
    pub timestamp: u64,
    pub block_number: u64,
    pub block_hash: B256,
    pub hash: B256,
}

/// Latest qualifying harvest of one strategy within a scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarvestEvent {
    pub strategy: Address,
    pub timestamp: u64,
    pub tx_hash: B256,
    pub block_hash: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyMetadata {
    pub strategy_address: Address,
    pub strategy_name: String,
    pub strategy_name_full: String,
    pub vault_address: Address,
    pub vault_name: String,
    pub vault_name_full: String,
    pub want_token_address: Address,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExchangeType {
    UniswapV2,
    Curve,
    UniswapV3,
}

impl ExchangeType {
    pub const ALL: [ExchangeType; 3] = [
        ExchangeType::UniswapV2,
        ExchangeType::Curve,
        ExchangeType::UniswapV3,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ExchangeType::UniswapV2 => "UniV2",
            ExchangeType::Curve => "Curve",
            ExchangeType::UniswapV3 => "UniV3",
        }
    }
}

impl FromStr for ExchangeType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "univ2" | "uniswapv2" => Ok(ExchangeType::UniswapV2),
            "curve" => Ok(ExchangeType::Curve),
            "univ3" | "uniswapv3" => Ok(ExchangeType::UniswapV3),
            _ => Err(AppError::UnsupportedExchangeType(s.to_string())),
        }
    }
}

impl fmt::Display for ExchangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwapPool {
    pub address: Address,
    pub exchange: ExchangeType,
    pub name: String,
    pub tvl_usd: f64,
}

/// A pool's balance of one token, priced. Only lives for a TVL computation.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenHolding {
    pub token: Address,
    pub raw_balance: U256,
    pub decimals: u8,
    pub unit_price: f64,
}

impl TokenHolding {
    /// Balance scaled down by `decimals`.
    pub fn normalized_balance(&self) -> f64 {
        format_units(self.raw_balance, self.decimals)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    pub fn value(&self) -> f64 {
        self.normalized_balance() * self.unit_price
    }
}

/// An event log as returned by `eth_getLogs`, reduced to what pool discovery reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_hash: Option<B256>,
    pub transaction_hash: Option<B256>,
}

impl LogEntry {
    pub fn topic0(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}
