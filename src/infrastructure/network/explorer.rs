// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::constants::ChainConfig;
use crate::common::error::AppError;
use crate::common::parsing::{parse_address_hex, parse_b256_hex, parse_hex_bytes, parse_u64_dec};
use crate::common::retry::retry_async;
use crate::domain::models::RawTransaction;
use alloy::primitives::{Address, Bytes};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

const NO_TRANSACTIONS: &str = "No transactions found";

/// Transaction history of an address, most recent first.
pub trait TransactionSource: Send + Sync {
    fn fetch_transactions(
        &self,
        chain: &ChainConfig,
        address: Address,
        start_block: u64,
    ) -> impl Future<Output = Result<Vec<RawTransaction>, AppError>> + Send;
}

#[derive(Clone)]
pub struct EtherscanClient {
    client: Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EtherscanTx {
    block_number: String,
    time_stamp: String,
    hash: String,
    block_hash: String,
    to: String,
    input: String,
}

impl EtherscanTx {
    /// Rows the explorer returns without a block (pending) or with garbled
    /// hashes are dropped.
    fn into_raw(self) -> Option<RawTransaction> {
        Some(RawTransaction {
            to: parse_address_hex(&self.to),
            input: non_empty(&self.input)
                .and_then(parse_hex_bytes)
                .map(Bytes::from),
            timestamp: parse_u64_dec(&self.time_stamp)?,
            block_number: parse_u64_dec(&self.block_number)?,
            block_hash: parse_b256_hex(&self.block_hash)?,
            hash: parse_b256_hex(&self.hash)?,
        })
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl EtherscanClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Initialization(format!("Explorer HTTP client: {e}")))?;
        Ok(Self { client, api_key })
    }

    fn txlist_url(&self, chain: &ChainConfig, address: Address, start_block: u64) -> String {
        format!(
            "{}?module=account&action=txlist&sort=desc&address={address:#x}&startblock={start_block}&apikey={}",
            chain.explorer_api,
            self.api_key.as_deref().unwrap_or_default()
        )
    }

    async fn get_txlist(&self, url: &str, provider: &str) -> Result<EtherscanResponse, AppError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Connection(format!("{provider} request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Fetch {
                provider: provider.to_string(),
                status: status.as_u16(),
                message: body,
            });
        }
        resp.json()
            .await
            .map_err(|e| AppError::Decode(format!("{provider} response decode failed: {e}")))
    }
}

impl TransactionSource for EtherscanClient {
    async fn fetch_transactions(
        &self,
        chain: &ChainConfig,
        address: Address,
        start_block: u64,
    ) -> Result<Vec<RawTransaction>, AppError> {
        let url = self.txlist_url(chain, address, start_block);
        let provider = format!("{} explorer", chain.display_name);
        let parsed = retry_async(
            |_| self.get_txlist(&url, &provider),
            3,
            Duration::from_millis(250),
            |e| matches!(e, AppError::Connection(_)),
        )
        .await?;
        let txs = parse_txlist(parsed, &provider)?;
        tracing::debug!(
            target: "explorer",
            chain_id = chain.chain_id,
            address = %address,
            start_block,
            txs = txs.len(),
            "Fetched transaction list"
        );
        Ok(txs)
    }
}

fn parse_txlist(parsed: EtherscanResponse, provider: &str) -> Result<Vec<RawTransaction>, AppError> {
    if parsed.status != "1" {
        if parsed.message == NO_TRANSACTIONS {
            return Ok(Vec::new());
        }
        // Errors carry their detail in `result` as a string.
        let detail = parsed
            .result
            .as_str()
            .map(str::to_string)
            .unwrap_or_default();
        return Err(AppError::Fetch {
            provider: provider.to_string(),
            status: 200,
            message: format!("{} {}", parsed.message, detail).trim().to_string(),
        });
    }
    let rows: Vec<EtherscanTx> = serde_json::from_value(parsed.result)?;
    let total = rows.len();
    let txs: Vec<RawTransaction> = rows.into_iter().filter_map(EtherscanTx::into_raw).collect();
    if txs.len() < total {
        tracing::debug!(target: "explorer", dropped = total - txs.len(), "Dropped malformed explorer rows");
    }
    Ok(txs)
}
