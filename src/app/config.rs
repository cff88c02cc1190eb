// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::data_path::resolve_data_path;
use crate::domain::constants::{self, ChainConfig};
use crate::domain::error::AppError;
use crate::domain::models::ExchangeType;
use crate::network::price_feed::PriceEndpoints;
use crate::services::harvests::filter::PickPolicy;
use crate::services::pipeline::PipelineOptions;
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalSettings {
    // General
    #[serde(default = "default_false")]
    pub debug: bool,
    #[serde(default = "default_false")]
    pub json_logs: bool,
    #[serde(default = "default_chain", deserialize_with = "deserialize_chain_list")]
    pub chains: Vec<u64>,
    pub data_dir: Option<String>,
    pub metadata_path: Option<String>,

    // Secrets
    pub etherscan_api_key: Option<String>,
    pub infura_project_id: Option<String>,
    pub discord_bot_token: Option<String>,
    pub discord_channel_id: Option<String>,
    pub coingecko_api_key: Option<String>,

    // Endpoints
    pub http_providers: Option<HashMap<String, String>>,
    #[serde(default = "default_price_api_url")]
    pub price_api_url: Option<String>,
    #[serde(default = "default_coingecko_api_url")]
    pub coingecko_api_url: Option<String>,

    // Run
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub harvest_liveness_check: bool,
    #[serde(default = "default_price_currency")]
    pub price_currency: String,
    /// Exchange families scanned for pools ("UniV2", "Curve", "UniV3").
    #[serde(default = "default_pool_exchanges")]
    pub pool_exchanges: Vec<String>,
}

// Defaults
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_chain() -> Vec<u64> {
    vec![constants::CHAIN_ETHEREUM, constants::CHAIN_ARBITRUM]
}
fn default_price_api_url() -> Option<String> {
    Some("https://api.badger.com".to_string())
}
fn default_coingecko_api_url() -> Option<String> {
    Some("https://api.coingecko.com/api/v3".to_string())
}
fn default_refresh_interval_secs() -> u64 {
    600
}
fn default_rpc_timeout_ms() -> u64 {
    10_000
}
fn default_price_currency() -> String {
    "usd".to_string()
}
fn default_pool_exchanges() -> Vec<String> {
    ExchangeType::ALL
        .iter()
        .map(|e| e.label().to_string())
        .collect()
}

const DEFAULT_METADATA_PATH: &str = "strategy-metadata.json";
const MIN_REFRESH_INTERVAL_SECS: u64 = 30;

fn deserialize_chain_list<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{Error, SeqAccess, Visitor};
    use std::fmt;

    struct ChainVisitor;

    impl<'de> Visitor<'de> for ChainVisitor {
        type Value = Vec<u64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a sequence of chain ids or a string with comma-separated ids")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            parse_chain_list(v).map_err(E::custom)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut out = Vec::new();
            while let Some(elem) = seq.next_element::<u64>()? {
                out.push(elem);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_any(ChainVisitor)
}

impl GlobalSettings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(selected_path) = path {
            builder = builder.add_source(File::from(Path::new(selected_path)).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Deterministic precedence: env/.env > config file.
        builder = builder.add_source(Environment::default());

        let mut settings: GlobalSettings = builder.build()?.try_deserialize()?;

        // Allow CHAINS env to be comma/space separated string (e.g. "1,42161")
        if let Ok(chains_str) = std::env::var("CHAINS") {
            settings.chains = parse_chain_list(&chains_str)?;
        }

        // Basic Validation
        settings.chain_configs()?;
        settings.exchanges()?;

        Ok(settings)
    }

    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    /// Registry entries for the configured chains, in configured order.
    pub fn chain_configs(&self) -> Result<Vec<&'static ChainConfig>, AppError> {
        if self.chains.is_empty() {
            return Err(AppError::Config("No chains configured".into()));
        }
        self.chains
            .iter()
            .map(|id| {
                constants::chain_config(*id)
                    .ok_or_else(|| AppError::Config(format!("Unsupported chain id {id}")))
            })
            .collect()
    }

    pub fn exchanges(&self) -> Result<Vec<ExchangeType>, AppError> {
        let mut out = Vec::with_capacity(self.pool_exchanges.len());
        for raw in &self.pool_exchanges {
            let exchange: ExchangeType = raw.parse()?;
            if !out.contains(&exchange) {
                out.push(exchange);
            }
        }
        Ok(out)
    }

    fn data_dir_value(&self) -> Option<String> {
        std::env::var("DATA_DIR")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| non_empty(self.data_dir.as_deref()))
    }

    /// Strategy metadata cache file, resolved against the data directory.
    pub fn metadata_path(&self) -> PathBuf {
        let raw = non_empty(self.metadata_path.as_deref())
            .unwrap_or_else(|| DEFAULT_METADATA_PATH.to_string());
        resolve_data_path(&raw, self.data_dir_value().as_deref())
    }

    pub fn etherscan_api_key_value(&self) -> Option<String> {
        if let Ok(v) = std::env::var("ETHERSCAN_TOKEN")
            && !v.trim().is_empty()
        {
            return Some(v.trim().to_string());
        }
        non_empty(self.etherscan_api_key.as_deref())
    }

    /// Helper to get RPC URL for a specific chain
    pub fn get_http_provider(&self, chain: &ChainConfig) -> Result<String, AppError> {
        // Try looking for explicit map
        if let Some(urls) = &self.http_providers
            && let Some(url) = urls.get(&chain.chain_id.to_string())
            && !url.trim().is_empty()
        {
            return Ok(url.trim().to_string());
        }

        // Fallback to env var convention: http_provider_1, http_provider_42161
        if let Ok(v) = std::env::var(format!("http_provider_{}", chain.chain_id)) {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }

        if let Some(project_id) = non_empty(self.infura_project_id.as_deref()) {
            return Ok(format!("https://{}/v3/{project_id}", chain.infura_host));
        }

        Err(AppError::Config(format!(
            "No RPC URL found for chain {} (set http_providers or INFURA_PROJECT_ID)",
            chain.chain_id
        )))
    }

    /// Bot token and channel id, when both are configured.
    pub fn discord_credentials(&self) -> Option<(String, String)> {
        Some((
            non_empty(self.discord_bot_token.as_deref())?,
            non_empty(self.discord_channel_id.as_deref())?,
        ))
    }

    pub fn price_endpoints(&self) -> PriceEndpoints {
        PriceEndpoints {
            price_api_url: non_empty(self.price_api_url.as_deref()),
            coingecko_url: non_empty(self.coingecko_api_url.as_deref()),
            coingecko_api_key: non_empty(self.coingecko_api_key.as_deref()),
        }
    }

    pub fn pipeline_options(&self) -> Result<PipelineOptions, AppError> {
        Ok(PipelineOptions {
            pick_policy: PickPolicy::MostRecentFirst,
            liveness_check: self.harvest_liveness_check,
            currency: self.price_currency.trim().to_ascii_lowercase(),
            exchanges: self.exchanges()?,
        })
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms.max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(MIN_REFRESH_INTERVAL_SECS))
    }

    pub fn log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn parse_chain_list(raw: &str) -> Result<Vec<u64>, AppError> {
    let cleaned = raw.trim_matches(|c| c == '`' || c == '"' || c == '\'');
    let mut out = Vec::new();
    for part in cleaned.split(|c: char| c == ',' || c.is_whitespace()) {
        let p = part.trim();
        if p.is_empty() {
            continue;
        }
        let id: u64 = p
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid chain id '{}'", p)))?;
        out.push(id);
    }
    if out.is_empty() {
        return Err(AppError::Config("CHAINS env is empty".into()));
    }
    Ok(out)
}
