// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::constants::chain_config;
use crate::common::error::AppError;
use crate::common::parsing::parse_address_hex;
use alloy::primitives::Address;
use dashmap::DashMap;
use reqwest::Client;
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

const CACHE_TTL: u64 = 60; // Cache prices for 60 seconds
const STALE_CACHE_GRACE_SECS: u64 = 900; // Accept up to 15m old cache on failures

/// Unit price of a token in a fiat currency.
pub trait PriceSource: Send + Sync {
    fn token_price(
        &self,
        chain_id: u64,
        token: Address,
        currency: &str,
    ) -> impl Future<Output = Result<f64, AppError>> + Send;
}

#[derive(Clone, Debug, Default)]
pub struct PriceEndpoints {
    /// Base URL of a chain-wide price map (`/v2/prices?chain=..&currency=..`).
    pub price_api_url: Option<String>,
    pub coingecko_url: Option<String>,
    pub coingecko_api_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct PriceQuote {
    pub price: f64,
    pub source: &'static str,
}

type CacheKey = (u64, Address, String);

pub struct PriceFeed {
    client: Client,
    endpoints: PriceEndpoints,
    cache: DashMap<CacheKey, (PriceQuote, Instant)>,
    // (chain, currency) -> last time the chain-wide map was fetched
    chain_maps: DashMap<(u64, String), Instant>,
}

impl PriceFeed {
    pub fn new(endpoints: PriceEndpoints, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Initialization(format!("Price HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoints,
            cache: DashMap::new(),
            chain_maps: DashMap::new(),
        })
    }

    pub async fn get_price(
        &self,
        chain_id: u64,
        token: Address,
        currency: &str,
    ) -> Result<PriceQuote, AppError> {
        let currency = currency.to_ascii_lowercase();
        let key = (chain_id, token, currency.clone());

        // 1. Check fresh cache
        if let Some(quote) = self.cached_if_fresh(&key) {
            return Ok(quote);
        }

        // 2. Chain-wide price map (one request prices every listed token)
        if let Some(quote) = self.try_chain_map(chain_id, token, &currency).await {
            return Ok(quote);
        }

        // 3. CoinGecko by contract address
        if let Some(quote) = self.try_coingecko(chain_id, token, &currency).await {
            self.store_cache(key, quote.clone());
            return Ok(quote);
        }

        // 4. Soft-fail: serve stale cache if available instead of hard error
        if let Some((quote, age)) = self.cached_any(&key) {
            tracing::debug!(target: "price_feed", token = %token, age_secs = age.as_secs(), "Serving stale price");
            return Ok(quote);
        }

        Err(AppError::PriceNotFound { token, chain_id })
    }

    async fn try_chain_map(&self, chain_id: u64, token: Address, currency: &str) -> Option<PriceQuote> {
        let base = self.endpoints.price_api_url.as_deref()?;
        let chain = chain_config(chain_id)?;
        let map_key = (chain_id, currency.to_string());
        let fresh = self
            .chain_maps
            .get(&map_key)
            .is_some_and(|fetched| fetched.elapsed().as_secs() < CACHE_TTL);
        if fresh {
            // Map already loaded into the cache; a miss means the API does not list the token.
            return None;
        }

        let url = format!(
            "{}/v2/prices?chain={}&currency={currency}",
            base.trim_end_matches('/'),
            chain.price_api_chain
        );
        let body = match self.get_json(&url, None).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(target: "price_feed", chain_id, error = %e, "Chain price map unavailable");
                return None;
            }
        };
        self.chain_maps.insert(map_key, Instant::now());

        let prices = parse_price_map(&body);
        tracing::debug!(target: "price_feed", chain_id, tokens = prices.len(), "Loaded chain price map");
        let mut hit = None;
        for (addr, price) in prices {
            let quote = PriceQuote {
                price,
                source: "price_api",
            };
            if addr == token {
                hit = Some(quote.clone());
            }
            self.store_cache((chain_id, addr, currency.to_string()), quote);
        }
        hit
    }

    async fn try_coingecko(&self, chain_id: u64, token: Address, currency: &str) -> Option<PriceQuote> {
        let base = self.endpoints.coingecko_url.as_deref()?;
        let platform = chain_config(chain_id)?.coingecko_platform;
        let url = format!(
            "{}/simple/token_price/{platform}?contract_addresses={token:#x}&vs_currencies={currency}",
            base.trim_end_matches('/')
        );
        let body = match self
            .get_json(&url, self.endpoints.coingecko_api_key.as_deref())
            .await
        {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(target: "price_feed", token = %token, error = %e, "CoinGecko lookup failed");
                return None;
            }
        };
        parse_coingecko_price(&body, token, currency).map(|price| PriceQuote {
            price,
            source: "coingecko",
        })
    }

    async fn get_json(&self, url: &str, api_key: Option<&str>) -> Result<serde_json::Value, AppError> {
        let mut req = self.client.get(url);
        if let Some(key) = api_key {
            req = req.header("x-cg-pro-api-key", key);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| AppError::Connection(format!("Price request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Fetch {
                provider: "price".into(),
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        resp.json()
            .await
            .map_err(|e| AppError::Decode(format!("Price response decode failed: {e}")))
    }

    fn store_cache(&self, key: CacheKey, quote: PriceQuote) {
        self.cache.insert(key, (quote, Instant::now()));
    }

    fn cached_if_fresh(&self, key: &CacheKey) -> Option<PriceQuote> {
        self.cache
            .get(key)
            .and_then(|entry| {
                let (quote, ts) = entry.value();
                (ts.elapsed().as_secs() < CACHE_TTL).then(|| quote.clone())
            })
    }

    fn cached_any(&self, key: &CacheKey) -> Option<(PriceQuote, Duration)> {
        self.cache
            .get(key)
            .map(|entry| {
                let (quote, ts) = entry.value();
                (quote.clone(), ts.elapsed())
            })
            .filter(|(_, age)| age.as_secs() < STALE_CACHE_GRACE_SECS)
    }
}

impl PriceSource for PriceFeed {
    async fn token_price(
        &self,
        chain_id: u64,
        token: Address,
        currency: &str,
    ) -> Result<f64, AppError> {
        self.get_price(chain_id, token, currency)
            .await
            .map(|quote| quote.price)
    }
}

/// `{ "0xToken": 1.23, ... }`; entries that are not address -> number are ignored.
fn parse_price_map(body: &serde_json::Value) -> HashMap<Address, f64> {
    body.as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| Some((parse_address_hex(k)?, v.as_f64()?)))
                .filter(|(_, price)| price.is_finite() && *price > 0.0)
                .collect()
        })
        .unwrap_or_default()
}

/// `{ "0xtoken": { "usd": 1.23 } }`, keyed by lowercase address.
fn parse_coingecko_price(body: &serde_json::Value, token: Address, currency: &str) -> Option<f64> {
    body.as_object()?
        .iter()
        .find(|(k, _)| parse_address_hex(k) == Some(token))
        .and_then(|(_, v)| v.get(currency))
        .and_then(|v| v.as_f64())
}
