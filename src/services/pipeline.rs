// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use chrono::{DateTime, Utc};
use futures::future::{join, join_all};

use crate::common::constants::ChainConfig;
use crate::common::error::AppError;
use crate::data::metadata_cache::MetadataCache;
use crate::domain::models::{ExchangeType, HarvestEvent, StrategyMetadata};
use crate::network::explorer::TransactionSource;
use crate::network::price_feed::PriceSource;
use crate::network::provider::ChainReader;
use crate::services::harvests::filter::{PickPolicy, retain_active, select_latest_harvests};
use crate::services::harvests::metadata::MetadataResolver;
use crate::services::harvests::pools::PoolScanner;
use crate::services::report::{Payload, harvest_table, last_update_footer, pool_table};

/// One configured chain and its read capability.
pub struct ChainRuntime<R> {
    pub chain: &'static ChainConfig,
    pub reader: R,
}

#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub pick_policy: PickPolicy,
    pub liveness_check: bool,
    pub currency: String,
    pub exchanges: Vec<ExchangeType>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            pick_policy: PickPolicy::default(),
            liveness_check: true,
            currency: "usd".into(),
            exchanges: ExchangeType::ALL.to_vec(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChainReport {
    pub chain_id: u64,
    pub harvest_table: String,
    /// `None` when pool valuation failed for this run.
    pub pool_table: Option<String>,
    pub harvests: usize,
    pub pools: usize,
}

/// Everything one run publishes: all harvest tables and all pool tables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub harvests: Payload,
    pub pools: Payload,
}

pub struct Pipeline<'a, T: TransactionSource, P: PriceSource> {
    transactions: &'a T,
    prices: &'a P,
    cache: &'a MetadataCache,
    options: &'a PipelineOptions,
}

impl<'a, T: TransactionSource, P: PriceSource> Pipeline<'a, T, P> {
    pub fn new(
        transactions: &'a T,
        prices: &'a P,
        cache: &'a MetadataCache,
        options: &'a PipelineOptions,
    ) -> Self {
        Self {
            transactions,
            prices,
            cache,
            options,
        }
    }

    pub async fn run<R: ChainReader>(&self, chains: &[ChainRuntime<R>]) -> Report {
        self.run_at(chains, Utc::now()).await
    }

    /// Runs every chain concurrently. A chain that fails is logged and left
    /// out of both payloads; the others are unaffected.
    pub async fn run_at<R: ChainReader>(
        &self,
        chains: &[ChainRuntime<R>],
        now: DateTime<Utc>,
    ) -> Report {
        let results = join_all(
            chains
                .iter()
                .map(|rt| self.run_chain(rt.chain, &rt.reader, now)),
        )
        .await;

        let footer = last_update_footer(now);
        let mut report = Report {
            harvests: Payload {
                tables: Vec::new(),
                footer: footer.clone(),
            },
            pools: Payload {
                tables: Vec::new(),
                footer,
            },
        };
        for (rt, result) in chains.iter().zip(results) {
            match result {
                Ok(chain_report) => {
                    tracing::info!(
                        target: "pipeline",
                        chain_id = chain_report.chain_id,
                        harvests = chain_report.harvests,
                        pools = chain_report.pools,
                        "Chain run complete"
                    );
                    report.harvests.tables.push(chain_report.harvest_table);
                    if let Some(table) = chain_report.pool_table {
                        report.pools.tables.push(table);
                    }
                }
                Err(e) => {
                    tracing::error!(
                        target: "pipeline",
                        chain_id = rt.chain.chain_id,
                        error = %e,
                        "Chain run failed; omitting from report"
                    );
                }
            }
        }
        report
    }

    pub async fn run_chain<R: ChainReader>(
        &self,
        chain: &ChainConfig,
        reader: &R,
        now: DateTime<Utc>,
    ) -> Result<ChainReport, AppError> {
        let resolver = MetadataResolver::new(reader, self.cache, chain.chain_id);
        let harvests = self.harvests(chain, reader, &resolver).await?;

        let scanner = PoolScanner::new(
            reader,
            self.prices,
            chain,
            &self.options.currency,
            &self.options.exchanges,
        );
        // A failed pool scan costs the pool table only.
        let (rows, scanned) = join(
            resolver.resolve_harvests(&harvests),
            scanner.scan(&harvests),
        )
        .await;
        let (pool_table, pools) = match scanned {
            Ok(pools) => (Some(pool_table(chain.display_name, &pools)), pools.len()),
            Err(e) => {
                tracing::error!(
                    target: "pools",
                    chain_id = chain.chain_id,
                    error = %e,
                    "Pool valuation failed; omitting pool table"
                );
                (None, 0)
            }
        };

        Ok(ChainReport {
            chain_id: chain.chain_id,
            harvest_table: harvest_table(chain.display_name, &rows, now),
            pool_table,
            harvests: rows.len(),
            pools,
        })
    }

    /// Resolve metadata for every harvested strategy without rendering tables.
    pub async fn prefetch_metadata<R: ChainReader>(
        &self,
        chain: &ChainConfig,
        reader: &R,
    ) -> Result<Vec<StrategyMetadata>, AppError> {
        let resolver = MetadataResolver::new(reader, self.cache, chain.chain_id);
        let harvests = self.harvests(chain, reader, &resolver).await?;
        let rows = resolver.resolve_harvests(&harvests).await;
        tracing::info!(
            target: "pipeline",
            chain_id = chain.chain_id,
            strategies = rows.len(),
            cached = self.cache.for_chain(chain.chain_id).len(),
            "Prefetched strategy metadata"
        );
        Ok(rows.into_iter().map(|(_, meta)| meta).collect())
    }

    async fn harvests<R: ChainReader>(
        &self,
        chain: &ChainConfig,
        reader: &R,
        resolver: &MetadataResolver<'_, R>,
    ) -> Result<Vec<HarvestEvent>, AppError> {
        let head = reader.block_number().await?;
        let start_block = chain.start_block(head);
        let txs = self
            .transactions
            .fetch_transactions(chain, chain.keeper_acl, start_block)
            .await?;
        let harvests = select_latest_harvests(
            &txs,
            chain.keeper_acl,
            chain.blacklisted_strategies,
            self.options.pick_policy,
        );
        tracing::debug!(
            target: "harvests",
            chain_id = chain.chain_id,
            head,
            start_block,
            txs = txs.len(),
            harvests = harvests.len(),
            "Selected latest harvests"
        );
        if !self.options.liveness_check {
            return Ok(harvests);
        }
        Ok(retain_active(harvests, resolver).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::constants::{CHAIN_ETHEREUM, chain_config};
    use crate::common::test_utils::FakeChain;
    use crate::domain::models::RawTransaction;
    use crate::infrastructure::data::abi::{IERC20Metadata, KeeperAccessControl, StrategyV15, VaultV15};
    use alloy::primitives::{Address, B256, Bytes, address};
    use alloy_sol_types::SolCall;
    use chrono::TimeZone;

    const STRATEGY: Address = address!("1000000000000000000000000000000000000001");
    const VAULT: Address = address!("3000000000000000000000000000000000000003");
    const WANT: Address = address!("4000000000000000000000000000000000000004");

    struct StaticTxs(Result<Vec<RawTransaction>, u16>);

    impl TransactionSource for StaticTxs {
        async fn fetch_transactions(
            &self,
            _chain: &ChainConfig,
            _address: Address,
            _start_block: u64,
        ) -> Result<Vec<RawTransaction>, AppError> {
            match &self.0 {
                Ok(txs) => Ok(txs.clone()),
                Err(status) => Err(AppError::Fetch {
                    provider: "explorer".into(),
                    status: *status,
                    message: "down".into(),
                }),
            }
        }
    }

    struct NoPrices;

    impl PriceSource for NoPrices {
        async fn token_price(&self, chain_id: u64, token: Address, _currency: &str) -> Result<f64, AppError> {
            Err(AppError::PriceNotFound { token, chain_id })
        }
    }

    fn chain_with_strategy() -> FakeChain {
        let chain = FakeChain::with_head(1_000_000);
        chain.respond(STRATEGY, StrategyV15::baseStrategyVersionCall {}, "1.5".into());
        chain.respond(STRATEGY, StrategyV15::wantCall {}, WANT);
        chain.respond(STRATEGY, StrategyV15::vaultCall {}, VAULT);
        chain.respond(STRATEGY, StrategyV15::getNameCall {}, "StrategyConvexCrv".into());
        chain.respond(VAULT, VaultV15::strategyCall {}, STRATEGY);
        chain.respond(VAULT, IERC20Metadata::nameCall {}, "Badger Sett Convex CRV".into());
        chain
    }

    fn harvest_tx(acl: Address, ts: u64) -> RawTransaction {
        RawTransaction {
            to: Some(acl),
            input: Some(Bytes::from(
                KeeperAccessControl::harvestCall { strategy: STRATEGY }.abi_encode(),
            )),
            timestamp: ts,
            block_number: 999_999,
            block_hash: B256::repeat_byte(0x01),
            hash: B256::repeat_byte(0x02),
        }
    }

    #[tokio::test]
    async fn single_chain_run_renders_both_tables() {
        let config = chain_config(CHAIN_ETHEREUM).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let txs = StaticTxs(Ok(vec![harvest_tx(config.keeper_acl, (now.timestamp() - 600) as u64)]));
        let cache = MetadataCache::in_memory();
        let options = PipelineOptions::default();
        let pipeline = Pipeline::new(&txs, &NoPrices, &cache, &options);

        let chains = [ChainRuntime {
            chain: config,
            reader: chain_with_strategy(),
        }];
        let report = pipeline.run_at(&chains, now).await;

        assert_eq!(report.harvests.tables.len(), 1);
        assert!(report.harvests.tables[0].contains("Convex CRV"));
        assert!(report.harvests.tables[0].contains("10m"));
        assert_eq!(report.pools.tables.len(), 1);
        assert_eq!(report.harvests.footer, report.pools.footer);
        assert!(cache.get(CHAIN_ETHEREUM, STRATEGY).is_some());
    }

    #[tokio::test]
    async fn fetch_failure_omits_chain() {
        let config = chain_config(CHAIN_ETHEREUM).unwrap();
        let txs = StaticTxs(Err(503));
        let cache = MetadataCache::in_memory();
        let options = PipelineOptions::default();
        let pipeline = Pipeline::new(&txs, &NoPrices, &cache, &options);

        let chains = [ChainRuntime {
            chain: config,
            reader: chain_with_strategy(),
        }];
        let report = pipeline.run(&chains).await;
        assert!(report.harvests.tables.is_empty());
        assert!(report.pools.tables.is_empty());
        assert!(report.harvests.render().contains("Last Update"));
    }

    #[tokio::test]
    async fn prefetch_populates_cache() {
        let config = chain_config(CHAIN_ETHEREUM).unwrap();
        let txs = StaticTxs(Ok(vec![harvest_tx(config.keeper_acl, 1)]));
        let cache = MetadataCache::in_memory();
        let options = PipelineOptions {
            liveness_check: false,
            ..PipelineOptions::default()
        };
        let pipeline = Pipeline::new(&txs, &NoPrices, &cache, &options);

        let metas = pipeline
            .prefetch_metadata(config, &chain_with_strategy())
            .await
            .unwrap();
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].vault_address, VAULT);
        assert!(cache.is_dirty());
    }
}
