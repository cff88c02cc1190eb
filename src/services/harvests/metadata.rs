// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::primitives::Address;

use crate::common::constants::{STRATEGY_NAME_BOILERPLATE, VAULT_NAME_BOILERPLATE};
use crate::common::error::AppError;
use crate::data::metadata_cache::MetadataCache;
use crate::domain::models::{HarvestEvent, StrategyMetadata};
use crate::infrastructure::data::abi::{
    ControllerV1, IERC20Metadata, StrategyV1, StrategyV15, VaultV15,
};
use crate::network::provider::{ChainReader, read};

/// The two strategy generations and how each reaches its vault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataSource {
    /// strategy -> controller -> controller.vaults(want)
    VersionOne,
    /// strategy -> strategy.vault()
    VersionOneFive,
}

impl MetadataSource {
    pub fn label(&self) -> &'static str {
        match self {
            MetadataSource::VersionOne => "v1",
            MetadataSource::VersionOneFive => "v1.5",
        }
    }
}

/// Resolves strategy metadata for one chain, reading through `cache`.
pub struct MetadataResolver<'a, R: ChainReader> {
    reader: &'a R,
    cache: &'a MetadataCache,
    chain_id: u64,
}

impl<'a, R: ChainReader> MetadataResolver<'a, R> {
    pub fn new(reader: &'a R, cache: &'a MetadataCache, chain_id: u64) -> Self {
        Self {
            reader,
            cache,
            chain_id,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Order in which to try the schemas for `strategy`.
    ///
    /// V1.5 strategies answer `baseStrategyVersion()`; anything else is tried
    /// as V1 first with V1.5 as the fallback.
    pub async fn detect_sources(&self, strategy: Address) -> [MetadataSource; 2] {
        match read(self.reader, strategy, StrategyV15::baseStrategyVersionCall {}).await {
            Ok(version) => {
                tracing::trace!(target: "metadata", strategy = %strategy, version = %version, "Detected versioned strategy");
                [MetadataSource::VersionOneFive, MetadataSource::VersionOne]
            }
            Err(_) => [MetadataSource::VersionOne, MetadataSource::VersionOneFive],
        }
    }

    /// Cache hit returns without any chain read; a miss resolves and stores.
    pub async fn resolve(&self, strategy: Address) -> Result<StrategyMetadata, AppError> {
        if let Some(meta) = self.cache.get(self.chain_id, strategy) {
            return Ok(meta);
        }
        let meta = self.resolve_uncached(strategy).await?;
        self.cache.insert(self.chain_id, meta.clone());
        Ok(meta)
    }

    async fn resolve_uncached(&self, strategy: Address) -> Result<StrategyMetadata, AppError> {
        let mut failures = Vec::with_capacity(2);
        for source in self.detect_sources(strategy).await {
            match self.resolve_with(source, strategy).await {
                Ok(meta) => return Ok(meta),
                Err(e) => {
                    tracing::debug!(
                        target: "metadata",
                        chain_id = self.chain_id,
                        strategy = %strategy,
                        source = source.label(),
                        error = %e,
                        "Schema did not resolve"
                    );
                    failures.push(format!("{}: {e}", source.label()));
                }
            }
        }
        Err(AppError::MetadataResolution {
            strategy,
            reason: failures.join("; "),
        })
    }

    pub async fn resolve_with(
        &self,
        source: MetadataSource,
        strategy: Address,
    ) -> Result<StrategyMetadata, AppError> {
        let (want, vault, strategy_name_full) = match source {
            MetadataSource::VersionOne => {
                let controller = read(self.reader, strategy, StrategyV1::controllerCall {}).await?;
                let want = read(self.reader, strategy, StrategyV1::wantCall {}).await?;
                let vault =
                    read(self.reader, controller, ControllerV1::vaultsCall { want }).await?;
                let name = read(self.reader, strategy, StrategyV1::getNameCall {}).await?;
                (want, vault, name)
            }
            MetadataSource::VersionOneFive => {
                let want = read(self.reader, strategy, StrategyV15::wantCall {}).await?;
                let vault = read(self.reader, strategy, StrategyV15::vaultCall {}).await?;
                let name = read(self.reader, strategy, StrategyV15::getNameCall {}).await?;
                (want, vault, name)
            }
        };
        if vault.is_zero() {
            return Err(AppError::MetadataResolution {
                strategy,
                reason: format!("{} schema has no vault for want {want:#x}", source.label()),
            });
        }
        let vault_name_full = read(self.reader, vault, IERC20Metadata::nameCall {}).await?;

        Ok(StrategyMetadata {
            strategy_address: strategy,
            strategy_name: display_name(&strategy_name_full, STRATEGY_NAME_BOILERPLATE),
            strategy_name_full,
            vault_address: vault,
            vault_name: display_name(&vault_name_full, VAULT_NAME_BOILERPLATE),
            vault_name_full,
            want_token_address: want,
        })
    }

    /// True only while the vault (v1.5) or controller (v1) still points at
    /// `strategy` for its want token.
    pub async fn is_active_strategy(&self, strategy: Address) -> Result<bool, AppError> {
        let mut last_err = None;
        for source in self.detect_sources(strategy).await {
            match self.active_strategy_for(source, strategy).await {
                Ok(active) => return Ok(active == strategy),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| AppError::MetadataResolution {
            strategy,
            reason: "no schema answered the liveness check".into(),
        }))
    }

    async fn active_strategy_for(
        &self,
        source: MetadataSource,
        strategy: Address,
    ) -> Result<Address, AppError> {
        match source {
            MetadataSource::VersionOne => {
                let controller = read(self.reader, strategy, StrategyV1::controllerCall {}).await?;
                let want = read(self.reader, strategy, StrategyV1::wantCall {}).await?;
                read(self.reader, controller, ControllerV1::strategiesCall { want }).await
            }
            MetadataSource::VersionOneFive => {
                let vault = read(self.reader, strategy, StrategyV15::vaultCall {}).await?;
                read(self.reader, vault, VaultV15::strategyCall {}).await
            }
        }
    }

    /// Pair each harvest with its metadata, in harvest order. Strategies that
    /// resolve under neither schema are logged and left out.
    pub async fn resolve_harvests(
        &self,
        harvests: &[HarvestEvent],
    ) -> Vec<(HarvestEvent, StrategyMetadata)> {
        let mut rows = Vec::with_capacity(harvests.len());
        for harvest in harvests {
            match self.resolve(harvest.strategy).await {
                Ok(meta) => rows.push((harvest.clone(), meta)),
                Err(e) => {
                    tracing::warn!(
                        target: "metadata",
                        chain_id = self.chain_id,
                        strategy = %harvest.strategy,
                        error = %e,
                        "Skipping strategy with unresolvable metadata"
                    );
                }
            }
        }
        rows
    }
}

fn display_name(full: &str, boilerplate: &str) -> String {
    let stripped = full.replace(boilerplate, "");
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        full.trim().to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_utils::FakeChain;
    use alloy::primitives::address;

    const STRATEGY: Address = address!("1000000000000000000000000000000000000001");
    const CONTROLLER: Address = address!("2000000000000000000000000000000000000002");
    const VAULT: Address = address!("3000000000000000000000000000000000000003");
    const WANT: Address = address!("4000000000000000000000000000000000000004");

    fn v1_chain() -> FakeChain {
        let chain = FakeChain::default();
        chain.respond(STRATEGY, StrategyV1::controllerCall {}, CONTROLLER);
        chain.respond(STRATEGY, StrategyV1::wantCall {}, WANT);
        chain.respond(CONTROLLER, ControllerV1::vaultsCall { want: WANT }, VAULT);
        chain.respond(CONTROLLER, ControllerV1::strategiesCall { want: WANT }, STRATEGY);
        chain.respond(
            STRATEGY,
            StrategyV1::getNameCall {},
            "StrategyCurveGaugeRenBtcCrv".to_string(),
        );
        chain.respond(
            VAULT,
            IERC20Metadata::nameCall {},
            "Badger Sett Curve.fi renBTC/wBTC".to_string(),
        );
        chain
    }

    fn v15_chain() -> FakeChain {
        let chain = FakeChain::default();
        chain.respond(STRATEGY, StrategyV15::baseStrategyVersionCall {}, "1.5".to_string());
        chain.respond(STRATEGY, StrategyV15::wantCall {}, WANT);
        chain.respond(STRATEGY, StrategyV15::vaultCall {}, VAULT);
        chain.respond(STRATEGY, StrategyV15::getNameCall {}, "StrategyConvexStakingOptimizer".to_string());
        chain.respond(VAULT, IERC20Metadata::nameCall {}, "Badger Sett Convex CRV".to_string());
        chain.respond(VAULT, VaultV15::strategyCall {}, STRATEGY);
        chain
    }

    #[tokio::test]
    async fn resolves_v1_through_controller() {
        let chain = v1_chain();
        let cache = MetadataCache::in_memory();
        let resolver = MetadataResolver::new(&chain, &cache, 1);

        let meta = resolver.resolve(STRATEGY).await.unwrap();
        assert_eq!(meta.vault_address, VAULT);
        assert_eq!(meta.want_token_address, WANT);
        assert_eq!(meta.strategy_name, "CurveGaugeRenBtcCrv");
        assert_eq!(meta.strategy_name_full, "StrategyCurveGaugeRenBtcCrv");
        assert_eq!(meta.vault_name, "Curve.fi renBTC/wBTC");
        assert_eq!(meta.vault_name_full, "Badger Sett Curve.fi renBTC/wBTC");
    }

    #[tokio::test]
    async fn falls_back_to_v15_when_controller_read_fails() {
        let chain = FakeChain::default();
        // No version answer and no controller(): only the v1.5 reads exist.
        chain.respond(STRATEGY, StrategyV15::wantCall {}, WANT);
        chain.respond(STRATEGY, StrategyV15::vaultCall {}, VAULT);
        chain.respond(STRATEGY, StrategyV15::getNameCall {}, "StrategyConvexStakingOptimizer".to_string());
        chain.respond(VAULT, IERC20Metadata::nameCall {}, "Badger Sett Convex CRV".to_string());

        let cache = MetadataCache::in_memory();
        let resolver = MetadataResolver::new(&chain, &cache, 1);
        let meta = resolver.resolve(STRATEGY).await.unwrap();

        assert_eq!(meta.strategy_address, STRATEGY);
        assert_eq!(meta.vault_address, VAULT);
        assert_eq!(meta.want_token_address, WANT);
        assert_eq!(meta.strategy_name, "ConvexStakingOptimizer");
        assert_eq!(meta.vault_name, "Convex CRV");
        assert!(!meta.vault_name_full.is_empty());
        assert!(!meta.strategy_name_full.is_empty());
    }

    #[tokio::test]
    async fn version_read_prefers_v15_without_touching_controller() {
        let chain = v15_chain();
        let cache = MetadataCache::in_memory();
        let resolver = MetadataResolver::new(&chain, &cache, 1);
        assert_eq!(
            resolver.detect_sources(STRATEGY).await[0],
            MetadataSource::VersionOneFive
        );
        resolver.resolve(STRATEGY).await.unwrap();
        assert_eq!(chain.calls_to(CONTROLLER), 0);
    }

    #[tokio::test]
    async fn cache_hit_skips_chain_reads() {
        let chain = v1_chain();
        let cache = MetadataCache::in_memory();
        let resolver = MetadataResolver::new(&chain, &cache, 1);

        let first = resolver.resolve(STRATEGY).await.unwrap();
        let reads = chain.total_calls();
        let second = resolver.resolve(STRATEGY).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(chain.total_calls(), reads);
        assert!(cache.is_dirty());
    }

    #[tokio::test]
    async fn unresolvable_strategy_is_skipped_not_fatal() {
        let chain = v1_chain();
        let cache = MetadataCache::in_memory();
        let resolver = MetadataResolver::new(&chain, &cache, 1);
        let ghost = address!("9999999999999999999999999999999999999999");
        let harvests = vec![
            HarvestEvent {
                strategy: ghost,
                timestamp: 2,
                tx_hash: Default::default(),
                block_hash: Default::default(),
            },
            HarvestEvent {
                strategy: STRATEGY,
                timestamp: 1,
                tx_hash: Default::default(),
                block_hash: Default::default(),
            },
        ];
        let err = resolver.resolve(ghost).await.unwrap_err();
        assert!(matches!(err, AppError::MetadataResolution { .. }));

        let rows = resolver.resolve_harvests(&harvests).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.strategy_address, STRATEGY);
    }

    #[tokio::test]
    async fn liveness_follows_schema() {
        let chain = v1_chain();
        let cache = MetadataCache::in_memory();
        let resolver = MetadataResolver::new(&chain, &cache, 1);
        assert!(resolver.is_active_strategy(STRATEGY).await.unwrap());

        let replaced = address!("5000000000000000000000000000000000000005");
        let chain = v15_chain();
        chain.respond(VAULT, VaultV15::strategyCall {}, replaced);
        let resolver = MetadataResolver::new(&chain, &cache, 1);
        assert!(!resolver.is_active_strategy(STRATEGY).await.unwrap());
    }

    #[test]
    fn display_names_strip_boilerplate() {
        assert_eq!(display_name("Badger Sett Convex CRV", VAULT_NAME_BOILERPLATE), "Convex CRV");
        assert_eq!(display_name("StrategyBadgerLpMetaFarm", STRATEGY_NAME_BOILERPLATE), "BadgerLpMetaFarm");
        assert_eq!(display_name("Strategy", STRATEGY_NAME_BOILERPLATE), "Strategy");
    }
}
