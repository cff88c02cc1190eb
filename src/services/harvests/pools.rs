// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::collections::HashSet;

use alloy::primitives::{Address, B256, U256};
use futures::future::{join_all, try_join_all};

use crate::common::constants::{ChainConfig, MAX_CURVE_COINS, NATIVE_SENTINEL};
use crate::common::error::AppError;
use crate::domain::models::{ExchangeType, HarvestEvent, SwapPool, TokenHolding};
use crate::infrastructure::data::abi::{
    ICurvePool, ICurvePoolLegacy, IERC20Metadata, IUniswapPool, swap_topics,
};
use crate::network::price_feed::PriceSource;
use crate::network::provider::{ChainReader, LogQuery, read};
use crate::services::harvests::decode::logs_for_transaction;

const NATIVE_DECIMALS: u8 = 18;
const NATIVE_SYMBOL: &str = "ETH";

/// Argument type a Curve pool takes for `coins(i)` and `balances(i)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CurveIndexing {
    Uint256,
    Int128,
}

/// Finds the swap pools touched by harvest transactions and values them.
pub struct PoolScanner<'a, R: ChainReader, P: PriceSource> {
    reader: &'a R,
    prices: &'a P,
    chain: &'a ChainConfig,
    currency: &'a str,
    exchanges: &'a [ExchangeType],
}

impl<'a, R: ChainReader, P: PriceSource> PoolScanner<'a, R, P> {
    pub fn new(
        reader: &'a R,
        prices: &'a P,
        chain: &'a ChainConfig,
        currency: &'a str,
        exchanges: &'a [ExchangeType],
    ) -> Self {
        Self {
            reader,
            prices,
            chain,
            currency,
            exchanges,
        }
    }

    /// Discover, value and sort (ascending TVL) every pool the harvests swapped through.
    pub async fn scan(&self, harvests: &[HarvestEvent]) -> Result<Vec<SwapPool>, AppError> {
        let pools = self.discover(harvests).await?;
        tracing::debug!(
            target: "pools",
            chain_id = self.chain.chain_id,
            blocks = distinct_blocks(harvests),
            pools = pools.len(),
            "Discovered swap pools"
        );
        self.value_pools(&pools).await
    }

    /// Pools emitting a swap event inside one of the harvest transactions.
    /// Each pool appears once, in first-discovery order.
    pub async fn discover(
        &self,
        harvests: &[HarvestEvent],
    ) -> Result<Vec<(ExchangeType, Address)>, AppError> {
        let mut queries = Vec::with_capacity(harvests.len() * self.exchanges.len());
        for harvest in harvests {
            for exchange in self.exchanges {
                queries.push(self.swap_emitters(*exchange, harvest));
            }
        }
        let results = try_join_all(queries).await?;

        let mut seen = HashSet::new();
        let mut pools = Vec::new();
        for (exchange, emitters) in results {
            for pool in emitters {
                if seen.insert((exchange, pool)) {
                    pools.push((exchange, pool));
                }
            }
        }
        Ok(pools)
    }

    /// Block-scoped log query narrowed to the harvest transaction itself.
    async fn swap_emitters(
        &self,
        exchange: ExchangeType,
        harvest: &HarvestEvent,
    ) -> Result<(ExchangeType, Vec<Address>), AppError> {
        let topics = swap_topics(exchange);
        let logs = self
            .reader
            .logs(LogQuery {
                block_hash: harvest.block_hash,
                topics: topics.clone(),
            })
            .await?;
        let emitters = logs_for_transaction(&logs, &topics, harvest.tx_hash)
            .map(|log| log.address)
            .collect();
        Ok((exchange, emitters))
    }

    /// Pools whose price lookups fail are dropped with a warning. Any other
    /// failure aborts the whole valuation.
    pub async fn value_pools(
        &self,
        pools: &[(ExchangeType, Address)],
    ) -> Result<Vec<SwapPool>, AppError> {
        let results = join_all(
            pools
                .iter()
                .map(|(exchange, pool)| self.value_pool(*exchange, *pool)),
        )
        .await;

        let mut valued = Vec::with_capacity(results.len());
        for ((exchange, pool), result) in pools.iter().zip(results) {
            match result {
                Ok(swap_pool) => valued.push(swap_pool),
                Err(e) if e.is_price_not_found() => {
                    tracing::warn!(
                        target: "pools",
                        chain_id = self.chain.chain_id,
                        pool = %pool,
                        exchange = %exchange,
                        error = %e,
                        "Excluding pool without a price"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        valued.sort_by(|a, b| a.tvl_usd.total_cmp(&b.tvl_usd));
        Ok(valued)
    }

    pub async fn value_pool(
        &self,
        exchange: ExchangeType,
        pool: Address,
    ) -> Result<SwapPool, AppError> {
        let (name, holdings) = match exchange {
            ExchangeType::Curve => self.curve_holdings(pool).await?,
            ExchangeType::UniswapV2 | ExchangeType::UniswapV3 => self.pair_holdings(pool).await?,
        };
        let tvl_usd = holdings.iter().map(TokenHolding::value).sum();
        Ok(SwapPool {
            address: pool,
            exchange,
            name,
            tvl_usd,
        })
    }

    async fn curve_holdings(&self, pool: Address) -> Result<(String, Vec<TokenHolding>), AppError> {
        // Older pools are their own LP token.
        let symbol_source = match read(self.reader, pool, ICurvePool::lp_tokenCall {}).await {
            Ok(lp) if !lp.is_zero() => lp,
            _ => pool,
        };
        let name = read(self.reader, symbol_source, IERC20Metadata::symbolCall {}).await?;

        let (indexing, first) = self.curve_indexing(pool).await?;
        let mut holdings = Vec::new();
        for i in 0..MAX_CURVE_COINS {
            let coin = if i == 0 {
                first
            } else {
                // coins(i) reverts past the last coin.
                match self.curve_coin(pool, indexing, i).await {
                    Ok(coin) => coin,
                    Err(_) => break,
                }
            };
            let balance = self.curve_balance(pool, indexing, i).await?;
            holdings.push(self.holding(coin, balance).await?);
        }
        Ok((name, holdings))
    }

    /// Detects the index type from coin 0. A pool answering neither form
    /// cannot be valued.
    async fn curve_indexing(&self, pool: Address) -> Result<(CurveIndexing, Address), AppError> {
        match self.curve_coin(pool, CurveIndexing::Uint256, 0).await {
            Ok(coin) => Ok((CurveIndexing::Uint256, coin)),
            Err(e) => match self.curve_coin(pool, CurveIndexing::Int128, 0).await {
                Ok(coin) => Ok((CurveIndexing::Int128, coin)),
                Err(_) => Err(e),
            },
        }
    }

    async fn curve_coin(
        &self,
        pool: Address,
        indexing: CurveIndexing,
        i: u64,
    ) -> Result<Address, AppError> {
        match indexing {
            CurveIndexing::Uint256 => {
                read(self.reader, pool, ICurvePool::coinsCall { i: U256::from(i) }).await
            }
            CurveIndexing::Int128 => {
                read(self.reader, pool, ICurvePoolLegacy::coinsCall { i: i128::from(i) }).await
            }
        }
    }

    async fn curve_balance(
        &self,
        pool: Address,
        indexing: CurveIndexing,
        i: u64,
    ) -> Result<U256, AppError> {
        match indexing {
            CurveIndexing::Uint256 => {
                read(self.reader, pool, ICurvePool::balancesCall { i: U256::from(i) }).await
            }
            CurveIndexing::Int128 => {
                read(self.reader, pool, ICurvePoolLegacy::balancesCall { i: i128::from(i) }).await
            }
        }
    }

    async fn pair_holdings(&self, pool: Address) -> Result<(String, Vec<TokenHolding>), AppError> {
        let token0 = read(self.reader, pool, IUniswapPool::token0Call {}).await?;
        let token1 = read(self.reader, pool, IUniswapPool::token1Call {}).await?;
        let name = format!(
            "{}-{}",
            self.symbol(token0).await?,
            self.symbol(token1).await?
        );

        let mut holdings = Vec::with_capacity(2);
        for token in [token0, token1] {
            let balance = read(self.reader, token, IERC20Metadata::balanceOfCall { owner: pool }).await?;
            holdings.push(self.holding(token, balance).await?);
        }
        Ok((name, holdings))
    }

    async fn symbol(&self, token: Address) -> Result<String, AppError> {
        if token == NATIVE_SENTINEL {
            return Ok(NATIVE_SYMBOL.to_string());
        }
        read(self.reader, token, IERC20Metadata::symbolCall {}).await
    }

    async fn holding(&self, token: Address, raw_balance: U256) -> Result<TokenHolding, AppError> {
        let (decimals, priced_as) = if token == NATIVE_SENTINEL {
            (NATIVE_DECIMALS, self.chain.wrapped_native)
        } else {
            (
                read(self.reader, token, IERC20Metadata::decimalsCall {}).await?,
                token,
            )
        };
        let unit_price = self
            .prices
            .token_price(self.chain.chain_id, priced_as, self.currency)
            .await?;
        Ok(TokenHolding {
            token,
            raw_balance,
            decimals,
            unit_price,
        })
    }
}

/// Number of distinct blocks the harvests landed in.
pub fn distinct_blocks(harvests: &[HarvestEvent]) -> usize {
    harvests
        .iter()
        .map(|h| h.block_hash)
        .collect::<HashSet<B256>>()
        .len()
}
