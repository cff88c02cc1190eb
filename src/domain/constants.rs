// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::{Address, address};

// Common assets
pub const WETH_MAINNET: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const WETH_ARBITRUM: Address = address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1");
/// Curve's placeholder for the native asset in `coins(i)`.
pub const NATIVE_SENTINEL: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

// =============================================================================
// NETWORK CONSTANTS
// =============================================================================

pub const CHAIN_ETHEREUM: u64 = 1;
pub const CHAIN_ARBITRUM: u64 = 42161;

// =============================================================================
// HARVEST CONSTANTS
// =============================================================================

/// Keeper functions that count as a harvest.
pub const HARVEST_FNS: [&str; 2] = ["harvest", "harvestNoReturn"];

/// Substrings stripped from on-chain names for display.
pub const STRATEGY_NAME_BOILERPLATE: &str = "Strategy";
pub const VAULT_NAME_BOILERPLATE: &str = "Badger Sett ";

/// Upper bound on `coins(i)` probing for Curve pools.
pub const MAX_CURVE_COINS: u64 = 8;

// =============================================================================
// OUTPUT CONSTANTS
// =============================================================================

pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Static per-chain parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Network name used by RPC hosts and price APIs.
    pub name: &'static str,
    pub display_name: &'static str,
    pub explorer_api: &'static str,
    pub keeper_acl: Address,
    pub blacklisted_strategies: &'static [Address],
    /// Blocks to look back from head; `None` scans from genesis.
    pub lookback_blocks: Option<u64>,
    pub wrapped_native: Address,
    pub infura_host: &'static str,
    pub coingecko_platform: &'static str,
    /// Chain key of the chain-wide price API.
    pub price_api_chain: &'static str,
}

impl ChainConfig {
    pub fn start_block(&self, head: u64) -> u64 {
        match self.lookback_blocks {
            Some(window) => head.saturating_sub(window),
            None => 0,
        }
    }
}

const MAINNET_BLACKLIST: [Address; 1] = [
    // tricrypto1
    address!("05eC4356e1acd89CC2d16adC7415c8c95E736AC1"),
];

pub const CHAIN_CONFIGS: [ChainConfig; 2] = [
    ChainConfig {
        chain_id: CHAIN_ETHEREUM,
        name: "mainnet",
        display_name: "Ethereum",
        explorer_api: "https://api.etherscan.io/api",
        keeper_acl: address!("711A339c002386f9db409cA55b6A35a604aB6cF6"),
        blacklisted_strategies: &MAINNET_BLACKLIST,
        // ~2 weeks of 12s blocks
        lookback_blocks: Some(100_000),
        wrapped_native: WETH_MAINNET,
        infura_host: "mainnet.infura.io",
        coingecko_platform: "ethereum",
        price_api_chain: "ethereum",
    },
    ChainConfig {
        chain_id: CHAIN_ARBITRUM,
        name: "arbitrum",
        display_name: "Arbitrum",
        explorer_api: "https://api.arbiscan.io/api",
        keeper_acl: address!("265820f3779f652f2a9857133fdeaf115b87db4b"),
        blacklisted_strategies: &[],
        lookback_blocks: None,
        wrapped_native: WETH_ARBITRUM,
        infura_host: "arbitrum-mainnet.infura.io",
        coingecko_platform: "arbitrum-one",
        price_api_chain: "arbitrum",
    },
];

pub fn chain_config(chain_id: u64) -> Option<&'static ChainConfig> {
    CHAIN_CONFIGS.iter().find(|c| c.chain_id == chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_block_respects_lookback_window() {
        let mainnet = chain_config(CHAIN_ETHEREUM).unwrap();
        assert_eq!(mainnet.start_block(250_000), 150_000);
        assert_eq!(mainnet.start_block(10), 0);

        let arbitrum = chain_config(CHAIN_ARBITRUM).unwrap();
        assert_eq!(arbitrum.start_block(99_999_999), 0);
    }

    #[test]
    fn blacklist_is_per_chain() {
        let tricrypto = address!("05eC4356e1acd89CC2d16adC7415c8c95E736AC1");
        let mainnet = chain_config(CHAIN_ETHEREUM).unwrap();
        let arbitrum = chain_config(CHAIN_ARBITRUM).unwrap();
        assert!(mainnet.blacklisted_strategies.contains(&tricrypto));
        assert!(!arbitrum.blacklisted_strategies.contains(&tricrypto));
        assert!(chain_config(10).is_none());
    }
}
