// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::primitives::Address;
use std::collections::HashSet;

use crate::domain::models::{HarvestEvent, RawTransaction};
use crate::network::provider::ChainReader;
use crate::services::harvests::decode::decode_keeper_call;
use crate::services::harvests::metadata::MetadataResolver;

/// Order of the transaction list handed to the filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PickPolicy {
    /// Newest first, as the explorer returns with `sort=desc`.
    #[default]
    MostRecentFirst,
    /// Oldest first; walked in reverse so the newest harvest still wins.
    OldestFirst,
}

/// One harvest per strategy: the newest qualifying keeper transaction.
///
/// Transactions not sent to `keeper_acl`, without calldata, with undecodable
/// calldata, or calling a non-harvest function are skipped. Blacklisted
/// strategies never appear. Output is newest-first.
pub fn select_latest_harvests(
    txs: &[RawTransaction],
    keeper_acl: Address,
    blacklist: &[Address],
    policy: PickPolicy,
) -> Vec<HarvestEvent> {
    let mut seen: HashSet<Address> = blacklist.iter().copied().collect();
    let mut harvests = Vec::new();

    let ordered: Vec<&RawTransaction> = match policy {
        PickPolicy::MostRecentFirst => txs.iter().collect(),
        PickPolicy::OldestFirst => txs.iter().rev().collect(),
    };

    for tx in ordered {
        // Address equality is byte equality, so checksum casing never matters.
        let (Some(to), Some(input)) = (tx.to, tx.input.as_ref()) else {
            continue;
        };
        if input.is_empty() || to != keeper_acl {
            continue;
        }
        let call = match decode_keeper_call(input) {
            Ok(call) => call,
            Err(e) => {
                tracing::trace!(target: "harvests", tx = %tx.hash, error = %e, "Skipping undecodable keeper tx");
                continue;
            }
        };
        if !call.is_harvest() {
            continue;
        }
        let strategy = call.strategy();
        if !seen.insert(strategy) {
            continue;
        }
        harvests.push(HarvestEvent {
            strategy,
            timestamp: tx.timestamp,
            tx_hash: tx.hash,
            block_hash: tx.block_hash,
        });
    }
    harvests
}

/// Drops harvests of strategies that have been superseded in their vault.
///
/// A liveness read that fails keeps the harvest; metadata resolution decides
/// later whether the strategy is reportable.
pub async fn retain_active<R: ChainReader>(
    harvests: Vec<HarvestEvent>,
    resolver: &MetadataResolver<'_, R>,
) -> Vec<HarvestEvent> {
    let mut active = Vec::with_capacity(harvests.len());
    for harvest in harvests {
        match resolver.is_active_strategy(harvest.strategy).await {
            Ok(true) => active.push(harvest),
            Ok(false) => {
                tracing::debug!(
                    target: "harvests",
                    chain_id = resolver.chain_id(),
                    strategy = %harvest.strategy,
                    "Skipping superseded strategy"
                );
            }
            Err(e) => {
                tracing::warn!(
                    target: "harvests",
                    chain_id = resolver.chain_id(),
                    strategy = %harvest.strategy,
                    error = %e,
                    "Liveness check failed; keeping harvest"
                );
                active.push(harvest);
            }
        }
    }
    active
}
