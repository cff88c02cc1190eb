// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::primitives::{Address, B256, U256};
use alloy_sol_types::SolInterface;

use crate::common::constants::HARVEST_FNS;
use crate::common::error::AppError;
use crate::domain::models::LogEntry;
use crate::infrastructure::data::abi::KeeperAccessControl::KeeperAccessControlCalls;

/// A decoded call to the keeper access-control contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeeperCall {
    Harvest { strategy: Address },
    HarvestNoReturn { strategy: Address },
    HarvestWithPrice { strategy: Address, price: U256 },
    Tend { strategy: Address },
    TendWithPrice { strategy: Address, price: U256 },
    Earn { strategy: Address },
}

impl KeeperCall {
    pub fn function_name(&self) -> &'static str {
        match self {
            KeeperCall::Harvest { .. } => "harvest",
            KeeperCall::HarvestNoReturn { .. } => "harvestNoReturn",
            KeeperCall::HarvestWithPrice { .. } => "harvestWithPrice",
            KeeperCall::Tend { .. } => "tend",
            KeeperCall::TendWithPrice { .. } => "tendWithPrice",
            KeeperCall::Earn { .. } => "earn",
        }
    }

    /// Every keeper function takes the target strategy as its first argument.
    pub fn strategy(&self) -> Address {
        match self {
            KeeperCall::Harvest { strategy }
            | KeeperCall::HarvestNoReturn { strategy }
            | KeeperCall::HarvestWithPrice { strategy, .. }
            | KeeperCall::Tend { strategy }
            | KeeperCall::TendWithPrice { strategy, .. }
            | KeeperCall::Earn { strategy } => *strategy,
        }
    }

    pub fn is_harvest(&self) -> bool {
        HARVEST_FNS.contains(&self.function_name())
    }
}

pub fn decode_keeper_call(input: &[u8]) -> Result<KeeperCall, AppError> {
    if input.len() < 4 {
        return Err(AppError::Decode(format!(
            "calldata too short ({} bytes)",
            input.len()
        )));
    }
    let decoded = KeeperAccessControlCalls::abi_decode(input)
        .map_err(|e| AppError::Decode(format!("selector 0x{}: {e}", alloy::hex::encode(&input[..4]))))?;
    Ok(match decoded {
        KeeperAccessControlCalls::harvest(c) => KeeperCall::Harvest {
            strategy: c.strategy,
        },
        KeeperAccessControlCalls::harvestNoReturn(c) => KeeperCall::HarvestNoReturn {
            strategy: c.strategy,
        },
        KeeperAccessControlCalls::harvestWithPrice(c) => KeeperCall::HarvestWithPrice {
            strategy: c.strategy,
            price: c.price,
        },
        KeeperAccessControlCalls::tend(c) => KeeperCall::Tend {
            strategy: c.strategy,
        },
        KeeperAccessControlCalls::tendWithPrice(c) => KeeperCall::TendWithPrice {
            strategy: c.strategy,
            price: c.price,
        },
        KeeperAccessControlCalls::earn(c) => KeeperCall::Earn {
            strategy: c.strategy,
        },
    })
}

/// Logs whose topic0 is one of `topics` and that were emitted by `tx_hash`.
/// Block-scoped log queries return every transaction's logs; this narrows them.
pub fn logs_for_transaction<'a>(
    logs: &'a [LogEntry],
    topics: &'a [B256],
    tx_hash: B256,
) -> impl Iterator<Item = &'a LogEntry> + 'a {
    logs.iter().filter(move |log| {
        log.transaction_hash == Some(tx_hash)
            && log.topic0().is_some_and(|t| topics.contains(&t))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::data::abi::KeeperAccessControl;
    use alloy::primitives::{Bytes, address, b256};
    use alloy_sol_types::SolCall;

    const STRATEGY: Address = address!("1111111111111111111111111111111111111111");

    #[test]
    fn decodes_harvest_variants() {
        let input = KeeperAccessControl::harvestCall { strategy: STRATEGY }.abi_encode();
        let call = decode_keeper_call(&input).unwrap();
        assert_eq!(call, KeeperCall::Harvest { strategy: STRATEGY });
        assert!(call.is_harvest());

        let input = KeeperAccessControl::harvestNoReturnCall { strategy: STRATEGY }.abi_encode();
        let call = decode_keeper_call(&input).unwrap();
        assert_eq!(call.function_name(), "harvestNoReturn");
        assert!(call.is_harvest());
    }

    #[test]
    fn non_harvest_keeper_calls_decode_but_are_not_harvests() {
        let input = KeeperAccessControl::tendWithPriceCall {
            strategy: STRATEGY,
            price: U256::from(42u64),
        }
        .abi_encode();
        let call = decode_keeper_call(&input).unwrap();
        assert_eq!(call.strategy(), STRATEGY);
        assert!(!call.is_harvest());

        let input = KeeperAccessControl::earnCall { strategy: STRATEGY }.abi_encode();
        assert!(!decode_keeper_call(&input).unwrap().is_harvest());
    }

    #[test]
    fn unknown_selector_is_decode_error() {
        let err = decode_keeper_call(&[0xde, 0xad, 0xbe, 0xef, 0, 0]).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
        assert!(matches!(decode_keeper_call(&[0x01]), Err(AppError::Decode(_))));
    }

    #[test]
    fn log_filter_requires_topic_and_exact_tx() {
        let topic = b256!("d78ad95fa46c994b6551d0da85fc275fe613ce37657fb8d5e3d130840159d822");
        let other_topic = B256::repeat_byte(0x01);
        let tx = B256::repeat_byte(0xaa);
        let other_tx = B256::repeat_byte(0xbb);
        let log = |addr: u8, topic: B256, hash: B256| LogEntry {
            address: Address::repeat_byte(addr),
            topics: vec![topic],
            data: Bytes::new(),
            block_hash: None,
            transaction_hash: Some(hash),
        };
        let logs = vec![
            log(1, topic, tx),
            log(2, topic, other_tx),
            log(3, other_topic, tx),
            log(4, topic, tx),
        ];
        let topics = [topic];
        let matched: Vec<Address> = logs_for_transaction(&logs, &topics, tx)
            .map(|l| l.address)
            .collect();
        assert_eq!(matched, vec![Address::repeat_byte(1), Address::repeat_byte(4)]);
    }
}
