// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes};
use alloy_sol_types::SolCall;

use crate::common::error::AppError;
use crate::domain::models::LogEntry;
use crate::network::provider::{ChainReader, LogQuery};

/// In-memory chain: canned `eth_call` answers keyed by (target, calldata),
/// plus a flat log list. Unknown calls revert.
#[derive(Default)]
pub struct FakeChain {
    pub head: u64,
    responses: Mutex<HashMap<(Address, Bytes), Bytes>>,
    logs: Mutex<Vec<LogEntry>>,
    calls: Mutex<Vec<Address>>,
}

impl FakeChain {
    pub fn with_head(head: u64) -> Self {
        Self {
            head,
            ..Self::default()
        }
    }

    pub fn respond<C: SolCall>(&self, to: Address, call: C, ret: C::Return) {
        let calldata = Bytes::from(call.abi_encode());
        let encoded = Bytes::from(C::abi_encode_returns(&ret));
        self.responses
            .lock()
            .unwrap()
            .insert((to, calldata), encoded);
    }

    pub fn push_log(&self, log: LogEntry) {
        self.logs.lock().unwrap().push(log);
    }

    pub fn calls_to(&self, to: Address) -> usize {
        self.calls.lock().unwrap().iter().filter(|a| **a == to).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ChainReader for FakeChain {
    async fn block_number(&self) -> Result<u64, AppError> {
        Ok(self.head)
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, AppError> {
        self.calls.lock().unwrap().push(to);
        self.responses
            .lock()
            .unwrap()
            .get(&(to, calldata))
            .cloned()
            .ok_or_else(|| AppError::Rpc("execution reverted".into()))
    }

    async fn logs(&self, query: LogQuery) -> Result<Vec<LogEntry>, AppError> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| {
                log.block_hash == Some(query.block_hash)
                    && log.topic0().is_some_and(|t| query.topics.contains(&t))
            })
            .cloned()
            .collect())
    }
}
