// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::error::AppError;
use crate::common::retry::retry_async;
use crate::domain::models::LogEntry;
use alloy::network::Ethereum;
use alloy::primitives::{Address, B256, Bytes};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{Filter, TransactionInput, TransactionRequest};
use alloy::transports::{RpcError, TransportErrorKind};
use alloy_sol_types::SolCall;
use std::future::{Future, IntoFuture};
use std::time::Duration;
use url::Url;

pub type HttpProvider = RootProvider<Ethereum>;

pub struct ConnectionFactory;

impl ConnectionFactory {
    pub fn http(rpc_url: &str) -> Result<HttpProvider, AppError> {
        let url =
            Url::parse(rpc_url).map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))?;

        let provider = RootProvider::new_http(url);
        Ok(provider)
    }
}

/// Logs emitted inside one block whose topic0 is any of `topics`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogQuery {
    pub block_hash: B256,
    pub topics: Vec<B256>,
}

/// Read-only access to a chain. The pipeline only ever needs these three calls.
pub trait ChainReader: Send + Sync {
    fn block_number(&self) -> impl Future<Output = Result<u64, AppError>> + Send;

    /// `eth_call` against `to`, returning raw ABI-encoded return data.
    fn call(
        &self,
        to: Address,
        calldata: Bytes,
    ) -> impl Future<Output = Result<Bytes, AppError>> + Send;

    fn logs(&self, query: LogQuery)
    -> impl Future<Output = Result<Vec<LogEntry>, AppError>> + Send;
}

/// Typed contract read: encodes `call`, performs it, decodes the return value.
/// Failures name the contract and function so a hop in a read chain is attributable.
pub async fn read<R, C>(reader: &R, to: Address, call: C) -> Result<C::Return, AppError>
where
    R: ChainReader,
    C: SolCall + Send,
{
    let raw = reader
        .call(to, Bytes::from(call.abi_encode()))
        .await
        .map_err(|e| AppError::ContractRead {
            address: to,
            call: C::SIGNATURE,
            reason: e.to_string(),
        })?;
    C::abi_decode_returns(&raw).map_err(|e| AppError::ContractRead {
        address: to,
        call: C::SIGNATURE,
        reason: format!("return data decode failed: {e}"),
    })
}

const READ_ATTEMPTS: usize = 3;
const READ_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct RpcChainReader {
    provider: HttpProvider,
    timeout: Duration,
}

impl RpcChainReader {
    pub fn new(provider: HttpProvider, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    async fn with_timeout<T, F>(&self, context: &str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(map_rpc_error(e)),
            Err(_) => Err(AppError::Timeout {
                ms: self.timeout.as_millis() as u64,
                context: context.to_string(),
            }),
        }
    }
}

fn map_rpc_error(e: RpcError<TransportErrorKind>) -> AppError {
    match e {
        // A JSON-RPC error response is a definitive answer (usually a revert).
        RpcError::ErrorResp(payload) => AppError::Rpc(payload.to_string()),
        other => AppError::Connection(other.to_string()),
    }
}

fn is_transient(e: &AppError) -> bool {
    matches!(e, AppError::Connection(_) | AppError::Timeout { .. })
}

impl ChainReader for RpcChainReader {
    async fn block_number(&self) -> Result<u64, AppError> {
        retry_async(
            |_| self.with_timeout("eth_blockNumber", self.provider.get_block_number()),
            READ_ATTEMPTS,
            READ_BACKOFF,
            is_transient,
        )
        .await
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, AppError> {
        retry_async(
            |_| {
                let req = TransactionRequest::default()
                    .to(to)
                    .input(TransactionInput::new(calldata.clone()));
                async move { self.with_timeout("eth_call", self.provider.call(req).into_future()).await }
            },
            READ_ATTEMPTS,
            READ_BACKOFF,
            is_transient,
        )
        .await
    }

    async fn logs(&self, query: LogQuery) -> Result<Vec<LogEntry>, AppError> {
        let filter = Filter::new()
            .at_block_hash(query.block_hash)
            .event_signature(query.topics.clone());
        let logs = retry_async(
            |_| self.with_timeout("eth_getLogs", self.provider.get_logs(&filter)),
            READ_ATTEMPTS,
            READ_BACKOFF,
            is_transient,
        )
        .await?;
        Ok(logs
            .into_iter()
            .map(|log| LogEntry {
                address: log.address(),
                topics: log.topics().to_vec(),
                data: log.data().data.clone(),
                block_hash: log.block_hash,
                transaction_hash: log.transaction_hash,
            })
            .collect())
    }
}
