// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use alloy::primitives::Address;
use dashmap::DashMap;

use crate::domain::error::AppError;
use crate::domain::models::StrategyMetadata;

/// On-disk layout: chain id -> strategy -> metadata, keys sorted.
type CacheFile = BTreeMap<u64, BTreeMap<Address, StrategyMetadata>>;

/// Read-through, write-through strategy metadata keyed by (chain, strategy).
///
/// Chains resolve concurrently but never share a key, and re-inserting a
/// strategy overwrites it with an identical value.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: DashMap<(u64, Address), StrategyMetadata>,
    dirty: AtomicBool,
    path: Option<PathBuf>,
}

impl MetadataCache {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing file yields an empty cache bound to `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        let cache = Self {
            path: Some(path.clone()),
            ..Self::default()
        };
        if !path.exists() {
            tracing::info!(target: "metadata", path = %path.display(), "No metadata cache on disk; starting empty");
            return Ok(cache);
        }
        let raw = fs::read_to_string(&path).map_err(|e| {
            AppError::Config(format!("Failed to read metadata cache {}: {e}", path.display()))
        })?;
        cache.merge_json(&raw)?;
        tracing::info!(
            target: "metadata",
            path = %path.display(),
            entries = cache.len(),
            "Loaded strategy metadata cache"
        );
        Ok(cache)
    }

    fn merge_json(&self, raw: &str) -> Result<(), AppError> {
        let file: CacheFile = serde_json::from_str(raw)?;
        for (chain_id, strategies) in file {
            for (strategy, meta) in strategies {
                self.entries.insert((chain_id, strategy), meta);
            }
        }
        Ok(())
    }

    pub fn get(&self, chain_id: u64, strategy: Address) -> Option<StrategyMetadata> {
        self.entries
            .get(&(chain_id, strategy))
            .map(|entry| entry.value().clone())
    }

    pub fn insert(&self, chain_id: u64, meta: StrategyMetadata) {
        self.entries.insert((chain_id, meta.strategy_address), meta);
        self.dirty.store(true, Ordering::Release);
    }

    /// Entries for one chain, sorted by strategy address.
    pub fn for_chain(&self, chain_id: u64) -> BTreeMap<Address, StrategyMetadata> {
        self.entries
            .iter()
            .filter(|entry| entry.key().0 == chain_id)
            .map(|entry| (entry.key().1, entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Pretty JSON with sorted keys so committed snapshots diff cleanly.
    pub fn to_json(&self) -> Result<String, AppError> {
        let mut file: CacheFile = BTreeMap::new();
        for entry in self.entries.iter() {
            let (chain_id, strategy) = *entry.key();
            file.entry(chain_id)
                .or_default()
                .insert(strategy, entry.value().clone());
        }
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let cache = Self::default();
        cache.merge_json(raw)?;
        Ok(cache)
    }

    /// Write to the bound path if anything was inserted since the last flush.
    pub fn flush(&self) -> Result<bool, AppError> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let body = match self.to_json() {
            Ok(body) => body,
            Err(e) => {
                self.dirty.store(true, Ordering::Release);
                return Err(e);
            }
        };
        if let Err(e) = fs::write(path, body) {
            self.dirty.store(true, Ordering::Release);
            return Err(e.into());
        }
        tracing::info!(target: "metadata", path = %path.display(), entries = self.len(), "Flushed strategy metadata cache");
        Ok(true)
    }
}
