// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::hex;
use alloy::primitives::{Address, B256};
use std::str::FromStr;

pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

pub fn parse_hex_bytes(s: &str) -> Option<Vec<u8>> {
    hex::decode(strip_0x(s.trim())).ok()
}

pub fn parse_b256_hex(s: &str) -> Option<B256> {
    let bytes = parse_hex_bytes(s)?;
    if bytes.len() != 32 {
        return None;
    }
    Some(B256::from_slice(&bytes))
}

/// Explorer APIs report contract creations with an empty `to`.
pub fn parse_address_hex(s: &str) -> Option<Address> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    Address::from_str(strip_0x(trimmed)).ok()
}

pub fn parse_u64_dec(s: &str) -> Option<u64> {
    s.trim().parse::<u64>().ok()
}
