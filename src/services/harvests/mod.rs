// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

//! Harvest discovery: keeper transactions in, strategy metadata and pools out.

pub mod decode;
pub mod filter;
pub mod metadata;
pub mod pools;
