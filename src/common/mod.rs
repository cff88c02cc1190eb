// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

pub mod data_path;
pub mod parsing;
pub mod retry;
#[cfg(test)]
pub mod test_utils;

// Shared aliases for frequently used modules.
pub use crate::domain::constants;
pub use crate::domain::error;
