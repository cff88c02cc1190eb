// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

//! Plain-text rendering of the harvest and pool tables.

use chrono::{DateTime, Utc};

use crate::domain::models::{HarvestEvent, StrategyMetadata, SwapPool};

const SECOND_MS: f64 = 1_000.0;
const MINUTE_MS: f64 = SECOND_MS * 60.0;
const HOUR_MS: f64 = MINUTE_MS * 60.0;
const DAY_MS: f64 = HOUR_MS * 24.0;
/// Below this, ages are shown in hours.
const DAYS_THRESHOLD_MS: f64 = DAY_MS * 3.0;

/// Humanize a duration to the coarsest unit, rounded.
pub fn format_ms(ms: i64) -> String {
    let abs = ms.unsigned_abs() as f64;
    let ms_f = ms as f64;
    if abs >= DAYS_THRESHOLD_MS {
        format!("{}d", (ms_f / DAY_MS).round())
    } else if abs >= HOUR_MS {
        format!("{}h", (ms_f / HOUR_MS).round())
    } else if abs >= MINUTE_MS {
        format!("{}m", (ms_f / MINUTE_MS).round())
    } else if abs >= SECOND_MS {
        format!("{}s", (ms_f / SECOND_MS).round())
    } else {
        format!("{ms}ms")
    }
}

/// Two-decimal currency with a k/m/b suffix. A value that rounds up to the
/// next unit is shown in that unit.
pub fn format_currency(value: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1.0, ""), (1e3, "k"), (1e6, "m"), (1e9, "b")];
    let cents = |v: f64| (v * 100.0).round() / 100.0;

    let mut tier = UNITS
        .iter()
        .rposition(|(unit, _)| value.abs() >= *unit)
        .unwrap_or(0);
    let mut scaled = cents(value / UNITS[tier].0);
    while scaled.abs() >= 1_000.0 && tier + 1 < UNITS.len() {
        tier += 1;
        scaled = cents(value / UNITS[tier].0);
    }
    // Rounds away -0.00.
    let scaled = if scaled == 0.0 { 0.0 } else { scaled };
    format!("${scaled:.2}{}", UNITS[tier].1)
}

/// Fixed-width table with a centered title and headings, left-aligned cells.
#[derive(Clone, Debug, Default)]
pub struct AsciiTable {
    title: String,
    headings: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl AsciiTable {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn heading<I, S>(mut self, headings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headings = headings.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn render(&self) -> String {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headings.len()))
            .max()
            .unwrap_or(0)
            .max(1);
        let mut widths = vec![0usize; columns];
        for row in std::iter::once(&self.headings).chain(self.rows.iter()) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        // Inner width between the outer pipes.
        let mut inner = widths.iter().map(|w| w + 2).sum::<usize>() + columns - 1;
        let title_width = self.title.chars().count() + 2;
        if title_width > inner {
            if let Some(last) = widths.last_mut() {
                *last += title_width - inner;
            }
            inner = title_width;
        }

        let mut lines = Vec::with_capacity(self.rows.len() + 6);
        lines.push(format!(".{}.", "-".repeat(inner)));
        if !self.title.is_empty() {
            lines.push(format!("|{}|", center(&self.title, inner)));
            lines.push(format!("|{}|", "-".repeat(inner)));
        }
        if !self.headings.is_empty() {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, &w)| {
                    center(self.headings.get(i).map(String::as_str).unwrap_or(""), w + 2)
                })
                .collect();
            lines.push(format!("|{}|", cells.join("|")));
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
            lines.push(format!("|{}|", rule.join("|")));
        }
        for row in &self.rows {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, &w)| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    format!(" {cell:<w$} ")
                })
                .collect();
            lines.push(format!("|{}|", cells.join("|")));
        }
        lines.push(format!("'{}'", "-".repeat(inner)));
        lines.join("\n")
    }
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{text}{}", " ".repeat(left), " ".repeat(right))
}

pub fn code_block(body: &str) -> String {
    format!("```\n{body}\n```")
}

pub fn last_update_footer(now: DateTime<Utc>) -> String {
    format!(
        "**_Last Update:_** _{}_",
        now.format("%a, %d %b %Y %H:%M:%S GMT")
    )
}

/// Vault name and age of its strategy's latest harvest.
pub fn harvest_table(
    title: &str,
    rows: &[(HarvestEvent, StrategyMetadata)],
    now: DateTime<Utc>,
) -> String {
    let now_ms = now.timestamp_millis();
    let mut table = AsciiTable::new(title).heading(["Vault", "Last Harvest"]);
    for (harvest, meta) in rows {
        let harvested_ms = i64::try_from(harvest.timestamp)
            .unwrap_or(i64::MAX / 1_000)
            .saturating_mul(1_000);
        table.add_row([
            meta.vault_name.clone(),
            format_ms(now_ms.saturating_sub(harvested_ms)),
        ]);
    }
    code_block(&table.render())
}

pub fn pool_table(title: &str, pools: &[SwapPool]) -> String {
    let mut table = AsciiTable::new(title).heading(["Pool", "Exchange", "TVL"]);
    for pool in pools {
        table.add_row([
            pool.name.clone(),
            pool.exchange.label().to_string(),
            format_currency(pool.tvl_usd),
        ]);
    }
    code_block(&table.render())
}

/// A group of rendered tables sharing one footer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    pub tables: Vec<String>,
    pub footer: String,
}

impl Payload {
    pub fn render(&self) -> String {
        self.render_within(usize::MAX).0
    }

    /// Longest rendering within `limit` chars that keeps whole tables.
    /// Returns the text and how many tables were left out.
    pub fn render_within(&self, limit: usize) -> (String, usize) {
        let footer = format!("\n{}\n", self.footer);
        let mut body = String::new();
        let mut kept = 0;
        for table in &self.tables {
            let sep = if kept == 0 { 0 } else { 1 };
            let projected = body.chars().count() + sep + table.chars().count() + footer.chars().count();
            if projected > limit {
                break;
            }
            if kept > 0 {
                body.push('\n');
            }
            body.push_str(table);
            kept += 1;
        }
        body.push_str(&footer);
        (body, self.tables.len() - kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ExchangeType;
    use alloy::primitives::{Address, B256};
    use chrono::TimeZone;

    #[test]
    fn format_ms_picks_coarsest_unit() {
        assert_eq!(format_ms(90_000), "2m");
        assert_eq!(format_ms(3_600_000), "1h");
        assert_eq!(format_ms(4 * 86_400_000), "4d");
        assert_eq!(format_ms(500), "500ms");
        assert_eq!(format_ms(2 * 86_400_000), "48h");
        assert_eq!(format_ms(1_499), "1s");
    }

    #[test]
    fn format_currency_abbreviates() {
        assert_eq!(format_currency(500.0), "$500.00");
        assert_eq!(format_currency(2_500.0), "$2.50k");
        assert_eq!(format_currency(2_500_000.0), "$2.50m");
        assert_eq!(format_currency(7_250_000_000.0), "$7.25b");
    }

    #[test]
    fn format_currency_picks_suffix_after_rounding() {
        assert_eq!(format_currency(999_999.995), "$1.00m");
        assert_eq!(format_currency(999.999), "$1.00k");
        assert_eq!(format_currency(999.0), "$999.00");
        assert_eq!(format_currency(-0.0), "$0.00");
        assert_eq!(format_currency(-0.001), "$0.00");
        assert_eq!(format_currency(-2_500.0), "$-2.50k");
    }

    #[test]
    fn table_renders_fixed_width() {
        let mut table = AsciiTable::new("Ethereum").heading(["Vault", "Last Harvest"]);
        table.add_row(["Convex CRV", "2h"]);
        table.add_row(["renBTC", "45m"]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();

        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
        assert!(lines[0].starts_with('.') && lines[0].ends_with('.'));
        assert!(lines.last().unwrap().starts_with('\''));
        assert_eq!(lines[1].trim_matches('|').trim(), "Ethereum");
        assert_eq!(lines[5], "| Convex CRV | 2h           |");
    }

    #[test]
    fn long_title_widens_table() {
        let table = AsciiTable::new("A very long chain display name").heading(["A", "B"]);
        let rendered = table.render();
        let widths: Vec<usize> = rendered.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn footer_uses_utc_string() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            last_update_footer(now),
            "**_Last Update:_** _Tue, 05 Mar 2024 14:07:09 GMT_"
        );
    }

    #[test]
    fn harvest_table_shows_age() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 0, 0).unwrap();
        let harvest = HarvestEvent {
            strategy: Address::ZERO,
            timestamp: (now.timestamp() - 7_200) as u64,
            tx_hash: B256::ZERO,
            block_hash: B256::ZERO,
        };
        let meta = StrategyMetadata {
            strategy_address: Address::ZERO,
            strategy_name: "Convex".into(),
            strategy_name_full: "StrategyConvex".into(),
            vault_address: Address::ZERO,
            vault_name: "Convex CRV".into(),
            vault_name_full: "Badger Sett Convex CRV".into(),
            want_token_address: Address::ZERO,
        };
        let out = harvest_table("Ethereum", &[(harvest, meta)], now);
        assert!(out.starts_with("```\n") && out.ends_with("\n```"));
        assert!(out.contains("| Convex CRV | 2h           |"));
    }

    #[test]
    fn pool_table_formats_tvl() {
        let pools = [SwapPool {
            address: Address::ZERO,
            exchange: ExchangeType::Curve,
            name: "steCRV".into(),
            tvl_usd: 2_500_000.0,
        }];
        let out = pool_table("Ethereum", &pools);
        assert!(out.contains("steCRV"));
        assert!(out.contains("$2.50m"));
        assert!(out.contains("Curve"));
    }

    #[test]
    fn payload_cut_keeps_whole_tables() {
        let payload = Payload {
            tables: vec!["a".repeat(40), "b".repeat(40), "c".repeat(40)],
            footer: "footer".into(),
        };
        let (full, dropped) = payload.render_within(usize::MAX);
        assert_eq!(dropped, 0);
        assert_eq!(full, payload.render());
        assert!(full.ends_with("\nfooter\n"));

        let (cut, dropped) = payload.render_within(90);
        assert_eq!(dropped, 1);
        assert!(cut.chars().count() <= 90);
        assert!(cut.contains(&"b".repeat(40)));
        assert!(!cut.contains('c'));
    }
}
