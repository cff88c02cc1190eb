// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use regex::Regex;
use std::fs;
use std::path::Path;

const BOT_TOKEN: &str = r"[MNO][A-Za-z\d_-]{23,25}\.[A-Za-z\d_-]{6}\.[A-Za-z\d_-]{27,38}";
const CANDIDATES: [&str; 4] = ["config.toml", "config.prod.toml", "config.dev.toml", ".env.example"];

fn scan(patterns: &[(&str, Regex)]) {
    for file in CANDIDATES {
        if !Path::new(file).exists() {
            continue;
        }
        let body = fs::read_to_string(file).expect("read config");
        for (idx, line) in body.lines().enumerate() {
            for (label, re) in patterns {
                if re.is_match(line) {
                    panic!("{label} in {} at line {}", file, idx + 1);
                }
            }
        }
    }
}

/// Fail CI if config files contain 64-hex keys or Discord bot tokens.
#[test]
fn no_committed_secrets_in_configs() {
    scan(&[
        ("Secret-looking hex", Regex::new(r"0x?[a-fA-F0-9]{64}").unwrap()),
        ("Discord bot token", Regex::new(BOT_TOKEN).unwrap()),
        (
            "Infura project id in URL",
            Regex::new(r"infura\.io/v3/[a-f0-9]{32}").unwrap(),
        ),
    ]);
}

#[test]
fn token_pattern_matches_bot_token_shape() {
    let re = Regex::new(BOT_TOKEN).unwrap();
    let fake = format!("N{}.{}.{}", "a".repeat(23), "b".repeat(6), "c".repeat(27));
    assert!(re.is_match(&fake));
    assert!(!re.is_match("discord_bot_token = \"\""));
}
