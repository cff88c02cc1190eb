// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use std::path::{Path, PathBuf};

const DATA_DIR_ENV: &str = "DATA_DIR";

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

fn normalize_data_relative(path: &Path) -> PathBuf {
    path.strip_prefix("data")
        .map(PathBuf::from)
        .unwrap_or_else(|_| path.to_path_buf())
}

fn env_data_dir() -> Option<String> {
    std::env::var(DATA_DIR_ENV)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the data directory: explicit setting, then `DATA_DIR`, then `./data`.
pub fn resolve_data_dir(explicit_data_dir: Option<&str>) -> PathBuf {
    explicit_data_dir
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .or_else(env_data_dir)
        .map(|dir| absolute(PathBuf::from(dir)))
        .unwrap_or_else(|| absolute(PathBuf::from("data")))
}

/// Absolute paths pass through; relative ones land under the data directory.
/// A leading `data/` is not doubled.
pub fn resolve_data_path(raw_path: &str, explicit_data_dir: Option<&str>) -> PathBuf {
    let as_path = PathBuf::from(raw_path.trim());
    if as_path.is_absolute() {
        return as_path;
    }
    resolve_data_dir(explicit_data_dir).join(normalize_data_relative(&as_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_are_untouched() {
        let p = resolve_data_path("/tmp/meta.json", Some("/srv/data"));
        assert_eq!(p, PathBuf::from("/tmp/meta.json"));
    }

    #[test]
    fn relative_paths_join_explicit_dir_without_doubling_data_prefix() {
        let p = resolve_data_path("data/strategy-metadata.json", Some("/srv/bot"));
        assert_eq!(p, PathBuf::from("/srv/bot/strategy-metadata.json"));
        let q = resolve_data_path("strategy-metadata.json", Some("/srv/bot"));
        assert_eq!(q, p);
    }
}
