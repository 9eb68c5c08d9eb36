// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::types::{FeedSource, FetchOptions};

pub const ENV_FEED_SOURCES_PATH: &str = "FEED_SOURCES_PATH";

const BUILTIN_SOURCES: &str = include_str!("../../config/sources.toml");

/// Longest per-source deadline we accept from config.
const MAX_TIMEOUT_MS: u64 = 30_000;

/// Sources and limits for one feed kind (market / world / deals).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedKindConfig {
    pub max_per_source: usize,
    pub cap: usize,
    pub timeout_ms: u64,
    #[serde(default)]
    pub sources: Vec<FeedSource>,
}

impl FeedKindConfig {
    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            max_per_source: self.max_per_source,
            cap: self.cap,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedCatalog {
    pub market: FeedKindConfig,
    pub world: FeedKindConfig,
    pub deals: FeedKindConfig,
}

impl FeedCatalog {
    /// The catalog compiled into the binary (`config/sources.toml`).
    pub fn builtin() -> Result<Self> {
        parse_catalog(BUILTIN_SOURCES, "toml").context("parsing built-in feed catalog")
    }
}

/// Load the catalog from an explicit path. Supports TOML or JSON formats.
pub fn load_catalog_from(path: &Path) -> Result<FeedCatalog> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feed catalog from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_catalog(&content, ext.as_str())
        .with_context(|| format!("parsing feed catalog {}", path.display()))
}

/// Load the catalog using env var + fallbacks:
/// 1) $FEED_SOURCES_PATH
/// 2) config/sources.toml (relative to CWD)
/// 3) built-in copy
pub fn load_catalog_default() -> Result<FeedCatalog> {
    if let Ok(p) = std::env::var(ENV_FEED_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_catalog_from(&pb);
        } else {
            return Err(anyhow!("{ENV_FEED_SOURCES_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_catalog_from(&toml_p);
    }
    FeedCatalog::builtin()
}

fn parse_catalog(s: &str, hint_ext: &str) -> Result<FeedCatalog> {
    let mut cat: FeedCatalog = if hint_ext == "json" {
        serde_json::from_str(s)?
    } else {
        match toml::from_str(s) {
            Ok(c) => c,
            // Fallback: content may be JSON behind a non-.json name
            Err(toml_err) => serde_json::from_str(s).map_err(|_| anyhow!(toml_err))?,
        }
    };
    for (kind, cfg) in [
        ("market", &mut cat.market),
        ("world", &mut cat.world),
        ("deals", &mut cat.deals),
    ] {
        validate_kind(kind, cfg)?;
    }
    Ok(cat)
}

fn validate_kind(kind: &str, cfg: &mut FeedKindConfig) -> Result<()> {
    if cfg.cap == 0 || cfg.max_per_source == 0 {
        bail!("[{kind}] cap and max_per_source must be positive");
    }
    if cfg.timeout_ms == 0 || cfg.timeout_ms > MAX_TIMEOUT_MS {
        bail!("[{kind}] timeout_ms must be in 1..={MAX_TIMEOUT_MS}");
    }
    cfg.sources = clean_sources(std::mem::take(&mut cfg.sources));
    Ok(())
}

/// Trim, drop entries without url, dedup by url (first wins, order kept).
fn clean_sources(items: Vec<FeedSource>) -> Vec<FeedSource> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let url = it.url.trim().to_string();
        if url.is_empty() || !seen.insert(url.clone()) {
            continue;
        }
        let name = match it.name.trim() {
            "" => url.clone(),
            n => n.to_string(),
        };
        out.push(FeedSource { name, url });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn builtin_catalog_is_valid() {
        let cat = FeedCatalog::builtin().unwrap();
        assert!(!cat.market.sources.is_empty());
        assert!(!cat.world.sources.is_empty());
        assert!(!cat.deals.sources.is_empty());
        assert_eq!(cat.market.options().timeout, Duration::from_millis(6000));
        assert!((80..=120).contains(&cat.world.cap));
        assert!((20..=25).contains(&cat.deals.max_per_source));
    }

    #[test]
    fn json_catalog_and_source_cleanup() {
        let json = r#"{
            "market": {"max_per_source": 20, "cap": 100, "timeout_ms": 6000,
                       "sources": [{"name": " A ", "url": "https://a.test/rss"},
                                   {"name": "dup", "url": "https://a.test/rss"},
                                   {"name": "empty", "url": "  "}]},
            "world":  {"max_per_source": 20, "cap": 80,  "timeout_ms": 6000},
            "deals":  {"max_per_source": 25, "cap": 120, "timeout_ms": 7000}
        }"#;
        let cat = parse_catalog(json, "json").unwrap();
        assert_eq!(
            cat.market.sources,
            vec![FeedSource::new("A", "https://a.test/rss")]
        );
        assert!(cat.world.sources.is_empty());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let toml = r#"
            [market]
            max_per_source = 20
            cap = 100
            timeout_ms = 0
            [world]
            max_per_source = 20
            cap = 80
            timeout_ms = 6000
            [deals]
            max_per_source = 25
            cap = 120
            timeout_ms = 7000
        "#;
        assert!(parse_catalog(toml, "toml").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so a real config/ in the repo does not interfere
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_FEED_SOURCES_PATH);
        let v = load_catalog_default().unwrap();
        assert_eq!(v, FeedCatalog::builtin().unwrap());

        // Env takes precedence
        let p = tmp.path().join("sources.toml");
        fs::write(
            &p,
            r#"
            [market]
            max_per_source = 5
            cap = 10
            timeout_ms = 100
            [[market.sources]]
            name = "X"
            url = "https://x.test/rss"
            [world]
            max_per_source = 5
            cap = 10
            timeout_ms = 100
            [deals]
            max_per_source = 5
            cap = 10
            timeout_ms = 100
            "#,
        )
        .unwrap();
        env::set_var(ENV_FEED_SOURCES_PATH, p.display().to_string());
        let v2 = load_catalog_default().unwrap();
        assert_eq!(v2.market.sources.len(), 1);
        assert_eq!(v2.market.cap, 10);

        env::set_var(ENV_FEED_SOURCES_PATH, tmp.path().join("missing.toml"));
        assert!(load_catalog_default().is_err());
        env::remove_var(ENV_FEED_SOURCES_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
