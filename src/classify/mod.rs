// src/classify/mod.rs
//! Text classifiers compiled from the pattern tables in `config/classifiers.toml`.
//!
//! Tables are read and compiled once at startup; afterwards a [`Classifiers`]
//! value is shared read-only (behind an `Arc` in the HTTP state) and every
//! classification is a pure function of `(tables, text)`.

pub mod deal;
pub mod sentiment;
pub mod severity;
pub mod tagger;
pub mod tiers;

use anyhow::{anyhow, bail, Context, Result};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub use deal::{extract_discount, DealTier};
pub use sentiment::{Direction, Sentiment, SentimentLevel, SentimentModel};
pub use severity::Severity;
pub use tagger::{Category, Tagger};
pub use tiers::{Tier, TierClassifier};

pub const ENV_CLASSIFIER_CONFIG_PATH: &str = "CLASSIFIER_CONFIG_PATH";
pub const DEFAULT_CLASSIFIER_CONFIG_PATH: &str = "config/classifiers.toml";

const BUILTIN_TABLES: &str = include_str!("../../config/classifiers.toml");

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
struct TablesRoot {
    sentiment: SentimentSection,
    deal_tiers: Vec<TierGroupCfg>,
    deal_categories: CategoriesCfg,
    severity_tiers: Vec<TierGroupCfg>,
    world_categories: CategoriesCfg,
}

#[derive(Debug, Clone, Deserialize)]
struct SentimentSection {
    positive: Vec<WeightedPattern>,
    negative: Vec<WeightedPattern>,
}

#[derive(Debug, Clone, Deserialize)]
struct WeightedPattern {
    pattern: String,
    weight: i32,
}

#[derive(Debug, Clone, Deserialize)]
struct TierGroupCfg {
    tier: String,
    patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoriesCfg {
    fallback: CategoryCfg,
    #[serde(default)]
    rules: Vec<CategoryRuleCfg>,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoryCfg {
    name: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoryRuleCfg {
    name: String,
    #[serde(default)]
    icon: String,
    patterns: Vec<String>,
}

/* ----------------------------
Compiled tables
---------------------------- */

#[derive(Debug, Clone)]
pub struct Classifiers {
    pub sentiment: SentimentModel,
    pub deal_tiers: TierClassifier<DealTier>,
    pub deal_categories: Tagger,
    pub severity: TierClassifier<Severity>,
    pub world_categories: Tagger,
}

impl Classifiers {
    /// Tables compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TABLES).context("compiling built-in classifier tables")
    }

    /// Load from $CLASSIFIER_CONFIG_PATH, then `config/classifiers.toml`,
    /// then the built-in copy.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CLASSIFIER_CONFIG_PATH) {
            return Self::from_path(Path::new(&p));
        }
        let p = PathBuf::from(DEFAULT_CLASSIFIER_CONFIG_PATH);
        if p.exists() {
            return Self::from_path(&p);
        }
        Self::builtin()
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading classifier tables from {}", path.display()))?;
        Self::from_toml_str(&s)
            .with_context(|| format!("compiling classifier tables from {}", path.display()))
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let root: TablesRoot = toml::from_str(toml_str)?;

        let positive = compile_weighted(&root.sentiment.positive, 1..=4, "positive")?;
        let negative = compile_weighted(&root.sentiment.negative, -5..=-1, "negative")?;

        Ok(Self {
            sentiment: SentimentModel::new(positive, negative),
            deal_tiers: compile_tiers::<DealTier>(&root.deal_tiers, "deal_tiers")?,
            deal_categories: compile_tagger(&root.deal_categories, "deal_categories")?,
            severity: compile_tiers::<Severity>(&root.severity_tiers, "severity_tiers")?,
            world_categories: compile_tagger(&root.world_categories, "world_categories")?,
        })
    }
}

/// Case-insensitive, Unicode-aware regex.
pub(crate) fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| anyhow!("pattern `{pattern}`: {e}"))
}

fn compile_all(patterns: &[String], section: &str) -> Result<Vec<Regex>> {
    if patterns.is_empty() {
        bail!("[{section}] empty pattern list");
    }
    patterns.iter().map(|p| compile(p)).collect()
}

fn compile_weighted(
    list: &[WeightedPattern],
    allowed: std::ops::RangeInclusive<i32>,
    section: &str,
) -> Result<Vec<(Regex, i32)>> {
    list.iter()
        .map(|wp| {
            if !allowed.contains(&wp.weight) {
                bail!(
                    "[sentiment.{section}] weight {} of `{}` outside {:?}",
                    wp.weight,
                    wp.pattern,
                    allowed
                );
            }
            Ok((compile(&wp.pattern)?, wp.weight))
        })
        .collect()
}

fn compile_tiers<T: Tier + std::hash::Hash>(
    groups: &[TierGroupCfg],
    section: &str,
) -> Result<TierClassifier<T>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(groups.len());
    for g in groups {
        let tier =
            T::parse(&g.tier).ok_or_else(|| anyhow!("[{section}] unknown tier `{}`", g.tier))?;
        if tier == T::FALLBACK {
            bail!("[{section}] fallback tier `{}` cannot have patterns", g.tier);
        }
        if !seen.insert(tier) {
            bail!("[{section}] tier `{}` listed twice", g.tier);
        }
        out.push((tier, compile_all(&g.patterns, section)?));
    }
    Ok(TierClassifier::new(out))
}

fn compile_tagger(cfg: &CategoriesCfg, section: &str) -> Result<Tagger> {
    let rules = cfg
        .rules
        .iter()
        .map(|r| {
            let patterns = compile_all(&r.patterns, section)
                .with_context(|| format!("category `{}`", r.name))?;
            Ok((Category::new(r.name.trim(), r.icon.trim()), patterns))
        })
        .collect::<Result<Vec<_>>>()?;
    let fallback = Category::new(cfg.fallback.name.trim(), cfg.fallback.icon.trim());
    if fallback.name.is_empty() {
        bail!("[{section}] fallback category needs a name");
    }
    Ok(Tagger::new(rules, fallback))
}
