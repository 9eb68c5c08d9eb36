//! Deal quality tiers and discount badge extraction.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::tiers::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealTier {
    Hot,
    Great,
    Good,
    Regular,
}

impl Tier for DealTier {
    const FALLBACK: Self = DealTier::Regular;

    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "hot" => Some(DealTier::Hot),
            "great" => Some(DealTier::Great),
            "good" => Some(DealTier::Good),
            "regular" => Some(DealTier::Regular),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            DealTier::Hot => "Hot Deal",
            DealTier::Great => "Great Deal",
            DealTier::Good => "Good Deal",
            DealTier::Regular => "Regular",
        }
    }

    fn rank(self) -> u8 {
        match self {
            DealTier::Hot => 0,
            DealTier::Great => 1,
            DealTier::Good => 2,
            DealTier::Regular => 3,
        }
    }
}

/// Discount badge shown next to a deal: `NN% OFF`, `Save $X`, `$X OFF`,
/// or empty when the text names no concrete discount.
pub fn extract_discount(text: &str) -> String {
    static RE_PCT: OnceCell<Regex> = OnceCell::new();
    static RE_SAVE: OnceCell<Regex> = OnceCell::new();
    static RE_DOLLAR: OnceCell<Regex> = OnceCell::new();

    let re_pct =
        RE_PCT.get_or_init(|| Regex::new(r"(?i)\b(100|[1-9]\d?)\s*%\s*off\b").unwrap());
    if let Some(c) = re_pct.captures(text) {
        return format!("{}% OFF", &c[1]);
    }

    let re_save = RE_SAVE
        .get_or_init(|| Regex::new(r"(?i)\bsave\s+(?:up\s+to\s+)?\$\s?(\d+(?:\.\d{2})?)").unwrap());
    if let Some(c) = re_save.captures(text) {
        return format!("Save ${}", &c[1]);
    }

    let re_dollar =
        RE_DOLLAR.get_or_init(|| Regex::new(r"(?i)\$(\d+(?:\.\d{2})?)\s*off\b").unwrap());
    if let Some(c) = re_dollar.captures(text) {
        return format!("${} OFF", &c[1]);
    }

    String::new()
}
