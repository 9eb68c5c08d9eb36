//! First-match-wins tier classification.
//!
//! Groups are tested in list order and the first group with any matching
//! pattern decides the tier. The list order is part of the contract: putting
//! a broad group ahead of a specific one changes results.

use regex::Regex;

/// A discrete rank with a fallback for unmatched text.
pub trait Tier: Copy + Eq + std::fmt::Debug {
    /// Returned when no group matches (and for empty text).
    const FALLBACK: Self;

    fn parse(name: &str) -> Option<Self>;
    fn label(self) -> &'static str;
    /// 0 is the most important tier; used as the primary sort key.
    fn rank(self) -> u8;
}

#[derive(Debug, Clone)]
pub struct TierClassifier<T: Tier> {
    groups: Vec<(T, Vec<Regex>)>,
}

impl<T: Tier> TierClassifier<T> {
    pub fn new(groups: Vec<(T, Vec<Regex>)>) -> Self {
        Self { groups }
    }

    pub fn classify(&self, text: &str) -> T {
        if text.trim().is_empty() {
            return T::FALLBACK;
        }
        for (tier, patterns) in &self.groups {
            if patterns.iter().any(|re| re.is_match(text)) {
                return *tier;
            }
        }
        T::FALLBACK
    }

    pub fn tiers(&self) -> impl Iterator<Item = T> + '_ {
        self.groups.iter().map(|(t, _)| *t)
    }
}
