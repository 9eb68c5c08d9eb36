//! Headline sentiment: additive weighted pattern scoring.
//!
//! score = Σ (non-overlapping matches of pattern × weight) over both lists,
//! then a fixed threshold ladder maps the score to label/level/direction.

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const STRONG_BULLISH_MIN: i32 = 5;
pub const BULLISH_MIN: i32 = 2;
pub const BEARISH_MAX: i32 = -2;
pub const STRONG_BEARISH_MAX: i32 = -5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SentimentLevel {
    HighPositive,
    Positive,
    Neutral,
    Negative,
    HighNegative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sentiment {
    pub score: i32,
    pub label: &'static str,
    pub level: SentimentLevel,
    pub direction: Direction,
}

impl Sentiment {
    /// Pure threshold mapping; the only input is the score.
    pub fn from_score(score: i32) -> Self {
        let (label, level, direction) = if score >= STRONG_BULLISH_MIN {
            ("Strong Bullish", SentimentLevel::HighPositive, Direction::Up)
        } else if score >= BULLISH_MIN {
            ("Bullish", SentimentLevel::Positive, Direction::Up)
        } else if score <= STRONG_BEARISH_MAX {
            ("Strong Bearish", SentimentLevel::HighNegative, Direction::Down)
        } else if score <= BEARISH_MAX {
            ("Bearish", SentimentLevel::Negative, Direction::Down)
        } else {
            ("Neutral", SentimentLevel::Neutral, Direction::Neutral)
        };
        Self {
            score,
            label,
            level,
            direction,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SentimentModel {
    positive: Vec<(Regex, i32)>,
    negative: Vec<(Regex, i32)>,
}

impl SentimentModel {
    pub fn new(positive: Vec<(Regex, i32)>, negative: Vec<(Regex, i32)>) -> Self {
        Self { positive, negative }
    }

    pub fn score(&self, text: &str) -> i32 {
        self.positive
            .iter()
            .chain(self.negative.iter())
            .map(|(re, w)| re.find_iter(text).count() as i32 * w)
            .sum()
    }

    pub fn classify(&self, text: &str) -> Sentiment {
        Sentiment::from_score(self.score(text))
    }
}
