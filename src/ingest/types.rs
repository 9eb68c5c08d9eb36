// src/ingest/types.rs
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// One configured upstream feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String, // e.g., "BBC World", "Slickdeals"
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A single normalized entry of an RSS/Atom document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RawFeedItem {
    pub title: String,
    pub description: String, // stripped + truncated
    pub link: String,
    #[serde(rename = "pubDate")]
    pub published_at: DateTime<Utc>,
    #[serde(rename = "source")]
    pub source_name: String,
}

impl RawFeedItem {
    /// Text the classifiers and taggers look at.
    pub fn text(&self) -> String {
        if self.description.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.description)
        }
    }

    /// Dedup id for this item, see [`crate::ingest::item_id`].
    pub fn id(&self) -> String {
        crate::ingest::item_id(&self.link, &self.title, &self.source_name)
    }
}

/// Per-kind fetch limits applied by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_per_source: usize,
    pub cap: usize,
}

/// Raw document fetch. The HTTP implementation lives in `providers::http`;
/// tests plug in fixtures.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, SourceError>;
}
