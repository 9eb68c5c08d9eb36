// src/ingest/providers/fixture.rs
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::ingest::types::FeedFetcher;

#[derive(Debug, Clone)]
enum Canned {
    Body(String),
    Status(u16),
    Slow(Duration, String),
}

/// In-memory fetcher keyed by URL. Unknown URLs answer 404.
/// Used by tests and by `probe --fixture`.
#[derive(Debug, Clone, Default)]
pub struct FixtureFetcher {
    docs: HashMap<String, Canned>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: impl Into<String>) -> Self {
        self.docs.insert(url.to_string(), Canned::Body(body.into()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.docs.insert(url.to_string(), Canned::Status(status));
        self
    }

    /// Answers with `body` only after `delay`; pairs with the aggregator timeout.
    pub fn with_delay(mut self, url: &str, delay: Duration, body: impl Into<String>) -> Self {
        self.docs
            .insert(url.to_string(), Canned::Slow(delay, body.into()));
        self
    }
}

#[async_trait]
impl FeedFetcher for FixtureFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String, SourceError> {
        match self.docs.get(url) {
            Some(Canned::Body(b)) => Ok(b.clone()),
            Some(Canned::Status(s)) => Err(SourceError::Status(*s)),
            Some(Canned::Slow(d, b)) => {
                tokio::time::sleep(*d).await;
                Ok(b.clone())
            }
            None => Err(SourceError::Status(404)),
        }
    }
}
