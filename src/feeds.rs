// src/feeds.rs
//! The three classified feeds served by the dashboard: market headlines with
//! sentiment, sales deals with quality tier and discount badge, and world news
//! with severity and category.

use std::cmp::Ordering;

use serde::Serialize;

use crate::classify::{extract_discount, Classifiers, DealTier, Sentiment, Severity, Tier};
use crate::ingest::aggregate::{aggregate, by_recency, RankedItem};
use crate::ingest::config::FeedKindConfig;
use crate::ingest::types::{FeedFetcher, RawFeedItem};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketNewsItem {
    pub id: String,
    #[serde(flatten)]
    pub item: RawFeedItem,
    #[serde(flatten)]
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealItem {
    pub id: String,
    #[serde(flatten)]
    pub item: RawFeedItem,
    pub category: String,
    pub category_icon: String,
    pub discount: String,
    pub deal: DealTier,
    pub deal_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldNewsItem {
    pub id: String,
    #[serde(flatten)]
    pub item: RawFeedItem,
    pub category: String,
    pub category_icon: String,
    pub severity: Severity,
    pub severity_label: &'static str,
}

impl Classifiers {
    pub fn market_item(&self, item: RawFeedItem) -> MarketNewsItem {
        let sentiment = self.sentiment.classify(&item.text());
        MarketNewsItem {
            id: item.id(),
            item,
            sentiment,
        }
    }

    pub fn deal_item(&self, item: RawFeedItem) -> DealItem {
        let text = item.text();
        let deal = self.deal_tiers.classify(&text);
        let category = self.deal_categories.tag(&text).clone();
        DealItem {
            id: item.id(),
            discount: extract_discount(&text),
            category: category.name,
            category_icon: category.icon,
            deal,
            deal_label: deal.label(),
            item,
        }
    }

    pub fn world_item(&self, item: RawFeedItem) -> WorldNewsItem {
        let text = item.text();
        let severity = self.severity.classify(&text);
        let category = self.world_categories.tag(&text).clone();
        WorldNewsItem {
            id: item.id(),
            category: category.name,
            category_icon: category.icon,
            severity,
            severity_label: severity.label(),
            item,
        }
    }
}

impl RankedItem for MarketNewsItem {
    fn id(&self) -> &str {
        &self.id
    }
    fn rank_cmp(&self, other: &Self) -> Ordering {
        by_recency(&self.item.published_at, &other.item.published_at)
    }
}

impl RankedItem for DealItem {
    fn id(&self) -> &str {
        &self.id
    }
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.deal
            .rank()
            .cmp(&other.deal.rank())
            .then_with(|| by_recency(&self.item.published_at, &other.item.published_at))
    }
}

impl RankedItem for WorldNewsItem {
    fn id(&self) -> &str {
        &self.id
    }
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.severity
            .rank()
            .cmp(&other.severity.rank())
            .then_with(|| by_recency(&self.item.published_at, &other.item.published_at))
    }
}

pub async fn market_news(
    fetcher: &dyn FeedFetcher,
    cfg: &FeedKindConfig,
    classifiers: &Classifiers,
) -> Vec<MarketNewsItem> {
    aggregate(&cfg.sources, fetcher, &cfg.options(), |it| {
        classifiers.market_item(it)
    })
    .await
}

pub async fn world_news(
    fetcher: &dyn FeedFetcher,
    cfg: &FeedKindConfig,
    classifiers: &Classifiers,
) -> Vec<WorldNewsItem> {
    aggregate(&cfg.sources, fetcher, &cfg.options(), |it| {
        classifiers.world_item(it)
    })
    .await
}

pub async fn deals(
    fetcher: &dyn FeedFetcher,
    cfg: &FeedKindConfig,
    classifiers: &Classifiers,
) -> Vec<DealItem> {
    aggregate(&cfg.sources, fetcher, &cfg.options(), |it| {
        classifiers.deal_item(it)
    })
    .await
}
