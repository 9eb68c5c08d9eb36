// src/ingest/aggregate.rs
//! Fan-out over all sources of one feed kind, settle-all join, then
//! dedup → sort → cap.
//!
//! A failing, slow or malformed source contributes zero items; it never fails
//! the aggregate, and an aggregate where every source failed is simply empty.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, histogram};

use crate::error::SourceError;
use crate::ingest::ensure_metrics_described;
use crate::ingest::feed::parse_feed;
use crate::ingest::types::{FeedFetcher, FeedSource, FetchOptions, RawFeedItem};

/// A classified item the aggregator can dedup and order.
pub trait RankedItem {
    fn id(&self) -> &str;

    /// Composite ordering; `Less` sorts first.
    fn rank_cmp(&self, other: &Self) -> Ordering;
}

/// Fetch + parse one source under a hard deadline. Never fails.
pub async fn fetch_source(
    fetcher: &dyn FeedFetcher,
    source: &FeedSource,
    opts: &FetchOptions,
    now: DateTime<Utc>,
) -> Vec<RawFeedItem> {
    let t0 = Instant::now();
    let timeout_ms = opts.timeout.as_millis() as u64;

    let body = match tokio::time::timeout(opts.timeout, fetcher.fetch(&source.url, opts.timeout))
        .await
    {
        Ok(res) => res,
        Err(_) => Err(SourceError::Timeout(timeout_ms)),
    };
    let parsed = body.and_then(|xml| {
        parse_feed(&xml, &source.name, opts.max_per_source, now)
            .map_err(|e| SourceError::Parse(format!("{e:#}")))
    });

    histogram!("feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    match parsed {
        Ok(items) => {
            counter!("feed_items_total").increment(items.len() as u64);
            tracing::debug!(
                target: "ingest",
                source = %source.name,
                items = items.len(),
                "feed source parsed"
            );
            items
        }
        Err(e) => {
            counter!("feed_source_errors_total", "kind" => e.kind()).increment(1);
            tracing::warn!(
                target: "ingest",
                source = %source.name,
                url = %source.url,
                error = %e,
                "feed source unavailable"
            );
            Vec::new()
        }
    }
}

/// Aggregate all `sources` concurrently and classify every item with `classify`.
/// Returns at most `opts.cap` items in rank order.
pub async fn aggregate<T, F>(
    sources: &[FeedSource],
    fetcher: &dyn FeedFetcher,
    opts: &FetchOptions,
    classify: F,
) -> Vec<T>
where
    T: RankedItem,
    F: Fn(RawFeedItem) -> T,
{
    ensure_metrics_described();
    let now = Utc::now();

    // join_all, not try_join_all: every source settles on its own
    let batches = join_all(
        sources
            .iter()
            .map(|s| fetch_source(fetcher, s, opts, now)),
    )
    .await;

    let classified: Vec<T> = batches.into_iter().flatten().map(classify).collect();
    let total = classified.len();
    let ranked = rank(classified, opts.cap);

    tracing::info!(
        target: "ingest",
        sources = sources.len(),
        total,
        kept = ranked.len(),
        "aggregation finished"
    );
    ranked
}

/// Dedup (first occurrence wins), stable sort by rank, then truncate.
/// Truncation happens last so no source is starved by an early cut.
pub fn rank<T: RankedItem>(items: Vec<T>, cap: usize) -> Vec<T> {
    let (mut kept, dropped) = dedup_by_id(items);
    counter!("feed_dedup_total").increment(dropped as u64);
    kept.sort_by(|a, b| a.rank_cmp(b));
    kept.truncate(cap);
    kept
}

/// Returns (kept, dropped_count). Relative order of kept items is preserved.
pub fn dedup_by_id<T: RankedItem>(items: Vec<T>) -> (Vec<T>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut keep = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for it in items {
        if seen.insert(it.id().to_string()) {
            keep.push(it);
        } else {
            dropped += 1;
        }
    }
    (keep, dropped)
}

/// Newest first.
pub fn by_recency(a: &DateTime<Utc>, b: &DateTime<Utc>) -> Ordering {
    b.cmp(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct T {
        id: String,
        rank: u8,
        seq: u32,
    }

    impl RankedItem for T {
        fn id(&self) -> &str {
            &self.id
        }
        fn rank_cmp(&self, other: &Self) -> Ordering {
            self.rank.cmp(&other.rank)
        }
    }

    fn t(id: &str, rank: u8, seq: u32) -> T {
        T {
            id: id.into(),
            rank,
            seq,
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence_in_order() {
        let (kept, dropped) = dedup_by_id(vec![t("a", 0, 1), t("b", 0, 2), t("a", 0, 3)]);
        assert_eq!(dropped, 1);
        assert_eq!(kept.iter().map(|x| x.seq).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn rank_sorts_stably_then_caps() {
        let items = vec![t("a", 2, 1), t("b", 0, 2), t("c", 2, 3), t("d", 0, 4), t("e", 1, 5)];
        let out = rank(items, 4);
        assert_eq!(out.iter().map(|x| x.seq).collect::<Vec<_>>(), vec![2, 4, 5, 1]);
    }

    #[test]
    fn cap_is_applied_after_sorting() {
        // best-ranked items sit at the tail of the input
        let mut items: Vec<T> = (0..50).map(|i| t(&format!("x{i}"), 3, i)).collect();
        items.extend((50..55).map(|i| t(&format!("x{i}"), 0, i)));
        let out = rank(items, 5);
        assert!(out.iter().all(|x| x.rank == 0));
    }
}
