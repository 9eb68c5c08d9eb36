// src/ingest/mod.rs
pub mod aggregate;
pub mod config;
pub mod feed;
pub mod providers;
pub mod types;

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

pub use aggregate::{aggregate, RankedItem};
pub use types::{FeedFetcher, FeedSource, FetchOptions, RawFeedItem};

/// Description length cap (chars) applied by the feed normalizer.
pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_items_total", "Items parsed from feed sources.");
        describe_counter!(
            "feed_source_errors_total",
            "Feed fetch/parse failures (source contributed nothing)."
        );
        describe_counter!(
            "feed_dedup_total",
            "Items removed by id deduplication within one aggregation run."
        );
        describe_histogram!("feed_fetch_ms", "Per-source fetch + parse time in milliseconds.");
    });
}

/// Normalize feed text: decode entities, strip markup, fold quotes and whitespace,
/// then cap to `max_chars` characters.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (NBSP included)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"[\s\u{00A0}]+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
        out.truncate(out.trim_end().len());
    }

    out
}

/// Dedup key: sha256 over `(link or title)|source`, first 8 bytes as hex.
pub fn item_id(link: &str, title: &str, source: &str) -> String {
    let key = if link.trim().is_empty() { title } else { link };
    let mut hasher = Sha256::new();
    hasher.update(key.trim().as_bytes());
    hasher.update(b"|");
    hasher.update(source.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
