// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, with
// in-memory feed and chart providers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use finance_pulse::ingest::providers::FixtureFetcher;
use finance_pulse::ingest::FeedSource;
use finance_pulse::market::chart::{ChartIndicators, ChartMeta, QuoteArrays};
use finance_pulse::market::{ChartResult, QuoteProvider};
use finance_pulse::{api, AppState, Classifiers, FeedCatalog, MarketError};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

const MARKET: &str = include_str!("fixtures/market_rss.xml");
const DEALS: &str = include_str!("fixtures/deals_atom.xml");
const WORLD: &str = include_str!("fixtures/world_rss.xml");

/// Serves a fixed uptrend for known symbols, fails the rest.
struct StubQuotes;

#[async_trait]
impl QuoteProvider for StubQuotes {
    async fn chart(
        &self,
        symbol: &str,
        _interval: &str,
        range: &str,
    ) -> Result<ChartResult, MarketError> {
        match symbol {
            "AAPL" => {}
            "FLAKY" => return Err(MarketError::Upstream("HTTP 503".into())),
            _ => return Err(MarketError::NotFound(symbol.into())),
        }
        let n = if range == "3mo" { 60 } else { 78 };
        let closes: Vec<Option<f64>> = (0..n).map(|i| Some(180.0 + i as f64 * 0.1)).collect();
        Ok(ChartResult {
            meta: ChartMeta {
                symbol: symbol.into(),
                short_name: Some("Apple Inc.".into()),
                currency: Some("USD".into()),
                regular_market_price: Some(187.7),
                chart_previous_close: Some(185.0),
                ..Default::default()
            },
            timestamp: (0..n as i64).map(|i| 1_700_000_000 + i * 300).collect(),
            indicators: ChartIndicators {
                quote: vec![QuoteArrays {
                    open: closes.clone(),
                    high: closes.clone(),
                    low: closes.clone(),
                    close: closes,
                    volume: vec![Some(20_000.0); n],
                }],
            },
        })
    }
}

/// Build the same Router the binary uses, over in-memory providers.
fn test_router() -> Router {
    let mut catalog = FeedCatalog::builtin().expect("built-in catalog");
    catalog.market.sources = vec![
        FeedSource::new("Wire", "https://market.test/rss"),
        FeedSource::new("Down", "https://down.test/rss"),
    ];
    catalog.world.sources = vec![FeedSource::new("World Desk", "https://world.test/rss")];
    catalog.deals.sources = vec![FeedSource::new("r/deals", "https://deals.test/atom")];

    let fetcher = FixtureFetcher::new()
        .with_body("https://market.test/rss", MARKET)
        .with_body("https://world.test/rss", WORLD)
        .with_body("https://deals.test/atom", DEALS)
        .with_status("https://down.test/rss", 502);

    let state = AppState::new(
        Arc::new(fetcher),
        Arc::new(StubQuotes),
        Classifiers::builtin().expect("built-in tables"),
        catalog,
    );
    api::router(state)
}

async fn get(uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = test_router().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

async fn get_json(uri: &str) -> (StatusCode, Json) {
    let (status, bytes) = get(uri).await;
    let v = serde_json::from_slice(&bytes).expect("json body");
    (status, v)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let (status, bytes) = get("/health").await;
    assert_eq!(status, StatusCode::OK, "health should be 200");
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "ok");
}

#[tokio::test]
async fn market_news_lists_ranked_items() {
    let (status, v) = get_json("/api/news/market").await;
    assert_eq!(status, StatusCode::OK);

    let arr = v.as_array().expect("array");
    assert_eq!(arr.len(), 3, "duplicate and untitled items are dropped");
    for key in [
        "id",
        "title",
        "description",
        "link",
        "pubDate",
        "source",
        "score",
        "label",
        "level",
        "direction",
    ] {
        assert!(arr[0].get(key).is_some(), "missing '{key}'");
    }
    assert_eq!(arr[1]["level"], "high-negative");
    assert_eq!(arr[2]["direction"], "up");
}

#[tokio::test]
async fn world_and_deals_carry_their_labels() {
    let (status, world) = get_json("/api/news/world").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(world[0]["severity"], "critical");
    assert_eq!(world[0]["severityLabel"], "Critical");
    assert_eq!(world[0]["categoryIcon"], "🌪️");

    let (status, deals) = get_json("/api/news/deals").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deals[0]["deal"], "hot");
    assert_eq!(deals[0]["dealLabel"], "Hot Deal");
    assert_eq!(deals[0]["discount"], "60% OFF");
    assert_eq!(deals[0]["category"], "Gaming");
}

#[tokio::test]
async fn level2_snapshot_contract() {
    let (status, v) = get_json("/api/market/level2/aapl").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(v["symbol"], "AAPL");
    assert_eq!(v["name"], "Apple Inc.");
    assert_eq!(v["bids"].as_array().map(Vec::len), Some(12));
    assert_eq!(v["asks"].as_array().map(Vec::len), Some(12));
    assert_eq!(v["candles"].as_array().map(Vec::len), Some(60));
    assert_eq!(v["indicators"]["rsi"], 100);
    for key in ["action", "confidence", "color", "score", "reasons"] {
        assert!(v["signal"].get(key).is_some(), "signal missing '{key}'");
    }
    let bid = v["bid"].as_f64().unwrap();
    let ask = v["ask"].as_f64().unwrap();
    assert!(bid < 187.7 && ask > 187.7);
}

#[tokio::test]
async fn quote_endpoint_and_error_statuses() {
    let (status, v) = get_json("/api/market/quote/AAPL").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["price"], 187.7);
    assert!(v.get("changePercent").is_some());

    let (status, v) = get_json("/api/market/quote/NOPE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(v["error"].as_str().unwrap().contains("NOPE"));

    let (status, _) = get_json("/api/market/level2/FLAKY").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, v) = get_json("/api/market/quote/TOO-LONG-SYMBOL").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v.get("error").is_some());
}
