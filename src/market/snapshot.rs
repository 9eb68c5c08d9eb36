// src/market/snapshot.rs
//! Per-instrument views assembled from chart documents: the full Level-2
//! snapshot and the lightweight quote used for watchlist validation.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;

use super::chart::{Candle, ChartResult, QuoteProvider};
use super::indicators::{round2, Indicators};
use super::order_book::{best_bid_ask, generate, reference_size, BookRng, OrderBookLevel};
use super::signal::{compute_signal, Signal, SignalInputs};
use crate::error::MarketError;

pub const MAX_SYMBOL_LEN: usize = 12;
/// Intraday bars returned with the snapshot (for the sparkline).
pub const SNAPSHOT_CANDLES: usize = 60;

const INTRADAY: (&str, &str) = ("5m", "1d");
const DAILY: (&str, &str) = ("1d", "3mo");
const QUOTE: (&str, &str) = ("1d", "5d");

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandlePoint {
    pub t: i64,
    pub c: f64,
    pub v: f64,
}

impl From<&Candle> for CandlePoint {
    fn from(c: &Candle) -> Self {
        Self {
            t: c.t,
            c: c.close,
            v: c.volume,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Level2Snapshot {
    pub symbol: String,
    pub name: String,
    pub currency: String,
    pub price: f64,
    pub bid: f64,
    pub ask: f64,
    pub spread: f64,
    pub spread_pct: f64,
    pub change: f64,
    pub change_pct: f64,
    pub volume: f64,
    pub avg_volume: f64,
    pub open: f64,
    pub day_low: f64,
    pub day_high: f64,
    pub prev_close: f64,
    #[serde(rename = "week52Low")]
    pub week52_low: f64,
    #[serde(rename = "week52High")]
    pub week52_high: f64,
    pub market_cap: f64,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
    pub total_bid_vol: u64,
    pub total_ask_vol: u64,
    pub indicators: Indicators,
    pub signal: Signal,
    pub candles: Vec<CandlePoint>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_percent: f64,
}

/// Trim and uppercase; accept 1..=12 chars of `A-Z 0-9 . - ^ =`.
pub fn normalize_symbol(raw: &str) -> Result<String, MarketError> {
    let sym = raw.trim().to_ascii_uppercase();
    let ok = !sym.is_empty()
        && sym.len() <= MAX_SYMBOL_LEN
        && sym
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if ok {
        Ok(sym)
    } else {
        Err(MarketError::InvalidSymbol(raw.to_string()))
    }
}

/// Quote + indicators + synthetic book + signal for one instrument.
///
/// Both chart fetches are required; the first failure fails the request.
pub async fn level2(
    provider: &dyn QuoteProvider,
    symbol: &str,
    rng: &mut (dyn BookRng + Send),
) -> Result<Level2Snapshot, MarketError> {
    super::ensure_metrics_described();
    let symbol = normalize_symbol(symbol)?;
    counter!("market_requests_total", "kind" => "level2").increment(1);

    let (intraday, daily) = tokio::try_join!(
        provider.chart(&symbol, INTRADAY.0, INTRADAY.1),
        provider.chart(&symbol, DAILY.0, DAILY.1),
    )
    .inspect_err(|e| record_failure(&symbol, e))?;

    let snap = assemble(&symbol, &intraday, &daily, rng, Utc::now())?;
    tracing::debug!(
        target: "market",
        symbol = %snap.symbol,
        price = snap.price,
        score = snap.signal.score,
        "level2 snapshot built"
    );
    Ok(snap)
}

/// Existence check and headline numbers for watchlists.
pub async fn quote_summary(
    provider: &dyn QuoteProvider,
    symbol: &str,
) -> Result<QuoteSummary, MarketError> {
    super::ensure_metrics_described();
    let symbol = normalize_symbol(symbol)?;
    counter!("market_requests_total", "kind" => "quote").increment(1);

    let chart = provider
        .chart(&symbol, QUOTE.0, QUOTE.1)
        .await
        .inspect_err(|e| record_failure(&symbol, e))?;

    let closes: Vec<f64> = chart.candles().iter().map(|c| c.close).collect();
    let price = chart
        .meta
        .regular_market_price
        .or_else(|| closes.last().copied())
        .ok_or_else(|| MarketError::NotFound(symbol.clone()))?;
    // over a 5d range chartPreviousClose predates the window
    let prev = chart
        .meta
        .previous_close
        .or_else(|| closes.len().checked_sub(2).map(|i| closes[i]))
        .or(chart.meta.chart_previous_close)
        .unwrap_or(price);

    Ok(QuoteSummary {
        name: chart.meta.display_name().to_string(),
        symbol,
        price: round2(price),
        change_percent: round2(pct_change(price, prev)),
    })
}

fn record_failure(symbol: &str, e: &MarketError) {
    let kind = if e.is_not_found() { "not_found" } else { "upstream" };
    counter!("market_upstream_errors_total", "kind" => kind).increment(1);
    tracing::warn!(target: "market", symbol, error = %e, "chart fetch failed");
}

fn assemble(
    symbol: &str,
    intraday: &ChartResult,
    daily: &ChartResult,
    rng: &mut (dyn BookRng + Send),
    now: DateTime<Utc>,
) -> Result<Level2Snapshot, MarketError> {
    let meta = &intraday.meta;
    let bars = intraday.candles();
    let days = daily.candles();
    let daily_closes: Vec<f64> = days.iter().map(|c| c.close).collect();

    let price = meta
        .regular_market_price
        .or_else(|| bars.last().map(|c| c.close))
        .ok_or_else(|| MarketError::NotFound(symbol.to_string()))?;
    let prev_close = meta
        .prev_close()
        .or_else(|| daily_closes.len().checked_sub(2).map(|i| daily_closes[i]))
        .unwrap_or(price);
    let change = price - prev_close;

    let (bid, ask) = best_bid_ask(price);
    let spread = round2(ask - bid);

    let avg_bar_volume = mean(bars.iter().map(|c| c.volume));
    let ref_size = reference_size(avg_bar_volume);
    let book = generate(bid, ask, ref_size, ref_size, rng);

    let indicators = Indicators::compute(&daily_closes, &bars);
    let change_pct = pct_change(price, prev_close);
    let signal = compute_signal(&SignalInputs {
        rsi: f64::from(indicators.rsi),
        vwap: indicators.vwap,
        price,
        bid_volume: book.total_bid_volume as f64,
        ask_volume: book.total_ask_volume as f64,
        day_change_pct: change_pct,
        sma20: indicators.sma20,
    });

    let day_high = meta
        .regular_market_day_high
        .or_else(|| bars.iter().map(|c| c.high).reduce(f64::max))
        .unwrap_or(price);
    let day_low = meta
        .regular_market_day_low
        .or_else(|| bars.iter().map(|c| c.low).reduce(f64::min))
        .unwrap_or(price);
    let week52_high = meta
        .fifty_two_week_high
        .or_else(|| days.iter().map(|c| c.high).reduce(f64::max))
        .unwrap_or(day_high);
    let week52_low = meta
        .fifty_two_week_low
        .or_else(|| days.iter().map(|c| c.low).reduce(f64::min))
        .unwrap_or(day_low);

    let skip = bars.len().saturating_sub(SNAPSHOT_CANDLES);

    Ok(Level2Snapshot {
        symbol: symbol.to_string(),
        name: meta.display_name().to_string(),
        currency: meta.currency.clone().unwrap_or_else(|| "USD".to_string()),
        price: round2(price),
        bid,
        ask,
        spread,
        spread_pct: round_to(spread / price * 100.0, 3),
        change: round2(change),
        change_pct: round2(change_pct),
        volume: meta
            .regular_market_volume
            .unwrap_or_else(|| bars.iter().map(|c| c.volume).sum()),
        avg_volume: mean(days.iter().map(|c| c.volume)).round(),
        open: round2(bars.first().map(|c| c.open).unwrap_or(price)),
        day_low: round2(day_low),
        day_high: round2(day_high),
        prev_close: round2(prev_close),
        week52_low: round2(week52_low),
        week52_high: round2(week52_high),
        market_cap: meta.market_cap.unwrap_or(0.0),
        total_bid_vol: book.total_bid_volume,
        total_ask_vol: book.total_ask_volume,
        bids: book.bids,
        asks: book.asks,
        indicators,
        signal,
        candles: bars[skip..].iter().map(CandlePoint::from).collect(),
        updated_at: now,
    })
}

fn pct_change(price: f64, prev: f64) -> f64 {
    if prev > 0.0 {
        (price - prev) / prev * 100.0
    } else {
        0.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let m = 10f64.powi(decimals);
    (v * m).round() / m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::chart::{ChartIndicators, ChartMeta, QuoteArrays};
    use crate::market::order_book::{RandBookRng, BOOK_LEVELS};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn series(symbol: &str, closes: &[f64], volume: f64, price: Option<f64>) -> ChartResult {
        let n = closes.len();
        ChartResult {
            meta: ChartMeta {
                symbol: symbol.into(),
                short_name: Some(format!("{symbol} Corp")),
                regular_market_price: price,
                ..Default::default()
            },
            timestamp: (0..n as i64).map(|i| 1_700_000_000 + i * 300).collect(),
            indicators: ChartIndicators {
                quote: vec![QuoteArrays {
                    open: closes.iter().map(|c| Some(*c)).collect(),
                    high: closes.iter().map(|c| Some(c + 0.5)).collect(),
                    low: closes.iter().map(|c| Some(c - 0.5)).collect(),
                    close: closes.iter().map(|c| Some(*c)).collect(),
                    volume: vec![Some(volume); n],
                }],
            },
        }
    }

    struct Stub {
        calls: AtomicUsize,
        fail_daily: bool,
    }

    impl Stub {
        fn new(fail_daily: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_daily,
            }
        }
    }

    #[async_trait]
    impl QuoteProvider for Stub {
        async fn chart(
            &self,
            symbol: &str,
            interval: &str,
            range: &str,
        ) -> Result<ChartResult, MarketError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match (interval, range) {
                ("5m", "1d") => {
                    let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i % 5) as f64 * 0.1).collect();
                    Ok(series(symbol, &closes, 5_000.0, Some(100.2)))
                }
                ("1d", "3mo") if self.fail_daily => Err(MarketError::Upstream("boom".into())),
                ("1d", "3mo") => {
                    let closes: Vec<f64> = (0..60).map(|i| 90.0 + i as f64 * 0.2).collect();
                    Ok(series(symbol, &closes, 1_000_000.0, None))
                }
                ("1d", "5d") => Ok(series(symbol, &[98.0, 99.0, 100.0, 101.0, 102.0], 10.0, None)),
                _ => Err(MarketError::NotFound(symbol.into())),
            }
        }
    }

    #[test]
    fn symbols_are_normalized_and_validated() {
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
        assert_eq!(normalize_symbol("^gspc").unwrap(), "^GSPC");
        assert_eq!(normalize_symbol("eurusd=x").unwrap(), "EURUSD=X");
        for bad in ["", "   ", "AAPL;DROP", "A B", "ABCDEFGHIJKLM", "ÄPFEL"] {
            assert!(
                matches!(normalize_symbol(bad), Err(MarketError::InvalidSymbol(_))),
                "{bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn level2_assembles_a_full_snapshot() {
        let stub = Stub::new(false);
        let mut rng = RandBookRng::seeded(42);
        let snap = level2(&stub, "msft", &mut rng).await.unwrap();

        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
        assert_eq!(snap.symbol, "MSFT");
        assert_eq!(snap.name, "MSFT Corp");
        assert_eq!(snap.price, 100.2);
        assert_eq!((snap.bid, snap.ask), (100.15, 100.25));
        assert_eq!(snap.spread, 0.1);
        assert_eq!(snap.bids.len(), BOOK_LEVELS);
        assert_eq!(snap.asks.len(), BOOK_LEVELS);
        assert_eq!(snap.candles.len(), SNAPSHOT_CANDLES);
        assert_eq!(snap.avg_volume, 1_000_000.0);
        // daily closes rise every session
        assert_eq!(snap.indicators.rsi, 100);
        assert!(snap.signal.reasons[0].contains("overbought"));

        let v = serde_json::to_value(&snap).unwrap();
        for key in ["spreadPct", "week52High", "totalBidVol", "updatedAt", "marketCap"] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert!(v["candles"][0].get("c").is_some());
    }

    #[tokio::test]
    async fn level2_fails_when_either_chart_fails() {
        let stub = Stub::new(true);
        let mut rng = RandBookRng::seeded(1);
        let err = level2(&stub, "MSFT", &mut rng).await.unwrap_err();
        assert!(matches!(err, MarketError::Upstream(_)));
    }

    #[tokio::test]
    async fn invalid_symbol_never_reaches_the_provider() {
        let stub = Stub::new(false);
        let mut rng = RandBookRng::seeded(1);
        assert!(level2(&stub, "no spaces", &mut rng).await.is_err());
        assert!(quote_summary(&stub, "").await.is_err());
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn quote_summary_uses_last_two_closes() {
        let stub = Stub::new(false);
        let q = quote_summary(&stub, "nvda").await.unwrap();
        assert_eq!(q.symbol, "NVDA");
        assert_eq!(q.price, 102.0);
        assert_eq!(q.change_percent, 0.99);
    }
}
