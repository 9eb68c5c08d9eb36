// src/market/mod.rs
//! Single-instrument pipeline: chart documents → indicators + synthetic
//! order book → rule-based signal.

pub mod chart;
pub mod indicators;
pub mod order_book;
pub mod signal;
pub mod snapshot;

use metrics::describe_counter;
use once_cell::sync::OnceCell;

pub use chart::{Candle, ChartResult, QuoteProvider, YahooChartProvider};
pub use indicators::Indicators;
pub use order_book::{BookRng, OrderBook, OrderBookLevel, RandBookRng};
pub use signal::{compute_signal, Action, Confidence, Signal, SignalInputs};
pub use snapshot::{level2, normalize_symbol, quote_summary, Level2Snapshot, QuoteSummary};

pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("market_requests_total", "Instrument requests by kind.");
        describe_counter!(
            "market_upstream_errors_total",
            "Chart fetch failures (not_found / upstream)."
        );
    });
}
