// src/market/chart.rs
//! Chart documents from the quote provider (Yahoo v8 `chart` API shape) and
//! the provider seam used by the instrument snapshot.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::MarketError;

pub const ENV_QUOTE_API_BASE: &str = "QUOTE_API_BASE";
pub const DEFAULT_QUOTE_API_BASE: &str = "https://query1.finance.yahoo.com";

const CHART_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

/// One chart series: instrument metadata plus parallel OHLCV arrays.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    #[serde(default)]
    pub indicators: ChartIndicators,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub regular_market_price: Option<f64>,
    #[serde(default)]
    pub chart_previous_close: Option<f64>,
    #[serde(default)]
    pub previous_close: Option<f64>,
    #[serde(default)]
    pub regular_market_volume: Option<f64>,
    #[serde(default)]
    pub regular_market_day_high: Option<f64>,
    #[serde(default)]
    pub regular_market_day_low: Option<f64>,
    #[serde(default)]
    pub fifty_two_week_high: Option<f64>,
    #[serde(default)]
    pub fifty_two_week_low: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
}

impl ChartMeta {
    /// Display name: short name, then long name, then the symbol itself.
    pub fn display_name(&self) -> &str {
        [self.short_name.as_deref(), self.long_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or(&self.symbol)
    }

    pub fn prev_close(&self) -> Option<f64> {
        self.previous_close.or(self.chart_previous_close)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<QuoteArrays>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteArrays {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub t: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl ChartResult {
    /// Zip the parallel arrays into bars. Bars without a close are dropped;
    /// missing open/high/low fall back to the close, missing volume to 0.
    pub fn candles(&self) -> Vec<Candle> {
        let Some(q) = self.indicators.quote.first() else {
            return Vec::new();
        };
        let at = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();

        self.timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &t)| {
                let close = at(&q.close, i).filter(|c| c.is_finite())?;
                Some(Candle {
                    t,
                    open: at(&q.open, i).unwrap_or(close),
                    high: at(&q.high, i).unwrap_or(close),
                    low: at(&q.low, i).unwrap_or(close),
                    close,
                    volume: at(&q.volume, i).unwrap_or(0.0),
                })
            })
            .collect()
    }
}

/// Parse a raw chart document, mapping provider-level errors.
pub fn parse_chart(symbol: &str, body: &str) -> Result<ChartResult, MarketError> {
    let env: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| MarketError::Upstream(format!("malformed chart document: {e}")))?;

    if let Some(err) = env.chart.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            return Err(MarketError::NotFound(symbol.to_string()));
        }
        return Err(MarketError::Upstream(format!("{}: {}", err.code, err.description)));
    }

    env.chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| MarketError::NotFound(symbol.to_string()))
}

/// Chart source for one instrument.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn chart(
        &self,
        symbol: &str,
        interval: &str,
        range: &str,
    ) -> Result<ChartResult, MarketError>;
}

/// Yahoo v8 chart API over reqwest.
#[derive(Clone)]
pub struct YahooChartProvider {
    client: reqwest::Client,
    base: String,
}

impl YahooChartProvider {
    pub fn new(base: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                 AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/120.0.0.0 Safari/537.36",
            )
            .timeout(CHART_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL from $QUOTE_API_BASE or the public endpoint.
    pub fn from_env() -> anyhow::Result<Self> {
        let base = std::env::var(ENV_QUOTE_API_BASE)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUOTE_API_BASE.to_string());
        Self::new(base)
    }

    fn chart_url(&self, symbol: &str) -> String {
        // index symbols such as ^GSPC
        format!("{}/v8/finance/chart/{}", self.base, symbol.replace('^', "%5E"))
    }
}

#[async_trait]
impl QuoteProvider for YahooChartProvider {
    async fn chart(
        &self,
        symbol: &str,
        interval: &str,
        range: &str,
    ) -> Result<ChartResult, MarketError> {
        let resp = self
            .client
            .get(self.chart_url(symbol))
            .query(&[("interval", interval), ("range", range)])
            .send()
            .await
            .map_err(|e| MarketError::Upstream(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketError::NotFound(symbol.to_string()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| MarketError::Upstream(e.to_string()))?;
        if !status.is_success() {
            // error documents still carry a "Not Found" code on some statuses
            return match parse_chart(symbol, &body) {
                Err(e) if e.is_not_found() => Err(e),
                _ => Err(MarketError::Upstream(format!("HTTP {}", status.as_u16()))),
            };
        }
        parse_chart(symbol, &body)
    }
}
