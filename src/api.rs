// src/api.rs
//! HTTP surface: three ranked feeds plus the per-instrument endpoints.
//! Handlers are thin; all logic lives in `feeds` and `market`.

use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use shuttle_axum::axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::classify::Classifiers;
use crate::error::MarketError;
use crate::feeds::{self, DealItem, MarketNewsItem, WorldNewsItem};
use crate::ingest::config::{load_catalog_default, FeedCatalog};
use crate::ingest::providers::HttpFeedFetcher;
use crate::ingest::FeedFetcher;
use crate::market::{
    self, Level2Snapshot, QuoteProvider, QuoteSummary, RandBookRng, YahooChartProvider,
};

/// Read-only state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<dyn FeedFetcher>,
    pub quotes: Arc<dyn QuoteProvider>,
    pub classifiers: Arc<Classifiers>,
    pub catalog: Arc<FeedCatalog>,
}

impl AppState {
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        quotes: Arc<dyn QuoteProvider>,
        classifiers: Classifiers,
        catalog: FeedCatalog,
    ) -> Self {
        Self {
            fetcher,
            quotes,
            classifiers: Arc::new(classifiers),
            catalog: Arc::new(catalog),
        }
    }

    /// Live HTTP providers plus catalog and classifier tables resolved from
    /// the environment (see `FEED_SOURCES_PATH`, `CLASSIFIER_CONFIG_PATH`,
    /// `QUOTE_API_BASE`).
    pub fn from_env() -> anyhow::Result<Self> {
        let catalog = load_catalog_default().context("loading feed catalog")?;
        let classifiers = Classifiers::load_default().context("loading classifier tables")?;
        let fetcher = HttpFeedFetcher::new();
        let quotes = YahooChartProvider::from_env().context("building quote client")?;
        tracing::info!(
            target: "api",
            market_sources = catalog.market.sources.len(),
            world_sources = catalog.world.sources.len(),
            deal_sources = catalog.deals.sources.len(),
            "state initialized"
        );
        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(quotes),
            classifiers,
            catalog,
        ))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/news/market", get(market_news))
        .route("/api/news/world", get(world_news))
        .route("/api/news/deals", get(deals))
        .route("/api/market/level2/{symbol}", get(level2))
        .route("/api/market/quote/{symbol}", get(quote))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = match &self {
            MarketError::InvalidSymbol(_) => StatusCode::BAD_REQUEST,
            MarketError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn market_news(State(state): State<AppState>) -> Json<Vec<MarketNewsItem>> {
    Json(feeds::market_news(state.fetcher.as_ref(), &state.catalog.market, &state.classifiers).await)
}

async fn world_news(State(state): State<AppState>) -> Json<Vec<WorldNewsItem>> {
    Json(feeds::world_news(state.fetcher.as_ref(), &state.catalog.world, &state.classifiers).await)
}

async fn deals(State(state): State<AppState>) -> Json<Vec<DealItem>> {
    Json(feeds::deals(state.fetcher.as_ref(), &state.catalog.deals, &state.classifiers).await)
}

async fn level2(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Level2Snapshot>, MarketError> {
    let mut rng = RandBookRng::from_entropy();
    market::level2(state.quotes.as_ref(), &symbol, &mut rng)
        .await
        .map(Json)
}

async fn quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<QuoteSummary>, MarketError> {
    market::quote_summary(state.quotes.as_ref(), &symbol)
        .await
        .map(Json)
}
