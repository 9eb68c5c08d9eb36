//! finance-pulse: binary entrypoint.
//! Boots the Axum HTTP server with live feed and quote providers, plus the
//! Prometheus `/metrics` route.

use finance_pulse::{api, init_tracing, metrics::Metrics, AppState};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    init_tracing();

    let metrics = Metrics::init()?;
    let state = AppState::from_env()?;

    let router = api::router(state).merge(metrics.router());
    tracing::info!(target: "api", "router ready");

    Ok(router.into())
}
