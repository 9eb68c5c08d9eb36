//! Fetch one feed kind or one instrument and print the JSON the API would serve.
//!
//! Usage:
//!   probe market|world|deals [--fixture FILE]
//!   probe <SYMBOL>
//!
//! With `--fixture`, every source of the kind answers with FILE's contents
//! instead of hitting the network.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use finance_pulse::feeds;
use finance_pulse::ingest::providers::{FixtureFetcher, HttpFeedFetcher};
use finance_pulse::ingest::FeedFetcher;
use finance_pulse::market::{self, RandBookRng, YahooChartProvider};
use finance_pulse::{init_tracing, Classifiers, FeedCatalog, FeedKindConfig};

fn usage() -> ! {
    eprintln!("usage: probe market|world|deals [--fixture FILE] | probe <SYMBOL>");
    std::process::exit(2);
}

fn fixture_for(cfg: &FeedKindConfig, path: &str) -> Result<FixtureFetcher> {
    let body = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    Ok(cfg
        .sources
        .iter()
        .fold(FixtureFetcher::new(), |f, s| f.with_body(&s.url, body.clone())))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(target) = args.first() else { usage() };
    let fixture = match args.get(1).map(String::as_str) {
        Some("--fixture") => Some(args.get(2).cloned().unwrap_or_else(|| usage())),
        Some(_) => usage(),
        None => None,
    };

    let catalog = finance_pulse::ingest::config::load_catalog_default()?;
    let classifiers = Classifiers::load_default()?;

    let json = match target.as_str() {
        kind @ ("market" | "world" | "deals") => {
            let cfg = kind_config(&catalog, kind);
            let fetcher: Arc<dyn FeedFetcher> = match &fixture {
                Some(path) => Arc::new(fixture_for(cfg, path)?),
                None => Arc::new(HttpFeedFetcher::new()),
            };
            let f = fetcher.as_ref();
            match kind {
                "market" => serde_json::to_string_pretty(&feeds::market_news(f, cfg, &classifiers).await)?,
                "world" => serde_json::to_string_pretty(&feeds::world_news(f, cfg, &classifiers).await)?,
                _ => serde_json::to_string_pretty(&feeds::deals(f, cfg, &classifiers).await)?,
            }
        }
        symbol => {
            if fixture.is_some() {
                bail!("--fixture only applies to feed kinds");
            }
            let provider = YahooChartProvider::from_env()?;
            let mut rng = RandBookRng::from_entropy();
            let snap = market::level2(&provider, symbol, &mut rng).await?;
            serde_json::to_string_pretty(&snap)?
        }
    };

    println!("{json}");
    Ok(())
}

fn kind_config<'a>(catalog: &'a FeedCatalog, kind: &str) -> &'a FeedKindConfig {
    match kind {
        "market" => &catalog.market,
        "world" => &catalog.world,
        _ => &catalog.deals,
    }
}
