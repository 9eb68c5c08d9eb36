// src/ingest/providers/mod.rs
pub mod fixture;
pub mod http;

pub use fixture::FixtureFetcher;
pub use http::HttpFeedFetcher;
