//! Error taxonomy for the two upstream boundaries.
//!
//! Feed failures (`SourceError`) are swallowed by the aggregator and only ever
//! logged; chart failures (`MarketError`) are request-fatal and map to HTTP
//! statuses in `api`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl SourceError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Timeout(_) => "timeout",
            SourceError::Status(_) => "status",
            SourceError::Transport(_) => "transport",
            SourceError::Parse(_) => "parse",
        }
    }
}

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("symbol not found: {0}")]
    NotFound(String),

    #[error("quote provider error: {0}")]
    Upstream(String),
}

impl MarketError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MarketError::NotFound(_))
    }
}
