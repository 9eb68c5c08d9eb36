// src/market/order_book.rs
//! Synthetic Level-2 ladder around a best bid/ask.
//!
//! The shape (level count, tick spacing, size taper) is deterministic; the
//! magnitudes come from a [`BookRng`]. This is a display simulation only and
//! is regenerated from scratch on every request.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::indicators::round2;

pub const BOOK_LEVELS: usize = 12;
const TAPER_PER_LEVEL: f64 = 0.08;
const TAPER_FLOOR: f64 = 0.1;
pub const SIZE_FACTOR_MIN: f64 = 0.7;
pub const SIZE_FACTOR_MAX: f64 = 1.3;
pub const MAX_ORDERS_PER_LEVEL: u32 = 15;
const MIN_REF_SIZE: f64 = 100.0;

/// Randomness used by the generator.
pub trait BookRng {
    /// Size multiplier in `[SIZE_FACTOR_MIN, SIZE_FACTOR_MAX]`.
    fn size_factor(&mut self) -> f64;
    /// Order count in `1..=MAX_ORDERS_PER_LEVEL`.
    fn order_count(&mut self) -> u32;
}

/// Production source backed by `rand`.
pub struct RandBookRng<R: Rng>(pub R);

impl RandBookRng<StdRng> {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_rng(&mut rand::rng()))
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> BookRng for RandBookRng<R> {
    fn size_factor(&mut self) -> f64 {
        self.0.random_range(SIZE_FACTOR_MIN..=SIZE_FACTOR_MAX)
    }

    fn order_count(&mut self) -> u32 {
        self.0.random_range(1..=MAX_ORDERS_PER_LEVEL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderBookLevel {
    pub price: f64,
    pub size: u64,
    pub orders: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBook {
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
    pub total_bid_volume: u64,
    pub total_ask_volume: u64,
}

/// Price increment by price band.
pub fn tick_size(price: f64) -> f64 {
    if price < 10.0 {
        0.01
    } else if price < 100.0 {
        0.05
    } else if price < 500.0 {
        0.10
    } else {
        0.25
    }
}

/// Best bid/ask straddling a last trade price, one tick apart. The bid never
/// drops below one tick.
pub fn best_bid_ask(price: f64) -> (f64, f64) {
    let tick = tick_size(price);
    let bid = round2(price - tick / 2.0).max(tick);
    let ask = round2(bid + tick);
    (bid, ask)
}

/// Level-0 size for each side, derived from the average intraday bar volume.
pub fn reference_size(avg_bar_volume: f64) -> f64 {
    (avg_bar_volume / 50.0).max(MIN_REF_SIZE)
}

pub fn generate(
    best_bid: f64,
    best_ask: f64,
    ref_bid_size: f64,
    ref_ask_size: f64,
    rng: &mut dyn BookRng,
) -> OrderBook {
    // the quoted spread is one tick; both ladders step by it
    let spread = round2(best_ask - best_bid);
    let tick = if spread > 0.0 { spread } else { tick_size(best_bid) };
    // bids stop at the last level that still prices above zero
    let bid_levels = ((best_bid / tick + 1e-6).floor() as usize).min(BOOK_LEVELS);
    let bids = ladder(best_bid, -tick, bid_levels, ref_bid_size, rng);
    let asks = ladder(best_ask, tick, BOOK_LEVELS, ref_ask_size, rng);
    OrderBook {
        total_bid_volume: bids.iter().map(|l| l.size).sum(),
        total_ask_volume: asks.iter().map(|l| l.size).sum(),
        bids,
        asks,
    }
}

fn ladder(
    best: f64,
    step: f64,
    levels: usize,
    ref_size: f64,
    rng: &mut dyn BookRng,
) -> Vec<OrderBookLevel> {
    (0..levels)
        .map(|i| {
            let taper = (1.0 - TAPER_PER_LEVEL * i as f64).max(TAPER_FLOOR);
            let size = (ref_size * taper * rng.size_factor()).round().max(1.0);
            OrderBookLevel {
                price: round2(best + step * i as f64),
                size: size as u64,
                orders: rng.order_count(),
            }
        })
        .collect()
}
