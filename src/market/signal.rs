// src/market/signal.rs
//! Additive, explainable trade signal.
//!
//! Each rule adds to an integer score and, when it fires, appends a reason.
//! Reasons keep rule evaluation order. No randomness.

use serde::Serialize;

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_MILD_OVERSOLD_MAX: f64 = 44.0;
pub const RSI_MILD_OVERBOUGHT_MIN: f64 = 55.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;
const VWAP_BAND: f64 = 0.002;
const SMA_BAND: f64 = 0.03;
const DAY_MOVE_PCT: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "STRONG SELL")]
    StrongSell,
}

impl Action {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 3 => Action::StrongBuy,
            1..=2 => Action::Buy,
            0 => Action::Hold,
            -2..=-1 => Action::Sell,
            _ => Action::StrongSell,
        }
    }

    pub fn confidence(self) -> Confidence {
        match self {
            Action::StrongBuy | Action::StrongSell => Confidence::High,
            Action::Buy | Action::Sell => Confidence::Medium,
            Action::Hold => Confidence::Low,
        }
    }

    /// Display color used by the dashboard panel.
    pub fn color(self) -> &'static str {
        match self {
            Action::StrongBuy => "strong-buy",
            Action::Buy => "buy",
            Action::Hold => "hold",
            Action::Sell => "sell",
            Action::StrongSell => "strong-sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub action: Action,
    pub confidence: Confidence,
    pub color: &'static str,
    pub score: i32,
    pub reasons: Vec<String>,
}

/// Inputs of [`compute_signal`], named to keep call sites readable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalInputs {
    pub rsi: f64,
    pub vwap: f64,
    pub price: f64,
    pub bid_volume: f64,
    pub ask_volume: f64,
    pub day_change_pct: f64,
    pub sma20: f64,
}

pub fn compute_signal(i: &SignalInputs) -> Signal {
    let mut score = 0;
    let mut reasons = Vec::new();
    let mut add = |points: i32, reason: String| {
        score += points;
        reasons.push(reason);
    };

    // 1. momentum
    let rsi = i.rsi;
    if rsi < RSI_OVERSOLD {
        add(2, format!("RSI {rsi:.0} oversold"));
    } else if rsi <= RSI_MILD_OVERSOLD_MAX {
        add(1, format!("RSI {rsi:.0} mildly oversold"));
    } else if rsi > RSI_OVERBOUGHT {
        add(-2, format!("RSI {rsi:.0} overbought"));
    } else if rsi >= RSI_MILD_OVERBOUGHT_MIN {
        add(-1, format!("RSI {rsi:.0} mildly overbought"));
    }

    // 2. price vs VWAP
    if i.vwap > 0.0 {
        if i.price > i.vwap * (1.0 + VWAP_BAND) {
            add(-1, "Price above VWAP".to_string());
        } else if i.price < i.vwap * (1.0 - VWAP_BAND) {
            add(1, "Price below VWAP".to_string());
        }
    }

    // 3. book pressure
    let total = i.bid_volume + i.ask_volume;
    if total > 0.0 {
        let ratio = i.bid_volume / total;
        let pct = ratio * 100.0;
        if ratio > 0.60 {
            add(2, format!("Strong bid pressure ({pct:.0}% bids)"));
        } else if ratio >= 0.52 {
            add(1, format!("Bid pressure ({pct:.0}% bids)"));
        } else if ratio < 0.40 {
            add(-2, format!("Strong ask pressure ({pct:.0}% bids)"));
        } else if ratio <= 0.48 {
            add(-1, format!("Ask pressure ({pct:.0}% bids)"));
        }
    }

    // 4. day move
    let chg = i.day_change_pct;
    if chg > DAY_MOVE_PCT {
        add(-1, format!("Extended {chg:+.1}% on the day"));
    } else if chg < -DAY_MOVE_PCT {
        add(1, format!("Pullback {chg:+.1}% on the day"));
    }

    // 5. price vs SMA20
    if i.sma20 > 0.0 {
        if i.price > i.sma20 * (1.0 + SMA_BAND) {
            add(-1, "Stretched above SMA20".to_string());
        } else if i.price < i.sma20 * (1.0 - SMA_BAND) {
            add(1, "Discount to SMA20".to_string());
        }
    }

    let action = Action::from_score(score);
    Signal {
        action,
        confidence: action.confidence(),
        color: action.color(),
        score,
        reasons,
    }
}
