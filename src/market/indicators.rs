// src/market/indicators.rs
//! RSI(14), VWAP and SMA(n). All functions degrade to a neutral value on short
//! or empty input; none of them can fail.

use serde::Serialize;

use super::chart::Candle;

pub const RSI_PERIOD: usize = 14;
/// Returned when fewer than `RSI_PERIOD + 1` closes are available.
pub const RSI_NEUTRAL: u8 = 50;

/// RSI over the last 14 close-to-close deltas, rounded to an integer.
///
/// RSI = 100 - 100 / (1 + avg_gain / avg_loss); 100 when there are no losses.
pub fn rsi(closes: &[f64]) -> u8 {
    if closes.len() < RSI_PERIOD + 1 {
        return RSI_NEUTRAL;
    }

    let tail = &closes[closes.len() - (RSI_PERIOD + 1)..];
    let (gain, loss) = tail.windows(2).fold((0.0, 0.0), |(g, l), w| {
        let change = w[1] - w[0];
        if change > 0.0 {
            (g + change, l)
        } else {
            (g, l - change)
        }
    });
    let avg_gain = gain / RSI_PERIOD as f64;
    let avg_loss = loss / RSI_PERIOD as f64;

    if avg_loss == 0.0 {
        return 100;
    }

    let rs = avg_gain / avg_loss;
    let value = 100.0 - (100.0 / (1.0 + rs));
    value.round().clamp(0.0, 100.0) as u8
}

/// Volume-weighted average of the typical price (h + l + c) / 3 over the
/// whole series; 0 when total volume is 0.
pub fn vwap(candles: &[Candle]) -> f64 {
    let (pv, vol) = candles.iter().fold((0.0, 0.0), |(pv, vol), c| {
        let typical = (c.high + c.low + c.close) / 3.0;
        (pv + typical * c.volume, vol + c.volume)
    });
    if vol > 0.0 {
        pv / vol
    } else {
        0.0
    }
}

/// Mean of the last `n` closes. A shorter series yields its last close, an
/// empty one yields 0.
pub fn sma(closes: &[f64], n: usize) -> f64 {
    match closes.last() {
        None => 0.0,
        Some(&last) if n == 0 || closes.len() < n => last,
        Some(_) => closes[closes.len() - n..].iter().sum::<f64>() / n as f64,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Indicators {
    pub rsi: u8,
    pub vwap: f64,
    pub sma20: f64,
    pub sma9: f64,
}

impl Indicators {
    /// RSI and SMAs come from the daily series, VWAP from the intraday bars.
    pub fn compute(daily_closes: &[f64], intraday: &[Candle]) -> Self {
        Self {
            rsi: rsi(daily_closes),
            vwap: round2(vwap(intraday)),
            sma20: round2(sma(daily_closes, 20)),
            sma9: round2(sma(daily_closes, 9)),
        }
    }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(h: f64, l: f64, c: f64, v: f64) -> Candle {
        Candle {
            t: 0,
            open: c,
            high: h,
            low: l,
            close: c,
            volume: v,
        }
    }

    #[test]
    fn rsi_short_series_is_neutral() {
        assert_eq!(rsi(&[]), 50);
        let closes: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&closes), 50);
    }

    #[test]
    fn rsi_all_gains_is_100_and_all_losses_is_0() {
        let up: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&up), 100);
        let down: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi(&down), 0);
    }

    #[test]
    fn rsi_uses_only_the_last_14_deltas() {
        // an early crash followed by 14 straight gains
        let mut closes = vec![200.0, 100.0];
        closes.extend((1..=14).map(|i| 100.0 + i as f64));
        assert_eq!(rsi(&closes), 100);
    }

    #[test]
    fn rsi_balanced_moves_is_50() {
        let closes: Vec<f64> = (0..15)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        assert_eq!(rsi(&closes), 50);
    }

    #[test]
    fn vwap_weights_typical_price_by_volume() {
        let bars = [bar(11.0, 9.0, 10.0, 100.0), bar(21.0, 19.0, 20.0, 300.0)];
        assert!((vwap(&bars) - 17.5).abs() < 1e-9);
        assert_eq!(vwap(&[bar(11.0, 9.0, 10.0, 0.0)]), 0.0);
        assert_eq!(vwap(&[]), 0.0);
    }

    #[test]
    fn sma_degrades_on_short_history() {
        assert_eq!(sma(&[], 20), 0.0);
        assert_eq!(sma(&[1.0, 2.0, 7.0], 20), 7.0);
        assert_eq!(sma(&[1.0, 2.0, 3.0, 4.0], 2), 3.5);
    }

    #[test]
    fn compute_rounds_to_cents() {
        let daily: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 / 3.0).collect();
        let ind = Indicators::compute(&daily, &[bar(10.0, 10.0, 10.0, 5.0)]);
        assert_eq!(ind.rsi, 100);
        assert_eq!(ind.vwap, 10.0);
        assert_eq!(ind.sma9, round2(sma(&daily, 9)));
    }
}
