//! Simple moving average of close.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) bars are invalid.

use super::{rolling, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let values = rolling(bars, period, |b| b.date, |window| {
        window.iter().map(|b| b.close).sum::<f64>() / period as f64
    });

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
