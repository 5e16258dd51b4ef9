//! Average dollar volume.
//!
//! ADV(n)[i] = sum(C[i-j] * V[i-j] for j in 0..n) / n
//! Warmup: first (n-1) bars are invalid.

use super::{rolling, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_avg_dollar_volume(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let values = rolling(bars, period, |b| b.date, |window| {
        window.iter().map(OhlcvBar::dollar_volume).sum::<f64>() / period as f64
    });

    IndicatorSeries {
        indicator_type: IndicatorType::AvgDollarVolume(period),
        values,
    }
}
