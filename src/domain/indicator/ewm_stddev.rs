//! Exponentially weighted standard deviation of close.
//!
//! Over a trailing window of n closes (oldest first), the observation
//! j steps back from the newest gets raw weight decay^j. Weights are
//! normalized to sum to 1:
//!   mean = sum(w * C)
//!   EWMSTD = sqrt(sum(w * (C - mean)^2))
//! With decay = 1 this is the population standard deviation.
//! Warmup: first (n-1) bars are invalid.

use super::{rolling, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ewm_stddev(bars: &[OhlcvBar], window: usize, decay_rate: f64) -> IndicatorSeries {
    let weights = normalized_weights(window, decay_rate);

    let values = rolling(bars, window, |b| b.date, |w| {
        let mean: f64 = w.iter().zip(&weights).map(|(b, wt)| wt * b.close).sum();
        let variance: f64 = w
            .iter()
            .zip(&weights)
            .map(|(b, wt)| {
                let diff = b.close - mean;
                wt * diff * diff
            })
            .sum();
        variance.max(0.0).sqrt()
    });

    IndicatorSeries {
        indicator_type: IndicatorType::EwmStddev {
            window,
            decay_x1000: (decay_rate * 1000.0).round() as u32,
        },
        values,
    }
}

/// Weights ordered oldest to newest, summing to 1.
fn normalized_weights(window: usize, decay_rate: f64) -> Vec<f64> {
    let raw: Vec<f64> = (0..window)
        .map(|i| decay_rate.powi((window - 1 - i) as i32))
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}
