//! Rolling factor statistics over daily bars.
//!
//! Each calculator produces an `IndicatorSeries` aligned with the input
//! bars; points inside the warmup window are marked invalid. The factor
//! engine only consumes the latest point of each series.
//!
//! `percentile` is the odd one out: it ranks one value per asset across
//! the universe rather than along time.

pub mod dollar_volume;
pub mod ewm_stddev;
pub mod percentile;
pub mod sma;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    EwmStddev { window: usize, decay_x1000: u32 },
    AvgDollarVolume(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Value at the last bar, if that point is past warmup.
    pub fn latest(&self) -> Option<f64> {
        self.values
            .last()
            .filter(|p| p.valid && p.value.is_finite())
            .map(|p| p.value)
    }
}

/// Shared windowed driver: `f` sees each full trailing window of `period` bars.
pub(crate) fn rolling<T, F>(
    items: &[T],
    period: usize,
    date_of: impl Fn(&T) -> NaiveDate,
    f: F,
) -> Vec<IndicatorPoint>
where
    F: Fn(&[T]) -> f64,
{
    let warmup = period.saturating_sub(1);
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let valid = period > 0 && i >= warmup;
            let value = if valid { f(&items[i + 1 - period..=i]) } else { 0.0 };
            IndicatorPoint {
                date: date_of(item),
                valid,
                value,
            }
        })
        .collect()
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::EwmStddev {
                window,
                decay_x1000,
            } => {
                let decay = *decay_x1000 as f64 / 1000.0;
                write!(f, "EWMSTD({},{})", window, decay)
            }
            IndicatorType::AvgDollarVolume(period) => write!(f, "ADV({})", period),
        }
    }
}
