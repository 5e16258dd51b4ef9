//! CSV file data adapter.
//!
//! Directory layout:
//! - `securities.csv` with header `asset_id,security_type`
//! - `<ASSET>.csv` per asset with header `date,open,high,low,close,volume`

use crate::domain::error::SellgapError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::{Asset, SecurityType};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub const SECURITIES_FILE: &str = "securities.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, asset_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", asset_id))
    }
}

fn field<'r>(record: &'r StringRecord, idx: usize, name: &str) -> Result<&'r str, SellgapError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| SellgapError::data(format!("missing {} column", name)))
}

fn price(record: &StringRecord, idx: usize, name: &str) -> Result<f64, SellgapError> {
    field(record, idx, name)?
        .parse()
        .map_err(|e| SellgapError::data(format!("invalid {} value: {}", name, e)))
}

/// Volumes are whole shares, but some vendors write them as `1234.0`.
fn volume(record: &StringRecord, idx: usize) -> Result<i64, SellgapError> {
    let raw = field(record, idx, "volume")?;
    raw.parse::<i64>()
        .or_else(|_| raw.parse::<f64>().map(|v| v as i64))
        .map_err(|e| SellgapError::data(format!("invalid volume value: {}", e)))
}

impl DataPort for CsvAdapter {
    fn list_assets(&self) -> Result<Vec<Asset>, SellgapError> {
        let path = self.base_path.join(SECURITIES_FILE);
        let content = fs::read_to_string(&path).map_err(|e| {
            SellgapError::data(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut assets = Vec::new();
        for result in rdr.records() {
            let record =
                result.map_err(|e| SellgapError::data(format!("CSV parse error: {}", e)))?;
            let id = field(&record, 0, "asset_id")?;
            if id.is_empty() {
                continue;
            }
            let security_type = SecurityType::parse(field(&record, 1, "security_type")?);
            assets.push(Asset::new(id, security_type));
        }

        debug!("{} assets listed in {}", assets.len(), path.display());
        Ok(assets)
    }

    fn fetch_ohlcv(
        &self,
        asset_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SellgapError> {
        let path = self.csv_path(asset_id);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SellgapError::NoData {
                    asset: asset_id.to_string(),
                });
            }
            Err(e) => {
                return Err(SellgapError::data(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record =
                result.map_err(|e| SellgapError::data(format!("CSV parse error: {}", e)))?;

            let date = NaiveDate::parse_from_str(field(&record, 0, "date")?, "%Y-%m-%d")
                .map_err(|e| SellgapError::data(format!("invalid date format: {}", e)))?;
            if date < start_date || date > end_date {
                continue;
            }

            bars.push(OhlcvBar {
                asset_id: asset_id.to_string(),
                date,
                open: price(&record, 1, "open")?,
                high: price(&record, 2, "high")?,
                low: price(&record, 3, "low")?,
                close: price(&record, 4, "close")?,
                volume: volume(&record, 5)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}
