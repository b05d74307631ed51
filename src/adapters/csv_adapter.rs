//! CSV file price data adapter.
//!
//! Each instrument lives in `<base_path>/<CODE>.csv` with the header
//! `date,open,high,low,close,volume` and ISO dates.

use crate::domain::error::SignalfolioError;
use crate::domain::ohlcv::{OhlcvBar, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    fn read_bars(&self, code: &str) -> Result<Vec<OhlcvBar>, SignalfolioError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| SignalfolioError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| SignalfolioError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = field(&record, 0, "date")?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                SignalfolioError::Data {
                    reason: format!("invalid date format '{}': {}", date_str, e),
                }
            })?;

            bars.push(OhlcvBar {
                date,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_volume(field(&record, 5, "volume")?)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<&'r str, SignalfolioError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| SignalfolioError::Data {
            reason: format!("missing {} column", name),
        })
}

fn parse_field<T>(record: &csv::StringRecord, index: usize, name: &str) -> Result<T, SignalfolioError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    field(record, index, name)?
        .parse()
        .map_err(|e: T::Err| SignalfolioError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

/// Volumes are sometimes exported as floats (`1.2e6`).
fn parse_volume(value: &str) -> Result<i64, SignalfolioError> {
    value
        .parse::<i64>()
        .or_else(|_| value.parse::<f64>().map(|v| v as i64))
        .map_err(|e| SignalfolioError::Data {
            reason: format!("invalid volume value: {}", e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, SignalfolioError> {
        let bars = self
            .read_bars(code)?
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect();
        Ok(PriceSeries::new(code, bars)?)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SignalfolioError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SignalfolioError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| SignalfolioError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(code) = name_str.strip_suffix(".csv") {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SignalfolioError> {
        if !self.csv_path(code).exists() {
            return Ok(None);
        }
        let bars = self.read_bars(code)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
