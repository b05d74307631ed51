#![allow(dead_code)]

use chrono::NaiveDate;
use signalfolio::domain::backtest::{BacktestConfig, SignalConfig};
use signalfolio::domain::error::SignalfolioError;
pub use signalfolio::domain::ohlcv::{OhlcvBar, PriceSeries};
use signalfolio::domain::signal::SignalThresholds;
use signalfolio::ports::data_port::DataPort;
use std::collections::HashMap;
use std::process::ExitCode;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, SignalfolioError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(SignalfolioError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(PriceSeries::new(code, bars)?)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SignalfolioError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SignalfolioError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(SignalfolioError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(code) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    }
}

/// Bars on consecutive days starting at `start_date`, one per close.
pub fn bars_from_closes(start_date: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000,
        })
        .collect()
}

pub fn make_prices(code: &str, start_date: &str, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(code, bars_from_closes(start_date, closes)).unwrap()
}

/// A wavy upward trend, so indicators move through both regimes.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| {
            let t = i as f64;
            start_price + 0.2 * t + 5.0 * (t / 7.0).sin()
        })
        .collect();
    bars_from_closes(start_date, &closes)
}

/// Small indicator periods so a few dozen bars are enough.
pub fn short_signal_config() -> SignalConfig {
    SignalConfig {
        rsi_period: 3,
        short_ma_period: 3,
        long_ma_period: 5,
        thresholds: SignalThresholds::default(),
        ..SignalConfig::default()
    }
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        start_date: date(2020, 1, 1),
        end_date: date(2024, 12, 31),
        risk_free_rate: 0.0,
        benchmark: "SPY".to_string(),
        weights: None,
        signal: short_signal_config(),
    }
}

pub fn is_success(code: ExitCode) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::SUCCESS)
}
