//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorType`: Indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values aligned to price dates

pub mod rsi;
pub mod sma;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    pub fn warmup(date: NaiveDate) -> Self {
        Self {
            date,
            valid: false,
            value: 0.0,
        }
    }

    pub fn defined(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            valid: true,
            value,
        }
    }

    /// The value, or `None` during warm-up.
    pub fn get(&self) -> Option<f64> {
        self.valid.then_some(self.value)
    }
}

/// Averaging scheme for RSI gains and losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RsiMethod {
    /// Plain mean over the trailing window.
    #[default]
    Simple,
    /// Wilder's recursive smoothing seeded by the first simple mean.
    Wilder,
}

impl std::str::FromStr for RsiMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(RsiMethod::Simple),
            "wilder" => Ok(RsiMethod::Wilder),
            other => Err(format!("unknown RSI method '{other}' (expected simple or wilder)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Rsi(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(IndicatorPoint::get)
    }

    /// Number of leading points still in warm-up.
    pub fn warmup_len(&self) -> usize {
        self.values.iter().take_while(|p| !p.valid).count()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(50).to_string(), "SMA(50)");
    }

    #[test]
    fn indicator_type_display_rsi() {
        assert_eq!(IndicatorType::Rsi(14).to_string(), "RSI(14)");
    }

    #[test]
    fn point_get_hides_warmup_value() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(IndicatorPoint::warmup(date).get(), None);
        assert_eq!(IndicatorPoint::defined(date, 42.0).get(), Some(42.0));
    }

    #[test]
    fn rsi_method_parses_case_insensitively() {
        assert_eq!("Simple".parse::<RsiMethod>().unwrap(), RsiMethod::Simple);
        assert_eq!(" WILDER ".parse::<RsiMethod>().unwrap(), RsiMethod::Wilder);
        assert!("ema".parse::<RsiMethod>().is_err());
    }

    #[test]
    fn warmup_len_counts_leading_invalid_points() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Sma(3),
            values: vec![
                IndicatorPoint::warmup(d(1)),
                IndicatorPoint::warmup(d(2)),
                IndicatorPoint::defined(d(3), 10.0),
            ],
        };
        assert_eq!(series.warmup_len(), 2);
        assert_eq!(series.value_at(2), Some(10.0));
        assert_eq!(series.value_at(5), None);
    }
}
