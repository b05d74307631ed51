//! OHLCV bars and validated price series.

use crate::domain::error::EngineError;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Daily bars for one instrument, keyed by ticker code.
///
/// Dates are strictly increasing and every close is finite and positive.
/// The series cannot be mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    code: String,
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    pub fn new(code: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, EngineError> {
        let code = code.into();

        for (i, bar) in bars.iter().enumerate() {
            if !bar.close.is_finite() || bar.close <= 0.0 {
                return Err(EngineError::InvalidSeries {
                    series: code,
                    reason: format!("close on {} must be positive, got {}", bar.date, bar.close),
                });
            }
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(EngineError::InvalidSeries {
                    series: code,
                    reason: format!(
                        "dates must be strictly increasing ({} follows {})",
                        bar.date,
                        bars[i - 1].date
                    ),
                });
            }
        }

        Ok(Self { code, bars })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|b| b.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// First and last date, if any bars exist.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        }
    }
}
