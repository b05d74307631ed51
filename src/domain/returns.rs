//! Daily and strategy-adjusted return series.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::SignalSeries;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    /// Simple return for the date; `None` where no prior close exists.
    pub value: Option<f64>,
}

/// Named sequence of dated simple returns.
///
/// The name identifies the series in errors: a ticker code for instrument
/// returns, or a label such as `portfolio` for aggregated series.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    pub name: String,
    pub values: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn new(name: impl Into<String>, values: Vec<ReturnPoint>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Builds a fully defined series from `(date, value)` pairs.
    pub fn from_pairs(name: impl Into<String>, pairs: &[(NaiveDate, f64)]) -> Self {
        Self::new(
            name,
            pairs
                .iter()
                .map(|&(date, value)| ReturnPoint {
                    date,
                    value: Some(value),
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Dated values, skipping undefined entries.
    pub fn defined(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values
            .iter()
            .filter_map(|p| p.value.map(|v| (p.date, v)))
    }

    pub fn defined_values(&self) -> Vec<f64> {
        self.defined().map(|(_, v)| v).collect()
    }
}

/// `close[t] / close[t-1] - 1`, undefined on the first date.
pub fn daily_returns(prices: &PriceSeries) -> ReturnSeries {
    let bars = prices.bars();
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| ReturnPoint {
            date: bar.date,
            value: (i > 0).then(|| bar.close / bars[i - 1].close - 1.0),
        })
        .collect();

    ReturnSeries::new(prices.code(), values)
}

/// Multiplies each day's return by that day's signal.
///
/// LONG passes the return through, SHORT negates it, FLAT zeroes it.
/// Both series must cover the same dates in the same order.
pub fn strategy_returns(
    daily: &ReturnSeries,
    signals: &SignalSeries,
) -> Result<ReturnSeries, EngineError> {
    let aligned = daily.len() == signals.len()
        && daily
            .values
            .iter()
            .zip(&signals.values)
            .all(|(r, s)| r.date == s.date);
    if !aligned {
        return Err(EngineError::MisalignedSeries {
            series: format!("{} returns, {} signals", daily.name, signals.code),
        });
    }

    let values = daily
        .values
        .iter()
        .zip(&signals.values)
        .map(|(r, s)| ReturnPoint {
            date: r.date,
            value: r.value.map(|v| s.signal.factor() * v),
        })
        .collect();

    Ok(ReturnSeries::new(daily.name.clone(), values))
}
