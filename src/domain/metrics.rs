//! Performance and risk statistics over daily return series.
//!
//! All statistics use the defined values of a [`ReturnSeries`], sample
//! (n - 1) moments, and 252 trading days per year.

use super::error::EngineError;
use super::portfolio::{cumulative_value, EquityPoint};
use super::returns::ReturnSeries;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Variances at or below this are treated as zero.
const MIN_VARIANCE: f64 = 1e-20;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskMetrics {
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub beta: f64,
    /// Simple sum of daily returns, not compounded.
    pub cumulative_return: f64,
}

impl RiskMetrics {
    pub fn compute(
        returns: &ReturnSeries,
        benchmark: &ReturnSeries,
        risk_free_rate: f64,
    ) -> Result<Self, EngineError> {
        Ok(RiskMetrics {
            annualized_return: annualized_return(returns)?,
            annualized_volatility: annualized_volatility(returns)?,
            sharpe_ratio: sharpe_ratio(returns, risk_free_rate)?,
            max_drawdown: max_drawdown(returns)?,
            beta: beta(returns, benchmark)?,
            cumulative_return: cumulative_return(returns)?,
        })
    }
}

/// `mean(R) * 252`
pub fn annualized_return(returns: &ReturnSeries) -> Result<f64, EngineError> {
    let values = non_empty(returns)?;
    Ok(mean(&values) * TRADING_DAYS_PER_YEAR)
}

/// `stdev(R) * sqrt(252)`
pub fn annualized_volatility(returns: &ReturnSeries) -> Result<f64, EngineError> {
    let values = non_empty(returns)?;
    let variance = sample_variance(&returns.name, &values)?;
    Ok(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt())
}

/// `(mean(R) - rf/252) / stdev(R) * sqrt(252)`
///
/// The annual risk-free rate is scaled to a daily rate before it is
/// subtracted from the mean daily return.
pub fn sharpe_ratio(returns: &ReturnSeries, risk_free_rate: f64) -> Result<f64, EngineError> {
    let values = non_empty(returns)?;
    let variance = sample_variance(&returns.name, &values)?;
    if variance <= MIN_VARIANCE {
        return Err(EngineError::DegenerateVariance {
            series: returns.name.clone(),
        });
    }

    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let excess_return = mean(&values) - daily_rf;
    Ok(excess_return / variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Largest peak-to-trough decline of the cumulative value, as a fraction
/// of the peak.
pub fn max_drawdown(returns: &ReturnSeries) -> Result<f64, EngineError> {
    non_empty(returns)?;
    Ok(compute_drawdown(&cumulative_value(returns)))
}

/// `cov(R, B) / var(B)` over the dates both series define.
pub fn beta(returns: &ReturnSeries, benchmark: &ReturnSeries) -> Result<f64, EngineError> {
    let bench: BTreeMap<NaiveDate, f64> = benchmark.defined().collect();
    let (r, b): (Vec<f64>, Vec<f64>) = returns
        .defined()
        .filter_map(|(date, v)| bench.get(&date).map(|&bv| (v, bv)))
        .unzip();

    if r.len() < 2 {
        return Err(EngineError::InsufficientOverlap {
            left: returns.name.clone(),
            right: benchmark.name.clone(),
            common: r.len(),
        });
    }

    let benchmark_variance = covariance(&b, &b);
    if benchmark_variance <= MIN_VARIANCE {
        return Err(EngineError::DegenerateVariance {
            series: benchmark.name.clone(),
        });
    }

    Ok(covariance(&r, &b) / benchmark_variance)
}

/// `sum(R)`
pub fn cumulative_return(returns: &ReturnSeries) -> Result<f64, EngineError> {
    let values = non_empty(returns)?;
    Ok(values.iter().sum())
}

fn non_empty(returns: &ReturnSeries) -> Result<Vec<f64>, EngineError> {
    let values = returns.defined_values();
    if values.is_empty() {
        return Err(EngineError::EmptySeries {
            series: returns.name.clone(),
        });
    }
    Ok(values)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_variance(name: &str, values: &[f64]) -> Result<f64, EngineError> {
    if values.len() < 2 {
        return Err(EngineError::InsufficientData {
            series: name.to_string(),
            observations: values.len(),
            minimum: 2,
        });
    }
    Ok(covariance(values, values))
}

/// Sample covariance of two equally long slices with at least two values.
fn covariance(x: &[f64], y: &[f64]) -> f64 {
    let mean_x = mean(x);
    let mean_y = mean(y);
    let sum: f64 = x
        .iter()
        .zip(y)
        .map(|(a, b)| (a - mean_x) * (b - mean_y))
        .sum();
    sum / (x.len() - 1) as f64
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}
