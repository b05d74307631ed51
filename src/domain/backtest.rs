//! Backtest engine: per-instrument pipelines fanned out over rayon, joined
//! into base and strategy portfolios.
//!
//! BacktestConfig defines the run parameters.

use crate::domain::error::{EngineError, SignalfolioError};
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::{IndicatorSeries, RsiMethod};
use crate::domain::metrics::RiskMetrics;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::portfolio::{combine, cumulative_value, EquityPoint, Weights};
use crate::domain::returns::{daily_returns, strategy_returns, ReturnSeries};
use crate::domain::signal::{generate_signals, SignalSeries, SignalThresholds};
use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, warn};

pub const BASE_PORTFOLIO: &str = "portfolio";
pub const STRATEGY_PORTFOLIO: &str = "strategy portfolio";

#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub rsi_period: usize,
    pub rsi_method: RsiMethod,
    pub short_ma_period: usize,
    pub long_ma_period: usize,
    pub thresholds: SignalThresholds,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_method: RsiMethod::Simple,
            short_ma_period: 50,
            long_ma_period: 200,
            thresholds: SignalThresholds::default(),
        }
    }
}

impl SignalConfig {
    /// Fewest bars for which every indicator period is accepted.
    pub fn min_bars(&self) -> usize {
        self.rsi_period
            .max(self.short_ma_period)
            .max(self.long_ma_period)
    }
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub risk_free_rate: f64,
    pub benchmark: String,
    /// One weight per instrument in input order; equal weight when `None`.
    pub weights: Option<Vec<f64>>,
    pub signal: SignalConfig,
}

#[derive(Debug, Clone)]
pub struct InstrumentResult {
    pub code: String,
    pub rsi: IndicatorSeries,
    pub short_ma: IndicatorSeries,
    pub long_ma: IndicatorSeries,
    pub signals: SignalSeries,
    pub daily_returns: ReturnSeries,
    pub strategy_returns: ReturnSeries,
    pub base_value: Vec<EquityPoint>,
    pub strategy_value: Vec<EquityPoint>,
    pub base_metrics: Result<RiskMetrics, EngineError>,
    pub strategy_metrics: Result<RiskMetrics, EngineError>,
}

/// An instrument whose pipeline failed and was left out of the portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentFailure {
    pub code: String,
    pub error: EngineError,
}

#[derive(Debug, Clone)]
pub struct PortfolioResult {
    pub returns: ReturnSeries,
    pub value: Vec<EquityPoint>,
    pub metrics: Result<RiskMetrics, EngineError>,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub benchmark_returns: ReturnSeries,
    pub instruments: Vec<InstrumentResult>,
    pub failures: Vec<InstrumentFailure>,
    /// Weights of the surviving instruments, in `instruments` order.
    pub weights: Weights,
    pub base: PortfolioResult,
    pub strategy: PortfolioResult,
}

/// Runs indicators, signals, returns and metrics for one instrument.
pub fn analyze_instrument(
    prices: &PriceSeries,
    benchmark_returns: &ReturnSeries,
    config: &BacktestConfig,
) -> Result<InstrumentResult, EngineError> {
    let signal = &config.signal;
    let code = prices.code();

    let rsi = calculate_rsi(prices, signal.rsi_period, signal.rsi_method)?;
    let short_ma = calculate_sma(prices, signal.short_ma_period)?;
    let long_ma = calculate_sma(prices, signal.long_ma_period)?;
    let signals = generate_signals(code, &rsi, &short_ma, &long_ma, &signal.thresholds)?;

    let daily = daily_returns(prices);
    let strategy = strategy_returns(&daily, &signals)?;

    debug!(
        code,
        bars = prices.len(),
        transitions = signals.transitions(),
        "instrument pipeline complete"
    );

    Ok(InstrumentResult {
        code: code.to_string(),
        base_value: cumulative_value(&daily),
        strategy_value: cumulative_value(&strategy),
        base_metrics: RiskMetrics::compute(&daily, benchmark_returns, config.risk_free_rate),
        strategy_metrics: RiskMetrics::compute(&strategy, benchmark_returns, config.risk_free_rate),
        rsi,
        short_ma,
        long_ma,
        signals,
        daily_returns: daily,
        strategy_returns: strategy,
    })
}

pub fn run_backtest(
    instruments: &[PriceSeries],
    benchmark: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, SignalfolioError> {
    if let Some(weights) = &config.weights {
        if weights.len() != instruments.len() {
            return Err(EngineError::InvalidParameter {
                name: "weights".into(),
                reason: format!(
                    "{} weights given for {} instruments",
                    weights.len(),
                    instruments.len()
                ),
            }
            .into());
        }
        Weights::new(weights.clone())?;
    }

    if benchmark.len() < 2 {
        return Err(EngineError::InsufficientData {
            series: benchmark.code().to_string(),
            observations: benchmark.len(),
            minimum: 2,
        }
        .into());
    }
    let benchmark_returns = daily_returns(benchmark);

    info!(
        instruments = instruments.len(),
        benchmark = benchmark.code(),
        "running backtest"
    );

    // Fan out: one independent pipeline per instrument.
    let outcomes: Vec<Result<InstrumentResult, EngineError>> = instruments
        .par_iter()
        .map(|prices| analyze_instrument(prices, &benchmark_returns, config))
        .collect();

    // Fan in.
    let mut results = Vec::with_capacity(outcomes.len());
    let mut survivors = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for (index, (prices, outcome)) in instruments.iter().zip(outcomes).enumerate() {
        match outcome {
            Ok(result) => {
                results.push(result);
                survivors.push(index);
            }
            Err(error) => {
                warn!(code = prices.code(), %error, "instrument excluded from portfolio");
                failures.push(InstrumentFailure {
                    code: prices.code().to_string(),
                    error,
                });
            }
        }
    }

    if results.is_empty() {
        return Err(SignalfolioError::NoData {
            code: instruments
                .iter()
                .map(|p| p.code())
                .collect::<Vec<_>>()
                .join(","),
        });
    }

    let weights = resolve_weights(config.weights.as_deref(), &survivors, instruments.len())?;

    let daily: Vec<&ReturnSeries> = results.iter().map(|r| &r.daily_returns).collect();
    let adjusted: Vec<&ReturnSeries> = results.iter().map(|r| &r.strategy_returns).collect();

    let base = build_portfolio(&daily, &weights, BASE_PORTFOLIO, &benchmark_returns, config)?;
    let strategy = build_portfolio(
        &adjusted,
        &weights,
        STRATEGY_PORTFOLIO,
        &benchmark_returns,
        config,
    )?;

    info!(
        included = results.len(),
        excluded = failures.len(),
        dates = base.returns.len(),
        "backtest complete"
    );

    Ok(BacktestResult {
        benchmark_returns,
        instruments: results,
        failures,
        weights,
        base,
        strategy,
    })
}

fn resolve_weights(
    configured: Option<&[f64]>,
    survivors: &[usize],
    total: usize,
) -> Result<Weights, EngineError> {
    match configured {
        None => Weights::equal(survivors.len()),
        Some(all) if survivors.len() == total => Weights::new(all.to_vec()),
        Some(all) => {
            let raw: Vec<f64> = survivors.iter().map(|&i| all[i]).collect();
            warn!(
                included = survivors.len(),
                configured = total,
                "renormalising weights over surviving instruments"
            );
            Weights::normalized(&raw)
        }
    }
}

fn build_portfolio(
    series: &[&ReturnSeries],
    weights: &Weights,
    name: &str,
    benchmark_returns: &ReturnSeries,
    config: &BacktestConfig,
) -> Result<PortfolioResult, EngineError> {
    let returns = combine(series, weights, name)?;
    let value = cumulative_value(&returns);
    let metrics = RiskMetrics::compute(&returns, benchmark_returns, config.risk_free_rate);
    if let Err(error) = &metrics {
        warn!(portfolio = name, %error, "portfolio metrics unavailable");
    }
    Ok(PortfolioResult {
        returns,
        value,
        metrics,
    })
}
