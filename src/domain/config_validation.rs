//! Configuration validation.
//!
//! Validates all config fields before a backtest runs.

use crate::domain::error::SignalfolioError;
use crate::domain::indicator::RsiMethod;
use crate::domain::portfolio::Weights;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SignalfolioError> {
    validate_run_settings(config)?;
    let code_count = validate_codes(config)?;
    validate_weights(config, code_count)?;
    Ok(())
}

/// Checks the `[backtest]` keys that apply to any code list: rate, dates and benchmark.
pub fn validate_run_settings(config: &dyn ConfigPort) -> Result<(), SignalfolioError> {
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    validate_benchmark(config)
}

pub fn validate_signal_config(config: &dyn ConfigPort) -> Result<(), SignalfolioError> {
    validate_period(config, "rsi_period", 14)?;
    let short = validate_period(config, "short_ma", 50)?;
    let long = validate_period(config, "long_ma", 200)?;
    if short >= long {
        return Err(invalid("signal", "short_ma", "short_ma must be less than long_ma"));
    }
    validate_rsi_method(config)?;
    validate_thresholds(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SignalfolioError {
    SignalfolioError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> SignalfolioError {
    SignalfolioError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), SignalfolioError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SignalfolioError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, SignalfolioError> {
    match value {
        None => Err(missing("backtest", field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_benchmark(config: &dyn ConfigPort) -> Result<(), SignalfolioError> {
    match config.get_string("backtest", "benchmark") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(missing("backtest", "benchmark")),
    }
}

/// Returns the number of configured codes.
fn validate_codes(config: &dyn ConfigPort) -> Result<usize, SignalfolioError> {
    let raw = match (
        config.get_string("backtest", "codes"),
        config.get_string("backtest", "code"),
    ) {
        (Some(c), _) if !c.trim().is_empty() => c,
        (None, Some(c)) if !c.trim().is_empty() => c,
        _ => return Err(missing("backtest", "codes")),
    };

    parse_codes(&raw)
        .map(|codes| codes.len())
        .map_err(|e| invalid("backtest", "codes", e.to_string()))
}

/// Parses the optional `weights` list into raw values.
pub fn parse_weights(config: &dyn ConfigPort) -> Result<Option<Vec<f64>>, SignalfolioError> {
    let Some(items) = config.get_list("backtest", "weights") else {
        return Ok(None);
    };
    if items.len() == 1 && items[0].is_empty() {
        return Ok(None);
    }
    items
        .iter()
        .map(|item| {
            item.parse::<f64>()
                .map_err(|_| invalid("backtest", "weights", format!("'{item}' is not a number")))
        })
        .collect::<Result<Vec<f64>, _>>()
        .map(Some)
}

fn validate_weights(config: &dyn ConfigPort, code_count: usize) -> Result<(), SignalfolioError> {
    let Some(weights) = parse_weights(config)? else {
        return Ok(());
    };
    if weights.len() != code_count {
        return Err(invalid(
            "backtest",
            "weights",
            format!("{} weights given for {} codes", weights.len(), code_count),
        ));
    }
    Weights::new(weights).map_err(|e| invalid("backtest", "weights", e.to_string()))?;
    Ok(())
}

fn validate_period(
    config: &dyn ConfigPort,
    key: &str,
    default: i64,
) -> Result<usize, SignalfolioError> {
    let value = config.get_int("signal", key, default);
    if value < 1 {
        return Err(invalid("signal", key, format!("{key} must be at least 1")));
    }
    Ok(value as usize)
}

fn validate_rsi_method(config: &dyn ConfigPort) -> Result<(), SignalfolioError> {
    if let Some(method) = config.get_string("signal", "rsi_method") {
        method
            .parse::<RsiMethod>()
            .map_err(|reason| invalid("signal", "rsi_method", reason))?;
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), SignalfolioError> {
    let oversold = config.get_double("signal", "oversold", 30.0);
    let overbought = config.get_double("signal", "overbought", 70.0);

    if !(0.0..=100.0).contains(&oversold) {
        return Err(invalid("signal", "oversold", "oversold must be between 0 and 100"));
    }
    if !(0.0..=100.0).contains(&overbought) {
        return Err(invalid(
            "signal",
            "overbought",
            "overbought must be between 0 and 100",
        ));
    }
    if oversold >= overbought {
        return Err(invalid(
            "signal",
            "oversold",
            "oversold must be below overbought",
        ));
    }
    Ok(())
}
