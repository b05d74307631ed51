//! Instrument universe: code list parsing and data validation.
//!
//! Parses code lists from configuration and checks that each code has
//! enough bars for the configured indicator periods.

use crate::domain::error::SignalfolioError;
use crate::domain::ohlcv::PriceSeries;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
}

pub struct UniverseValidationResult {
    /// Price series of the accepted codes, in request order.
    pub prices: Vec<PriceSeries>,
    pub skipped: Vec<SkippedCode>,
}

impl UniverseValidationResult {
    pub fn codes(&self) -> Vec<&str> {
        self.prices.iter().map(|p| p.code()).collect()
    }
}

/// Fetches each code, keeping those with at least `min_bars` bars.
pub fn validate_universe(
    data_port: &dyn DataPort,
    codes: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
    min_bars: usize,
) -> Result<UniverseValidationResult, SignalfolioError> {
    let mut prices = Vec::with_capacity(codes.len());
    let mut skipped = Vec::new();

    for code in codes {
        let series = match data_port.fetch_prices(code, start_date, end_date) {
            Ok(series) => series,
            Err(error) => {
                warn!(code = code.as_str(), %error, "skipping code");
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        if series.is_empty() {
            warn!(code = code.as_str(), "skipping code: no data in range");
            skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        if series.len() < min_bars {
            warn!(
                code = code.as_str(),
                bars = series.len(),
                minimum = min_bars,
                "skipping code: insufficient bars"
            );
            skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::InsufficientBars { bars: series.len() },
            });
            continue;
        }

        info!(code = code.as_str(), bars = series.len(), "code accepted");
        prices.push(series);
    }

    if prices.is_empty() {
        return Err(SignalfolioError::NoData {
            code: codes.join(","),
        });
    }

    if !skipped.is_empty() {
        info!(
            accepted = prices.len(),
            requested = codes.len(),
            "continuing with partial universe"
        );
    }

    Ok(UniverseValidationResult { prices, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_basic() {
        let result = parse_codes("AAPL,MSFT,GOOG,AMZN").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "GOOG", "AMZN"]);
    }

    #[test]
    fn test_parse_codes_with_whitespace() {
        let result = parse_codes("  AAPL , MSFT ,GOOG,  AMZN  ").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "GOOG", "AMZN"]);
    }

    #[test]
    fn test_parse_codes_uppercase() {
        let result = parse_codes("aapl,msft,goog").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "GOOG"]);
    }

    #[test]
    fn test_parse_codes_single() {
        let result = parse_codes("AAPL").unwrap();
        assert_eq!(result, vec!["AAPL"]);
    }

    #[test]
    fn test_parse_codes_empty_token() {
        let result = parse_codes("AAPL,,MSFT");
        assert!(matches!(result, Err(UniverseError::EmptyToken)));
    }

    #[test]
    fn test_parse_codes_duplicate() {
        let result = parse_codes("AAPL,MSFT,aapl");
        assert!(matches!(result, Err(UniverseError::DuplicateCode(s)) if s == "AAPL"));
    }
}
