//! Shared helper functions for indicator calculations.

use crate::domain::error::EngineError;
use crate::domain::indicator::IndicatorType;

/// Rejects a period of zero or one longer than the series.
pub fn check_period(
    indicator: &IndicatorType,
    period: usize,
    series_len: usize,
) -> Result<(), EngineError> {
    if period == 0 {
        return Err(EngineError::InvalidParameter {
            name: indicator.to_string(),
            reason: "period must be positive".into(),
        });
    }
    if period > series_len {
        return Err(EngineError::InvalidParameter {
            name: indicator.to_string(),
            reason: format!("period {period} exceeds series length {series_len}"),
        });
    }
    Ok(())
}

/// Maps average gain and loss onto the 0..=100 RSI scale.
///
/// A window with no losses reads 100, unless it also has no gains, in
/// which case the market was flat and the RSI is 50.
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
