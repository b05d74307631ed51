//! SMA (Simple Moving Average) indicator.
//!
//! Arithmetic mean of the trailing `period` closes ending at each bar.
//! Warmup: first `period - 1` bars are invalid.

use crate::domain::error::EngineError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::indicator_helpers::check_period;
use crate::domain::ohlcv::PriceSeries;

pub fn calculate_sma(prices: &PriceSeries, period: usize) -> Result<IndicatorSeries, EngineError> {
    let indicator_type = IndicatorType::Sma(period);
    check_period(&indicator_type, period, prices.len())?;

    let bars = prices.bars();
    let closes = prices.closes();
    let mut values = Vec::with_capacity(bars.len());

    values.extend(bars[..period - 1].iter().map(|b| IndicatorPoint::warmup(b.date)));
    values.extend(
        closes
            .windows(period)
            .zip(&bars[period - 1..])
            .map(|(window, bar)| {
                let mean = window.iter().sum::<f64>() / period as f64;
                IndicatorPoint::defined(bar.date, mean)
            }),
    );

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}
