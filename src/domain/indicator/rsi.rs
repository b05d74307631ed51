//! RSI (Relative Strength Index) indicator implementation.
//!
//! Average gain and loss are taken over the trailing `period` close-to-close
//! changes, either as a plain window mean ([`RsiMethod::Simple`]) or with
//! Wilder's smoothing ([`RsiMethod::Wilder`]):
//! - First average: simple mean of gains/losses over first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, or 50 when avg_gain is also 0 (flat window).
//!
//! Warmup: first n bars are invalid (need n price changes to compute initial average).

use crate::domain::error::EngineError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, RsiMethod};
use crate::domain::indicator_helpers::{check_period, rsi_from_averages};
use crate::domain::ohlcv::PriceSeries;

pub fn calculate_rsi(
    prices: &PriceSeries,
    period: usize,
    method: RsiMethod,
) -> Result<IndicatorSeries, EngineError> {
    let indicator_type = IndicatorType::Rsi(period);
    check_period(&indicator_type, period, prices.len())?;

    let bars = prices.bars();
    let closes = prices.closes();

    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let mut values: Vec<IndicatorPoint> = bars[..period]
        .iter()
        .map(|b| IndicatorPoint::warmup(b.date))
        .collect();
    values.reserve(bars.len() - period);

    let n = period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, bar) in bars.iter().enumerate().skip(period) {
        // Changes into bars (i - period + 1)..=i.
        let window = (i - period)..i;

        match method {
            RsiMethod::Simple => {
                avg_gain = gains[window.clone()].iter().sum::<f64>() / n;
                avg_loss = losses[window].iter().sum::<f64>() / n;
            }
            RsiMethod::Wilder if i == period => {
                avg_gain = gains[window.clone()].iter().sum::<f64>() / n;
                avg_loss = losses[window].iter().sum::<f64>() / n;
            }
            RsiMethod::Wilder => {
                avg_gain = (avg_gain * (n - 1.0) + gains[i - 1]) / n;
                avg_loss = (avg_loss * (n - 1.0) + losses[i - 1]) / n;
            }
        }

        values.push(IndicatorPoint::defined(
            bar.date,
            rsi_from_averages(avg_gain, avg_loss),
        ));
    }

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}
