//! Position signals derived from RSI and moving-average indicators.
//!
//! Each date is classified by a priority cascade (first match wins):
//!
//! 1. RSI below the oversold threshold → LONG
//! 2. RSI above the overbought threshold → SHORT
//! 3. short MA above long MA → LONG
//! 4. short MA below long MA → SHORT
//! 5. anything else → undefined
//!
//! RSI extremes always outrank the moving-average trend. Undefined dates take
//! the last defined signal; dates before the first defined signal are FLAT.

use crate::domain::error::EngineError;
use crate::domain::indicator::IndicatorSeries;
use chrono::NaiveDate;

/// Position held on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    Long = 1,
    Short = -1,
    #[default]
    Flat = 0,
}

impl Signal {
    /// Multiplier applied to the day's return.
    pub fn factor(self) -> f64 {
        self as i8 as f64
    }
}

/// RSI bands that override the moving-average trend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalThresholds {
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalSeries {
    pub code: String,
    pub values: Vec<SignalPoint>,
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of dates on which the signal differs from the previous date.
    pub fn transitions(&self) -> usize {
        self.values
            .windows(2)
            .filter(|w| w[0].signal != w[1].signal)
            .count()
    }
}

/// Applies the priority cascade to one date's indicator readings.
pub fn classify(
    rsi: Option<f64>,
    short_ma: Option<f64>,
    long_ma: Option<f64>,
    thresholds: &SignalThresholds,
) -> Option<Signal> {
    match (rsi, short_ma, long_ma) {
        (Some(r), _, _) if r < thresholds.oversold => Some(Signal::Long),
        (Some(r), _, _) if r > thresholds.overbought => Some(Signal::Short),
        (_, Some(s), Some(l)) if s > l => Some(Signal::Long),
        (_, Some(s), Some(l)) if s < l => Some(Signal::Short),
        _ => None,
    }
}

/// Carries the last defined signal over undefined entries, starting FLAT.
pub fn forward_fill(raw: &[Option<Signal>]) -> Vec<Signal> {
    let (_, filled) = raw.iter().fold(
        (Signal::Flat, Vec::with_capacity(raw.len())),
        |(last, mut out), current| {
            let next = current.unwrap_or(last);
            out.push(next);
            (next, out)
        },
    );
    filled
}

/// Builds the total signal series for one instrument.
///
/// All three indicator series must cover the same dates in the same order.
pub fn generate_signals(
    code: &str,
    rsi: &IndicatorSeries,
    short_ma: &IndicatorSeries,
    long_ma: &IndicatorSeries,
    thresholds: &SignalThresholds,
) -> Result<SignalSeries, EngineError> {
    let aligned = rsi.len() == short_ma.len()
        && rsi.len() == long_ma.len()
        && rsi
            .values
            .iter()
            .zip(&short_ma.values)
            .zip(&long_ma.values)
            .all(|((r, s), l)| r.date == s.date && r.date == l.date);
    if !aligned {
        return Err(EngineError::MisalignedSeries {
            series: format!(
                "{code} {}, {code} {}, {code} {}",
                rsi.indicator_type, short_ma.indicator_type, long_ma.indicator_type
            ),
        });
    }

    let raw: Vec<Option<Signal>> = rsi
        .values
        .iter()
        .zip(&short_ma.values)
        .zip(&long_ma.values)
        .map(|((r, s), l)| classify(r.get(), s.get(), l.get(), thresholds))
        .collect();

    let values = rsi
        .values
        .iter()
        .zip(forward_fill(&raw))
        .map(|(point, signal)| SignalPoint {
            date: point.date,
            signal,
        })
        .collect();

    Ok(SignalSeries {
        code: code.to_string(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{IndicatorPoint, IndicatorType};
    use proptest::prelude::*;

    fn t() -> SignalThresholds {
        SignalThresholds::default()
    }

    fn series(indicator_type: IndicatorType, values: &[Option<f64>]) -> IndicatorSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        IndicatorSeries {
            indicator_type,
            values: values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let date = start + chrono::Duration::days(i as i64);
                    match v {
                        Some(v) => IndicatorPoint::defined(date, *v),
                        None => IndicatorPoint::warmup(date),
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn signal_factor() {
        assert_eq!(Signal::Long.factor(), 1.0);
        assert_eq!(Signal::Short.factor(), -1.0);
        assert_eq!(Signal::Flat.factor(), 0.0);
    }

    #[test]
    fn oversold_rsi_is_long() {
        assert_eq!(classify(Some(25.0), None, None, &t()), Some(Signal::Long));
    }

    #[test]
    fn overbought_rsi_is_short() {
        assert_eq!(classify(Some(75.0), None, None, &t()), Some(Signal::Short));
    }

    #[test]
    fn rsi_extreme_overrides_ma_trend() {
        // MA says short, RSI oversold says long.
        assert_eq!(
            classify(Some(20.0), Some(90.0), Some(100.0), &t()),
            Some(Signal::Long)
        );
        // MA says long, RSI overbought says short.
        assert_eq!(
            classify(Some(80.0), Some(110.0), Some(100.0), &t()),
            Some(Signal::Short)
        );
    }

    #[test]
    fn neutral_rsi_defers_to_ma() {
        assert_eq!(
            classify(Some(50.0), Some(110.0), Some(100.0), &t()),
            Some(Signal::Long)
        );
        assert_eq!(
            classify(Some(50.0), Some(90.0), Some(100.0), &t()),
            Some(Signal::Short)
        );
    }

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(classify(Some(30.0), None, None, &t()), None);
        assert_eq!(classify(Some(70.0), None, None, &t()), None);
    }

    #[test]
    fn equal_averages_are_undefined() {
        assert_eq!(classify(Some(50.0), Some(100.0), Some(100.0), &t()), None);
    }

    #[test]
    fn warmup_ma_without_rsi_is_undefined() {
        assert_eq!(classify(None, Some(110.0), None, &t()), None);
        assert_eq!(classify(None, None, None, &t()), None);
    }

    #[test]
    fn ma_rules_apply_while_rsi_warms_up() {
        assert_eq!(
            classify(None, Some(110.0), Some(100.0), &t()),
            Some(Signal::Long)
        );
    }

    #[test]
    fn custom_thresholds() {
        let narrow = SignalThresholds {
            oversold: 45.0,
            overbought: 55.0,
        };
        assert_eq!(classify(Some(44.0), None, None, &narrow), Some(Signal::Long));
        assert_eq!(classify(Some(56.0), None, None, &narrow), Some(Signal::Short));
    }

    #[test]
    fn forward_fill_leading_undefined_is_flat() {
        let raw = [None, None, Some(Signal::Long), None, Some(Signal::Short), None];
        assert_eq!(
            forward_fill(&raw),
            vec![
                Signal::Flat,
                Signal::Flat,
                Signal::Long,
                Signal::Long,
                Signal::Short,
                Signal::Short,
            ]
        );
    }

    #[test]
    fn forward_fill_empty() {
        assert!(forward_fill(&[]).is_empty());
    }

    #[test]
    fn generate_signals_fills_warmup_and_gaps() {
        let rsi = series(IndicatorType::Rsi(2), &[None, None, Some(50.0), Some(20.0), Some(50.0)]);
        let short = series(IndicatorType::Sma(1), &[Some(1.0), Some(2.0), Some(3.0), Some(3.0), Some(3.0)]);
        let long = series(IndicatorType::Sma(2), &[None, Some(1.5), Some(2.5), Some(3.0), Some(3.0)]);

        let signals = generate_signals("AAPL", &rsi, &short, &long, &t()).unwrap();
        let got: Vec<Signal> = signals.values.iter().map(|p| p.signal).collect();
        assert_eq!(
            got,
            vec![
                Signal::Flat,
                Signal::Long,
                Signal::Long,
                Signal::Long,
                Signal::Long,
            ]
        );
        assert_eq!(signals.code, "AAPL");
        assert_eq!(signals.values[0].date, rsi.values[0].date);
    }

    #[test]
    fn generate_signals_counts_transitions() {
        let rsi = series(IndicatorType::Rsi(1), &[Some(50.0), Some(80.0), Some(50.0), Some(10.0)]);
        let short = series(IndicatorType::Sma(1), &[Some(2.0), Some(2.0), Some(2.0), Some(2.0)]);
        let long = series(IndicatorType::Sma(2), &[Some(1.0), Some(1.0), Some(1.0), Some(1.0)]);

        let signals = generate_signals("MSFT", &rsi, &short, &long, &t()).unwrap();
        let got: Vec<Signal> = signals.values.iter().map(|p| p.signal).collect();
        assert_eq!(got, vec![Signal::Long, Signal::Short, Signal::Long, Signal::Long]);
        assert_eq!(signals.transitions(), 2);
    }

    #[test]
    fn generate_signals_rejects_misaligned_inputs() {
        let rsi = series(IndicatorType::Rsi(2), &[None, None, Some(50.0)]);
        let short = series(IndicatorType::Sma(1), &[Some(1.0), Some(2.0)]);
        let long = series(IndicatorType::Sma(2), &[None, Some(1.5), Some(2.5)]);

        let err = generate_signals("AAPL", &rsi, &short, &long, &t()).unwrap_err();
        assert!(matches!(err, EngineError::MisalignedSeries { .. }));
    }

    fn any_raw_signal() -> impl Strategy<Value = Option<Signal>> {
        prop_oneof![
            Just(None),
            Just(Some(Signal::Long)),
            Just(Some(Signal::Short)),
            Just(Some(Signal::Flat)),
        ]
    }

    proptest! {
        #[test]
        fn forward_fill_takes_nearest_preceding_defined(raw in prop::collection::vec(any_raw_signal(), 0..64)) {
            let filled = forward_fill(&raw);
            prop_assert_eq!(filled.len(), raw.len());
            for (i, value) in filled.iter().enumerate() {
                let expected = raw[..=i]
                    .iter()
                    .rev()
                    .find_map(|s| *s)
                    .unwrap_or(Signal::Flat);
                prop_assert_eq!(*value, expected);
            }
        }
    }
}
