//! Portfolio aggregation and cumulative value tracking.

use crate::domain::error::EngineError;
use crate::domain::returns::{ReturnPoint, ReturnSeries};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// One weight per instrument, non-negative and summing to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights(Vec<f64>);

impl Weights {
    pub fn new(weights: Vec<f64>) -> Result<Self, EngineError> {
        if weights.is_empty() {
            return Err(EngineError::InvalidParameter {
                name: "weights".into(),
                reason: "at least one weight is required".into(),
            });
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(EngineError::InvalidParameter {
                name: "weights".into(),
                reason: format!("weights must be finite and non-negative, got {w}"),
            });
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::InvalidParameter {
                name: "weights".into(),
                reason: format!("weights must sum to 1, got {sum}"),
            });
        }
        Ok(Self(weights))
    }

    pub fn equal(count: usize) -> Result<Self, EngineError> {
        if count == 0 {
            return Err(EngineError::InvalidParameter {
                name: "weights".into(),
                reason: "at least one instrument is required".into(),
            });
        }
        Ok(Self(vec![1.0 / count as f64; count]))
    }

    /// Rescales non-negative raw weights so they sum to 1.
    pub fn normalized(raw: &[f64]) -> Result<Self, EngineError> {
        let sum: f64 = raw.iter().sum();
        if !(sum.is_finite() && sum > 0.0) {
            return Err(EngineError::InvalidParameter {
                name: "weights".into(),
                reason: format!("cannot normalise weights summing to {sum}"),
            });
        }
        Self::new(raw.iter().map(|w| w / sum).collect())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Dates on which every series has a defined value.
pub fn common_dates(series: &[&ReturnSeries]) -> BTreeSet<NaiveDate> {
    let mut iter = series.iter();
    let Some(first) = iter.next() else {
        return BTreeSet::new();
    };
    let mut dates: BTreeSet<NaiveDate> = first.defined().map(|(d, _)| d).collect();
    for s in iter {
        let other: BTreeSet<NaiveDate> = s.defined().map(|(d, _)| d).collect();
        dates.retain(|d| other.contains(d));
    }
    dates
}

/// Weighted sum of per-instrument returns on each common date.
///
/// Dates missing (or undefined) in any one input are dropped.
pub fn combine(
    series: &[&ReturnSeries],
    weights: &Weights,
    name: &str,
) -> Result<ReturnSeries, EngineError> {
    if series.is_empty() {
        return Err(EngineError::EmptySeries {
            series: name.to_string(),
        });
    }
    if series.len() != weights.len() {
        return Err(EngineError::InvalidParameter {
            name: "weights".into(),
            reason: format!(
                "{} weights given for {} series",
                weights.len(),
                series.len()
            ),
        });
    }

    let dates = common_dates(series);
    if dates.is_empty() {
        return Err(EngineError::MisalignedSeries {
            series: series
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    let lookups: Vec<BTreeMap<NaiveDate, f64>> =
        series.iter().map(|s| s.defined().collect()).collect();

    let values = dates
        .into_iter()
        .map(|date| {
            let value: f64 = lookups
                .iter()
                .zip(weights.as_slice())
                .map(|(lookup, w)| w * lookup[&date])
                .sum();
            ReturnPoint {
                date,
                value: Some(value),
            }
        })
        .collect();

    Ok(ReturnSeries::new(name, values))
}

/// Growth of one unit invested at the first date.
///
/// Undefined returns leave the value unchanged, so a leading undefined
/// return yields a starting value of 1.0.
pub fn cumulative_value(returns: &ReturnSeries) -> Vec<EquityPoint> {
    returns
        .values
        .iter()
        .scan(1.0_f64, |value, point| {
            if let Some(r) = point.value {
                *value *= 1.0 + r;
            }
            Some(EquityPoint {
                date: point.date,
                equity: *value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
    }

    fn series(name: &str, values: &[Option<f64>]) -> ReturnSeries {
        ReturnSeries::new(
            name,
            values
                .iter()
                .enumerate()
                .map(|(i, &value)| ReturnPoint { date: day(i), value })
                .collect(),
        )
    }

    #[test]
    fn weights_must_sum_to_one() {
        assert!(Weights::new(vec![0.5, 0.5]).is_ok());
        assert!(Weights::new(vec![0.5, 0.4]).is_err());
        assert!(Weights::new(vec![]).is_err());
    }

    #[test]
    fn weights_reject_negative() {
        let err = Weights::new(vec![1.5, -0.5]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { name, .. } if name == "weights"));
    }

    #[test]
    fn equal_weights() {
        let w = Weights::equal(4).unwrap();
        assert_eq!(w.as_slice(), &[0.25, 0.25, 0.25, 0.25]);
        assert!(Weights::equal(0).is_err());
    }

    #[test]
    fn normalized_weights() {
        let w = Weights::normalized(&[0.2, 0.6]).unwrap();
        assert_relative_eq!(w.as_slice()[0], 0.25);
        assert_relative_eq!(w.as_slice()[1], 0.75);
        assert!(Weights::normalized(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn combine_two_instruments() {
        let a = series("A", &[Some(0.01), Some(0.02)]);
        let b = series("B", &[Some(0.03), Some(-0.01)]);
        let weights = Weights::new(vec![0.5, 0.5]).unwrap();

        let combined = combine(&[&a, &b], &weights, "portfolio").unwrap();
        let values = combined.defined_values();
        assert_eq!(combined.name, "portfolio");
        assert_eq!(values.len(), 2);
        assert_relative_eq!(values[0], 0.02, epsilon = 1e-12);
        assert_relative_eq!(values[1], 0.005, epsilon = 1e-12);
    }

    #[test]
    fn combine_inner_joins_on_dates() {
        let a = series("A", &[None, Some(0.01), Some(0.02), Some(0.03)]);
        let b = ReturnSeries::from_pairs("B", &[(day(2), 0.04), (day(3), 0.05), (day(7), 0.1)]);
        let weights = Weights::new(vec![0.25, 0.75]).unwrap();

        let combined = combine(&[&a, &b], &weights, "portfolio").unwrap();
        let dates: Vec<NaiveDate> = combined.values.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(2), day(3)]);
        assert_relative_eq!(
            combined.values[0].value.unwrap(),
            0.25 * 0.02 + 0.75 * 0.04,
            epsilon = 1e-12
        );
    }

    #[test]
    fn combine_without_common_dates_fails() {
        let a = ReturnSeries::from_pairs("A", &[(day(0), 0.01)]);
        let b = ReturnSeries::from_pairs("B", &[(day(1), 0.01)]);
        let weights = Weights::equal(2).unwrap();

        let err = combine(&[&a, &b], &weights, "portfolio").unwrap_err();
        assert_eq!(
            err,
            EngineError::MisalignedSeries {
                series: "A, B".into()
            }
        );
    }

    #[test]
    fn combine_weight_count_mismatch() {
        let a = series("A", &[Some(0.01)]);
        let weights = Weights::equal(2).unwrap();
        let err = combine(&[&a], &weights, "portfolio").unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
    }

    #[test]
    fn combine_no_series() {
        let weights = Weights::equal(1).unwrap();
        let err = combine(&[], &weights, "portfolio").unwrap_err();
        assert!(matches!(err, EngineError::EmptySeries { .. }));
    }

    #[test]
    fn cumulative_value_scenario() {
        let returns = series("TEST", &[None, Some(0.10), Some(-0.10), Some(0.10)]);
        let curve = cumulative_value(&returns);
        let values: Vec<f64> = curve.iter().map(|p| p.equity).collect();

        assert_eq!(values.len(), 4);
        assert_eq!(values[0], 1.0);
        assert_relative_eq!(values[1], 1.10, epsilon = 1e-12);
        assert_relative_eq!(values[2], 0.99, epsilon = 1e-12);
        assert_relative_eq!(values[3], 1.0791, epsilon = 1e-12);
    }

    #[test]
    fn cumulative_value_first_defined_return_compounds() {
        let returns = series("P", &[Some(0.02), Some(0.005)]);
        let curve = cumulative_value(&returns);
        assert_relative_eq!(curve[0].equity, 1.02, epsilon = 1e-12);
        assert_relative_eq!(curve[1].equity, 1.02 * 1.005, epsilon = 1e-12);
    }

    #[test]
    fn cumulative_value_empty() {
        assert!(cumulative_value(&series("P", &[])).is_empty());
    }

    proptest! {
        #[test]
        fn cumulative_value_of_zero_returns_is_one(len in 0usize..100, leading_gap in any::<bool>()) {
            let values: Vec<Option<f64>> = (0..len)
                .map(|i| if leading_gap && i == 0 { None } else { Some(0.0) })
                .collect();
            let curve = cumulative_value(&series("ZERO", &values));
            prop_assert_eq!(curve.len(), len);
            for point in curve {
                prop_assert_eq!(point.equity, 1.0);
            }
        }
    }
}
