//! CSV report adapter: one row per portfolio date.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SignalfolioError;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;

pub const HEADER: [&str; 5] = [
    "date",
    "base_return",
    "strategy_return",
    "base_value",
    "strategy_value",
];

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    fn report_error(path: &Path, e: impl std::fmt::Display) -> SignalfolioError {
        SignalfolioError::Report {
            reason: format!("failed to write {}: {}", path.display(), e),
        }
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SignalfolioError> {
        let mut writer =
            csv::Writer::from_path(output_path).map_err(|e| Self::report_error(output_path, e))?;
        writer
            .write_record(HEADER)
            .map_err(|e| Self::report_error(output_path, e))?;

        let strategy_returns: BTreeMap<NaiveDate, f64> = result.strategy.returns.defined().collect();
        let strategy_values: BTreeMap<NaiveDate, f64> = result
            .strategy
            .value
            .iter()
            .map(|p| (p.date, p.equity))
            .collect();

        let fmt = |v: Option<&f64>| v.map(|v| v.to_string()).unwrap_or_default();

        for (point, value) in result.base.returns.values.iter().zip(&result.base.value) {
            let row = [
                point.date.format("%Y-%m-%d").to_string(),
                fmt(point.value.as_ref()),
                fmt(strategy_returns.get(&point.date)),
                value.equity.to_string(),
                fmt(strategy_values.get(&point.date)),
            ];
            writer
                .write_record(&row)
                .map_err(|e| Self::report_error(output_path, e))?;
        }

        writer.flush()?;
        Ok(())
    }
}
