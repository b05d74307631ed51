//! Price data access port trait.

use crate::domain::error::SignalfolioError;
use crate::domain::ohlcv::PriceSeries;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `code` between `start_date` and `end_date` inclusive.
    fn fetch_prices(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, SignalfolioError>;

    fn list_symbols(&self) -> Result<Vec<String>, SignalfolioError>;

    /// First date, last date and bar count of everything stored for `code`.
    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SignalfolioError>;
}
