//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod indicator_helpers;
pub mod signal;
pub mod returns;
pub mod portfolio;
pub mod metrics;
pub mod backtest;
pub mod universe;
pub mod config_validation;
pub mod error;
