//! Port traits at the engine's I/O boundary.

pub mod config_port;
pub mod data_port;
pub mod report_port;
