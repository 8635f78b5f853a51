//! Well dashboard data pipeline: CSV ingestion, analytics and forecast
//! uploads feeding a pluggable dashboard view.

pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod external;
pub mod forecast;
pub mod loader;
pub mod management;
pub mod output;
pub mod parser;
pub mod sample;
pub mod source;
pub mod types;
pub mod util;
