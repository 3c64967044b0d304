//! mishtrix: mishap-trend dashboard engine.
//!
//! Turns heterogeneous prediction/aggregation rows from the ML backend
//! into canonical, chart-ready series and drives the dashboard's
//! drill-down navigation.

pub mod config;
pub mod core;
pub mod dashboard;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod series;
pub mod services;
