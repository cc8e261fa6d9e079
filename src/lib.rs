//! costdash library
//!
//! AWS cost visibility: the idle-instance analysis document kept in S3,
//! Cost Explorer breakdowns by service, and stale EC2 resources priced with
//! flat per-unit rates.

pub mod aggregate;
pub mod aws_errors;
pub mod billing;
pub mod commands;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod error;
pub mod exit_codes;
pub mod idle_analysis;
pub mod inventory;
pub mod lambda;
pub mod object_store;
pub mod report;
pub mod session;
pub mod stale;

// Re-export commonly used types
pub use aggregate::CostReport;
pub use billing::{CostRow, DateRange, Granularity};
pub use error::{CostdashError, Result};
pub use stale::{Pricing, StaleReport, StaleResourceEstimator};
