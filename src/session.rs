//! Per-session cached results
//!
//! Each dashboard session owns one `DashboardSession`. A section is either
//! never fetched, loaded (possibly with empty data), or failed; the three
//! render differently.

use crate::aggregate::CostReport;
use crate::error::CostdashError;
use crate::idle_analysis::IdleAnalysis;
use crate::stale::StaleReport;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum Fetch<T> {
    NotFetched,
    Loaded { data: T, at: DateTime<Utc> },
    Failed { message: String, retryable: bool },
}

impl<T> Default for Fetch<T> {
    fn default() -> Self {
        Fetch::NotFetched
    }
}

impl<T> Fetch<T> {
    pub fn from_result(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(data) => Fetch::Loaded {
                data,
                at: Utc::now(),
            },
            Err(e) => Fetch::failed(&e),
        }
    }

    pub fn failed(error: &CostdashError) -> Self {
        use crate::error::IsRetryable;
        Fetch::Failed {
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Fetch::Loaded { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Fetch::Loaded { .. })
    }
}

#[derive(Debug, Default)]
pub struct DashboardSession {
    pub idle: Fetch<IdleAnalysis>,
    pub costs: Fetch<CostReport>,
    pub stale: Fetch<StaleReport>,
}

impl DashboardSession {
    pub fn new() -> Self {
        Self::default()
    }
}
