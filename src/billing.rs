//! Billing queries against AWS Cost Explorer
//!
//! A query covers `[start, end)`: the end date is exclusive, as in the
//! Cost Explorer API. Ranges are validated before any network call is made.

use crate::aws_errors::from_sdk_error;
use crate::error::{CostdashError, Result};
use async_trait::async_trait;
use aws_sdk_costexplorer::types::{
    DateInterval, GroupDefinition, GroupDefinitionType, ResultByTime,
};
use aws_sdk_costexplorer::Client as CostExplorerClient;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One cost figure for one service in one time bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRow {
    pub date: NaiveDate,
    pub service: String,
    /// Currency-agnostic amount; credits can make this negative
    pub cost: Decimal,
}

/// Time-bucket size for billing data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Granularity {
    Daily,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "DAILY",
            Granularity::Monthly => "MONTHLY",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Granularity> for aws_sdk_costexplorer::types::Granularity {
    fn from(g: Granularity) -> Self {
        match g {
            Granularity::Daily => aws_sdk_costexplorer::types::Granularity::Daily,
            Granularity::Monthly => aws_sdk_costexplorer::types::Granularity::Monthly,
        }
    }
}

/// A validated billing period with an exclusive end date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = CostdashError;

    fn try_from(raw: RawDateRange) -> Result<Self> {
        DateRange::new(raw.start, raw.end)
    }
}

fn days_before(end: NaiveDate, days: u32) -> Result<NaiveDate> {
    end.checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| {
            CostdashError::validation(
                "lookback_days",
                format!("{} days before {} is out of range", days, end),
            )
        })
}

impl DateRange {
    /// Fails with `InvalidRange` unless `start < end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(CostdashError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` days before `end`, with `end` excluded.
    pub fn trailing(end: NaiveDate, days: u32) -> Result<Self> {
        Self::new(days_before(end, days)?, end)
    }

    /// Trailing window ending today in UTC.
    pub fn trailing_from_today(days: u32) -> Result<Self> {
        Self::trailing(Utc::now().date_naive(), days)
    }

    /// Resolve optional caller-supplied bounds, defaulting the end to today
    /// (UTC) and the start to `lookback_days` before the end.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        lookback_days: u32,
    ) -> Result<Self> {
        let end = end.unwrap_or_else(|| Utc::now().date_naive());
        let start = match start {
            Some(start) => start,
            None => days_before(end, lookback_days)?,
        };
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

/// Source of grouped cost data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CostSource: Send + Sync {
    /// Cost per service per time bucket. Ordering is not guaranteed.
    async fn cost_by_service(
        &self,
        range: DateRange,
        granularity: Granularity,
    ) -> Result<Vec<CostRow>>;
}

/// Validate the range and run one cost query.
///
/// `start >= end` fails with `InvalidRange` and the source is never called.
pub async fn query_cost<S>(
    source: &S,
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
) -> Result<Vec<CostRow>>
where
    S: CostSource + ?Sized,
{
    let range = DateRange::new(start, end)?;
    source.cost_by_service(range, granularity).await
}

/// Cost Explorer backed `CostSource`
pub struct CostExplorer {
    client: CostExplorerClient,
    metric: String,
}

impl CostExplorer {
    pub fn new(aws_config: &aws_config::SdkConfig, metric: impl Into<String>) -> Self {
        Self {
            client: CostExplorerClient::new(aws_config),
            metric: metric.into(),
        }
    }
}

#[async_trait]
impl CostSource for CostExplorer {
    async fn cost_by_service(
        &self,
        range: DateRange,
        granularity: Granularity,
    ) -> Result<Vec<CostRow>> {
        let period = DateInterval::builder()
            .start(range.start().format(DATE_FORMAT).to_string())
            .end(range.end().format(DATE_FORMAT).to_string())
            .build()
            .map_err(|e| CostdashError::validation("time_period", e.to_string()))?;

        info!(
            "Querying {} cost ({}) for {}",
            self.metric, granularity, range
        );

        let response = self
            .client
            .get_cost_and_usage()
            .time_period(period)
            .granularity(granularity.into())
            .metrics(&self.metric)
            .group_by(
                GroupDefinition::builder()
                    .r#type(GroupDefinitionType::Dimension)
                    .key("SERVICE")
                    .build(),
            )
            .send()
            .await
            .map_err(|e| from_sdk_error("GetCostAndUsage", "cost-explorer", e))?;

        if response.next_page_token().is_some() {
            warn!("Cost Explorer response is paginated; only the first page is shown");
        }

        let rows = rows_from_results(response.results_by_time(), &self.metric)?;
        debug!("Cost Explorer returned {} rows", rows.len());
        Ok(rows)
    }
}

/// Flatten Cost Explorer time buckets into one row per (date, service).
///
/// Buckets without groups contribute no rows. A group without the metric is
/// a malformed response and fails with `Parse`.
pub fn rows_from_results(results: &[ResultByTime], metric: &str) -> Result<Vec<CostRow>> {
    let mut rows = Vec::new();
    for result in results {
        let start = result
            .time_period()
            .map(|p| p.start())
            .ok_or_else(|| CostdashError::parse("ResultsByTime", "missing TimePeriod"))?;
        let date = NaiveDate::parse_from_str(start, DATE_FORMAT)
            .map_err(|e| CostdashError::parse("TimePeriod.Start", format!("{}: {}", start, e)))?;

        for group in result.groups() {
            let service = group
                .keys()
                .first()
                .cloned()
                .unwrap_or_else(|| "unknown".to_string());
            let amount = group
                .metrics()
                .and_then(|m| m.get(metric))
                .and_then(|v| v.amount())
                .ok_or_else(|| {
                    CostdashError::parse(
                        "Groups.Metrics",
                        format!("no {} amount for {} on {}", metric, service, date),
                    )
                })?;
            let cost = parse_amount(amount)?;
            rows.push(CostRow { date, service, cost });
        }
    }
    Ok(rows)
}

fn parse_amount(amount: &str) -> Result<Decimal> {
    Decimal::from_str(amount)
        .or_else(|_| Decimal::from_scientific(amount))
        .map_err(|e| CostdashError::parse("MetricValue.Amount", format!("{}: {}", amount, e)))
}
