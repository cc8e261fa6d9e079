//! Wiring between configuration, AWS clients, and the fetch operations
//!
//! `AppContext` is what the CLI and the terminal dashboard call into. Each
//! operation is a single request/response round; nothing is cached here.

use crate::aggregate::CostReport;
use crate::billing::{query_cost, CostExplorer, CostSource, DateRange, Granularity};
use crate::config::{AwsConfig, Config};
use crate::error::Result;
use crate::idle_analysis::{self, IdleAnalysis};
use crate::inventory::{Ec2Inventory, Inventory};
use crate::lambda::{AnalysisTrigger, LambdaTrigger};
use crate::object_store::{fetch_json, ObjectStore, S3ObjectStore};
use crate::stale::{self, StaleReport, StaleResourceEstimator};
use aws_config::BehaviorVersion;
use chrono::{NaiveDate, Utc};
use tracing::debug;

pub struct AppContext {
    pub config: Config,
    store: Box<dyn ObjectStore>,
    costs: Box<dyn CostSource>,
    inventory: Box<dyn Inventory>,
    trigger: Box<dyn AnalysisTrigger>,
}

/// Load the shared SDK configuration, honouring configured region/profile.
pub async fn load_aws_config(aws: &AwsConfig) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &aws.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }
    if let Some(profile) = &aws.profile {
        loader = loader.profile_name(profile);
    }
    let sdk_config = loader.load().await;
    debug!("AWS region: {:?}", sdk_config.region());
    sdk_config
}

impl AppContext {
    pub async fn from_config(config: Config) -> Self {
        let sdk_config = load_aws_config(&config.aws).await;
        let costs = CostExplorer::new(&sdk_config, config.billing.metric.clone());
        Self::with_clients(
            config,
            Box::new(S3ObjectStore::new(&sdk_config)),
            Box::new(costs),
            Box::new(Ec2Inventory::new(&sdk_config)),
            Box::new(LambdaTrigger::new(&sdk_config)),
        )
    }

    pub fn with_clients(
        config: Config,
        store: Box<dyn ObjectStore>,
        costs: Box<dyn CostSource>,
        inventory: Box<dyn Inventory>,
        trigger: Box<dyn AnalysisTrigger>,
    ) -> Self {
        Self {
            config,
            store,
            costs,
            inventory,
            trigger,
        }
    }

    /// Read the idle analysis document; `None` falls back to configured location.
    pub async fn fetch_idle(&self, bucket: Option<&str>, key: Option<&str>) -> Result<IdleAnalysis> {
        let bucket = bucket.unwrap_or(&self.config.idle_analysis.bucket);
        let key = key.unwrap_or(&self.config.idle_analysis.key);
        idle_analysis::load(self.store.as_ref(), bucket, key).await
    }

    /// The idle analysis document exactly as stored, unknown fields included.
    pub async fn fetch_idle_raw(
        &self,
        bucket: Option<&str>,
        key: Option<&str>,
    ) -> Result<serde_json::Value> {
        let bucket = bucket.unwrap_or(&self.config.idle_analysis.bucket);
        let key = key.unwrap_or(&self.config.idle_analysis.key);
        fetch_json(self.store.as_ref(), bucket, key).await
    }

    /// Invoke the analysis job; the document is re-read separately.
    pub async fn run_analysis(&self, function_name: Option<&str>) -> Result<serde_json::Value> {
        let function_name = function_name.unwrap_or(&self.config.idle_analysis.lambda_function);
        self.trigger.trigger(function_name).await
    }

    /// Query costs by service. Missing bounds default to the configured
    /// trailing window ending today (UTC).
    pub async fn fetch_costs(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        granularity: Option<Granularity>,
    ) -> Result<CostReport> {
        let range = DateRange::resolve(start, end, self.config.billing.lookback_days)?;
        let granularity = granularity.unwrap_or(self.config.billing.granularity);
        let rows = query_cost(self.costs.as_ref(), range.start(), range.end(), granularity).await?;
        Ok(CostReport::new(range, granularity, rows))
    }

    pub fn estimator(&self) -> StaleResourceEstimator {
        StaleResourceEstimator::new(self.config.pricing, self.config.stale.snapshot_max_age_days)
    }

    pub async fn detect_stale(&self) -> Result<StaleReport> {
        stale::detect(self.inventory.as_ref(), &self.estimator(), Utc::now()).await
    }
}
