//! Stale resource detection and savings estimates
//!
//! Three independent filters over inventory listings, each priced with a
//! flat per-unit rate:
//!
//! - unattached EBS volumes: `size_gib * ebs_per_gib_month`
//! - elastic IPs with no instance: `eip_per_month`
//! - snapshots started before the cutoff: `size_gib * snapshot_per_gib_month`
//!
//! The rates are illustrative estimation constants, not live pricing.
//! A report is built only from complete data: if any of the three listings
//! fails, detection fails as a whole.

use crate::error::{CostdashError, Result};
use crate::inventory::{Inventory, RawAddress, RawSnapshot, RawVolume};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

pub const DEFAULT_SNAPSHOT_MAX_AGE_DAYS: u32 = 60;

/// Flat per-unit rates used for estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    pub ebs_per_gib_month: Decimal,
    pub eip_per_month: Decimal,
    pub snapshot_per_gib_month: Decimal,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            ebs_per_gib_month: dec!(0.10),
            eip_per_month: dec!(3.60),
            snapshot_per_gib_month: dec!(0.05),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleVolume {
    pub id: String,
    pub size_gib: u32,
    pub created_at: Option<NaiveDate>,
    pub region: String,
    pub estimated_monthly_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleAddress {
    pub public_ip: String,
    pub allocation_id: String,
    /// `vpc`, `standard`, or "unknown"
    pub domain: String,
    pub estimated_monthly_cost: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotState {
    Pending,
    Completed,
    Error,
    /// Any state EC2 reports beyond the three above (`recoverable`, ...)
    Other,
}

impl SnapshotState {
    pub fn parse(state: Option<&str>) -> Self {
        match state {
            Some("pending") => SnapshotState::Pending,
            Some("completed") => SnapshotState::Completed,
            Some("error") => SnapshotState::Error,
            _ => SnapshotState::Other,
        }
    }
}

impl fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SnapshotState::Pending => "pending",
            SnapshotState::Completed => "completed",
            SnapshotState::Error => "error",
            SnapshotState::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleSnapshot {
    pub id: String,
    pub volume_id: String,
    pub started_at: NaiveDate,
    pub state: SnapshotState,
    pub size_gib: u32,
    pub estimated_monthly_cost: Decimal,
}

/// Result of one detection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleReport {
    pub region: String,
    /// Snapshots started before this instant were flagged
    pub snapshot_cutoff: DateTime<Utc>,
    pub snapshot_max_age_days: u32,
    pub unattached_volumes: Vec<StaleVolume>,
    pub unassociated_eips: Vec<StaleAddress>,
    pub old_snapshots: Vec<StaleSnapshot>,
    pub total_savings: Decimal,
}

impl StaleReport {
    pub fn volumes_total(&self) -> Decimal {
        self.unattached_volumes.iter().map(|v| v.estimated_monthly_cost).sum()
    }

    pub fn eips_total(&self) -> Decimal {
        self.unassociated_eips.iter().map(|e| e.estimated_monthly_cost).sum()
    }

    pub fn snapshots_total(&self) -> Decimal {
        self.old_snapshots.iter().map(|s| s.estimated_monthly_cost).sum()
    }

    pub fn resource_count(&self) -> usize {
        self.unattached_volumes.len() + self.unassociated_eips.len() + self.old_snapshots.len()
    }
}

/// Pure pricing and filtering over inventory listings
#[derive(Debug, Clone)]
pub struct StaleResourceEstimator {
    pricing: Pricing,
    snapshot_max_age_days: u32,
}

impl Default for StaleResourceEstimator {
    fn default() -> Self {
        Self::new(Pricing::default(), DEFAULT_SNAPSHOT_MAX_AGE_DAYS)
    }
}

impl StaleResourceEstimator {
    pub fn new(pricing: Pricing, snapshot_max_age_days: u32) -> Self {
        Self {
            pricing,
            snapshot_max_age_days,
        }
    }

    pub fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    /// `now` minus the configured age. Fails if that falls outside the
    /// representable date range.
    pub fn snapshot_cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        now.checked_sub_signed(Duration::days(i64::from(self.snapshot_max_age_days)))
            .ok_or_else(|| {
                CostdashError::validation(
                    "snapshot_max_age_days",
                    format!("{} days before {} is out of range", self.snapshot_max_age_days, now),
                )
            })
    }

    /// Volumes are listed pre-filtered (`status = available`); every one is priced.
    pub fn price_volumes(&self, volumes: &[RawVolume], region: &str) -> Vec<StaleVolume> {
        volumes
            .iter()
            .map(|v| {
                let size_gib = gib(v.size_gib);
                StaleVolume {
                    id: v.volume_id.clone(),
                    size_gib,
                    created_at: v.create_time.map(|t| t.date_naive()),
                    region: region.to_string(),
                    estimated_monthly_cost: Decimal::from(size_gib) * self.pricing.ebs_per_gib_month,
                }
            })
            .collect()
    }

    /// Addresses with no attached instance
    pub fn unassociated_addresses(&self, addresses: &[RawAddress]) -> Vec<StaleAddress> {
        addresses
            .iter()
            .filter(|a| a.instance_id.as_deref().map_or(true, str::is_empty))
            .map(|a| StaleAddress {
                public_ip: a.public_ip.clone().unwrap_or_else(|| "unknown".to_string()),
                allocation_id: a.allocation_id.clone().unwrap_or_else(|| "unknown".to_string()),
                domain: a.domain.clone().unwrap_or_else(|| "unknown".to_string()),
                estimated_monthly_cost: self.pricing.eip_per_month,
            })
            .collect()
    }

    /// Snapshots started strictly before `cutoff`.
    ///
    /// Snapshots without a start time cannot be aged and are left out.
    pub fn old_snapshots(&self, snapshots: &[RawSnapshot], cutoff: DateTime<Utc>) -> Vec<StaleSnapshot> {
        snapshots
            .iter()
            .filter_map(|s| {
                let Some(started) = s.start_time else {
                    debug!("Snapshot {} has no start time; skipping", s.snapshot_id);
                    return None;
                };
                if started >= cutoff {
                    return None;
                }
                let size_gib = gib(s.volume_size_gib);
                Some(StaleSnapshot {
                    id: s.snapshot_id.clone(),
                    volume_id: s.volume_id.clone().unwrap_or_else(|| "unknown".to_string()),
                    started_at: started.date_naive(),
                    state: SnapshotState::parse(s.state.as_deref()),
                    size_gib,
                    estimated_monthly_cost: Decimal::from(size_gib)
                        * self.pricing.snapshot_per_gib_month,
                })
            })
            .collect()
    }

    /// Build a report from complete listings.
    ///
    /// `now` is read once by the caller so every snapshot is compared with
    /// the same cutoff.
    pub fn estimate(
        &self,
        volumes: &[RawVolume],
        addresses: &[RawAddress],
        snapshots: &[RawSnapshot],
        region: &str,
        now: DateTime<Utc>,
    ) -> Result<StaleReport> {
        let cutoff = self.snapshot_cutoff(now)?;
        let mut report = StaleReport {
            region: region.to_string(),
            snapshot_cutoff: cutoff,
            snapshot_max_age_days: self.snapshot_max_age_days,
            unattached_volumes: self.price_volumes(volumes, region),
            unassociated_eips: self.unassociated_addresses(addresses),
            old_snapshots: self.old_snapshots(snapshots, cutoff),
            total_savings: Decimal::ZERO,
        };
        report.total_savings = report.volumes_total() + report.eips_total() + report.snapshots_total();
        Ok(report)
    }
}

/// List all three inventories and estimate.
///
/// The listings are independent and run concurrently. The first failure
/// aborts detection; no report is produced from partial listings.
pub async fn detect<I>(
    inventory: &I,
    estimator: &StaleResourceEstimator,
    now: DateTime<Utc>,
) -> Result<StaleReport>
where
    I: Inventory + ?Sized,
{
    let (volumes, addresses, snapshots) = tokio::try_join!(
        inventory.list_unattached_volumes(),
        inventory.list_addresses(),
        inventory.list_snapshots(true),
    )?;

    let region = inventory.region();
    let report = estimator.estimate(&volumes, &addresses, &snapshots, &region, now)?;
    info!(
        "{} stale resources in {}, estimated ${}/month",
        report.resource_count(),
        region,
        report.total_savings.round_dp(2)
    );
    Ok(report)
}

fn gib(size: Option<i32>) -> u32 {
    size.map(|s| s.max(0) as u32).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CostdashError;
    use crate::inventory::MockInventory;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn volume(id: &str, size: i32) -> RawVolume {
        RawVolume {
            volume_id: id.to_string(),
            size_gib: Some(size),
            create_time: Some(at(2024, 1, 15)),
            state: Some("available".to_string()),
            availability_zone: Some("us-east-1a".to_string()),
        }
    }

    fn address(ip: &str, instance: Option<&str>) -> RawAddress {
        RawAddress {
            public_ip: Some(ip.to_string()),
            allocation_id: Some(format!("eipalloc-{}", ip)),
            domain: None,
            instance_id: instance.map(str::to_string),
            association_id: None,
        }
    }

    fn snapshot(id: &str, started: DateTime<Utc>, size: Option<i32>) -> RawSnapshot {
        RawSnapshot {
            snapshot_id: id.to_string(),
            volume_id: Some("vol-1".to_string()),
            start_time: Some(started),
            state: Some("completed".to_string()),
            volume_size_gib: size,
        }
    }

    #[test]
    fn test_volume_cost_is_size_times_rate() {
        let estimator = StaleResourceEstimator::default();
        let priced = estimator.price_volumes(&[volume("vol-100", 100)], "us-east-1");
        assert_eq!(priced[0].estimated_monthly_cost, dec!(10.00));
        assert_eq!(priced[0].region, "us-east-1");
        assert_eq!(priced[0].created_at, NaiveDate::from_ymd_opt(2024, 1, 15));
    }

    #[test]
    fn test_negative_or_missing_size_is_zero() {
        let estimator = StaleResourceEstimator::default();
        let mut v = volume("vol-x", -5);
        let priced = estimator.price_volumes(&[v.clone()], "r");
        assert_eq!(priced[0].size_gib, 0);
        v.size_gib = None;
        let priced = estimator.price_volumes(&[v], "r");
        assert_eq!(priced[0].estimated_monthly_cost, Decimal::ZERO);
    }

    #[test]
    fn test_address_filter() {
        let estimator = StaleResourceEstimator::default();
        let stale = estimator.unassociated_addresses(&[
            address("1.1.1.1", None),
            address("2.2.2.2", Some("i-123")),
            address("3.3.3.3", Some("")),
        ]);
        let ips: Vec<_> = stale.iter().map(|a| a.public_ip.as_str()).collect();
        assert_eq!(ips, vec!["1.1.1.1", "3.3.3.3"]);
        assert_eq!(stale[0].domain, "unknown");
        assert_eq!(stale[0].estimated_monthly_cost, dec!(3.60));
    }

    #[test]
    fn test_snapshot_cutoff_sixty_days() {
        let estimator = StaleResourceEstimator::default();
        let now = at(2024, 3, 1);
        let cutoff = estimator.snapshot_cutoff(now).unwrap();
        let old = estimator.old_snapshots(
            &[
                snapshot("snap-old", at(2023, 12, 1), Some(50)),
                snapshot("snap-new", at(2024, 2, 15), Some(50)),
            ],
            cutoff,
        );
        assert_eq!(old.len(), 1);
        assert_eq!(old[0].id, "snap-old");
        assert_eq!(old[0].estimated_monthly_cost, dec!(2.50));
        assert_eq!(old[0].state, SnapshotState::Completed);
    }

    #[test]
    fn test_snapshot_exactly_at_cutoff_is_kept_out() {
        let estimator = StaleResourceEstimator::default();
        let now = at(2024, 3, 1);
        let cutoff = estimator.snapshot_cutoff(now).unwrap();
        let old = estimator.old_snapshots(&[snapshot("snap-edge", cutoff, Some(1))], cutoff);
        assert!(old.is_empty());
    }

    #[test]
    fn test_cutoff_out_of_range_is_error() {
        let estimator = StaleResourceEstimator::new(Pricing::default(), u32::MAX);
        let result = estimator.estimate(&[], &[], &[], "us-east-1", at(2024, 3, 1));
        assert!(matches!(result, Err(CostdashError::Validation { .. })));
    }

    #[test]
    fn test_snapshot_without_size_defaults_to_zero() {
        let estimator = StaleResourceEstimator::default();
        let old = estimator.old_snapshots(&[snapshot("s", at(2020, 1, 1), None)], at(2024, 1, 1));
        assert_eq!(old[0].size_gib, 0);
        assert_eq!(old[0].estimated_monthly_cost, Decimal::ZERO);
    }

    #[test]
    fn test_estimate_total_is_sum_of_categories() {
        let estimator = StaleResourceEstimator::default();
        let report = estimator.estimate(
            &[volume("vol-1", 100), volume("vol-2", 20)],
            &[address("1.1.1.1", None), address("2.2.2.2", Some("i-1"))],
            &[snapshot("s-1", at(2023, 1, 1), Some(200))],
            "eu-west-1",
            at(2024, 3, 1),
        )
        .unwrap();
        assert_eq!(report.volumes_total(), dec!(12.00));
        assert_eq!(report.eips_total(), dec!(3.60));
        assert_eq!(report.snapshots_total(), dec!(10.00));
        assert_eq!(report.total_savings, dec!(25.60));
        assert_eq!(report.resource_count(), 4);
    }

    #[test]
    fn test_custom_pricing() {
        let pricing = Pricing {
            ebs_per_gib_month: dec!(0.08),
            eip_per_month: dec!(5),
            snapshot_per_gib_month: dec!(0.01),
        };
        let estimator = StaleResourceEstimator::new(pricing, 90);
        let report = estimator.estimate(
            &[volume("vol-1", 10)],
            &[address("1.1.1.1", None)],
            &[snapshot("s-1", at(2024, 1, 1), Some(10))],
            "r",
            at(2024, 3, 1),
        )
        .unwrap();
        // 60 days old: younger than the 90 day threshold
        assert!(report.old_snapshots.is_empty());
        assert_eq!(report.total_savings, dec!(5.80));
    }

    #[tokio::test]
    async fn test_detect_fails_when_snapshot_listing_fails() {
        let mut inventory = MockInventory::new();
        inventory.expect_region().returning(|| "us-east-1".to_string());
        inventory
            .expect_list_unattached_volumes()
            .returning(|| Ok(vec![volume("vol-1", 100)]));
        inventory
            .expect_list_addresses()
            .returning(|| Ok(vec![address("1.1.1.1", None)]));
        inventory.expect_list_snapshots().returning(|_| {
            Err(CostdashError::Transient {
                operation: "DescribeSnapshots".to_string(),
                message: "throttled".to_string(),
            })
        });

        let result = detect(&inventory, &StaleResourceEstimator::default(), at(2024, 3, 1)).await;
        assert!(matches!(result, Err(CostdashError::Transient { .. })));
    }

    #[tokio::test]
    async fn test_detect_lists_owned_snapshots() {
        let mut inventory = MockInventory::new();
        inventory.expect_region().returning(|| "us-east-1".to_string());
        inventory.expect_list_unattached_volumes().returning(|| Ok(vec![]));
        inventory.expect_list_addresses().returning(|| Ok(vec![]));
        inventory
            .expect_list_snapshots()
            .withf(|owner_self| *owner_self)
            .times(1)
            .returning(|_| Ok(vec![]));

        let report = detect(&inventory, &StaleResourceEstimator::default(), at(2024, 3, 1))
            .await
            .unwrap();
        assert_eq!(report.total_savings, Decimal::ZERO);
        assert_eq!(report.region, "us-east-1");
        assert_eq!(report.snapshot_cutoff, at(2024, 1, 1));
    }
}
