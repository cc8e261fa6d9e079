//! In-memory collaborators for integration tests
//!
//! Each fake counts its calls so tests can assert that validation failures
//! never reach the remote side.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use costdash::billing::{CostRow, CostSource, DateRange, Granularity};
use costdash::config::Config;
use costdash::context::AppContext;
use costdash::error::{CostdashError, Result};
use costdash::inventory::{Inventory, RawAddress, RawSnapshot, RawVolume};
use costdash::lambda::AnalysisTrigger;
use costdash::object_store::ObjectStore;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn row(day: NaiveDate, service: &str, cost: Decimal) -> CostRow {
    CostRow {
        date: day,
        service: service.to_string(),
        cost,
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub objects: HashMap<(String, String), Vec<u8>>,
    pub calls: Arc<AtomicUsize>,
}

impl FakeStore {
    pub fn with_object(bucket: &str, key: &str, body: &str) -> Self {
        let mut store = Self::default();
        store
            .objects
            .insert((bucket.to_string(), key.to_string()), body.as_bytes().to_vec());
        store
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| CostdashError::NotFound {
                operation: "GetObject".to_string(),
                resource: format!("s3://{}/{}", bucket, key),
            })
    }
}

#[derive(Default)]
pub struct FakeCosts {
    pub rows: Vec<CostRow>,
    pub fail_transient: bool,
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CostSource for FakeCosts {
    async fn cost_by_service(&self, range: DateRange, _granularity: Granularity) -> Result<Vec<CostRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_transient {
            return Err(CostdashError::Transient {
                operation: "GetCostAndUsage".to_string(),
                message: "connection reset".to_string(),
            });
        }
        Ok(self
            .rows
            .iter()
            .filter(|r| r.date >= range.start() && r.date < range.end())
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct FakeInventory {
    pub volumes: Vec<RawVolume>,
    pub addresses: Vec<RawAddress>,
    pub snapshots: Vec<RawSnapshot>,
    pub fail_snapshots: bool,
}

#[async_trait]
impl Inventory for FakeInventory {
    fn region(&self) -> String {
        "us-east-1".to_string()
    }

    async fn list_unattached_volumes(&self) -> Result<Vec<RawVolume>> {
        Ok(self.volumes.clone())
    }

    async fn list_addresses(&self) -> Result<Vec<RawAddress>> {
        Ok(self.addresses.clone())
    }

    async fn list_snapshots(&self, _owner_self: bool) -> Result<Vec<RawSnapshot>> {
        if self.fail_snapshots {
            return Err(CostdashError::Access {
                operation: "DescribeSnapshots".to_string(),
                message: "UnauthorizedOperation".to_string(),
            });
        }
        Ok(self.snapshots.clone())
    }
}

#[derive(Default)]
pub struct FakeTrigger {
    pub invoked: Arc<std::sync::Mutex<Vec<String>>>,
}

#[async_trait]
impl AnalysisTrigger for FakeTrigger {
    async fn trigger(&self, function_name: &str) -> Result<serde_json::Value> {
        if let Ok(mut invoked) = self.invoked.lock() {
            invoked.push(function_name.to_string());
        }
        Ok(serde_json::json!({ "statusCode": 200 }))
    }
}

pub fn context(store: FakeStore, costs: FakeCosts, inventory: FakeInventory) -> AppContext {
    AppContext::with_clients(
        Config::default(),
        Box::new(store),
        Box::new(costs),
        Box::new(inventory),
        Box::new(FakeTrigger::default()),
    )
}

pub fn volume(id: &str, size: i32) -> RawVolume {
    RawVolume {
        volume_id: id.to_string(),
        size_gib: Some(size),
        create_time: Some(at(2024, 1, 15)),
        state: Some("available".to_string()),
        availability_zone: Some("us-east-1a".to_string()),
    }
}

pub fn address(ip: &str, instance_id: Option<&str>) -> RawAddress {
    RawAddress {
        public_ip: Some(ip.to_string()),
        allocation_id: Some(format!("eipalloc-{}", ip.replace('.', ""))),
        domain: Some("vpc".to_string()),
        instance_id: instance_id.map(str::to_string),
        association_id: instance_id.map(|_| "eipassoc-1".to_string()),
    }
}

pub fn snapshot(id: &str, started: DateTime<Utc>, size: i32) -> RawSnapshot {
    RawSnapshot {
        snapshot_id: id.to_string(),
        volume_id: Some("vol-src".to_string()),
        start_time: Some(started),
        state: Some("completed".to_string()),
        volume_size_gib: Some(size),
    }
}
