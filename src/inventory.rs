//! Read-only EC2 inventory listings
//!
//! Thin pass-throughs to the EC2 API for one account and region. The only
//! filtering here is what the EC2 query filters provide; deciding what is
//! stale is left to `crate::stale`.

use crate::aws_errors::from_sdk_error;
use crate::error::Result;
use async_trait::async_trait;
use aws_sdk_ec2::types::Filter;
use aws_sdk_ec2::Client as Ec2Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVolume {
    pub volume_id: String,
    pub size_gib: Option<i32>,
    pub create_time: Option<DateTime<Utc>>,
    pub state: Option<String>,
    pub availability_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAddress {
    pub public_ip: Option<String>,
    pub allocation_id: Option<String>,
    pub domain: Option<String>,
    pub instance_id: Option<String>,
    pub association_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub snapshot_id: String,
    pub volume_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub state: Option<String>,
    pub volume_size_gib: Option<i32>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Region the listings come from
    fn region(&self) -> String;

    /// Volumes whose status is `available` (not attached)
    async fn list_unattached_volumes(&self) -> Result<Vec<RawVolume>>;

    async fn list_addresses(&self) -> Result<Vec<RawAddress>>;

    /// Snapshots; `owner_self` restricts to snapshots owned by this account
    async fn list_snapshots(&self, owner_self: bool) -> Result<Vec<RawSnapshot>>;
}

/// EC2 backed `Inventory`
pub struct Ec2Inventory {
    client: Ec2Client,
    region: String,
}

impl Ec2Inventory {
    pub fn new(aws_config: &aws_config::SdkConfig) -> Self {
        let region = aws_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            client: Ec2Client::new(aws_config),
            region,
        }
    }
}

fn to_chrono(t: &aws_sdk_ec2::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t.secs(), t.subsec_nanos())
}

#[async_trait]
impl Inventory for Ec2Inventory {
    fn region(&self) -> String {
        self.region.clone()
    }

    async fn list_unattached_volumes(&self) -> Result<Vec<RawVolume>> {
        let response = self
            .client
            .describe_volumes()
            .filters(Filter::builder().name("status").values("available").build())
            .send()
            .await
            .map_err(|e| from_sdk_error("DescribeVolumes", "volumes", e))?;

        let volumes: Vec<RawVolume> = response
            .volumes()
            .iter()
            .map(|v| RawVolume {
                volume_id: v.volume_id().unwrap_or("unknown").to_string(),
                size_gib: v.size(),
                create_time: v.create_time().and_then(to_chrono),
                state: v.state().map(|s| s.as_str().to_string()),
                availability_zone: v.availability_zone().map(str::to_string),
            })
            .collect();
        debug!("{} unattached volumes in {}", volumes.len(), self.region);
        Ok(volumes)
    }

    async fn list_addresses(&self) -> Result<Vec<RawAddress>> {
        let response = self
            .client
            .describe_addresses()
            .send()
            .await
            .map_err(|e| from_sdk_error("DescribeAddresses", "addresses", e))?;

        let addresses: Vec<RawAddress> = response
            .addresses()
            .iter()
            .map(|a| RawAddress {
                public_ip: a.public_ip().map(str::to_string),
                allocation_id: a.allocation_id().map(str::to_string),
                domain: a.domain().map(|d| d.as_str().to_string()),
                instance_id: a.instance_id().map(str::to_string),
                association_id: a.association_id().map(str::to_string),
            })
            .collect();
        debug!("{} elastic IPs in {}", addresses.len(), self.region);
        Ok(addresses)
    }

    async fn list_snapshots(&self, owner_self: bool) -> Result<Vec<RawSnapshot>> {
        let mut request = self.client.describe_snapshots();
        if owner_self {
            request = request.owner_ids("self");
        }
        let response = request
            .send()
            .await
            .map_err(|e| from_sdk_error("DescribeSnapshots", "snapshots", e))?;

        let snapshots: Vec<RawSnapshot> = response
            .snapshots()
            .iter()
            .map(|s| RawSnapshot {
                snapshot_id: s.snapshot_id().unwrap_or("unknown").to_string(),
                volume_id: s.volume_id().map(str::to_string),
                start_time: s.start_time().and_then(to_chrono),
                state: s.state().map(|st| st.as_str().to_string()),
                volume_size_gib: s.volume_size(),
            })
            .collect();
        debug!("{} snapshots in {}", snapshots.len(), self.region);
        Ok(snapshots)
    }
}
