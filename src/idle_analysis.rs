//! Idle EC2 instance analysis document
//!
//! The document is produced by an external job and read from the object
//! store. Parsing is lenient: unknown fields are ignored and missing or
//! unreadable values fall back to zero / "N/A" instead of failing.

use crate::error::Result;
use crate::object_store::{fetch_json, ObjectStore};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::warn;

pub const NOT_AVAILABLE: &str = "N/A";
pub const HISTOGRAM_BINS: usize = 20;

/// Headline numbers of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleAnalysisSummary {
    pub total_instances_analyzed: u64,
    pub idle_instances: u64,
    pub active_instances: u64,
    pub potential_monthly_savings: Decimal,
    /// ISO-8601 timestamp of the run, "N/A" when absent
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub timestamp: String,
    pub evaluation_period_minutes: u64,
    pub cpu_threshold: f64,
    pub network_threshold: f64,
}

/// Per-instance result of the analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceAnalysis {
    pub instance_id: String,
    pub instance_type: String,
    pub status: String,
    pub avg_cpu: Option<f64>,
    pub max_cpu: Option<f64>,
    pub total_network: Option<f64>,
    pub recommendation: String,
    pub estimated_savings: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleAnalysis {
    pub summary: IdleAnalysisSummary,
    pub metadata: AnalysisMetadata,
    pub detailed_analysis: Vec<InstanceAnalysis>,
    pub idle_instances: Vec<InstanceAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

impl IdleAnalysis {
    pub fn from_json(value: &Value) -> Self {
        if !value.is_object() {
            warn!("Idle analysis document is not a JSON object; using empty analysis");
        }
        let empty = Value::Null;
        let summary = value.get("summary").unwrap_or(&empty);
        let metadata = value.get("metadata").unwrap_or(&empty);
        let timestamp = string_field(metadata, "timestamp", NOT_AVAILABLE);

        Self {
            summary: IdleAnalysisSummary {
                total_instances_analyzed: count_field(summary, "total_instances_analyzed"),
                idle_instances: count_field(summary, "idle_instances"),
                active_instances: count_field(summary, "active_instances"),
                potential_monthly_savings: decimal_field(summary, "potential_monthly_savings")
                    .unwrap_or(Decimal::ZERO),
                timestamp: timestamp.clone(),
            },
            metadata: AnalysisMetadata {
                timestamp,
                evaluation_period_minutes: count_field(metadata, "evaluation_period_minutes"),
                cpu_threshold: float_field(metadata, "cpu_threshold").unwrap_or(0.0),
                network_threshold: float_field(metadata, "network_threshold").unwrap_or(0.0),
            },
            detailed_analysis: instance_list(value, "detailed_analysis"),
            idle_instances: instance_list(value, "idle_instances"),
        }
    }

    /// Instance count per status, most common first
    pub fn status_distribution(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for inst in &self.detailed_analysis {
            *counts.entry(inst.status.as_str()).or_insert(0) += 1;
        }
        let mut distribution: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(status, count)| (status.to_string(), count))
            .collect();
        distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        distribution
    }

    /// Average-CPU histogram over instances that did not error
    pub fn cpu_histogram(&self, bins: usize) -> Vec<HistogramBin> {
        let values: Vec<f64> = self
            .detailed_analysis
            .iter()
            .filter(|inst| inst.status != "error")
            .filter_map(|inst| inst.avg_cpu)
            .filter(|v| v.is_finite())
            .collect();
        histogram(&values, bins)
    }
}

/// Read and parse the analysis document at `bucket`/`key`.
pub async fn load<S>(store: &S, bucket: &str, key: &str) -> Result<IdleAnalysis>
where
    S: ObjectStore + ?Sized,
{
    let value = fetch_json(store, bucket, key).await?;
    Ok(IdleAnalysis::from_json(&value))
}

/// Equal-width histogram between the smallest and largest value
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if max <= min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();
    for v in values {
        // The maximum lands in the last bin
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

fn instance_list(value: &Value, field: &str) -> Vec<InstanceAnalysis> {
    value
        .get(field)
        .and_then(|v| v.as_array())
        .map(|items| items.iter().map(parse_instance).collect())
        .unwrap_or_default()
}

fn parse_instance(item: &Value) -> InstanceAnalysis {
    InstanceAnalysis {
        instance_id: string_field(item, "instance_id", NOT_AVAILABLE),
        instance_type: string_field(item, "instance_type", NOT_AVAILABLE),
        status: string_field(item, "status", "unknown"),
        avg_cpu: float_field(item, "avg_cpu"),
        max_cpu: float_field(item, "max_cpu"),
        total_network: float_field(item, "total_network"),
        recommendation: string_field(item, "recommendation", ""),
        estimated_savings: decimal_field(item, "estimated_savings"),
    }
}

fn string_field(value: &Value, field: &str, default: &str) -> String {
    match value.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

fn float_field(value: &Value, field: &str) -> Option<f64> {
    match value.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn count_field(value: &Value, field: &str) -> u64 {
    match value.get(field) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

fn decimal_field(value: &Value, field: &str) -> Option<Decimal> {
    let text = match value.get(field)? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(Decimal::from_f64))
}
