//! Cost aggregation over billing rows
//!
//! Pure functions: no ordering is assumed on input rows, and an empty input
//! is a valid result (zero total, no services), distinct from a failed fetch.

use crate::billing::{CostRow, DateRange, Granularity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sum of all cost values
pub fn total_cost(rows: &[CostRow]) -> Decimal {
    rows.iter().map(|r| r.cost).sum()
}

/// Cost per service, independent of date
pub fn by_service(rows: &[CostRow]) -> BTreeMap<String, Decimal> {
    let mut totals = BTreeMap::new();
    for row in rows {
        *totals.entry(row.service.clone()).or_insert(Decimal::ZERO) += row.cost;
    }
    totals
}

/// Rows as returned, for time-series charting
pub fn by_date_and_service(rows: &[CostRow]) -> &[CostRow] {
    rows
}

/// Per-service totals ordered by cost descending, ties broken by name
pub fn ranked_services(totals: &BTreeMap<String, Decimal>) -> Vec<ServiceCost> {
    let mut ranked: Vec<ServiceCost> = totals
        .iter()
        .map(|(service, cost)| ServiceCost {
            service: service.clone(),
            cost: *cost,
        })
        .collect();
    ranked.sort_by(|a, b| b.cost.cmp(&a.cost).then_with(|| a.service.cmp(&b.service)));
    ranked
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCost {
    pub service: String,
    pub cost: Decimal,
}

/// A fetched billing period with its aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostReport {
    pub range: DateRange,
    pub granularity: Granularity,
    pub rows: Vec<CostRow>,
    pub total: Decimal,
    pub by_service: Vec<ServiceCost>,
}

impl CostReport {
    pub fn new(range: DateRange, granularity: Granularity, rows: Vec<CostRow>) -> Self {
        let total = total_cost(&rows);
        let by_service = ranked_services(&by_service(&rows));
        Self {
            range,
            granularity,
            rows,
            total,
            by_service,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn row(date: &str, service: &str, cost: Decimal) -> CostRow {
        CostRow {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            service: service.to_string(),
            cost,
        }
    }

    #[test]
    fn test_total_of_empty_is_zero() {
        assert_eq!(total_cost(&[]), Decimal::ZERO);
        assert!(by_service(&[]).is_empty());
    }

    #[test]
    fn test_by_service_groups_across_dates() {
        let rows = vec![
            row("2024-01-01", "S3", dec!(10)),
            row("2024-01-02", "S3", dec!(5)),
            row("2024-01-01", "EC2", dec!(20)),
        ];
        let grouped = by_service(&rows);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["S3"], dec!(15));
        assert_eq!(grouped["EC2"], dec!(20));
        assert_eq!(total_cost(&rows), dec!(35));
    }

    #[test]
    fn test_credits_reduce_totals() {
        let rows = vec![
            row("2024-01-01", "EC2", dec!(20)),
            row("2024-01-02", "EC2", dec!(-25)),
        ];
        assert_eq!(total_cost(&rows), dec!(-5));
        assert_eq!(by_service(&rows)["EC2"], dec!(-5));
    }

    #[test]
    fn test_ranked_services_descending_with_name_ties() {
        let rows = vec![
            row("2024-01-01", "b", dec!(1)),
            row("2024-01-01", "a", dec!(1)),
            row("2024-01-01", "c", dec!(9)),
        ];
        let ranked = ranked_services(&by_service(&rows));
        let names: Vec<_> = ranked.iter().map(|s| s.service.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_passthrough_keeps_rows() {
        let rows = vec![
            row("2024-01-02", "S3", dec!(1)),
            row("2024-01-01", "S3", dec!(2)),
        ];
        assert_eq!(by_date_and_service(&rows), rows.as_slice());
    }

    #[test]
    fn test_report_empty_is_valid() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
        )
        .unwrap();
        let report = CostReport::new(range, Granularity::Daily, Vec::new());
        assert!(report.is_empty());
        assert_eq!(report.total, Decimal::ZERO);
        assert!(report.by_service.is_empty());
    }
}
