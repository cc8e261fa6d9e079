//! End-to-end tests against a real AWS account
//!
//! These tests are read-only but need credentials with S3, Cost Explorer and
//! EC2 describe permissions. Cost Explorer requests are billed per call.
//! Run with: COSTDASH_E2E=1 cargo test --test e2e_aws_test --features e2e -- --ignored

#![cfg(feature = "e2e")]

use costdash::config::Config;
use costdash::context::AppContext;
use costdash::error::CostdashError;
use std::env;

fn should_run_e2e() -> bool {
    env::var("COSTDASH_E2E").is_ok()
}

async fn live_context() -> AppContext {
    AppContext::from_config(Config::default()).await
}

#[tokio::test]
#[ignore] // Requires AWS credentials and explicit opt-in
async fn test_detect_stale_resources_live() {
    if !should_run_e2e() {
        eprintln!("Skipping E2E test. Set COSTDASH_E2E=1 to run");
        return;
    }

    let ctx = live_context().await;
    let report = ctx.detect_stale().await.expect("stale detection failed");
    println!(
        "{} stale resources in {}, ${}/month",
        report.resource_count(),
        report.region,
        report.total_savings.round_dp(2)
    );
    assert_eq!(
        report.total_savings,
        report.volumes_total() + report.eips_total() + report.snapshots_total()
    );
}

#[tokio::test]
#[ignore] // Requires AWS credentials and explicit opt-in
async fn test_fetch_costs_last_week_live() {
    if !should_run_e2e() {
        eprintln!("Skipping E2E test. Set COSTDASH_E2E=1 to run");
        return;
    }

    let ctx = live_context().await;
    let report = ctx.fetch_costs(None, None, None).await.expect("cost query failed");
    assert_eq!(report.range.days(), 7);
    let sum: rust_decimal::Decimal = report.by_service.iter().map(|s| s.cost).sum();
    assert_eq!(sum, report.total);
}

#[tokio::test]
#[ignore] // Requires AWS credentials and explicit opt-in
async fn test_missing_object_is_not_found_live() {
    if !should_run_e2e() {
        eprintln!("Skipping E2E test. Set COSTDASH_E2E=1 to run");
        return;
    }

    let bucket = match env::var("COSTDASH_E2E_BUCKET") {
        Ok(b) => b,
        Err(_) => {
            eprintln!("Skipping: COSTDASH_E2E_BUCKET not set");
            return;
        }
    };

    let ctx = live_context().await;
    let err = ctx
        .fetch_idle(Some(&bucket), Some("costdash-e2e/definitely-missing.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, CostdashError::NotFound { .. }));
}
