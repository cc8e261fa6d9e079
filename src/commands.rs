//! CLI command handlers
//!
//! Each handler runs one fetch through `AppContext` and prints either a
//! text report or pretty JSON.

use crate::billing::Granularity;
use crate::context::AppContext;
use crate::error::Result;
use crate::report;
use chrono::NaiveDate;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn spinner(output: OutputFormat, message: &str) -> Option<ProgressBar> {
    if output == OutputFormat::Json {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn finish(pb: Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn show_idle(
    ctx: &AppContext,
    bucket: Option<&str>,
    key: Option<&str>,
    invoke: bool,
    raw: bool,
    output: OutputFormat,
) -> Result<()> {
    if invoke {
        let pb = spinner(output, "Invoking analysis function...");
        let result = ctx.run_analysis(None).await;
        finish(pb);
        result?;
        if output == OutputFormat::Text {
            println!("{}", style("Analysis completed, reading results...").green());
        }
    }

    if raw {
        let document = ctx.fetch_idle_raw(bucket, key).await?;
        return print_json(&document);
    }

    let pb = spinner(output, "Reading idle instance analysis...");
    let result = ctx.fetch_idle(bucket, key).await;
    finish(pb);
    let analysis = result?;

    match output {
        OutputFormat::Json => print_json(&analysis),
        OutputFormat::Text => {
            print!("{}", report::render_idle(&analysis));
            Ok(())
        }
    }
}

pub async fn show_costs(
    ctx: &AppContext,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    granularity: Option<Granularity>,
    output: OutputFormat,
) -> Result<()> {
    let pb = spinner(output, "Fetching cost data...");
    let result = ctx.fetch_costs(start, end, granularity).await;
    finish(pb);
    let cost_report = result?;

    match output {
        OutputFormat::Json => print_json(&cost_report),
        OutputFormat::Text => {
            print!("{}", report::render_costs(&cost_report));
            Ok(())
        }
    }
}

pub async fn show_stale(ctx: &AppContext, output: OutputFormat) -> Result<()> {
    let pb = spinner(output, "Detecting stale resources...");
    let result = ctx.detect_stale().await;
    finish(pb);
    let stale_report = result?;

    match output {
        OutputFormat::Json => print_json(&stale_report),
        OutputFormat::Text => {
            print!("{}", report::render_stale(&stale_report));
            Ok(())
        }
    }
}
