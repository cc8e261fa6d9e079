//! Text rendering of fetched results for the CLI

use crate::aggregate::CostReport;
use crate::idle_analysis::{IdleAnalysis, HISTOGRAM_BINS};
use crate::stale::StaleReport;
use comfy_table::{Cell, Color, Table};
use rust_decimal::Decimal;
use std::fmt::Write;

/// `$1,234.56`, with a leading minus for credits
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, frac)
}

fn optional(value: Option<f64>, suffix: &str, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}{}", precision, v, suffix))
        .unwrap_or_else(|| "-".to_string())
}

pub fn render_idle(analysis: &IdleAnalysis) -> String {
    let mut out = String::new();
    let s = &analysis.summary;
    let _ = writeln!(out, "EC2 Idle Instance Analysis");
    let _ = writeln!(out, "  Total instances:   {}", s.total_instances_analyzed);
    let _ = writeln!(out, "  Idle instances:    {}", s.idle_instances);
    let _ = writeln!(out, "  Active instances:  {}", s.active_instances);
    let _ = writeln!(out, "  Potential savings: {}", format_money(s.potential_monthly_savings));
    let _ = writeln!(out, "  Last updated:      {}", s.timestamp);
    let m = &analysis.metadata;
    let _ = writeln!(
        out,
        "  Evaluation: {} minutes, CPU threshold {}%, network threshold {} bytes",
        m.evaluation_period_minutes, m.cpu_threshold, m.network_threshold
    );

    if analysis.detailed_analysis.is_empty() {
        let _ = writeln!(out, "\nNo detailed analysis available.");
        return out;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Instance ID",
        "Type",
        "Status",
        "Avg CPU",
        "Max CPU",
        "Network",
        "Recommendation",
        "Savings",
    ]);
    for inst in &analysis.detailed_analysis {
        let status = match inst.status.as_str() {
            "idle" => Cell::new(&inst.status).fg(Color::Yellow),
            "error" => Cell::new(&inst.status).fg(Color::Red),
            _ => Cell::new(&inst.status).fg(Color::Green),
        };
        table.add_row(vec![
            Cell::new(&inst.instance_id),
            Cell::new(&inst.instance_type),
            status,
            Cell::new(optional(inst.avg_cpu, "%", 2)),
            Cell::new(optional(inst.max_cpu, "%", 2)),
            Cell::new(optional(inst.total_network, " bytes", 0)),
            Cell::new(&inst.recommendation),
            Cell::new(
                inst.estimated_savings
                    .map(format_money)
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    let _ = writeln!(out, "\n{}", table);

    let _ = writeln!(out, "\nStatus distribution:");
    for (status, count) in analysis.status_distribution() {
        let _ = writeln!(out, "  {:<12} {}", status, count);
    }

    let bins = analysis.cpu_histogram(HISTOGRAM_BINS);
    if !bins.is_empty() {
        let _ = writeln!(out, "\nAverage CPU distribution:");
        for bin in bins.iter().filter(|b| b.count > 0) {
            let _ = writeln!(
                out,
                "  {:>6.2}% - {:>6.2}%  {}",
                bin.lower,
                bin.upper,
                "#".repeat(bin.count)
            );
        }
    }

    if !analysis.idle_instances.is_empty() {
        let _ = writeln!(out, "\nIdle instances (action required):");
        for inst in &analysis.idle_instances {
            let _ = writeln!(
                out,
                "  {} ({}) avg CPU {} - {}/month",
                inst.instance_id,
                inst.instance_type,
                optional(inst.avg_cpu, "%", 2),
                inst.estimated_savings
                    .map(format_money)
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }
    out
}

pub fn render_costs(report: &CostReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Total Cost ({}, {}): {}",
        report.range,
        report.granularity,
        format_money(report.total)
    );

    if report.is_empty() {
        let _ = writeln!(
            out,
            "No cost data for this period. Make sure Cost Explorer is enabled."
        );
        return out;
    }

    let mut by_service = Table::new();
    by_service.set_header(vec!["Service", "Cost"]);
    for entry in &report.by_service {
        by_service.add_row(vec![Cell::new(&entry.service), Cell::new(format_money(entry.cost))]);
    }
    let _ = writeln!(out, "\nCost by Service\n{}", by_service);

    let mut rows = report.rows.clone();
    rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| b.cost.cmp(&a.cost)));
    let mut series = Table::new();
    series.set_header(vec!["Date", "Service", "Cost"]);
    for row in &rows {
        series.add_row(vec![
            Cell::new(row.date),
            Cell::new(&row.service),
            Cell::new(format_money(row.cost)),
        ]);
    }
    let _ = writeln!(out, "\nCost by Date and Service\n{}", series);
    out
}

pub fn render_stale(report: &StaleReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Potential Monthly Savings: {} ({})",
        format_money(report.total_savings),
        report.region
    );
    let _ = writeln!(
        out,
        "Estimates use flat illustrative rates, not billing data."
    );

    let _ = writeln!(out, "\nUnattached EBS Volumes ({})", format_money(report.volumes_total()));
    if report.unattached_volumes.is_empty() {
        let _ = writeln!(out, "  No unattached volumes found.");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["Volume ID", "Size (GiB)", "Created", "Region", "Est. Monthly"]);
        for v in &report.unattached_volumes {
            table.add_row(vec![
                Cell::new(&v.id),
                Cell::new(v.size_gib),
                Cell::new(
                    v.created_at
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(&v.region),
                Cell::new(format_money(v.estimated_monthly_cost)),
            ]);
        }
        let _ = writeln!(out, "{}", table);
    }

    let _ = writeln!(out, "\nUnassociated Elastic IPs ({})", format_money(report.eips_total()));
    if report.unassociated_eips.is_empty() {
        let _ = writeln!(out, "  No unassociated Elastic IPs found.");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["Public IP", "Allocation ID", "Domain", "Est. Monthly"]);
        for e in &report.unassociated_eips {
            table.add_row(vec![
                Cell::new(&e.public_ip),
                Cell::new(&e.allocation_id),
                Cell::new(&e.domain),
                Cell::new(format_money(e.estimated_monthly_cost)),
            ]);
        }
        let _ = writeln!(out, "{}", table);
    }

    let _ = writeln!(
        out,
        "\nOld Snapshots (>{} days, {})",
        report.snapshot_max_age_days,
        format_money(report.snapshots_total())
    );
    if report.old_snapshots.is_empty() {
        let _ = writeln!(out, "  No old snapshots found.");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["Snapshot ID", "Volume ID", "Started", "State", "Size (GiB)", "Est. Monthly"]);
        for s in &report.old_snapshots {
            table.add_row(vec![
                Cell::new(&s.id),
                Cell::new(&s.volume_id),
                Cell::new(s.started_at),
                Cell::new(s.state),
                Cell::new(s.size_gib),
                Cell::new(format_money(s.estimated_monthly_cost)),
            ]);
        }
        let _ = writeln!(out, "{}", table);
    }
    out
}
