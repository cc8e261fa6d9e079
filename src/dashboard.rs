//! Interactive terminal dashboard
//!
//! Provides a ratatui-based dashboard with one tab per data source:
//! - Idle EC2 instance analysis (object store document)
//! - Cost Explorer breakdown by service
//! - Stale resources and estimated savings
//!
//! Fetched results are kept in a `DashboardSession` owned by the event loop.
//! Fetches run one at a time and block input until they finish.

use crate::context::AppContext;
use crate::error::Result;
use crate::report::format_money;
use crate::session::{DashboardSession, Fetch};
use chrono::{DateTime, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Paragraph, Row, Table, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tracing::debug;

const TAB_TITLES: [&str; 3] = ["Idle Analysis", "Costs", "Stale Resources"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Idle,
    Costs,
    Stale,
}

impl Section {
    fn from_index(i: usize) -> Self {
        match i {
            0 => Section::Idle,
            1 => Section::Costs,
            _ => Section::Stale,
        }
    }
}

struct DashboardState {
    selected_tab: usize,
    loading: Option<Section>,
    session: DashboardSession,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            selected_tab: 0,
            loading: None,
            session: DashboardSession::new(),
        }
    }
}

type Term = Terminal<CrosstermBackend<io::Stdout>>;

pub async fn run_dashboard(ctx: &AppContext) -> Result<()> {
    let mut terminal = init_terminal()?;
    let result = event_loop(&mut terminal, ctx).await;
    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(terminal: &mut Term, ctx: &AppContext) -> Result<()> {
    let mut state = DashboardState::default();

    // Idle analysis and costs load on open; stale detection waits for 'r'
    refresh(terminal, &mut state, ctx, Section::Idle).await?;
    refresh(terminal, &mut state, ctx, Section::Costs).await?;

    loop {
        terminal.draw(|f| render_dashboard(f, &state))?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Char('h') | KeyCode::Left => {
                    state.selected_tab = state.selected_tab.saturating_sub(1);
                }
                KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => {
                    state.selected_tab = (state.selected_tab + 1).min(TAB_TITLES.len() - 1);
                }
                KeyCode::Char('1') => state.selected_tab = 0,
                KeyCode::Char('2') => state.selected_tab = 1,
                KeyCode::Char('3') => state.selected_tab = 2,
                KeyCode::Char('r') => {
                    let section = Section::from_index(state.selected_tab);
                    refresh(terminal, &mut state, ctx, section).await?;
                }
                _ => {}
            }
        }
    }
    Ok(())
}

async fn refresh(
    terminal: &mut Term,
    state: &mut DashboardState,
    ctx: &AppContext,
    section: Section,
) -> Result<()> {
    state.loading = Some(section);
    terminal.draw(|f| render_dashboard(f, state))?;
    debug!("Refreshing {:?}", section);

    match section {
        Section::Idle => state.session.idle = Fetch::from_result(ctx.fetch_idle(None, None).await),
        Section::Costs => {
            state.session.costs = Fetch::from_result(ctx.fetch_costs(None, None, None).await)
        }
        Section::Stale => state.session.stale = Fetch::from_result(ctx.detect_stale().await),
    }
    state.loading = None;
    Ok(())
}

fn init_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn header_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

fn render_dashboard(f: &mut Frame, state: &DashboardState) {
    let size = f.size();

    let tabs = Tabs::new(TAB_TITLES.to_vec())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("AWS Cost Dashboard (←/→ switch, r refresh, q quit)"),
        )
        .select(state.selected_tab)
        .style(Style::default().fg(Color::White))
        .highlight_style(header_style());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(size);

    f.render_widget(tabs, chunks[0]);

    let section = Section::from_index(state.selected_tab);
    if state.loading == Some(section) {
        let loading = Paragraph::new("Fetching...")
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(loading, chunks[1]);
        return;
    }

    match section {
        Section::Idle => match &state.session.idle {
            Fetch::Loaded { data, at } => render_idle(f, chunks[1], data, at),
            other => render_placeholder(f, chunks[1], other, "No idle instance data loaded."),
        },
        Section::Costs => match &state.session.costs {
            Fetch::Loaded { data, at } => render_costs(f, chunks[1], data, at),
            other => render_placeholder(f, chunks[1], other, "No cost data loaded."),
        },
        Section::Stale => match &state.session.stale {
            Fetch::Loaded { data, at } => render_stale(f, chunks[1], data, at),
            other => render_placeholder(
                f,
                chunks[1],
                other,
                "Press 'r' to detect stale resources and estimate savings.",
            ),
        },
    }
}

fn render_placeholder<T>(f: &mut Frame, area: Rect, fetch: &Fetch<T>, not_fetched: &str) {
    let lines = match fetch {
        Fetch::Failed { message, retryable } => {
            let mut lines = vec![Line::from(Span::styled(
                format!("Fetch failed: {}", message),
                Style::default().fg(Color::Red),
            ))];
            if *retryable {
                lines.push(Line::from("Temporary failure; press 'r' to try again."));
            }
            lines
        }
        _ => vec![Line::from(not_fetched.to_string())],
    };
    let para = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(para, area);
}

fn fetched_at(at: &DateTime<Utc>) -> String {
    format!("fetched {}", at.format("%H:%M:%S UTC"))
}

fn render_idle(
    f: &mut Frame,
    area: Rect,
    analysis: &crate::idle_analysis::IdleAnalysis,
    at: &DateTime<Utc>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(6)])
        .split(area);

    let s = &analysis.summary;
    let summary = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Total: ", Style::default().fg(Color::Cyan)),
            Span::raw(s.total_instances_analyzed.to_string()),
            Span::raw(" | "),
            Span::styled("Idle: ", Style::default().fg(Color::Cyan)),
            Span::styled(s.idle_instances.to_string(), Style::default().fg(Color::Yellow)),
            Span::raw(" | "),
            Span::styled("Active: ", Style::default().fg(Color::Cyan)),
            Span::styled(s.active_instances.to_string(), Style::default().fg(Color::Green)),
            Span::raw(" | "),
            Span::styled("Potential Savings: ", Style::default().fg(Color::Cyan)),
            Span::styled(
                format_money(s.potential_monthly_savings),
                Style::default().fg(Color::Yellow),
            ),
        ]),
        Line::from(format!("Last updated: {} ({})", s.timestamp, fetched_at(at))),
    ])
    .block(Block::default().borders(Borders::ALL).title("Analysis Summary"));
    f.render_widget(summary, chunks[0]);

    let rows: Vec<Row> = analysis
        .detailed_analysis
        .iter()
        .map(|inst| {
            let status_style = match inst.status.as_str() {
                "idle" => Style::default().fg(Color::Yellow),
                "error" => Style::default().fg(Color::Red),
                _ => Style::default().fg(Color::Green),
            };
            Row::new(vec![
                Cell::from(inst.instance_id.clone()),
                Cell::from(inst.instance_type.clone()),
                Cell::from(inst.status.clone()).style(status_style),
                Cell::from(inst.avg_cpu.map(|v| format!("{:.2}%", v)).unwrap_or_default()),
                Cell::from(inst.max_cpu.map(|v| format!("{:.2}%", v)).unwrap_or_default()),
                Cell::from(inst.recommendation.clone()),
                Cell::from(inst.estimated_savings.map(format_money).unwrap_or_default()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(21),
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Min(16),
        Constraint::Length(12),
    ];
    let table = Table::new(rows, widths)
        .block(Block::default().borders(Borders::ALL).title("Instance Details"))
        .header(
            Row::new(vec![
                "Instance", "Type", "Status", "Avg CPU", "Max CPU", "Recommendation", "Savings",
            ])
            .style(header_style()),
        );
    f.render_widget(table, chunks[1]);

    let distribution: Vec<Line> = analysis
        .status_distribution()
        .into_iter()
        .map(|(status, count)| Line::from(format!("{:<12} {}", status, count)))
        .collect();
    let dist = Paragraph::new(distribution)
        .block(Block::default().borders(Borders::ALL).title("Status Distribution"));
    f.render_widget(dist, chunks[2]);
}

fn render_costs(
    f: &mut Frame,
    area: Rect,
    report: &crate::aggregate::CostReport,
    at: &DateTime<Utc>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let total = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("Total Cost ({}): ", report.range),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(format_money(report.total), Style::default().fg(Color::Yellow)),
        Span::raw(format!(" | {} | {}", report.granularity, fetched_at(at))),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Cost Summary"));
    f.render_widget(total, chunks[0]);

    if report.is_empty() {
        let empty = Paragraph::new("No cost data for this period. Make sure Cost Explorer is enabled.")
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(empty, chunks[1]);
        return;
    }

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let rows: Vec<Row> = report
        .by_service
        .iter()
        .map(|s| {
            Row::new(vec![
                Cell::from(s.service.clone()),
                Cell::from(format_money(s.cost)),
            ])
        })
        .collect();
    let table = Table::new(rows, [Constraint::Min(20), Constraint::Length(14)])
        .block(Block::default().borders(Borders::ALL).title("Cost by Service"))
        .header(Row::new(vec!["Service", "Cost"]).style(header_style()));
    f.render_widget(table, body[0]);

    // Bars are whole dollars; credits clamp to zero
    let labels: Vec<String> = report
        .by_service
        .iter()
        .take(8)
        .map(|s| s.service.chars().take(10).collect())
        .collect();
    let bars: Vec<(&str, u64)> = report
        .by_service
        .iter()
        .take(8)
        .zip(labels.iter())
        .map(|(s, label)| {
            let dollars = s.cost.round().max(Decimal::ZERO);
            (label.as_str(), dollars.to_u64().unwrap_or(0))
        })
        .collect();
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("Top Services ($)"))
        .data(bars.as_slice())
        .bar_width(10)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, body[1]);
}

fn render_stale(
    f: &mut Frame,
    area: Rect,
    report: &crate::stale::StaleReport,
    at: &DateTime<Utc>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Min(0),
        ])
        .split(area);

    let total = Paragraph::new(Line::from(vec![
        Span::styled("Potential Monthly Savings: ", Style::default().fg(Color::Cyan)),
        Span::styled(
            format_money(report.total_savings),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" | {} | {} (estimates)", report.region, fetched_at(at))),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Stale Resources"));
    f.render_widget(total, chunks[0]);

    let volumes: Vec<Row> = report
        .unattached_volumes
        .iter()
        .map(|v| {
            Row::new(vec![
                Cell::from(v.id.clone()),
                Cell::from(v.size_gib.to_string()),
                Cell::from(v.created_at.map(|d| d.to_string()).unwrap_or_default()),
                Cell::from(format_money(v.estimated_monthly_cost)),
            ])
        })
        .collect();
    let volumes = Table::new(
        volumes,
        [
            Constraint::Length(22),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(format!(
        "Unattached EBS Volumes ({})",
        report.unattached_volumes.len()
    )))
    .header(Row::new(vec!["Volume", "GiB", "Created", "Monthly"]).style(header_style()));
    f.render_widget(volumes, chunks[1]);

    let eips: Vec<Row> = report
        .unassociated_eips
        .iter()
        .map(|e| {
            Row::new(vec![
                Cell::from(e.public_ip.clone()),
                Cell::from(e.allocation_id.clone()),
                Cell::from(e.domain.clone()),
                Cell::from(format_money(e.estimated_monthly_cost)),
            ])
        })
        .collect();
    let eips = Table::new(
        eips,
        [
            Constraint::Length(16),
            Constraint::Length(26),
            Constraint::Length(10),
            Constraint::Length(12),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(format!(
        "Unassociated Elastic IPs ({})",
        report.unassociated_eips.len()
    )))
    .header(Row::new(vec!["Public IP", "Allocation", "Domain", "Monthly"]).style(header_style()));
    f.render_widget(eips, chunks[2]);

    let snapshots: Vec<Row> = report
        .old_snapshots
        .iter()
        .map(|s| {
            Row::new(vec![
                Cell::from(s.id.clone()),
                Cell::from(s.volume_id.clone()),
                Cell::from(s.started_at.to_string()),
                Cell::from(s.state.to_string()),
                Cell::from(s.size_gib.to_string()),
                Cell::from(format_money(s.estimated_monthly_cost)),
            ])
        })
        .collect();
    let snapshots = Table::new(
        snapshots,
        [
            Constraint::Length(24),
            Constraint::Length(22),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(12),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(format!(
        "Old Snapshots (>{} days, {})",
        report.snapshot_max_age_days,
        report.old_snapshots.len()
    )))
    .header(
        Row::new(vec!["Snapshot", "Volume", "Started", "State", "GiB", "Monthly"])
            .style(header_style()),
    );
    f.render_widget(snapshots, chunks[3]);
}
