use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use costdash::billing::Granularity;
use costdash::commands::{self, OutputFormat};
use costdash::config::{self, Config};
use costdash::context::AppContext;
use costdash::dashboard;
use costdash::exit_codes::exit_code_for_anyhow;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "costdash")]
#[command(
    about = "AWS cost optimization dashboard",
    long_about = "costdash shows where AWS money goes and where it could be saved.\n\nData sources:\n  - Idle EC2 instance analysis stored in S3 by an external job\n  - Cost Explorer unblended cost grouped by service\n  - Live EC2 inventory (unattached volumes, unassociated Elastic IPs, old snapshots)\n\nSavings figures are estimates from flat illustrative rates, not billing data."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "COSTDASH_CONFIG")]
    config: Option<PathBuf>,

    /// AWS region (overrides config and SDK defaults)
    #[arg(long, global = true, env = "COSTDASH_REGION")]
    region: Option<String>,

    /// AWS profile name
    #[arg(long, global = true, env = "COSTDASH_PROFILE")]
    profile: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the idle EC2 instance analysis stored in S3
    Idle {
        /// S3 bucket holding the analysis document
        #[arg(long)]
        bucket: Option<String>,
        /// S3 key of the analysis document
        #[arg(long)]
        key: Option<String>,
        /// Run a fresh analysis before reading the results
        #[arg(long)]
        invoke: bool,
        /// Print the stored document unchanged, as JSON
        #[arg(long)]
        raw: bool,
    },
    /// Show Cost Explorer cost grouped by service
    Costs {
        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Day after the last day of the range (YYYY-MM-DD, exclusive)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Time-bucket size
        #[arg(long, value_enum)]
        granularity: Option<Granularity>,
    },
    /// Detect stale resources and estimate monthly savings
    Stale,
    /// Interactive terminal dashboard
    Dashboard,
    /// Write a default configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = ".costdash.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise warnings only unless --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    // Machine-readable runs get machine-readable logs
    if cli.output == OutputFormat::Json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    if let Err(e) = run(cli).await {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(exit_code_for_anyhow(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { output } = &cli.command {
        config::init_config(output)?;
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.region.is_some() {
        config.aws.region = cli.region.clone();
    }
    if cli.profile.is_some() {
        config.aws.profile = cli.profile.clone();
    }

    let ctx = AppContext::from_config(config).await;

    match cli.command {
        Commands::Idle {
            bucket,
            key,
            invoke,
            raw,
        } => {
            commands::show_idle(&ctx, bucket.as_deref(), key.as_deref(), invoke, raw, cli.output)
                .await?;
        }
        Commands::Costs {
            start,
            end,
            granularity,
        } => {
            commands::show_costs(&ctx, start, end, granularity, cli.output).await?;
        }
        Commands::Stale => {
            commands::show_stale(&ctx, cli.output).await?;
        }
        Commands::Dashboard => {
            dashboard::run_dashboard(&ctx).await?;
        }
        Commands::Init { .. } => unreachable!("handled before loading config"),
    }

    Ok(())
}
