use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use ec2_reservation_check::aws::Ec2Inventory;
use ec2_reservation_check::check::check_reservations;
use ec2_reservation_check::config::{init_config, parse_log_level, Config, OutputFormat, Overrides};
use ec2_reservation_check::report::{render_json, render_text, ReportOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ec2-check-reserved-instances")]
#[command(
    about = "Cross reference existing reservations to current instances",
    long_about = "Lists running EC2 instances and active reserved instances in one region,\nthen reports unused reservations and instances not covered by any reservation,\ngrouped by instance type, platform, and availability zone (or region)."
)]
#[command(version)]
struct Cli {
    /// AWS Region to connect to (default: us-east-1)
    #[arg(short, long, env = "AWS_REGION")]
    region: Option<String>,

    /// Change log level (default: warn)
    #[arg(long, value_name = "LEVEL")]
    log: Option<String>,

    /// Append instance names to unreserved instance lines
    #[arg(short, long)]
    names: bool,

    /// Output format
    #[arg(long, value_enum)]
    output: Option<OutputFormat>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a default configuration file to PATH and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = cli.init_config {
        return init_config(&path);
    }

    let config = Config::load(cli.config.as_deref())?.with_overrides(Overrides {
        region: cli.region,
        log_level: cli.log,
        names: cli.names,
        output: cli.output,
    });

    // Diagnostics go to stderr; stdout carries only the report
    let level = parse_log_level(&config.log_level)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::default().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let provider = Ec2Inventory::connect(&config.region).await;
    let reconciliation = check_reservations(&provider).await?;

    let options = ReportOptions {
        include_names: config.names,
    };
    match config.output {
        OutputFormat::Text => print!("{}", render_text(&reconciliation, &options)),
        OutputFormat::Json => println!(
            "{}",
            render_json(&reconciliation, &options, &config.region, Utc::now())?
        ),
    }

    Ok(())
}
