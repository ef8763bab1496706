//! DRA Resources
//!
//! Prints one row per cluster node with its CPU, memory and storage
//! headroom and a tally of its dynamically allocatable devices.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dra_resources::{
    render, ClusterReport, ClusterSnapshot, DisplayNameResolver, KubeSource, KubeSourceConfig,
    OutputFormat, Reconciler, Result,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// DRA Resources - node capacity and device availability report
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the kubeconfig file
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, env = "KUBE_CONTEXT")]
    context: Option<String>,

    /// Report on a saved snapshot (JSON or YAML) instead of a live cluster
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Output format
    #[arg(short, long, env = "DRA_OUTPUT", value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Also list every device with its allocation status
    #[arg(long)]
    devices: bool,

    /// Objects requested per list call
    #[arg(long, default_value = "500")]
    page_size: u32,

    /// Stop retrying transient API failures after this many seconds
    #[arg(long, default_value = "30")]
    retry_timeout_secs: u64,

    /// Name devices of DRIVER by their ATTRIBUTE (DRIVER=ATTRIBUTE, repeatable)
    #[arg(long = "product-attribute", env = "DRA_PRODUCT_ATTRIBUTES", value_delimiter = ',')]
    product_attributes: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args);

    if let Err(e) = run(args).await {
        error!("Report failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Starting DRA Resources v{}", dra_resources::VERSION);

    let mut names = DisplayNameResolver::default();
    for spec in &args.product_attributes {
        let (driver, rule) = DisplayNameResolver::parse_rule(spec)?;
        debug!("Naming rule for {}: {:?}", driver, rule);
        names = names.with_rule(driver, rule);
    }
    let reconciler = Reconciler::new(names);

    let snapshot = match &args.snapshot {
        Some(path) => ClusterSnapshot::from_file(path)?,
        None => {
            let source = KubeSource::connect(KubeSourceConfig {
                kubeconfig: args.kubeconfig.clone(),
                context: args.context.clone(),
                page_size: args.page_size,
                retry_timeout: Duration::from_secs(args.retry_timeout_secs),
            })
            .await?;
            ClusterSnapshot::fetch(&source).await?
        }
    };

    let nodes = reconciler.reconcile_snapshot(&snapshot);
    let devices = args.devices.then(|| reconciler.inventory(&snapshot));
    let report = ClusterReport::new(nodes, devices);

    println!("{}", render(&report, args.output)?);
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=warn", "tower=warn", "rustls=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
