//! treectld - Fat-Tree SDN Controller Daemon
//!
//! Reads newline-delimited JSON fabric events on stdin, dispatches them to
//! the controller, and writes every command it issues as one JSON line on
//! stdout. Logs go to stderr.

use anyhow::Context;
use clap::Parser;
use sdn_flow::ChannelFabric;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use treectld::{
    Controller, ControllerConfig, Dispatcher, FabricEvent, ForwardingMode, DEFAULT_CONFIG_PATH,
};

/// Storm-safe L2 learning controller for fat-tree switch fabrics
#[derive(Parser, Debug)]
#[command(name = "treectld")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Fat-tree branch factor; overrides the configuration file
    #[arg(short = 'k', long)]
    branch_factor: Option<u32>,

    /// Forwarding mode; overrides the configuration file
    #[arg(short, long, value_enum)]
    mode: Option<ForwardingMode>,

    /// Copy flooded frames to the controller
    #[arg(long)]
    punt_to_controller: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting treectld ---");

    match run(args).await {
        Ok(()) => {
            info!("treectld exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("treectld exiting with error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<ControllerConfig> {
    let mut config = ControllerConfig::load_or_default(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    if let Some(branch_factor) = args.branch_factor {
        config.branch_factor = branch_factor;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if args.punt_to_controller {
        config.punt_to_controller = true;
    }

    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    info!(
        mode = %config.mode,
        branch_factor = config.branch_factor,
        punt_to_controller = config.punt_to_controller,
        neighbors = config.neighbors.len(),
        "configuration loaded"
    );

    let (fabric, mut commands) = ChannelFabric::new();
    let controller = Controller::new(config, Arc::new(fabric)).context("invalid configuration")?;
    let dispatcher = Dispatcher::new();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(command) = commands.recv().await {
            let mut line = serde_json::to_vec(&command)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
        }
        stdout.flush().await?;
        Ok::<(), anyhow::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no: u64 = 0;
    while let Some(line) = lines.next_line().await.context("failed to read events")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<FabricEvent>(line) {
            Ok(event) => {
                dispatcher.dispatch(&controller, event);
            }
            Err(e) => warn!(line = line_no, error = %e, "skipping unparseable event"),
        }
    }

    let stats = controller.stats().snapshot();
    info!(
        switches = controller.store().switch_count(),
        ?stats,
        "event stream closed"
    );

    // Dropping the controller closes the command channel and ends the writer.
    drop(controller);
    writer.await.context("command writer panicked")??;
    Ok(())
}
