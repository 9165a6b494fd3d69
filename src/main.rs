use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flowwatch::{server, simulate, App, Settings};

#[derive(Parser, Debug)]
#[command(name = "flowwatch")]
#[command(about = "Production-line health and KPI monitor")]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "FLOWWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Address for the line protocol listener (overrides server.listen)
    #[arg(short, long)]
    listen: Option<String>,

    /// Directory for persisted counters and events (overrides storage.data_dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Push simulated environment readings
    #[arg(long)]
    simulate_environment: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        settings.server.listen = listen;
    }
    if let Some(data_dir) = args.data_dir {
        settings.storage.data_dir = Some(data_dir);
    }
    if args.simulate_environment {
        settings.simulate.environment = true;
    }

    let app = Arc::new(App::build(&settings)?);
    let listener = TcpListener::bind(&settings.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", settings.server.listen))?;

    #[cfg(feature = "amqp")]
    let feed = {
        let amqp = settings.amqp.clone();
        let app = app.clone();
        tokio::spawn(async move {
            if let Err(e) = flowwatch::bus::run(amqp, app).await {
                tracing::error!(error = %format!("{e:#}"), "AMQP feed stopped");
            }
        })
    };
    #[cfg(not(feature = "amqp"))]
    app.feeds
        .set_status(flowwatch::app::AMQP_FEED, flowwatch::types::FeedStatus::Disabled);

    let simulator = if settings.simulate.environment {
        let period = settings.simulate.interval()?;
        Some(tokio::spawn(simulate::run_environment(
            app.environment.clone(),
            period,
        )))
    } else {
        None
    };

    let result = tokio::select! {
        served = server::serve(listener, app.clone()) => served.context("listener failed"),
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    };

    #[cfg(feature = "amqp")]
    feed.abort();
    if let Some(simulator) = simulator {
        simulator.abort();
    }

    result
}
