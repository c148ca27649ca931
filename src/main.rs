//! ckPayment Dashboard CLI
//!
//! - `watch`: run the synchronization loop against a canister gateway
//! - `synthetic`: print one synthetic snapshot as JSON
//! - `init-config`: print a default configuration file

use ckpay_dashboard::config::{generate_default_config, Config, LoggingConfig};
use ckpay_dashboard::remote::GatewayClient;
use ckpay_dashboard::sync::{DashboardSync, DashboardView};
use ckpay_dashboard::synthetic::SyntheticGenerator;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "ckpay-dashboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resilient data synchronization for the ckPayment dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronize continuously and log every published view
    Watch {
        /// Gateway URL
        #[arg(long)]
        gateway: Option<String>,
        /// Bearer token for the gateway
        #[arg(long)]
        token: Option<String>,
        /// Source to select
        #[arg(long)]
        source: Option<String>,
    },

    /// Print one synthetic snapshot as JSON
    Synthetic,

    /// Print a default configuration file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    match cli.command {
        Commands::Watch {
            gateway,
            token,
            source,
        } => {
            if let Some(url) = gateway {
                config.gateway.url = url;
            }
            if let Some(token) = token {
                config.gateway.token = Some(token);
            }
            if let Some(source) = source {
                config.gateway.source = Some(source);
            }

            init_tracing(&config.logging);
            watch(config).await?;
        }

        Commands::Synthetic => {
            let generator = SyntheticGenerator::new(config.synthetic_config());
            let snapshot = generator.generate_snapshot().await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }

        Commands::InitConfig => {
            print!("{}", generate_default_config());
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ckpay_dashboard={}", logging.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

async fn watch(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Starting ckPayment dashboard sync v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(gateway = %config.gateway.url, "Using canister gateway");

    let gateway = Arc::new(GatewayClient::new(config.gateway_config())?);
    let synthetic = Arc::new(SyntheticGenerator::new(config.synthetic_config()));
    let sync = DashboardSync::new(gateway, config.credential(), synthetic, config.sync_options());

    if let Some(source) = &config.gateway.source {
        sync.select_source(source.clone()).await?;
    }

    let mut views = sync.subscribe();

    if let Err(e) = sync.load(false).await {
        tracing::error!(error = %e, "Initial load failed");
    }
    report(&views.borrow_and_update());

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                report(&view);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down...");
                break;
            }
        }
    }

    sync.shutdown().await;
    tracing::info!("Dashboard sync shutdown complete");
    Ok(())
}

fn report(view: &DashboardView) {
    let state = &view.state;
    if state.is_loading || state.is_refreshing {
        tracing::debug!(status = %state.connection_status, "Load in flight");
        return;
    }

    if let Some(error) = &state.error {
        tracing::warn!(kind = %error.kind, details = ?error.details, "{}", error.message);
    }

    match &view.snapshot {
        Some(snapshot) => tracing::info!(
            status = %state.connection_status,
            synthetic = state.is_using_synthetic_data,
            quality = ?view.health.quality(),
            errors = view.health.error_count(),
            source = ?snapshot.selected_source.as_ref().map(|s| s.id.as_str()),
            payments = snapshot.analytics.as_ref().map_or(0, |m| m.payments),
            transactions = snapshot.transactions.len(),
            "Dashboard view"
        ),
        None => tracing::info!(
            status = %state.connection_status,
            quality = ?view.health.quality(),
            "Dashboard view without data"
        ),
    }
}
