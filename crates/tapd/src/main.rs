//! tapd — the tap-control daemon.
//!
//! Serves tap-changer control decisions to the grid simulator:
//! - Registers its callback URL with the simulator
//! - Answers `POST /calculateControl/` with a control decision
//! - Answers `GET /heartbeat/` for liveness
//!
//! # Usage
//!
//! ```text
//! BACKEND_URL=http://simulator:3000/ tapd serve --port 7777
//! tapd print-config > tapd.toml
//! ```

mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use tap_core::{Controller, ServiceConfig};
use tapgrid_register::{Registrar, RegistrationOutcome};

use settings::{Overrides, Settings};

const DEFAULT_LOG_FILTER: &str = "info,tapd=debug,tapgrid=debug,tap_core=debug";

#[derive(Parser)]
#[command(name = "tapd", about = "Tap-changer control daemon", version)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Register with the simulator and serve control decisions.
    Serve {
        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (default 7777).
        #[arg(long)]
        port: Option<u16>,

        /// Base URL of the simulator.
        #[arg(long, env = "BACKEND_URL")]
        backend_url: Option<String>,

        /// URL the simulator should use to reach this service.
        #[arg(long, env = "STUDENTTASK_URL")]
        studenttask_url: Option<String>,

        /// Serve without registering with the simulator.
        #[arg(long)]
        skip_registration: bool,
    },
    /// Print the effective configuration as TOML.
    PrintConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve {
            config,
            port,
            backend_url,
            studenttask_url,
            skip_registration,
        } => {
            let config = load_config(config.as_deref())?;
            let settings = Settings::resolve(
                config,
                Overrides {
                    port,
                    backend_url,
                    studenttask_url,
                    skip_registration,
                },
            )?;
            run_serve(settings).await
        }
        Command::PrintConfig { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<ServiceConfig> {
    match path {
        Some(path) => {
            let config = ServiceConfig::from_file(path)?;
            info!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(ServiceConfig::default()),
    }
}

async fn run_serve(settings: Settings) -> anyhow::Result<()> {
    info!("tap-control daemon starting");
    info!(simulator = %settings.endpoints.simulator_url, "simulator url");
    info!(studenttask = %settings.endpoints.studenttask_url, "own url");

    // ── Controller ─────────────────────────────────────────────

    let controller = Arc::new(Controller::new(settings.controller.clone()));
    info!(
        nominal_voltage = settings.controller.nominal_voltage,
        range_control = ?settings.controller.range_control,
        "controller initialized"
    );

    // ── API listener ───────────────────────────────────────────

    let router = tapgrid_api::build_router(controller);
    let listener = tokio::net::TcpListener::bind(settings.listen).await?;
    info!(addr = %settings.listen, "API server listening");

    // ── Registration ───────────────────────────────────────────

    // The listener is already bound, so the simulator's first calls queue
    // until the server loop starts.
    if settings.registration.enabled {
        let registrar = Registrar::new(
            settings.endpoints.simulator_url.clone(),
            settings.endpoints.studenttask_url.clone(),
        )
        .with_timeout(settings.registration_timeout())
        .with_attempts(settings.registration.attempts)
        .with_backoff(settings.registration_backoff());

        let outcome = registrar
            .register()
            .await
            .context("registration with simulator failed (use --skip-registration to serve anyway)")?;
        if let RegistrationOutcome::Rejected { status } = outcome {
            warn!(status, "simulator did not accept registration, serving anyway");
        }
    } else {
        info!("registration disabled");
    }

    // ── Serve ──────────────────────────────────────────────────

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("tap-control daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!(error = %e, "failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    }
}
