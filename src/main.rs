//! Gemvault HTTP server
//!
//! Permission policy, approvals, emergency access and audit for the
//! inventory dashboard.

use clap::Parser;
use gemvault::{
    build_state,
    config::{LogFormat, load_config},
    router,
    server::{HttpConfig, run_http},
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Gemvault - permission and approval governance
#[derive(Parser, Debug)]
#[command(name = "gemvault")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "GEMVAULT_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "GEMVAULT_LOG_LEVEL")]
    log_level: Option<String>,

    /// HTTP server host; overrides the config file
    #[arg(long, env = "GEMVAULT_HTTP_HOST")]
    host: Option<String>,

    /// HTTP server port; overrides the config file
    #[arg(long, env = "GEMVAULT_HTTP_PORT")]
    port: Option<u16>,
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level, config.logging.format);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting gemvault");

    let state = build_state(&config)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to initialise governance"))?;

    let host = args.host.as_deref().unwrap_or(&config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let http_config = HttpConfig::from_host_port(host, port)?
        .with_cors_origins(config.server.cors_origins.clone());

    run_http(router(state), http_config).await
}
