use clap::Parser;
use pagesnap::{server, Config, RenderService, SessionPool};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "pagesnap")]
#[command(about = "Headless-browser web render service")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Configuration file path (JSON)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Address to bind")]
    host: Option<String>,

    #[arg(long, help = "Port to bind")]
    port: Option<u16>,

    #[arg(long, help = "Base URL of a remote rendering peer")]
    remote_url: Option<String>,

    #[arg(long, help = "Skip local rendering and use the remote peer only")]
    remote_only: bool,

    #[arg(long, help = "Chrome executable path")]
    chrome_path: Option<String>,

    #[arg(long, help = "Run the browser headful and keep pages open")]
    debug: bool,

    #[arg(long, help = "Enable verbose logging")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    setup_logging(args.verbose)?;

    info!("Starting pagesnap v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;

    // A failed browser launch is not fatal: with a remote peer configured the
    // service degrades to remote-only, otherwise requests get 503 until a
    // restart.
    let pool = if args.remote_only && config.remote_url.is_some() {
        info!("Remote-only mode, skipping browser launch");
        None
    } else {
        match SessionPool::launch(config.clone()).await {
            Ok(pool) => Some(Arc::new(pool)),
            Err(e) => {
                error!("Browser launch failed: {}", e);
                if config.remote_url.is_none() {
                    warn!("No remote peer configured, render requests will fail");
                }
                None
            }
        }
    };

    let service = Arc::new(RenderService::new(config.clone(), pool)?);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    server::serve(service.clone(), addr, shutdown_signal()).await?;

    info!("Shutting down...");
    service.shutdown().await;
    info!("pagesnap stopped");
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    Ok(())
}

async fn load_config(args: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if let Some(config_path) = &args.config {
        let config_content = tokio::fs::read_to_string(config_path).await?;
        serde_json::from_str(&config_content)?
    } else {
        Config::default()
    };

    // Override with CLI arguments
    if let Some(host) = &args.host {
        config.host = host.clone();
    }

    if let Some(port) = args.port {
        config.port = port;
    }

    if let Some(remote_url) = &args.remote_url {
        config.remote_url = Some(remote_url.clone());
    }

    if args.remote_only {
        config.remote_only = true;
    }

    if let Some(chrome_path) = &args.chrome_path {
        config.chrome_path = Some(chrome_path.clone());
    }

    if args.debug {
        config.debug = true;
    }

    validate_config(&config)?;

    info!("Configuration loaded successfully");
    info!("Max segment height: {}", config.max_segment_height);
    info!("Navigation timeout: {:?}", config.navigation_timeout);
    if let Some(remote) = &config.remote_url {
        info!("Remote peer: {}", remote);
    }

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if config.max_segment_height == 0 {
        return Err("Max segment height must be greater than 0".into());
    }

    if config.device_scale_factor <= 0.0 {
        return Err("Device scale factor must be greater than 0".into());
    }

    if config.navigation_timeout.as_secs() == 0 {
        return Err("Navigation timeout must be greater than 0".into());
    }

    if config.remote_only && config.remote_url.is_none() {
        return Err("Remote-only mode requires a remote peer URL".into());
    }

    Ok(())
}

async fn shutdown_signal() {
    let mut sigint = match signal::unix::signal(signal::unix::SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to install SIGINT handler: {}", e);
            return std::future::pending().await;
        }
    };
    let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
        }
    }
}
