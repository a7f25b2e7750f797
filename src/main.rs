use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use mproxy::commands;
use mproxy::config::{self, Config};
use mproxy::error::Result;
use mproxy::proxy::ProxyServer;
use mproxy::transform::TransformMode;

#[derive(Parser, Debug)]
#[command(name = "mproxy")]
#[command(about = "A minimal obfuscating TCP/HTTP forward proxy", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (TOML/JSON/YAML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Local listen port
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Next hop server as host:port; skips header-based resolution
    #[arg(short, long, global = true, value_name = "HOST:PORT")]
    next_hop: Option<String>,

    /// Decode data when receiving it from clients
    #[arg(short = 'D', long, global = true, conflicts_with = "encode_on_write")]
    decode_on_read: bool,

    /// Encode data when forwarding it to the next hop
    #[arg(short = 'E', long, global = true)]
    encode_on_write: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Run the proxy (default)
    Run,
    /// Validate configuration and test next-hop reachability
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("mproxy={log_level}").parse().unwrap()),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            config::load_from_path(path)?
        }
        None => config::load_from_env_or_file()?,
    };
    apply_cli_overrides(&mut config, &args);
    // CLI flags may have introduced a malformed next hop.
    config::validate(&config)?;

    match args.command.unwrap_or(Command::Run) {
        Command::Check => return commands::run_config_check(config).await,
        Command::Run => {}
    }

    info!("======= mproxy (v0.1) ========");
    info!("{}", config.work_mode());

    let server = match ProxyServer::bind(Arc::new(config)).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind listen socket: {e}");
            return Err(e);
        }
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = &result {
                error!("Proxy server error: {e}");
            }
            result
        }
        _ = shutdown_signal() => {
            info!("Shutting down mproxy");
            Ok(())
        }
    }
}

fn apply_cli_overrides(config: &mut Config, args: &Args) {
    if let Some(port) = args.port {
        config.listen.port = port;
    }
    if let Some(next_hop) = &args.next_hop {
        config.next_hop = Some(next_hop.clone());
    }
    if args.decode_on_read {
        config.transform = TransformMode::DecodeOnClientRead;
    }
    if args.encode_on_write {
        config.transform = TransformMode::EncodeOnServerWrite;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
