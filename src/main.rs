//! Signaling gateway binary
//!
//! Run with: streamnet-gateway [--bind ADDR] [--require-auth --jwt-secret S]
//!
//! Mint a token for local testing:
//!   streamnet-gateway --jwt-secret S token --subject alice

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamnet::{GatewayConfig, GatewayServer};

#[derive(Parser, Debug)]
#[command(name = "streamnet-gateway", version, about = "Live streaming signaling gateway")]
struct Cli {
    /// Address to listen on
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Require a bearer token on WebSocket upgrade
    #[arg(long)]
    require_auth: bool,

    /// HS256 secret for bearer tokens
    #[arg(long, env = "STREAMNET_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Stop a session when the connection that started it closes
    #[arg(long)]
    bind_sessions: bool,

    /// Base URL publishers push media to
    #[arg(long)]
    rtmp_base_url: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a signed bearer token
    Token {
        /// Identity placed in the `sub` claim
        #[arg(long)]
        subject: String,

        /// Token lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        ttl_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "streamnet=debug,tower_http=debug"
    } else {
        "streamnet=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = GatewayConfig::from_env()?;
    if let Some(addr) = cli.bind {
        config = config.bind(addr);
    }
    if let Some(secret) = cli.jwt_secret {
        config.jwt_secret = Some(secret);
    }
    if cli.require_auth {
        config.auth_required = true;
    }
    if cli.bind_sessions {
        config = config.bind_sessions_to_connections(true);
    }
    if let Some(url) = cli.rtmp_base_url {
        config = config.rtmp_base_url(url);
    }

    if let Some(Command::Token { subject, ttl_secs }) = cli.command {
        let validator = config
            .token_validator()
            .ok_or("a JWT secret is required to issue tokens")?;
        println!("{}", validator.issue(&subject, Duration::from_secs(ttl_secs))?);
        return Ok(());
    }

    let server = GatewayServer::new(config)?;
    server.run_until(shutdown_signal()).await?;

    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
