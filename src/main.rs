//! Celo MCP server.
//!
//! # Architecture Overview
//!
//! ```text
//!   MCP client (stdin/stdout, newline-delimited JSON-RPC)
//!        │
//!        ▼
//!   ┌──────────┐     ┌───────────────────────────────────────────┐
//!   │   mcp    │────▶│ tools                                      │
//!   │  server  │     │  session tools ──▶ SessionManager (session)│
//!   └──────────┘     │  aave tools    ──▶ SessionManager (aave)   │
//!                    │  writer/aave   ──▶ checkout ──▶ blockchain  │
//!                    └───────────────────────────────────────────┘
//!
//!   Background: session sweeper, metrics exporter, admin API
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use celo_mcp::admin::{serve_admin, AdminState};
use celo_mcp::config::resolve_config;
use celo_mcp::lifecycle::signals::wait_for_signal;
use celo_mcp::observability::{logging, metrics};
use celo_mcp::session::SessionSweeper;
use celo_mcp::tools::{build_tools, ToolContext};
use celo_mcp::{McpServer, Shutdown};

#[derive(Parser)]
#[command(name = "celo-mcp")]
#[command(about = "MCP server for Celo and Aave with time-boxed signing sessions", long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long, env = "CELO_MCP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = resolve_config(args.config.as_deref())?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "celo-mcp starting");
    tracing::info!(
        ttl_secs = config.sessions.ttl_secs,
        sweep_interval_secs = config.sessions.sweep_interval_secs,
        admin_enabled = config.admin.enabled,
        metrics_enabled = config.observability.metrics_enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let ctx = Arc::new(ToolContext::new(config.clone()));

    let sweeper = SessionSweeper::new(
        ctx.managers(),
        Duration::from_secs(config.sessions.sweep_interval_secs),
    );
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.subscribe()));

    let admin_handle = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState::new(&config.admin.api_key, ctx.managers());
        Some(tokio::spawn(serve_admin(listener, state, shutdown.subscribe())))
    } else {
        None
    };

    let server = McpServer::new(build_tools(ctx.clone()));
    tokio::select! {
        result = server.serve_stdio(shutdown.subscribe()) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "MCP stdio loop failed");
            }
        }
        _ = wait_for_signal() => {}
    }

    shutdown.trigger();
    let _ = sweeper_handle.await;
    if let Some(handle) = admin_handle {
        match handle.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API failed"),
            Err(e) => tracing::error!(error = %e, "Admin API task panicked"),
            Ok(Ok(())) => {}
        }
    }

    // Anything left in memory is dropped here; secrets zeroize on drop
    let remaining: usize = ctx.managers().iter().map(|m| m.len()).sum();
    tracing::info!(remaining_sessions = remaining, "Shutdown complete");
    Ok(())
}
