//! toolmux HTTP server
//!
//! Serves streaming chat completions backed by the configured MCP tool
//! servers, and a status endpoint reporting each server's reachability.

mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use toolmux_core::{
    create_provider, ChatService, ConsoleLogger, FileServerRegistry, LogLevel, Logger,
    McpConnector, StatusReporter,
};

use crate::routes::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server list and chat settings (YAML, or JSON by extension)
    #[arg(short, long, env = "TOOLMUX_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:3000", env = "TOOLMUX_BIND")]
    bind: SocketAddr,

    /// Model provider: auto, mock, or a provider id such as anthropic
    #[arg(long, default_value = "auto")]
    provider: String,

    #[arg(long, default_value = "info", env = "TOOLMUX_LOG")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger::new().with_level(args.log_level));

    let registry = match &args.config {
        Some(path) => FileServerRegistry::new(path),
        None => FileServerRegistry::user(),
    };
    logger.info(&format!("[Server] config: {}", registry.path().display()));

    let settings = match registry.settings() {
        Ok(settings) => settings,
        Err(e) => {
            logger.warn(&format!("[Server] using default chat settings: {}", e));
            Default::default()
        }
    };

    let provider = create_provider(&args.provider, Arc::clone(&logger))
        .with_context(|| format!("creating provider '{}'", args.provider))?;
    let registry = Arc::new(registry);
    let connector = Arc::new(McpConnector::new(Arc::clone(&logger)));

    let status = StatusReporter::new(registry.clone(), connector.clone(), Arc::clone(&logger))
        .with_settings(&settings);
    let chat = ChatService::new(registry, connector, provider, Arc::clone(&logger))
        .with_settings(settings);

    let app = routes::router(AppState { chat, status });

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    logger.info(&format!("[Server] listening on http://{}", args.bind));

    axum::serve(listener, app).await?;
    Ok(())
}
