//! HTTP transport: the rmcp streamable-HTTP service mounted in axum.

use std::time::Duration;

use anyhow::Context;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};

use mongo_mcp_config::Config;

use crate::server::McpServer;

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

pub async fn serve_http(server: McpServer, config: &Config) -> anyhow::Result<()> {
    let service = StreamableHttpService::new(
        move || Ok(server.clone_for_connection()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            sse_keep_alive: Some(SSE_KEEP_ALIVE),
            stateful_mode: true,
        },
    );

    let router = axum::Router::new().nest_service("/mcp", service);
    let addr = format!("{}:{}", config.http_host, config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind HTTP transport to {addr}"))?;

    log::info!(
        "HTTP transport listening on {addr} (idle timeout {} ms, notification timeout {} ms)",
        config.idle_timeout_ms,
        config.notification_timeout_ms
    );
    axum::serve(listener, router)
        .await
        .context("HTTP transport failed")?;
    Ok(())
}
