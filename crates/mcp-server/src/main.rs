//! MongoDB MCP server binary.
//!
//! Usage: `mongodb-mcp [CONNECTION_STRING] [--flags...]`
//!
//! Configuration flags mirror the documented option names (`--readOnly`,
//! `--maxDocumentsPerQuery`, ...); every option also has an
//! `MDB_MCP_<SNAKE_UPPER>` environment variable. Configuration errors are
//! consolidated and fatal.

use std::sync::Arc;

use anyhow::Result;
use rmcp::ServiceExt;

use mongo_mcp_config::{parse_args, Config, Parsed, Transport};
use mongo_mcp_server::{http, logging, McpServer};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match parse_args(std::env::args()) {
        Ok(Parsed::Display(text)) => {
            println!("{text}");
            return Ok(());
        }
        Ok(Parsed::Run(cli)) => cli,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let env = |name: &str| std::env::var(name).ok();
    let config = match Config::resolve(&cli, &env) {
        Ok(config) => Arc::new(config),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = logging::init(&config) {
        eprintln!("failed to initialize logging: {err}");
    }

    let server = McpServer::new(config.clone());

    if cli.print_tools {
        let inventory = server
            .dispatcher()
            .registry()
            .inventory_json(env!("CARGO_PKG_VERSION"));
        println!("{inventory}");
        return Ok(());
    }

    match config.transport {
        Transport::Stdio => {
            log::info!("starting MongoDB MCP server on stdio");
            let running = server.serve(rmcp::transport::io::stdio()).await?;
            running.waiting().await?;
        }
        Transport::Http => {
            http::serve_http(server, &config).await?;
        }
    }

    log::info!("MongoDB MCP server stopped");
    Ok(())
}
