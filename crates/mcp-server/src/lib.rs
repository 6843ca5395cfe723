//! MongoDB MCP broker server.
//!
//! Mediates between a conversational model client and MongoDB (plus the
//! Atlas control plane and the Voyage AI embedding service). The server
//! exposes a catalog of typed tools over stdio or streamable HTTP; a
//! dispatcher applies policy (read-only, disabled tools, confirmation,
//! preview features), validates arguments, executes against the database
//! and streams text results back.

pub mod atlas;
pub mod content;
pub mod dispatch;
pub mod elicitation;
pub mod error;
pub mod http;
pub mod logging;
pub mod provider;
pub mod registry;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod tool;
pub mod tools;
pub mod vector_search;

pub use server::McpServer;
