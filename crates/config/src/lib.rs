//! Configuration for the MongoDB MCP server.
//!
//! Options are resolved with a fixed precedence: positional connection
//! specifier, then named CLI flag, then `MDB_MCP_*` environment variable,
//! then the built-in default. Configuration errors are fatal: they are
//! collected, printed as one consolidated message and the process exits
//! with code 1.

mod auth;
mod cli;
mod keychain;
mod options;

pub use auth::{connection_string_auth_type, AuthType};
pub use cli::{parse_args, CliArgs, CliError, Parsed};
pub use keychain::{keychain, Keychain, SecretKind};
pub use options::{
    Config, ConfigError, LoggerKind, PreviewFeature, SimilarityFunction, TelemetryMode, Transport,
    DEFAULT_CONFIRMATION_REQUIRED_TOOLS, SUPPORTED_VECTOR_DIMENSIONS,
};

/// Environment variable prefix shared by every recognized option.
pub const ENV_PREFIX: &str = "MDB_MCP_";

/// Map a camelCase option name to its `MDB_MCP_<SNAKE_UPPER>` variable name.
pub fn env_var_name(option: &str) -> String {
    let mut out = String::with_capacity(ENV_PREFIX.len() + option.len() + 4);
    out.push_str(ENV_PREFIX);
    for ch in option.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch);
        } else {
            out.push(ch.to_ascii_uppercase());
        }
    }
    out
}
