//! CLI flag surface.
//!
//! Flags use the camelCase option names verbatim (`--readOnly`,
//! `--maxDocumentsPerQuery`). Raw string values are kept here and parsed
//! during [`crate::Config::resolve`] so that flag and environment values go
//! through the same validation path.

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::Parser;

/// Long flag names recognized by the binary, used for typo suggestions.
const KNOWN_FLAGS: &[&str] = &[
    "connectionString",
    "transport",
    "httpHost",
    "httpPort",
    "idleTimeoutMs",
    "notificationTimeoutMs",
    "readOnly",
    "indexCheck",
    "disabledTools",
    "confirmationRequiredTools",
    "telemetry",
    "loggers",
    "maxDocumentsPerQuery",
    "maxBytesPerQuery",
    "voyageApiKey",
    "vectorSearchDimensions",
    "vectorSearchSimilarityFunction",
    "disableEmbeddingsValidation",
    "previewFeatures",
    "atlasTemporaryDatabaseUserLifetimeMs",
    "print-tools",
    "help",
    "version",
];

#[derive(Parser, Debug, Default)]
#[command(name = "mongodb-mcp")]
#[command(about = "MCP broker server for MongoDB, Atlas and vector search", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct CliArgs {
    /// Positional MongoDB connection specifier (highest precedence).
    #[arg(value_name = "CONNECTION_STRING")]
    pub positional_connection_string: Option<String>,

    /// Deprecated; pass the connection string positionally instead.
    #[arg(long = "connectionString", value_name = "URI")]
    pub connection_string: Option<String>,

    #[arg(long = "transport", value_name = "stdio|http")]
    pub transport: Option<String>,

    #[arg(long = "httpHost", value_name = "HOST")]
    pub http_host: Option<String>,

    #[arg(long = "httpPort", value_name = "PORT")]
    pub http_port: Option<String>,

    #[arg(long = "idleTimeoutMs", value_name = "MS")]
    pub idle_timeout_ms: Option<String>,

    #[arg(long = "notificationTimeoutMs", value_name = "MS")]
    pub notification_timeout_ms: Option<String>,

    /// Disable all create/update/delete operations.
    #[arg(long = "readOnly", num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub read_only: Option<bool>,

    /// Reject read queries whose plan is a collection scan.
    #[arg(long = "indexCheck", num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub index_check: Option<bool>,

    /// Comma-separated tool names, categories or operation types to disable.
    #[arg(long = "disabledTools", value_name = "LIST")]
    pub disabled_tools: Option<String>,

    /// Comma-separated tool names that require elicited confirmation.
    #[arg(long = "confirmationRequiredTools", value_name = "LIST")]
    pub confirmation_required_tools: Option<String>,

    #[arg(long = "telemetry", value_name = "enabled|disabled")]
    pub telemetry: Option<String>,

    /// Comma-separated subset of stderr, disk, mcp.
    #[arg(long = "loggers", value_name = "LIST")]
    pub loggers: Option<String>,

    #[arg(long = "maxDocumentsPerQuery", value_name = "N")]
    pub max_documents_per_query: Option<String>,

    #[arg(long = "maxBytesPerQuery", value_name = "BYTES")]
    pub max_bytes_per_query: Option<String>,

    #[arg(long = "voyageApiKey", value_name = "KEY")]
    pub voyage_api_key: Option<String>,

    #[arg(long = "vectorSearchDimensions", value_name = "N")]
    pub vector_search_dimensions: Option<String>,

    #[arg(long = "vectorSearchSimilarityFunction", value_name = "FN")]
    pub vector_search_similarity_function: Option<String>,

    #[arg(long = "disableEmbeddingsValidation", num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub disable_embeddings_validation: Option<bool>,

    /// Comma-separated preview features to enable (currently: vectorSearch).
    #[arg(long = "previewFeatures", value_name = "LIST")]
    pub preview_features: Option<String>,

    #[arg(long = "atlasTemporaryDatabaseUserLifetimeMs", value_name = "MS")]
    pub atlas_temporary_database_user_lifetime_ms: Option<String>,

    /// Print the tool inventory as JSON and exit.
    #[arg(long = "print-tools")]
    pub print_tools: bool,
}

/// Outcome of CLI parsing that is not a fatal error.
pub enum Parsed {
    Run(Box<CliArgs>),
    /// Help or version text that should be printed to stdout, exit 0.
    Display(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("unknown flag '{flag}'{}", suggestion.as_ref().map(|s| format!(" (did you mean '--{s}'?)")).unwrap_or_default())]
    UnknownFlag {
        flag: String,
        suggestion: Option<String>,
    },
    #[error("{0}")]
    Other(String),
}

/// Parse CLI arguments, producing a typo suggestion for unknown flags.
pub fn parse_args<I, S>(args: I) -> Result<Parsed, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<std::ffi::OsString> + Clone,
{
    match CliArgs::try_parse_from(args) {
        Ok(cli) => {
            if cli.connection_string.is_some() {
                log::warn!(
                    "--connectionString is deprecated; pass the connection string positionally"
                );
            }
            Ok(Parsed::Run(Box::new(cli)))
        }
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                Ok(Parsed::Display(err.to_string()))
            }
            ErrorKind::UnknownArgument => {
                let flag = err
                    .get(ContextKind::InvalidArg)
                    .and_then(|value| match value {
                        ContextValue::String(s) => Some(s.clone()),
                        _ => None,
                    })
                    .unwrap_or_default();
                let bare = flag.trim_start_matches('-').to_string();
                Err(CliError::UnknownFlag {
                    suggestion: suggest_flag(&bare),
                    flag,
                })
            }
            _ => Err(CliError::Other(err.to_string())),
        },
    }
}

/// Closest known flag within edit distance 2, if any.
fn suggest_flag(unknown: &str) -> Option<String> {
    KNOWN_FLAGS
        .iter()
        .map(|candidate| (levenshtein(unknown, candidate), *candidate))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut previous_diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous_diagonal + usize::from(ca != cb);
            previous_diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(row[j + 1] + 1);
        }
    }

    row[b.len()]
}
