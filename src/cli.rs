use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "coding-assistant-ui")]
#[command(about = "Query page and CLI for the medical coding assistant API", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the query page and JSON API.
    Serve(ServeArgs),
    /// Run a single query and print the ranked candidates.
    Query(QueryArgs),
}

/// Coding API connection. Values may also come from the environment or a
/// `.env` file; a missing value is reported per query, not at startup.
#[derive(clap::Args, Debug, Clone)]
pub struct ApiArgs {
    /// Coding assistant API endpoint (full URL the query is POSTed to).
    #[arg(long, env = "CODING_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Bearer token sent in the Authorization header.
    #[arg(long, env = "CODING_API_BEARER_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,

    /// Reference code list used to mark returned codes as valid (one code per line).
    #[arg(long, env = "CODING_REFERENCE_CODES")]
    pub reference_codes: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8787)]
    pub port: u16,
}

#[derive(clap::Args, Debug, Clone)]
pub struct QueryArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    /// Clinical description to search for.
    #[arg(long)]
    pub text: String,

    /// Maximum number of candidates to return (default 3).
    #[arg(long)]
    pub max_results: Option<String>,

    /// Print the response as JSON instead of a text listing.
    #[arg(long)]
    pub json: bool,
}
