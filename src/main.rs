mod cli;
mod client;
mod display;
mod error;
mod model;
mod page;
mod request;
mod server;
mod service;
mod validator;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use crate::client::{ApiSettings, CodingApiClient, http_client};
use crate::request::QueryForm;
use crate::service::QueryService;
use crate::validator::ReferenceCodeSet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = cli::Args::parse();

    match args.cmd {
        cli::Command::Serve(cmd) => server::run(cmd).await.context("serve failed"),
        cli::Command::Query(cmd) => run_query(cmd).await,
    }
}

/// Wires the shared HTTP client, the endpoint settings and the optional
/// reference code validator into a [`QueryService`].
pub(crate) fn build_service(api: &cli::ApiArgs) -> anyhow::Result<QueryService> {
    let settings = ApiSettings {
        base_url: api.api_base_url.clone(),
        bearer_token: api.bearer_token.clone(),
    };
    if settings.base_url.is_none() || settings.bearer_token.is_none() {
        tracing::warn!(
            "Coding API URL or bearer token not configured; queries will fail until both are set"
        );
    }

    let mut service = QueryService::new(CodingApiClient::new(http_client()?, settings));
    if let Some(path) = &api.reference_codes {
        let codes = ReferenceCodeSet::load(path)?;
        service = service.with_validator(Arc::new(codes));
    }
    Ok(service)
}

async fn run_query(cmd: cli::QueryArgs) -> anyhow::Result<()> {
    let service = build_service(&cmd.api)?;
    let form = QueryForm::new(cmd.text, cmd.max_results);

    let response = service.run(&form).await?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", display::render_text(&response));
    }
    Ok(())
}
