use anyhow::Context;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use crate::error::QueryError;
use crate::model::{QueryResponse, parse_response};
use crate::request::QueryRequest;

pub const USER_AGENT: &str = concat!("coding-assistant-ui/", env!("CARGO_PKG_VERSION"));
const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Builds the shared connection pool. Create once and clone the handle.
pub fn http_client() -> anyhow::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed creating HTTP client")
}

/// Endpoint and credential for the coding API. Either may be missing; that
/// is only reported when a query is dispatched.
#[derive(Clone, Default)]
pub struct ApiSettings {
    pub base_url: Option<String>,
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("base_url", &self.base_url)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            bearer_token: Some(bearer_token.into()),
        }
    }

    fn resolve(&self) -> Result<(Url, &str), QueryError> {
        let base_url = non_empty(self.base_url.as_deref());
        let token = non_empty(self.bearer_token.as_deref());
        let (base_url, token) = match (base_url, token) {
            (Some(u), Some(t)) => (u, t),
            (None, Some(_)) => return Err(config_error("API base URL is not set")),
            (Some(_), None) => return Err(config_error("bearer token is not set")),
            (None, None) => {
                return Err(config_error("API base URL and bearer token are not set"));
            }
        };

        let url = Url::parse(base_url)
            .map_err(|e| config_error(&format!("API base URL '{base_url}' is invalid: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(config_error(&format!(
                "API base URL '{base_url}' must use http or https"
            )));
        }
        Ok((url, token))
    }
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn config_error(msg: &str) -> QueryError {
    QueryError::Configuration(msg.to_string())
}

/// One authenticated POST per query against the coding API.
#[derive(Debug, Clone)]
pub struct CodingApiClient {
    http: Client,
    settings: ApiSettings,
}

impl CodingApiClient {
    pub fn new(http: Client, settings: ApiSettings) -> Self {
        Self { http, settings }
    }

    /// Sends `request` and classifies the outcome. Configuration problems are
    /// reported before anything touches the network; there are no retries.
    pub async fn send(&self, request: &QueryRequest) -> Result<QueryResponse, QueryError> {
        let (url, token) = self.settings.resolve()?;
        let payload = serde_json::to_vec(request)
            .map_err(|e| QueryError::Unexpected(format!("serialize request: {e}")))?;

        tracing::info!(
            "Sending API request to {} (max results {})",
            url,
            request.max_results()
        );
        tracing::debug!(query = request.query(), "Request payload built");

        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, JSON_UTF8)
            .body(payload)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(classify_reqwest_error)?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        if !status.is_success() {
            tracing::error!(
                "API error: status {}, content: {}",
                status,
                truncate_for_log(&body)
            );
            return Err(QueryError::RemoteApi { status, body });
        }

        tracing::debug!("API response received: {}", truncate_for_log(&body));
        parse_response(&body)
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> QueryError {
    let detail = error_chain(&err);
    if err.is_builder() {
        // Only the URL and the token header feed the builder.
        QueryError::Configuration(detail)
    } else if err.is_connect()
        || err.is_timeout()
        || err.is_request()
        || err.is_body()
        || err.is_decode()
        || err.is_redirect()
    {
        QueryError::Network(detail)
    } else {
        QueryError::Unexpected(detail)
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        out.push_str(": ");
        out.push_str(&s.to_string());
        source = s.source();
    }
    out
}

fn truncate_for_log(text: &str) -> String {
    const MAX_CHARS: usize = 300;
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX_CHARS) {
        None => trimmed.to_string(),
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
    }
}
