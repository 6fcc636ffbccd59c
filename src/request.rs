use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_QUERY: &str = "chronic bronchitis and emphysema";
pub const DEFAULT_MAX_RESULTS: i32 = 3;

/// Raw, unvalidated input as it arrives from the page form or the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryForm {
    #[serde(default)]
    pub query: String,

    /// Kept as text so a non-numeric entry is reported back instead of being
    /// rejected by the extractor.
    #[serde(default, rename = "maxSqlResults")]
    pub max_results: Option<String>,
}

impl Default for QueryForm {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            max_results: Some(DEFAULT_MAX_RESULTS.to_string()),
        }
    }
}

impl QueryForm {
    pub fn new(query: impl Into<String>, max_results: Option<String>) -> Self {
        Self {
            query: query.into(),
            max_results,
        }
    }
}

/// Outbound payload. Only constructible through validation, so a request with
/// an empty query or a zero limit never reaches the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    query: String,
    /// The service binds this as a signed 32-bit integer.
    #[serde(rename = "maxSqlResults")]
    max_results: i32,
}

impl QueryRequest {
    pub fn new(query: &str, max_results: i32) -> Result<Self, ValidationError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if max_results <= 0 {
            return Err(ValidationError::InvalidMaxResults(max_results.to_string()));
        }
        Ok(Self {
            query: query.to_string(),
            max_results,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn max_results(&self) -> i32 {
        self.max_results
    }
}

pub fn build_request(form: &QueryForm) -> Result<QueryRequest, ValidationError> {
    let max_results = parse_max_results(form.max_results.as_deref())?;
    QueryRequest::new(&form.query, max_results)
}

fn parse_max_results(raw: Option<&str>) -> Result<i32, ValidationError> {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_MAX_RESULTS);
    };
    match s.parse::<i32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ValidationError::InvalidMaxResults(s.to_string())),
    }
}
