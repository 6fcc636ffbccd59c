use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Reasons a raw form submission is rejected before any request is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a clinical description to search for.")]
    EmptyQuery,

    #[error("Max results must be a positive whole number (got '{0}').")]
    InvalidMaxResults(String),

    /// A JSON API body that is not JSON, or has a field of the wrong type.
    #[error("Request body is not a valid query: {0}")]
    MalformedBody(String),
}

/// Discriminant of [`QueryError`], used for logging and for the JSON API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Configuration,
    Network,
    RemoteApi,
    Parse,
    Deserialization,
    Unexpected,
}

/// Every way a single query can fail. Exactly one of these, or a response,
/// comes back from a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Bad user input; no network call was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Endpoint URL or bearer token missing or unusable; no network call was made.
    #[error("API URL or bearer token is not configured correctly: {0}")]
    Configuration(String),

    /// Connection refused, DNS failure, timeout or a broken body stream.
    #[error("Network error calling API: {0}")]
    Network(String),

    /// Non-success HTTP status. `body` is the response bytes decoded as UTF-8,
    /// verbatim except that invalid sequences become U+FFFD; the declared
    /// charset is ignored.
    #[error("API request failed with status code {status}. Details: {body}")]
    RemoteApi { status: StatusCode, body: String },

    /// Success status, but the body is not JSON at all.
    #[error("Error parsing API response: {0}")]
    Parse(String),

    /// Valid JSON that does not have the expected shape.
    #[error("Failed to deserialize API response: {0}")]
    Deserialization(String),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Validation(_) => ErrorKind::Validation,
            QueryError::Configuration(_) => ErrorKind::Configuration,
            QueryError::Network(_) => ErrorKind::Network,
            QueryError::RemoteApi { .. } => ErrorKind::RemoteApi,
            QueryError::Parse(_) => ErrorKind::Parse,
            QueryError::Deserialization(_) => ErrorKind::Deserialization,
            QueryError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Status the JSON API answers with for this failure.
    pub fn http_status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Configuration | ErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Network
            | ErrorKind::RemoteApi
            | ErrorKind::Parse
            | ErrorKind::Deserialization => StatusCode::BAD_GATEWAY,
        }
    }
}
