use std::sync::Arc;

use crate::client::CodingApiClient;
use crate::error::QueryError;
use crate::model::QueryResponse;
use crate::request::{QueryForm, build_request};
use crate::validator::CodeValidator;

/// Validates input, dispatches it, and marks returned codes against the
/// optional reference validator. Holds no per-query state.
#[derive(Clone)]
pub struct QueryService {
    client: CodingApiClient,
    validator: Option<Arc<dyn CodeValidator>>,
}

impl QueryService {
    pub fn new(client: CodingApiClient) -> Self {
        Self {
            client,
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn CodeValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Runs one query end to end. Invalid input returns
    /// [`QueryError::Validation`] without touching the network.
    pub async fn run(&self, form: &QueryForm) -> Result<QueryResponse, QueryError> {
        let request = match build_request(form) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Rejected query input: {}", e);
                return Err(e.into());
            }
        };

        let mut response = match self.client.send(&request).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(kind = ?e.kind(), "Query failed: {}", e);
                return Err(e);
            }
        };

        if let Some(validator) = &self.validator {
            for candidate in &mut response.candidates {
                candidate.is_valid = validator.is_valid(&candidate.code);
            }
        }

        tracing::info!(
            "Query returned {} of {} candidates (free-text fallback: {})",
            response.candidates.len(),
            response.total_match_count,
            response.used_free_text_fallback
        );
        Ok(response)
    }
}
