use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::QueryError;

/// Ranked candidates returned by the coding API for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// The service found no structured match and fell back to free-text search.
    pub used_free_text_fallback: bool,
    /// Matches found server-side; may exceed `candidates.len()`.
    pub total_match_count: i64,
    pub model: Option<String>,
    pub model_version: Option<String>,
    pub model_temperature: Option<f64>,
    /// Server rank order. Never re-sorted.
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub code: String,
    pub description: String,
    pub rank: i64,
    pub reason: String,
    pub source: String,
    pub confidence: i64,
    pub is_valid: bool,
}

// Wire shapes. Keys are lowercased before these are deserialized, so the
// renames below are the lowercase form of the service's field names.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireResponse {
    #[serde(rename = "usedfreetextfallback")]
    used_free_text_fallback: bool,
    #[serde(rename = "totalsqlresultcount")]
    total_sql_result_count: i64,
    #[serde(rename = "aimodel")]
    ai_model: Option<String>,
    #[serde(rename = "aiversion")]
    ai_version: Option<String>,
    #[serde(rename = "aitemperature")]
    ai_temperature: Option<f64>,
    #[serde(rename = "searchresults")]
    search_results: Option<Vec<WireCandidate>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireCandidate {
    code: Option<String>,
    description: Option<String>,
    rank: i64,
    reason: Option<String>,
    source: Option<String>,
    confidence: i64,
    #[serde(rename = "isvalid")]
    is_valid: bool,
}

impl From<WireCandidate> for Candidate {
    fn from(w: WireCandidate) -> Self {
        Self {
            code: w.code.unwrap_or_default(),
            description: w.description.unwrap_or_default(),
            rank: w.rank,
            reason: w.reason.unwrap_or_default(),
            source: w.source.unwrap_or_default(),
            confidence: w.confidence,
            is_valid: w.is_valid,
        }
    }
}

impl From<WireResponse> for QueryResponse {
    fn from(w: WireResponse) -> Self {
        Self {
            used_free_text_fallback: w.used_free_text_fallback,
            total_match_count: w.total_sql_result_count,
            model: w.ai_model,
            model_version: w.ai_version,
            model_temperature: w.ai_temperature,
            candidates: w
                .search_results
                .unwrap_or_default()
                .into_iter()
                .map(Candidate::from)
                .collect(),
        }
    }
}

/// Parses a success body. Field names match case-insensitively; unknown
/// fields are ignored and missing ones take their defaults.
///
/// Text that is not JSON is a [`QueryError::Parse`]; JSON of the wrong shape
/// (including a bare `null` or a top-level array) is a
/// [`QueryError::Deserialization`].
pub fn parse_response(body: &str) -> Result<QueryResponse, QueryError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| QueryError::Parse(e.to_string()))?;
    if !value.is_object() {
        return Err(QueryError::Deserialization(format!(
            "expected a JSON object, found {}",
            json_type_name(&value)
        )));
    }
    let wire: WireResponse = serde_json::from_value(lowercase_keys(value))
        .map_err(|e| QueryError::Deserialization(e.to_string()))?;
    Ok(wire.into())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// On duplicate keys differing only in case, the last one wins.
fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.to_lowercase(), lowercase_keys(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}
