use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cli::ServeArgs;
use crate::error::{ErrorKind, QueryError, ValidationError};
use crate::page::{QueryPage, render_about, render_index};
use crate::request::QueryForm;
use crate::service::QueryService;

#[derive(Clone)]
pub struct AppState {
    service: QueryService,
}

impl AppState {
    pub fn new(service: QueryService) -> Self {
        Self { service }
    }
}

pub async fn run(opts: ServeArgs) -> anyhow::Result<()> {
    let service = crate::build_service(&opts.api)?;
    let app = router(AppState::new(service));

    let addr: SocketAddr = format!("{}:{}", opts.host, opts.port)
        .parse()
        .context("parse host:port")?;

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_page).post(submit_query))
        .route("/about", get(about_page))
        .route("/api/health", get(api_health))
        .route("/api/query", post(api_query))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_page() -> Html<String> {
    Html(render_index(&QueryPage::blank(QueryForm::default())))
}

async fn submit_query(State(st): State<AppState>, Form(form): Form<QueryForm>) -> Html<String> {
    let outcome = st.service.run(&form).await;
    Html(render_index(&QueryPage::from_outcome(form, outcome)))
}

async fn about_page() -> Html<String> {
    Html(render_about())
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn api_health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Fields stay loosely typed so a wrong type is reported through the error
/// taxonomy instead of the extractor's plain-text rejection.
#[derive(Debug, Deserialize)]
struct ApiQueryBody {
    #[serde(default)]
    query: Option<Value>,
    #[serde(default, rename = "maxSqlResults")]
    max_results: Option<Value>,
}

impl ApiQueryBody {
    /// Numbers and numeric strings both reach the Request Builder as text, so
    /// `5`, `"5"` and `2.0` are judged by the same rules as the page form.
    fn into_form(self) -> Result<QueryForm, ValidationError> {
        let query = match self.query {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => {
                return Err(ValidationError::MalformedBody(format!(
                    "query must be a string, got {other}"
                )));
            }
        };
        let max_results = match self.max_results {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(other) => return Err(ValidationError::InvalidMaxResults(other.to_string())),
        };
        Ok(QueryForm::new(query, max_results))
    }
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    kind: ErrorKind,
    message: String,
}

fn error_response(e: &QueryError) -> Response {
    (
        e.http_status(),
        Json(ApiErrorBody {
            kind: e.kind(),
            message: e.to_string(),
        }),
    )
        .into_response()
}

async fn api_query(
    State(st): State<AppState>,
    body: Result<Json<ApiQueryBody>, JsonRejection>,
) -> Response {
    let form = match body
        .map_err(|rej| ValidationError::MalformedBody(rej.body_text()))
        .and_then(|Json(b)| b.into_form())
    {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("Rejected API query body: {}", e);
            return error_response(&QueryError::from(e));
        }
    };
    match st.service.run(&form).await {
        Ok(r) => Json(r).into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiSettings, CodingApiClient, http_client};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use httpmock::prelude::*;
    use serde_json::json;
    use tower::ServiceExt;

    fn app_for(settings: ApiSettings) -> Router {
        let client = CodingApiClient::new(http_client().unwrap(), settings);
        router(AppState::new(QueryService::new(client)))
    }

    async fn body_string(resp: axum::response::Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form_post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json_post(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn index_renders_default_form() {
        let app = app_for(ApiSettings::default());
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;
        assert!(html.contains("chronic bronchitis and emphysema"));
    }

    #[tokio::test]
    async fn about_and_health_respond() {
        let app = app_for(ApiSettings::default());
        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/about").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_string(resp).await.contains("<h1>About</h1>"));

        let resp = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let v: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(v, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn form_post_renders_ranked_results() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/search")
                .json_body(json!({"query": "copd", "maxSqlResults": 2}));
            then.status(200).json_body(json!({
                "totalSqlResultCount": 5,
                "searchResults": [
                    {"code": "J44.9", "description": "COPD, unspecified", "rank": 1},
                    {"code": "J44.1", "description": "COPD with exacerbation", "rank": 2}
                ]
            }));
        });

        let app = app_for(ApiSettings::new(server.url("/search"), "t"));
        let resp = app.oneshot(form_post("query=copd&maxSqlResults=2")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;

        mock.assert();
        assert!(html.contains("Found 5 matches, showing 2."));
        assert!(html.find("J44.9").unwrap() < html.find("J44.1").unwrap());
    }

    #[tokio::test]
    async fn form_post_with_blank_query_shows_message_without_calling_api() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({}));
        });

        let app = app_for(ApiSettings::new(server.url("/search"), "t"));
        let resp = app.oneshot(form_post("query=+++&maxSqlResults=3")).await.unwrap();
        let html = body_string(resp).await;

        assert!(html.contains("Please enter a clinical description"));
        assert!(!html.contains("<table>"));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn form_post_surfaces_remote_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/search");
            then.status(503).body("maintenance");
        });

        let app = app_for(ApiSettings::new(server.url("/search"), "t"));
        let resp = app.oneshot(form_post("query=copd&maxSqlResults=3")).await.unwrap();
        let html = body_string(resp).await;
        assert!(html.contains("503"));
        assert!(html.contains("Details: maintenance"));
    }

    #[tokio::test]
    async fn api_query_returns_shaped_json() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/search");
            then.status(200).json_body(json!({
                "usedFreeTextFallback": true,
                "totalSqlResultCount": 1,
                "aiModel": "gpt-4o",
                "searchResults": [{"code": "R05", "description": "Cough", "rank": 1, "confidence": 40}]
            }));
        });

        let app = app_for(ApiSettings::new(server.url("/search"), "t"));
        let resp = app
            .oneshot(json_post(json!({"query": "cough", "maxSqlResults": 1})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(v["usedFreeTextFallback"], true);
        assert_eq!(v["model"], "gpt-4o");
        assert_eq!(v["modelVersion"], Value::Null);
        assert_eq!(v["candidates"][0]["code"], "R05");
        assert_eq!(v["candidates"][0]["isValid"], false);
    }

    #[tokio::test]
    async fn api_query_maps_error_kinds_to_status() {
        let app = app_for(ApiSettings::default());
        let resp = app
            .clone()
            .oneshot(json_post(json!({"query": "cough"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let v: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(v["kind"], "configuration");

        let resp = app
            .oneshot(json_post(json!({"query": "cough", "maxSqlResults": -1})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(v["kind"], "validation");
    }

    #[tokio::test]
    async fn api_query_accepts_numeric_string_limit() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/search")
                .json_body(json!({"query": "copd", "maxSqlResults": 5}));
            then.status(200).json_body(json!({"totalSqlResultCount": 0}));
        });

        let app = app_for(ApiSettings::new(server.url("/search"), "t"));
        let resp = app
            .oneshot(json_post(json!({"query": "copd", "maxSqlResults": "5"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        mock.assert();
    }

    #[tokio::test]
    async fn malformed_api_bodies_are_validation_errors() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({}));
        });
        let app = app_for(ApiSettings::new(server.url("/search"), "t"));

        let not_json = Request::builder()
            .method("POST")
            .uri("/api/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let wrong_types = [
            json!({"query": 5}),
            json!({"query": "copd", "maxSqlResults": 2.0}),
            json!({"query": "copd", "maxSqlResults": true}),
        ];

        let mut requests = vec![not_json];
        requests.extend(wrong_types.into_iter().map(json_post));
        for req in requests {
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let v: Value = serde_json::from_str(&body_string(resp).await).unwrap();
            assert_eq!(v["kind"], "validation");
            assert!(v["message"].as_str().is_some_and(|m| !m.is_empty()));
        }
        assert_eq!(mock.calls(), 0);
    }
}
