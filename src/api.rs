//! REST API Server for the rent roll query service
//!
//! Two surfaces:
//! - `/tools/:name`: direct tool invocation with explicit CORS headers
//!   and a JSON 404 for anything unrecognized
//! - `/api/query` and `/health`: client surface wrapped in `ApiResponse`

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::error::QueryServiceError;
use crate::models::QueryMode;
use crate::router::QueryRouter;
use crate::store::RentRollStore;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_query_type")]
    pub query_type: QueryMode,
}

fn default_query_type() -> QueryMode {
    QueryMode::NaturalLanguage
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub router: QueryRouter,
    pub store: Arc<dyn RentRollStore>,
}

/// =============================
/// Error Mapping
/// =============================

pub fn status_for(error: &QueryServiceError) -> StatusCode {
    match error {
        QueryServiceError::UnknownTool(_) => StatusCode::NOT_FOUND,
        QueryServiceError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn not_found_response() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

fn error_response(error: QueryServiceError) -> Response {
    match status_for(&error) {
        StatusCode::NOT_FOUND => not_found_response(),
        status => (status, Json(json!({ "error": error.to_string() }))).into_response(),
    }
}

/// =============================
/// Tool Surface
/// =============================

async fn invoke_tool(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let registry = state.router.registry();
    if registry.get(&name).is_none() {
        warn!(tool = %name, "Request for unknown tool");
        return not_found_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => return error_response(QueryServiceError::InvalidPayload(e.to_string())),
    };

    match registry.invoke(&name, payload).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_tools(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({ "tools": state.router.registry().list() }))
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_found() -> Response {
    not_found_response()
}

/// Unmatched paths: preflight still succeeds, anything else is a 404
async fn unmatched(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found_response()
    }
}

async fn with_tool_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// =============================
/// Client Surface
/// =============================

async fn health(State(state): State<ApiState>) -> (StatusCode, Json<Value>) {
    match state.store.unit_count().await {
        Ok(units) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "units": units,
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        ),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "error": e.to_string(),
                    "timestamp": chrono::Utc::now().to_rfc3339()
                })),
            )
        }
    }
}

async fn handle_query(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected query body");
            return (
                rejection.status(),
                Json(ApiResponse::error(rejection.body_text())),
            );
        }
    };

    info!(query = %req.query, query_type = %req.query_type, "Received query");

    if req.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Query must not be empty".into())),
        );
    }

    match state.router.route(&req.query, req.query_type).await {
        Ok(response) => (StatusCode::OK, Json(ApiResponse::success(response))),
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    let tool_routes = Router::new()
        .route(
            "/tools",
            get(list_tools).options(preflight).fallback(not_found),
        )
        .route(
            "/tools/:name",
            post(invoke_tool).options(preflight).fallback(not_found),
        )
        .fallback(unmatched)
        .layer(middleware::map_response(with_tool_cors_headers));

    let client_routes = Router::new()
        .route("/health", get(health))
        .route("/api/query", post(handle_query))
        .layer(CorsLayer::permissive());

    tool_routes.merge(client_routes).with_state(state)
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
