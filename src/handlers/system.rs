use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::app::AppContext;
use crate::database::Store;
use crate::routing::{Method, Route, RouteSet};

/// Public, undocumented routes: the rendered document and a backend ping
pub fn routes(ctx: &AppContext, document_json: String) -> RouteSet {
    let document: Arc<str> = Arc::from(document_json);

    [
        Route::new(Method::Get, "/api-spec", api_spec, document),
        Route::new(Method::Get, "/health", health, ctx.store.clone()),
    ]
    .into_iter()
    .collect()
}

/// GET /api-spec
async fn api_spec(State(document): State<Arc<str>>) -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/json")], document.to_string())
}

/// GET /health
async fn health(State(store): State<Arc<dyn Store>>) -> Response {
    let now = chrono::Utc::now();

    match store.health_check().await {
        Ok(()) => Json(json!({
            "item": { "status": "ok", "timestamp": now, "database": "ok" }
        }))
        .into_response(),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "Service Unavailable", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}
