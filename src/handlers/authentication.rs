use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Extension, Json,
};
use tracing::{error, info};

use crate::api::Item;
use crate::app::AppContext;
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{Gates, Identity};
use crate::openapi::components::responses;
use crate::openapi::model::Operation;
use crate::routing::{Method, Route, RouteSet};
use crate::session::Session;

const TAG: &str = "Authentication";

pub fn routes(ctx: &AppContext) -> RouteSet {
    let authenticated = || vec![ctx.gates.authenticated()];

    [
        Route::new(Method::Get, "/authentication/check", check, ())
            .with_middleware(authenticated())
            .with_doc(Operation {
                summary: "Check Authentication".to_string(),
                description: "Confirms the caller holds a live session.".to_string(),
                tags: vec![TAG.to_string()],
                responses: responses("The caller is authenticated.", &[401, 500]),
                ..Operation::default()
            }),
        Route::new(Method::Get, "/authentication/me", me, ())
            .with_middleware(authenticated())
            .with_doc(Operation {
                summary: "Get Current User".to_string(),
                description: "Returns the current user's information.".to_string(),
                tags: vec![TAG.to_string()],
                responses: responses(
                    "Returns the current user's information.",
                    &[400, 401, 403, 404, 500],
                ),
                ..Operation::default()
            }),
        Route::new(Method::Post, "/authentication/logout", logout, ctx.gates.clone())
            .with_middleware(authenticated())
            .with_doc(Operation {
                summary: "Logout".to_string(),
                description: "Destroys the caller's session.".to_string(),
                tags: vec![TAG.to_string()],
                responses: responses("The session was destroyed.", &[401, 500]),
                ..Operation::default()
            }),
    ]
    .into_iter()
    .collect()
}

/// GET /authentication/check
async fn check() -> Json<Item<bool>> {
    Json(Item::new(true))
}

/// GET /authentication/me
async fn me(Extension(identity): Extension<Identity>) -> Json<Item<User>> {
    Json(Item::new(identity.user))
}

/// POST /authentication/logout
async fn logout(
    State(gates): State<Gates>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    gates.sessions.destroy(&session.id).await.map_err(|e| {
        error!("Failed to destroy session {}: {}", session.id, e);
        ApiError::internal_server_error(e.to_string())
    })?;
    info!("User {} logged out", session.user_id);

    let expired = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", gates.cookie_name);
    Ok((StatusCode::OK, AppendHeaders([(SET_COOKIE, expired)])))
}
