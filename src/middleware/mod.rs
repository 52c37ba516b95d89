use axum::{http::HeaderMap, middleware::from_fn_with_state, routing::MethodRouter};
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error};

use crate::auth::PermissionSet;
use crate::database::models::{Role, User};
use crate::database::{Entity, Query, Store};
use crate::error::ApiError;
use crate::routing::Middleware;
use crate::session::{session_cookie, Session, SessionStore};

pub mod auth;
pub mod authorize;

pub use auth::authenticated_middleware;
pub use authorize::{authorized_middleware, Authorization};

pub const UNAUTHENTICATED: &str = "You must be logged in to access this resource.";
pub const FORBIDDEN: &str = "You do not have permission to access this resource.";
pub const SESSION_SAVE_FAILED: &str = "Failed to save session.";

/// The caller resolved from the session cookie, with roles loaded
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
    pub roles: Vec<Role>,
    pub permissions: PermissionSet,
}

/// Builds the authentication and authorization steps for route middleware chains
#[derive(Clone)]
pub struct Gates {
    pub store: Arc<dyn Store>,
    pub sessions: Arc<dyn SessionStore>,
    pub cookie_name: Arc<str>,
    pub idle_timeout: Duration,
}

impl Gates {
    pub fn new(
        store: Arc<dyn Store>,
        sessions: Arc<dyn SessionStore>,
        cookie_name: &str,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            store,
            sessions,
            cookie_name: Arc::from(cookie_name),
            idle_timeout,
        }
    }

    /// Requires a live session
    pub fn authenticated(&self) -> Middleware {
        let gates = self.clone();
        Middleware::new("authenticated", Vec::new(), move |handler: MethodRouter| {
            handler.route_layer(from_fn_with_state(gates.clone(), authenticated_middleware))
        })
    }

    /// Requires a live session whose roles grant one of `permissions`
    pub fn authorized<I, S>(&self, permissions: I) -> Middleware
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let required: Vec<String> = permissions.into_iter().map(Into::into).collect();
        let state = Authorization {
            gates: self.clone(),
            required: Arc::new(required.clone()),
        };
        Middleware::new("authorized", required, move |handler: MethodRouter| {
            handler.route_layer(from_fn_with_state(state.clone(), authorized_middleware))
        })
    }

    /// Resolve the caller and refresh the session's idle timeout
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<(Identity, Session), ApiError> {
        let session_id = session_cookie(headers, &self.cookie_name).ok_or_else(|| {
            debug!("Rejected request without a session cookie");
            ApiError::unauthorized(UNAUTHENTICATED)
        })?;

        let mut session = self
            .sessions
            .load(&session_id)
            .await
            .map_err(|e| {
                error!("Failed to load session: {}", e);
                ApiError::internal_server_error(e.to_string())
            })?
            .ok_or_else(|| {
                debug!("Rejected request with unknown or expired session");
                ApiError::unauthorized(UNAUTHENTICATED)
            })?;

        let preloads = User::meta().preloads(&["roles".to_string()])?;
        let record = self
            .store
            .find_one(User::meta(), &Query::by_id(session.user_id).with_preloads(preloads))
            .await?
            .ok_or_else(|| {
                debug!("Session {} refers to missing user {}", session.id, session.user_id);
                ApiError::unauthorized(UNAUTHENTICATED)
            })?;

        let user = User::from_record(record)?;
        let roles = user.roles.clone().unwrap_or_default();
        let permissions = PermissionSet::from_roles(&roles);

        session.touch(self.idle_timeout);
        self.sessions.save(&session).await.map_err(|e| {
            error!("Failed to save session {}: {}", session.id, e);
            ApiError::internal_server_error(SESSION_SAVE_FAILED)
        })?;

        Ok((
            Identity {
                user,
                roles,
                permissions,
            },
            session,
        ))
    }
}
