use anyhow::{Context, Result};
use axum::{
    http::{
        header::{CONTENT_TYPE, COOKIE},
        HeaderValue, Method,
    },
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::{AppConfig, StorageBackend};
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};
use crate::handlers;
use crate::middleware::Gates;
use crate::openapi::{self, Document, DocumentInfo};
use crate::routing::{Middleware, RouteSet};
use crate::session::{MemorySessionStore, PgSessionStore, SessionStore};

/// Shared backends and the gates built on them
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn Store>,
    pub sessions: Arc<dyn SessionStore>,
    pub gates: Gates,
}

impl AppContext {
    pub fn new(store: Arc<dyn Store>, sessions: Arc<dyn SessionStore>, config: &AppConfig) -> Self {
        let gates = Gates::new(
            store.clone(),
            sessions.clone(),
            &config.session.cookie_name,
            config.session.idle_timeout(),
        );

        Self { store, sessions, gates }
    }

    /// Build the backends selected by `config.storage`
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let (store, sessions): (Arc<dyn Store>, Arc<dyn SessionStore>) = match config.storage {
            StorageBackend::Memory => {
                warn!("Using in-memory storage; data is lost on exit");
                (Arc::new(MemoryStore::new()), Arc::new(MemorySessionStore::new()))
            }
            StorageBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.database)
                    .await
                    .context("failed to connect to PostgreSQL")?;
                (Arc::new(PgStore::new(pool.clone())), Arc::new(PgSessionStore::new(pool)))
            }
        };

        Ok(Self::new(store, sessions, config))
    }

    /// Middleware for a route requiring `permission`: session first, then the permission check
    pub fn guard(&self) -> impl Fn(String) -> Vec<Middleware> + '_ {
        move |permission| vec![self.gates.authenticated(), self.gates.authorized([permission])]
    }
}

/// The API document for the documented routes
pub fn document(ctx: &AppContext, config: &AppConfig) -> Result<Document> {
    let routes = handlers::routes(ctx)?;
    Ok(build_document(&routes, config))
}

fn build_document(routes: &RouteSet, config: &AppConfig) -> Document {
    openapi::build(routes, &handlers::entities(), &DocumentInfo::from_config(config))
}

/// Full application router: every feature route under the API prefix, plus CORS and tracing
pub fn router(ctx: &AppContext, config: &AppConfig) -> Result<Router> {
    let mut routes = handlers::routes(ctx)?;
    let document = build_document(&routes, config);
    info!(
        "Registered {} routes across {} paths",
        routes.len(),
        document.paths.len()
    );

    let document_json = openapi::render(&document, openapi::Format::Json)?;
    routes.extend(handlers::system::routes(ctx, document_json));

    let api = routes.bind()?;
    let prefix = config.server.api_prefix.trim_end_matches('/');
    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    };

    Ok(app.layer(cors(config)).layer(TraceLayer::new_for_http()))
}

fn cors(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE, COOKIE])
        .allow_credentials(true)
}
