use std::collections::BTreeMap;
use tracing::warn;

use super::components::components;
use super::model::{Document, Info, PathItem, Server};
use crate::config::AppConfig;
use crate::database::EntityMeta;
use crate::routing::RouteSet;

pub const OPENAPI_VERSION: &str = "3.0.3";

/// Title, version and server list for the generated document
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub title: String,
    pub version: String,
    /// Prefix the routes are mounted under; prepended to every path
    pub api_prefix: String,
    pub servers: Vec<Server>,
}

impl DocumentInfo {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            title: config.server.name.clone(),
            version: config.server.version.clone(),
            api_prefix: config.server.api_prefix.clone(),
            servers: vec![
                Server {
                    url: format!("http://localhost:{}", config.server.port),
                    description: "Development".to_string(),
                },
                Server {
                    url: config.server.base_url.clone(),
                    description: "Production".to_string(),
                },
            ],
        }
    }
}

/// Fold every route's documentation into one document.
///
/// Routes sharing a path become separate operations under one path entry.
/// A repeated (method, path) keeps the last route's documentation.
pub fn build(routes: &RouteSet, entities: &[&'static EntityMeta], info: &DocumentInfo) -> Document {
    let mut paths: BTreeMap<String, PathItem> = BTreeMap::new();

    for route in routes.iter() {
        let path = format!("{}{}", info.api_prefix, route.path);
        let item = paths.entry(path).or_default();

        if item
            .insert(route.method.as_str().to_string(), route.doc.clone())
            .is_some()
        {
            warn!(
                "Duplicate documentation for {} {}, keeping the last",
                route.method, route.path
            );
        }
    }

    Document {
        openapi: OPENAPI_VERSION.to_string(),
        info: Info {
            title: info.title.clone(),
            version: info.version.clone(),
            description: None,
        },
        servers: info.servers.clone(),
        paths,
        components: components(entities),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use crate::database::Entity;
    use crate::openapi::model::Operation;
    use crate::routing::{Method, Route};

    async fn ok() -> &'static str {
        "ok"
    }

    fn info() -> DocumentInfo {
        DocumentInfo {
            title: "One REST API".to_string(),
            version: "1.0.0".to_string(),
            api_prefix: "/api/v1".to_string(),
            servers: Vec::new(),
        }
    }

    fn documented(method: Method, path: &str, summary: &str) -> Route {
        Route::new(method, path, ok, ()).with_doc(Operation {
            summary: summary.to_string(),
            ..Operation::default()
        })
    }

    #[test]
    fn shared_path_keeps_every_method() {
        let routes: RouteSet = [
            documented(Method::Get, "/roles/{id}", "Get Role"),
            documented(Method::Put, "/roles/{id}", "Update Role"),
            documented(Method::Delete, "/roles/{id}", "Delete Role"),
        ]
        .into_iter()
        .collect();

        let doc = build(&routes, &[Role::meta()], &info());
        let item = &doc.paths["/api/v1/roles/{id}"];

        assert_eq!(doc.paths.len(), 1);
        assert_eq!(item.len(), 3);
        assert_eq!(item["get"].summary, "Get Role");
        assert_eq!(item["put"].summary, "Update Role");
        assert_eq!(item["delete"].summary, "Delete Role");
    }

    #[test]
    fn repeated_method_keeps_last() {
        let routes: RouteSet = [
            documented(Method::Get, "/roles", "first"),
            documented(Method::Get, "/roles", "second"),
        ]
        .into_iter()
        .collect();

        let doc = build(&routes, &[], &info());
        assert_eq!(doc.paths["/api/v1/roles"]["get"].summary, "second");
    }

    #[test]
    fn document_carries_components_and_version() {
        let doc = build(&RouteSet::new(), &[Role::meta()], &info());
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["openapi"], "3.0.3");
        assert_eq!(value["info"]["title"], "One REST API");
        assert!(value["components"]["schemas"]["Role"].is_object());
        assert!(value["components"]["schemas"]["Roles"].is_object());
        assert!(value["components"]["requestBodies"]["CreateRolePayload"].is_object());
        assert!(value["components"]["parameters"]["PageSize"].is_object());
    }
}
