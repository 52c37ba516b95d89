use axum::{
    handler::Handler,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::openapi::model::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Lower-case name, as used for operation keys in the API document
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Patch => "patch",
            Method::Delete => "delete",
        }
    }

    fn filter(&self) -> MethodFilter {
        match self {
            Method::Get => MethodFilter::GET,
            Method::Post => MethodFilter::POST,
            Method::Put => MethodFilter::PUT,
            Method::Patch => MethodFilter::PATCH,
            Method::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("{entity} has no relation named '{relation}'")]
    UnknownRelation { entity: &'static str, relation: String },

    #[error("relation '{relation}' on {entity} is not many-to-many")]
    NotManyToMany { entity: &'static str, relation: String },

    #[error("relation '{relation}' on {entity} does not lead to {expected}")]
    TargetMismatch {
        entity: &'static str,
        relation: String,
        expected: &'static str,
    },

    #[error("route {method} {path} is registered more than once")]
    Conflict { method: Method, path: String },
}

type Wrap = dyn Fn(MethodRouter) -> MethodRouter + Send + Sync;

/// One step of a route's middleware chain
#[derive(Clone)]
pub struct Middleware {
    pub name: &'static str,
    /// Permissions this step requires, for documentation and logging
    pub permissions: Vec<String>,
    wrap: Arc<Wrap>,
}

impl Middleware {
    pub fn new<F>(name: &'static str, permissions: Vec<String>, wrap: F) -> Self
    where
        F: Fn(MethodRouter) -> MethodRouter + Send + Sync + 'static,
    {
        Self {
            name,
            permissions,
            wrap: Arc::new(wrap),
        }
    }

    pub fn apply(&self, handler: MethodRouter) -> MethodRouter {
        (self.wrap)(handler)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name)
            .field("permissions", &self.permissions)
            .finish()
    }
}

/// Method, path template, middleware chain, handler and documentation for one endpoint
pub struct Route {
    pub method: Method,
    /// Path template with `{name}` placeholders
    pub path: String,
    pub middleware: Vec<Middleware>,
    pub handler: MethodRouter,
    pub doc: Operation,
}

impl Route {
    pub fn new<H, T, S>(method: Method, path: impl Into<String>, handler: H, state: S) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        Self {
            method,
            path: path.into(),
            middleware: Vec::new(),
            handler: on(method.filter(), handler).with_state(state),
            doc: Operation::default(),
        }
    }

    pub fn with_middleware(mut self, middleware: Vec<Middleware>) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn with_doc(mut self, doc: Operation) -> Self {
        self.doc = doc;
        self
    }

    /// Handler wrapped so the first listed middleware runs first
    fn layered(&self) -> MethodRouter {
        self.middleware
            .iter()
            .rev()
            .fold(self.handler.clone(), |handler, m| m.apply(handler))
    }
}

/// Routes contributed by one feature router; merged by the composition root
#[derive(Default)]
pub struct RouteSet {
    routes: Vec<Route>,
}

impl RouteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn extend(&mut self, other: RouteSet) {
        self.routes.extend(other.routes);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Mount every route on a router. Methods sharing a path merge into one entry.
    pub fn bind(&self) -> Result<Router, RouteError> {
        let mut seen = HashSet::new();
        let mut router = Router::new();

        for route in &self.routes {
            if !seen.insert((route.method, route.path.clone())) {
                return Err(RouteError::Conflict {
                    method: route.method,
                    path: route.path.clone(),
                });
            }

            tracing::debug!(
                "Binding {} {} ({} middleware)",
                route.method,
                route.path,
                route.middleware.len()
            );
            router = router.route(&axum_path(&route.path), route.layered());
        }

        Ok(router)
    }
}

impl FromIterator<Route> for RouteSet {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}

/// Convert `{name}` placeholders to axum's `:name` form
pub fn axum_path(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        match rest[start..].find('}') {
            Some(len) => {
                out.push_str(&rest[..start]);
                out.push(':');
                out.push_str(&rest[start + 1..start + len]);
                rest = &rest[start + len + 1..];
            }
            None => break,
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[test]
    fn converts_placeholders() {
        assert_eq!(axum_path("/users/{id}"), "/users/:id");
        assert_eq!(
            axum_path("/users/unassign-role/{userId}/{roleId}"),
            "/users/unassign-role/:userId/:roleId"
        );
        assert_eq!(axum_path("/users"), "/users");
        assert_eq!(axum_path("/broken/{id"), "/broken/{id");
    }

    async fn ok() -> &'static str {
        "ok"
    }

    #[tokio::test]
    async fn shared_path_methods_merge() {
        let routes: RouteSet = [
            Route::new(Method::Get, "/things/{id}", ok, ()),
            Route::new(Method::Delete, "/things/{id}", ok, ()),
        ]
        .into_iter()
        .collect();

        let router = routes.bind().unwrap();
        for method in ["GET", "DELETE"] {
            let response = router
                .clone()
                .oneshot(Request::builder().method(method).uri("/things/1").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), 200);
        }
    }

    #[test]
    fn duplicate_method_and_path_is_a_conflict() {
        let routes: RouteSet = [
            Route::new(Method::Get, "/things", ok, ()),
            Route::new(Method::Get, "/things", ok, ()),
        ]
        .into_iter()
        .collect();

        assert!(matches!(routes.bind(), Err(RouteError::Conflict { method: Method::Get, .. })));
    }

    #[tokio::test]
    async fn first_listed_middleware_runs_first() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        let step = |name: &'static str| {
            let order = order.clone();
            let calls = calls.clone();
            Middleware::new(name, Vec::new(), move |handler: MethodRouter| {
                let order = order.clone();
                let calls = calls.clone();
                handler.route_layer(axum::middleware::from_fn(
                    move |request: axum::extract::Request, next: axum::middleware::Next| {
                        let order = order.clone();
                        calls.fetch_add(1, Ordering::SeqCst);
                        async move {
                            order.lock().unwrap().push(name);
                            next.run(request).await
                        }
                    },
                ))
            })
        };

        let routes: RouteSet = [Route::new(Method::Get, "/x", ok, ()).with_middleware(vec![step("outer"), step("inner")])]
            .into_iter()
            .collect();

        routes
            .bind()
            .unwrap()
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*order.lock().unwrap(), vec!["outer", "inner"]);
    }
}
