// Feature routers. Each returns its own RouteSet; the composition root in
// app.rs merges them, binds them and folds their docs into the API document.
//
// /users             resource + roles + organizations
// /roles             resource
// /organizations     resource + members + roles
// /authentication    check, me, logout
// /api-spec, /health system routes, added after the document is built

pub mod authentication;
pub mod organizations;
pub mod roles;
pub mod system;
pub mod users;

use crate::app::AppContext;
use crate::database::models::{Organization, Role, User};
use crate::database::{Entity, EntityMeta};
use crate::routing::{RouteError, RouteSet};

/// Entities whose schemas and payloads appear in the document components
pub fn entities() -> Vec<&'static EntityMeta> {
    vec![User::meta(), Role::meta(), Organization::meta()]
}

/// Every documented route, in registration order
pub fn routes(ctx: &AppContext) -> Result<RouteSet, RouteError> {
    let mut routes = RouteSet::new();

    routes.extend(authentication::routes(ctx));
    routes.extend(users::routes(ctx)?);
    routes.extend(roles::routes(ctx));
    routes.extend(organizations::routes(ctx)?);

    Ok(routes)
}
