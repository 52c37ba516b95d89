use crate::api::{AssignmentApi, ResourceApi};
use crate::app::AppContext;
use crate::database::models::{Organization, Role, User};
use crate::routing::{RouteError, RouteSet};

const BASE: &str = "/users";

pub fn routes(ctx: &AppContext) -> Result<RouteSet, RouteError> {
    let guard = ctx.guard();
    let mut routes = RouteSet::new();

    routes.extend(
        AssignmentApi::<User, Organization>::new(ctx.store.clone(), BASE, "Organizations")?
            .routes("users", &guard),
    );
    routes.extend(AssignmentApi::<User, Role>::new(ctx.store.clone(), BASE, "Roles")?.routes("users", &guard));
    routes.extend(ResourceApi::<User>::new(ctx.store.clone(), BASE).routes("users", &guard));

    Ok(routes)
}
