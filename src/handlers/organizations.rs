use crate::api::{AssignmentApi, ResourceApi};
use crate::app::AppContext;
use crate::database::models::{Organization, Role, User};
use crate::routing::{RouteError, RouteSet};

const BASE: &str = "/organizations";

pub fn routes(ctx: &AppContext) -> Result<RouteSet, RouteError> {
    let guard = ctx.guard();
    let mut routes = RouteSet::new();

    // members are users; permissions read organizations.users.*
    routes.extend(
        AssignmentApi::<Organization, User>::new(ctx.store.clone(), BASE, "Members")?
            .routes("organizations", &guard),
    );
    routes.extend(
        AssignmentApi::<Organization, Role>::new(ctx.store.clone(), BASE, "Roles")?
            .routes("organizations", &guard),
    );
    routes.extend(ResourceApi::<Organization>::new(ctx.store.clone(), BASE).routes("organizations", &guard));

    Ok(routes)
}
