use std::marker::PhantomData;
use std::sync::Arc;

use crate::database::{Entity, Relation, Store};
use crate::openapi::components::path_parameter;
use crate::openapi::model::{Parameter, RefOr};
use crate::routing::{Middleware, Route, RouteError, RouteSet};

mod assign;
mod list;
mod unassign;

/// Handler state: the store plus the relation the routes operate on
#[derive(Clone)]
pub(crate) struct Association {
    pub store: Arc<dyn Store>,
    pub relation: &'static Relation,
}

/// Association routes between a parent type `P` and a child type `C`,
/// operating on one many-to-many relation of `P`
pub struct AssignmentApi<P: Entity, C: Entity> {
    association: Association,
    base: String,
    _types: PhantomData<fn() -> (P, C)>,
}

impl<P: Entity, C: Entity> AssignmentApi<P, C> {
    /// Fails when `P` has no many-to-many relation named `relation` leading to `C`
    pub fn new(store: Arc<dyn Store>, base: impl Into<String>, relation: &str) -> Result<Self, RouteError> {
        let parent = P::meta();
        let child = C::meta();

        let resolved = parent.relation(relation).ok_or_else(|| RouteError::UnknownRelation {
            entity: parent.name,
            relation: relation.to_string(),
        })?;

        if !resolved.is_many_to_many() {
            return Err(RouteError::NotManyToMany {
                entity: parent.name,
                relation: relation.to_string(),
            });
        }

        if !std::ptr::eq(resolved.target_meta(), child) {
            return Err(RouteError::TargetMismatch {
                entity: parent.name,
                relation: relation.to_string(),
                expected: child.name,
            });
        }

        Ok(Self {
            association: Association {
                store,
                relation: resolved,
            },
            base: base.into(),
            _types: PhantomData,
        })
    }

    pub fn relation(&self) -> &'static Relation {
        self.association.relation
    }

    fn id_parameter<E: Entity>() -> RefOr<Parameter> {
        let meta = E::meta();
        RefOr::Item(path_parameter(
            &meta.path_param(),
            &format!("The {} id.", meta.name.to_lowercase()),
        ))
    }

    /// Assign, unassign and list, guarded by `guard(<prefix>.<children>.<action>)`
    pub fn routes<F>(&self, prefix: &str, guard: F) -> RouteSet
    where
        F: Fn(String) -> Vec<Middleware>,
    {
        let permission =
            |action: &str| guard(format!("{}.{}.{}", prefix, C::meta().plural_slug, action));

        [
            self.assign(permission("assign")),
            self.unassign(permission("unassign")),
            self.list(permission("list")),
        ]
        .into_iter()
        .collect::<RouteSet>()
    }

    pub fn assign(&self, middleware: Vec<Middleware>) -> Route {
        assign::route::<P, C>(self, None, middleware)
    }

    /// Same handler as `assign`, documented with a named request body
    pub fn assign_with_payload(&self, request_body: &str, middleware: Vec<Middleware>) -> Route {
        assign::route::<P, C>(self, Some(request_body), middleware)
    }

    pub fn unassign(&self, middleware: Vec<Middleware>) -> Route {
        unassign::route::<P, C>(self, middleware)
    }

    pub fn list(&self, middleware: Vec<Middleware>) -> Route {
        list::route::<P, C>(self, middleware)
    }
}
