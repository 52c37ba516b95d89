use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::base::{self, Base};
use super::User;
use crate::database::entity::{Entity, EntityMeta, Field, FieldKind, Relation, RelationKind};

/// Named bundle of permission strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<User>>,
}

static FIELDS: [Field; 6] = [
    base::ID,
    base::CREATED_AT,
    base::UPDATED_AT,
    Field::new("name", "name", FieldKind::Text),
    Field::new("description", "description", FieldKind::Text).optional(),
    Field::new("permissions", "permissions", FieldKind::TextArray).defaulted(),
];

static RELATIONS: [Relation; 1] = [Relation {
    name: "Users",
    key: "users",
    kind: RelationKind::ManyToMany {
        join_table: "users_roles",
        parent_column: "role_id",
        child_column: "user_id",
    },
    target: <User as Entity>::meta,
}];

static META: EntityMeta = EntityMeta {
    table: "roles",
    name: "Role",
    plural: "Roles",
    param: "role",
    slug: "role",
    plural_slug: "roles",
    fields: &FIELDS,
    relations: &RELATIONS,
};

impl Entity for Role {
    fn meta() -> &'static EntityMeta {
        &META
    }

    fn id(&self) -> Uuid {
        self.base.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.base.id = id;
    }
}
