use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::base::{self, Base};
use super::{Organization, Role};
use crate::database::entity::{Entity, EntityMeta, Field, FieldKind, Relation, RelationKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub base: Base,
    #[serde(default)]
    pub image: Option<String>,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub mfa_enabled: bool,
    #[serde(default)]
    pub mfa_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizations: Option<Vec<Organization>>,
}

static FIELDS: [Field; 9] = [
    base::ID,
    base::CREATED_AT,
    base::UPDATED_AT,
    Field::new("image", "image", FieldKind::Text).optional(),
    Field::new("name", "name", FieldKind::Text),
    Field::new("username", "username", FieldKind::Text),
    Field::new("bio", "bio", FieldKind::Text).optional(),
    Field::new("mfaEnabled", "mfa_enabled", FieldKind::Boolean).defaulted(),
    Field::new("mfaVerified", "mfa_verified", FieldKind::Boolean).defaulted(),
];

static RELATIONS: [Relation; 2] = [
    Relation {
        name: "Roles",
        key: "roles",
        kind: RelationKind::ManyToMany {
            join_table: "users_roles",
            parent_column: "user_id",
            child_column: "role_id",
        },
        target: <Role as Entity>::meta,
    },
    Relation {
        name: "Organizations",
        key: "organizations",
        kind: RelationKind::ManyToMany {
            join_table: "organizations_members",
            parent_column: "user_id",
            child_column: "organization_id",
        },
        target: <Organization as Entity>::meta,
    },
];

static META: EntityMeta = EntityMeta {
    table: "users",
    name: "User",
    plural: "Users",
    param: "user",
    slug: "user",
    plural_slug: "users",
    fields: &FIELDS,
    relations: &RELATIONS,
};

impl Entity for User {
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
