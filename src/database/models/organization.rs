use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::base::{self, Base};
use super::{Role, User};
use crate::database::entity::{Entity, EntityMeta, Field, FieldKind, Relation, RelationKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
    pub owner_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Box<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
}

static FIELDS: [Field; 6] = [
    base::ID,
    base::CREATED_AT,
    base::UPDATED_AT,
    Field::new("name", "name", FieldKind::Text),
    Field::new("domain", "domain", FieldKind::Text).optional(),
    Field::new("ownerId", "owner_id", FieldKind::Uuid),
];

static RELATIONS: [Relation; 3] = [
    Relation {
        name: "Owner",
        key: "owner",
        kind: RelationKind::BelongsTo {
            foreign_key: "owner_id",
        },
        target: <User as Entity>::meta,
    },
    Relation {
        name: "Members",
        key: "members",
        kind: RelationKind::ManyToMany {
            join_table: "organizations_members",
            parent_column: "organization_id",
            child_column: "user_id",
        },
        target: <User as Entity>::meta,
    },
    Relation {
        name: "Roles",
        key: "roles",
        kind: RelationKind::ManyToMany {
            join_table: "organizations_roles",
            parent_column: "organization_id",
            child_column: "role_id",
        },
        target: <Role as Entity>::meta,
    },
];

static META: EntityMeta = EntityMeta {
    table: "organizations",
    name: "Organization",
    plural: "Organizations",
    param: "organization",
    slug: "organization",
    plural_slug: "organizations",
    fields: &FIELDS,
    relations: &RELATIONS,
};

impl Entity for Organization {
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
