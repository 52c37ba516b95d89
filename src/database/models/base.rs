use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::entity::{Field, FieldKind};

/// Identifier and timestamps shared by every model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Base {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

pub(crate) const ID: Field = Field::system("id", "id", FieldKind::Uuid);
pub(crate) const CREATED_AT: Field = Field::system("createdAt", "created_at", FieldKind::Timestamp);
pub(crate) const UPDATED_AT: Field = Field::system("updatedAt", "updated_at", FieldKind::Timestamp);
