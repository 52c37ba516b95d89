use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::record::Record;

/// Errors raised while translating between wire payloads and storage records
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("The relation '{segment}' does not exist on {entity}.")]
    UnknownRelation { entity: &'static str, segment: String },

    #[error("System field '{0}' cannot be set via API")]
    SystemField(String),

    #[error("Failed to encode record: {0}")]
    Encode(String),

    #[error("Failed to decode record: {0}")]
    Decode(String),
}

/// A persisted record type served by the generic controllers
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Static metadata table for this type
    fn meta() -> &'static EntityMeta;

    fn id(&self) -> Uuid;

    fn set_id(&mut self, id: Uuid);

    /// Storage-cased record holding every declared column
    fn to_record(&self) -> Result<Record, EntityError> {
        Self::meta().storage_record(self)
    }

    fn from_record(record: Record) -> Result<Self, EntityError> {
        Self::meta().decode(record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Uuid,
    Text,
    Boolean,
    Timestamp,
    TextArray,
}

/// One column: its wire (JSON) name, storage column, and documentation traits
#[derive(Debug)]
pub struct Field {
    pub wire: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    /// Clients may set it through create/update payloads
    pub writable: bool,
    /// Must be present in create payloads
    pub required: bool,
}

impl Field {
    pub const fn new(wire: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self {
            wire,
            column,
            kind,
            nullable: false,
            writable: true,
            required: true,
        }
    }

    /// Server-managed column (identifier, timestamps)
    pub const fn system(wire: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self {
            wire,
            column,
            kind,
            nullable: false,
            writable: false,
            required: false,
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            nullable: true,
            required: false,
            ..self
        }
    }

    /// Not nullable, but has a storage default
    pub const fn defaulted(self) -> Self {
        Self {
            required: false,
            ..self
        }
    }
}

#[derive(Debug)]
pub enum RelationKind {
    ManyToMany {
        join_table: &'static str,
        parent_column: &'static str,
        child_column: &'static str,
    },
    BelongsTo {
        foreign_key: &'static str,
    },
}

/// A named relation from one entity to another
#[derive(Debug)]
pub struct Relation {
    /// Canonical relation name ("Roles")
    pub name: &'static str,
    /// Key the related value lives under in records ("roles")
    pub key: &'static str,
    pub kind: RelationKind,
    pub target: fn() -> &'static EntityMeta,
}

impl Relation {
    pub fn target_meta(&self) -> &'static EntityMeta {
        (self.target)()
    }

    pub fn is_many_to_many(&self) -> bool {
        matches!(self.kind, RelationKind::ManyToMany { .. })
    }
}

/// A resolved preload: one relation plus the relations to load beneath it
#[derive(Debug, Clone)]
pub struct Preload {
    pub relation: &'static Relation,
    pub nested: Vec<Preload>,
}

/// Per-entity naming and schema table, built once as a static
#[derive(Debug)]
pub struct EntityMeta {
    pub table: &'static str,
    /// Display name ("Role")
    pub name: &'static str,
    /// Pluralized display name, also the documentation tag ("Roles")
    pub plural: &'static str,
    /// Path parameter stem, `{roleId}`
    pub param: &'static str,
    /// Path segment for assign/unassign routes ("role")
    pub slug: &'static str,
    /// Path segment for list routes ("roles")
    pub plural_slug: &'static str,
    pub fields: &'static [Field],
    pub relations: &'static [Relation],
}

impl EntityMeta {
    /// Name of the path parameter carrying this entity's identifier
    pub fn path_param(&self) -> String {
        format!("{}Id", self.param)
    }

    pub fn field(&self, wire: &str) -> Option<&'static Field> {
        let fields: &'static [Field] = self.fields;
        fields.iter().find(|f| f.wire == wire)
    }

    pub fn field_by_column(&self, column: &str) -> Option<&'static Field> {
        let fields: &'static [Field] = self.fields;
        fields.iter().find(|f| f.column == column)
    }

    pub fn column(&self, wire: &str) -> Option<&'static str> {
        self.field(wire).map(|f| f.column)
    }

    /// Storage column for a wire name. Unknown names pass through unchanged.
    pub fn column_name(&self, wire: &str) -> String {
        self.column(wire)
            .map(str::to_string)
            .unwrap_or_else(|| wire.to_string())
    }

    /// Resolve a relation by name, ignoring ASCII case and underscores
    pub fn relation(&self, name: &str) -> Option<&'static Relation> {
        let relations: &'static [Relation] = self.relations;
        relations
            .iter()
            .find(|r| same_name(r.name, name) || same_name(r.key, name))
    }

    /// Normalize dot-separated preload paths into a merged relation tree
    pub fn preloads(&self, paths: &[String]) -> Result<Vec<Preload>, EntityError> {
        let mut tree = Vec::new();

        for path in paths {
            let segments: Vec<&str> = path
                .split('.')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();

            if segments.is_empty() {
                continue;
            }

            insert_preload(self, &mut tree, &segments)?;
        }

        Ok(tree)
    }

    /// Serialize a typed entity into a storage-cased record of declared columns
    pub fn storage_record<E: Serialize + ?Sized>(&self, entity: &E) -> Result<Record, EntityError> {
        let value = serde_json::to_value(entity).map_err(|e| EntityError::Encode(e.to_string()))?;

        let Value::Object(map) = value else {
            return Err(EntityError::Encode(format!(
                "{} did not serialize to an object",
                self.name
            )));
        };

        let mut record = Record::new();
        for field in self.fields {
            if let Some(value) = map.get(field.wire) {
                record.insert(field.column.to_string(), value.clone());
            }
        }

        Ok(record)
    }

    /// Map a wire-cased partial update onto storage column names
    pub fn storage_fields(&self, fields: &Map<String, Value>) -> Result<Record, EntityError> {
        let mut record = Record::new();

        for (key, value) in fields {
            let field = self.field(key).or_else(|| self.field_by_column(key));

            match field {
                Some(field) if !field.writable => {
                    return Err(EntityError::SystemField(key.clone()));
                }
                Some(field) => {
                    record.insert(field.column.to_string(), value.clone());
                }
                None => {
                    record.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(record)
    }

    /// Rename storage columns to wire names, including preloaded relations
    pub fn wire_record(&self, record: Record) -> Record {
        let mut wire = Record::new();

        for (key, value) in record {
            if let Some(field) = self.field_by_column(&key) {
                wire.insert(field.wire.to_string(), value);
                continue;
            }

            let relation = self.relations.iter().find(|r| r.key == key);
            match relation {
                Some(relation) => {
                    let target = relation.target_meta();
                    wire.insert(key, target.wire_value(value));
                }
                None => {
                    wire.insert(key, value);
                }
            }
        }

        wire
    }

    fn wire_value(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.wire_record(map)),
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.wire_value(v)).collect()),
            other => other,
        }
    }

    pub fn decode<E: DeserializeOwned>(&self, record: Record) -> Result<E, EntityError> {
        serde_json::from_value(Value::Object(self.wire_record(record)))
            .map_err(|e| EntityError::Decode(format!("{}: {}", self.name, e)))
    }
}

fn insert_preload(
    meta: &EntityMeta,
    level: &mut Vec<Preload>,
    segments: &[&str],
) -> Result<(), EntityError> {
    let Some((first, rest)) = segments.split_first() else {
        return Ok(());
    };

    let relation = meta
        .relation(first)
        .ok_or_else(|| EntityError::UnknownRelation {
            entity: meta.name,
            segment: first.to_string(),
        })?;

    let index = match level.iter().position(|p| std::ptr::eq(p.relation, relation)) {
        Some(index) => index,
        None => {
            level.push(Preload {
                relation,
                nested: Vec::new(),
            });
            level.len() - 1
        }
    };

    insert_preload(relation.target_meta(), &mut level[index].nested, rest)
}

fn same_name(canonical: &str, candidate: &str) -> bool {
    let fold = |s: &str| {
        s.chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect::<String>()
    };
    fold(canonical) == fold(candidate)
}
