use serde_json::json;
use std::collections::BTreeMap;

use super::model::{
    json_content, Components, Parameter, ParameterLocation, RefOr, RequestBody, Response, Schema,
};
use crate::database::entity::{EntityMeta, Field, FieldKind};

fn query_parameter(name: &str, description: &str, schema: Schema) -> Parameter {
    Parameter {
        name: name.to_string(),
        location: ParameterLocation::Query,
        description: description.to_string(),
        required: false,
        schema: RefOr::Item(schema),
        style: None,
        explode: None,
    }
}

fn string_array() -> Schema {
    Schema::array_of(RefOr::Item(Schema::typed("string")))
}

/// Required UUID path parameter, e.g. `{userId}`
pub fn path_parameter(name: &str, description: &str) -> Parameter {
    Parameter {
        name: name.to_string(),
        location: ParameterLocation::Path,
        description: description.to_string(),
        required: true,
        schema: RefOr::Item(Schema::typed("string").with_format("uuid")),
        style: None,
        explode: None,
    }
}

/// Parameters referenced by name from every list and get-one operation
pub fn shared_parameters() -> BTreeMap<String, Parameter> {
    let mut page = Schema::typed("integer").with_format("int64");
    page.default = Some(json!(1));
    page.minimum = Some(1);

    let mut page_size = Schema::typed("integer").with_format("int64");
    page_size.default = Some(json!(10));
    page_size.minimum = Some(1);

    let mut disable = Schema::typed("boolean");
    disable.default = Some(json!(false));

    let mut preload = query_parameter("preload", "The related entities to preload.", string_array());
    preload.style = Some("form".to_string());
    preload.explode = Some(true);

    let mut search_column = query_parameter("searchColumn", "The columns to search in.", string_array());
    search_column.style = Some("form".to_string());
    search_column.explode = Some(true);

    BTreeMap::from([
        ("Id".to_string(), path_parameter("id", "The entity id.")),
        (
            "DisablePagination".to_string(),
            query_parameter("disablePagination", "Disable pagination.", disable),
        ),
        ("Page".to_string(), query_parameter("page", "The page number.", page)),
        (
            "PageSize".to_string(),
            query_parameter("pageSize", "The number of items per page.", page_size),
        ),
        ("Preload".to_string(), preload),
        (
            "SearchTerm".to_string(),
            query_parameter("searchTerm", "The term to search for.", Schema::typed("string")),
        ),
        ("SearchColumn".to_string(), search_column),
    ])
}

/// References to the query parameters every list operation accepts
pub fn list_parameters() -> Vec<RefOr<Parameter>> {
    ["DisablePagination", "Page", "PageSize", "Preload", "SearchTerm", "SearchColumn"]
        .into_iter()
        .map(RefOr::parameter)
        .collect()
}

fn error_schema() -> Schema {
    Schema::object(
        BTreeMap::from([
            ("error".to_string(), RefOr::Item(Schema::typed("string").with_format("text"))),
            ("message".to_string(), RefOr::Item(Schema::typed("string").with_format("text"))),
        ]),
        vec!["error".to_string(), "message".to_string()],
    )
}

fn pagination_schema() -> Schema {
    let integer = || RefOr::Item(Schema::typed("integer").with_format("int64"));
    let names = ["count", "pages", "pageSize", "currentPage", "nextPage", "previousPage"];

    Schema::object(
        names.iter().map(|n| (n.to_string(), integer())).collect(),
        names.iter().map(|n| n.to_string()).collect(),
    )
}

fn success_schema(entities: &[&'static EntityMeta]) -> Schema {
    let mut item = Schema::default();
    item.any_of = Some(entities.iter().map(|m| RefOr::schema(m.name)).collect());

    let mut items = Schema::typed("array");
    items.any_of = Some(entities.iter().map(|m| RefOr::schema(m.plural)).collect());

    Schema::object(
        BTreeMap::from([
            ("item".to_string(), RefOr::Item(item)),
            ("items".to_string(), RefOr::Item(items)),
            ("pagination".to_string(), RefOr::schema("Pagination")),
        ]),
        Vec::new(),
    )
}

fn field_schema(field: &Field) -> Schema {
    let mut schema = match field.kind {
        FieldKind::Uuid => Schema::typed("string").with_format("uuid"),
        FieldKind::Text => Schema::typed("string").with_format("text"),
        FieldKind::Boolean => Schema::typed("boolean"),
        FieldKind::Timestamp => Schema::typed("string").with_format("date-time"),
        FieldKind::TextArray => string_array(),
    };
    if field.nullable {
        schema.nullable = Some(true);
    }
    schema
}

/// Schema of one stored entity, relations included as references
pub fn entity_schema(meta: &EntityMeta) -> Schema {
    let mut properties: BTreeMap<String, RefOr<Schema>> = meta
        .fields
        .iter()
        .map(|f| {
            let mut schema = field_schema(f);
            if !f.writable {
                schema.read_only = Some(true);
            }
            (f.wire.to_string(), RefOr::Item(schema))
        })
        .collect();

    for relation in meta.relations {
        let target = relation.target_meta();
        let schema = if relation.is_many_to_many() {
            RefOr::schema(target.plural)
        } else {
            RefOr::schema(target.name)
        };
        properties.insert(relation.key.to_string(), schema);
    }

    let required = meta
        .fields
        .iter()
        .filter(|f| !f.nullable)
        .map(|f| f.wire.to_string())
        .collect();

    Schema::object(properties, required)
}

fn payload(meta: &EntityMeta, creating: bool) -> RequestBody {
    let writable: Vec<&Field> = meta.fields.iter().filter(|f| f.writable).collect();

    let properties = writable
        .iter()
        .map(|f| (f.wire.to_string(), RefOr::Item(field_schema(f))))
        .collect();
    let required = if creating {
        writable.iter().filter(|f| f.required).map(|f| f.wire.to_string()).collect()
    } else {
        Vec::new()
    };

    let action = if creating { "create a new" } else { "update an existing" };
    RequestBody {
        description: format!("The payload to {} {}.", action, meta.name.to_lowercase()),
        required: true,
        content: json_content(RefOr::Item(Schema::object(properties, required))),
    }
}

pub fn create_payload_name(meta: &EntityMeta) -> String {
    format!("Create{}Payload", meta.name)
}

pub fn update_payload_name(meta: &EntityMeta) -> String {
    format!("Update{}Payload", meta.name)
}

/// Shared dictionaries for the given entities
pub fn components(entities: &[&'static EntityMeta]) -> Components {
    let mut components = Components {
        parameters: shared_parameters(),
        ..Components::default()
    };

    components.schemas.insert("SuccessResponse".to_string(), success_schema(entities));
    components.schemas.insert("ErrorResponse".to_string(), error_schema());
    components.schemas.insert("Pagination".to_string(), pagination_schema());

    for meta in entities {
        components.schemas.insert(meta.name.to_string(), entity_schema(meta));
        components
            .schemas
            .insert(meta.plural.to_string(), Schema::array_of(RefOr::schema(meta.name)));
        components
            .request_bodies
            .insert(create_payload_name(meta), payload(meta, true));
        components
            .request_bodies
            .insert(update_payload_name(meta), payload(meta, false));
    }

    components
}

/// Standard response set: `success` for 200 and the error shape for each listed code
pub fn responses(success: &str, errors: &[u16]) -> BTreeMap<String, Response> {
    let mut responses = BTreeMap::from([(
        "200".to_string(),
        Response {
            description: success.to_string(),
            content: Some(json_content(RefOr::schema("SuccessResponse"))),
        },
    )]);

    for code in errors {
        let description = axum::http::StatusCode::from_u16(*code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Error");
        responses.insert(
            code.to_string(),
            Response {
                description: description.to_string(),
                content: Some(json_content(RefOr::schema("ErrorResponse"))),
            },
        );
    }

    responses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entity::Entity;
    use crate::database::models::{Role, User};

    #[test]
    fn create_payload_lists_writable_required_fields() {
        let body = payload(Role::meta(), true);
        let schema = match &body.content["application/json"].schema {
            RefOr::Item(schema) => schema.clone(),
            RefOr::Ref(_) => panic!("expected inline schema"),
        };

        let properties = schema.properties.unwrap();
        assert!(properties.contains_key("name"));
        assert!(!properties.contains_key("id"));
        assert_eq!(schema.required, Some(vec!["name".to_string()]));
    }

    #[test]
    fn update_payload_requires_nothing() {
        let body = payload(User::meta(), false);
        let value = serde_json::to_value(&body).unwrap();
        assert!(value["content"]["application/json"]["schema"].get("required").is_none());
        assert_eq!(body.description, "The payload to update an existing user.");
    }

    #[test]
    fn entity_schema_references_related_collections() {
        let value = serde_json::to_value(entity_schema(User::meta())).unwrap();
        assert_eq!(value["properties"]["roles"]["$ref"], "#/components/schemas/Roles");
        assert_eq!(value["properties"]["id"]["format"], "uuid");
        assert_eq!(value["properties"]["bio"]["nullable"], true);
    }

    #[test]
    fn responses_use_reason_phrases() {
        let responses = responses("Roles retrieved successfully.", &[400, 401, 403, 500]);
        assert_eq!(responses.len(), 5);
        assert_eq!(responses["403"].description, "Forbidden");
        assert_eq!(responses["500"].description, "Internal Server Error");
    }
}
