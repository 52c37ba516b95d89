use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A storage-cased row: column name -> JSON value
pub type Record = Map<String, Value>;

pub const ID: &str = "id";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Identifier of a record, if present and well formed
pub fn record_id(record: &Record) -> Option<Uuid> {
    record.get(ID)?.as_str()?.parse().ok()
}

pub fn timestamp(now: DateTime<Utc>) -> Value {
    Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Fill in creation timestamps that the caller left empty
pub fn stamp_created(record: &mut Record, now: DateTime<Utc>) {
    for column in [CREATED_AT, UPDATED_AT] {
        let missing = matches!(record.get(column), None | Some(Value::Null));
        if missing {
            record.insert(column.to_string(), timestamp(now));
        }
    }
}

pub fn stamp_updated(record: &mut Record, now: DateTime<Utc>) {
    record.insert(UPDATED_AT.to_string(), timestamp(now));
}

/// Text form of a value as the `::text` cast would render it
pub fn search_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(search_text).collect();
            format!("{{{}}}", inner.join(","))
        }
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stamps_only_missing_timestamps() {
        let mut record = Record::new();
        record.insert(CREATED_AT.into(), json!("2024-01-01T00:00:00Z"));
        record.insert(UPDATED_AT.into(), Value::Null);

        stamp_created(&mut record, Utc::now());

        assert_eq!(record[CREATED_AT], json!("2024-01-01T00:00:00Z"));
        assert!(record[UPDATED_AT].is_string());
    }

    #[test]
    fn arrays_render_like_postgres_text() {
        assert_eq!(search_text(&json!(["users.*", "roles.view"])), "{users.*,roles.view}");
        assert_eq!(search_text(&json!(true)), "true");
    }

    #[test]
    fn record_id_requires_uuid_text() {
        let mut record = Record::new();
        record.insert(ID.into(), json!("not-a-uuid"));
        assert_eq!(record_id(&record), None);

        let id = Uuid::new_v4();
        record.insert(ID.into(), json!(id));
        assert_eq!(record_id(&record), Some(id));
    }
}
