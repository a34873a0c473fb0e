//! Declarative ledger schema.
//!
//! One table describes every ledger field: its flat name, its Notion property,
//! how it is rendered and whether a record without it is refused. Sinks render
//! from the table through [`map_fields`]; none of them inspects fields by hand.

use aqua_core::models::LedgerOutcome;
use aqua_core::LedgerError;

/// Notion rich text blocks are limited to this many characters.
const NOTION_TEXT_LIMIT: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    Email,
    Url,
    Select,
    Number,
    RichText,
    Date,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(u64),
}

pub struct FieldDescriptor {
    /// Key in the flat (HTTP) record
    pub name: &'static str,
    /// Property name in the Notion database
    pub property: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub extract: fn(&LedgerOutcome) -> Option<FieldValue>,
}

fn text(value: &Option<String>) -> Option<FieldValue> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| FieldValue::Text(v.to_string()))
}

pub static LEDGER_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "filename",
        property: "Name",
        kind: FieldKind::Title,
        required: true,
        extract: |o| text(&o.filename),
    },
    FieldDescriptor {
        name: "email",
        property: "user_email",
        kind: FieldKind::Email,
        required: false,
        extract: |o| text(&o.email),
    },
    FieldDescriptor {
        name: "original_url",
        property: "original_links",
        kind: FieldKind::Url,
        required: true,
        extract: |o| text(&o.original_url),
    },
    FieldDescriptor {
        name: "output_url",
        property: "output_links",
        kind: FieldKind::Url,
        required: false,
        extract: |o| text(&o.output_url),
    },
    FieldDescriptor {
        name: "status",
        property: "status",
        kind: FieldKind::Select,
        required: true,
        extract: |o| o.status.map(|s| FieldValue::Text(s.as_str().to_string())),
    },
    FieldDescriptor {
        name: "enhancement_level",
        property: "enhancement_level",
        kind: FieldKind::Select,
        required: false,
        extract: |o| {
            o.enhancement_level
                .map(|l| FieldValue::Text(l.as_str().to_string()))
        },
    },
    FieldDescriptor {
        name: "processing_time",
        property: "processing_time_ms",
        kind: FieldKind::Number,
        required: false,
        extract: |o| o.processing_time_ms.map(FieldValue::Number),
    },
    FieldDescriptor {
        name: "notes",
        property: "notes",
        kind: FieldKind::RichText,
        required: false,
        extract: |o| text(&o.notes),
    },
    FieldDescriptor {
        name: "created_at",
        property: "created_at",
        kind: FieldKind::Date,
        required: false,
        extract: |o| o.recorded_at.map(|t| FieldValue::Text(t.to_rfc3339())),
    },
];

/// Extract every present field. A missing required field refuses the record;
/// a missing optional one is simply left out.
pub fn map_fields(
    outcome: &LedgerOutcome,
) -> Result<Vec<(&'static FieldDescriptor, FieldValue)>, LedgerError> {
    let mut fields = Vec::with_capacity(LEDGER_FIELDS.len());
    for descriptor in LEDGER_FIELDS {
        match (descriptor.extract)(outcome) {
            Some(value) => fields.push((descriptor, value)),
            None if descriptor.required => {
                return Err(LedgerError::MissingField(descriptor.name));
            }
            None => {}
        }
    }
    Ok(fields)
}

/// Flat record for the HTTP ledger endpoint.
pub fn to_flat_record(
    outcome: &LedgerOutcome,
) -> Result<serde_json::Map<String, serde_json::Value>, LedgerError> {
    let mut record = serde_json::Map::new();
    for (descriptor, value) in map_fields(outcome)? {
        let value = match value {
            FieldValue::Text(s) => serde_json::Value::String(s),
            FieldValue::Number(n) => serde_json::Value::from(n),
        };
        record.insert(descriptor.name.to_string(), value);
    }
    Ok(record)
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn notion_text(content: &str) -> serde_json::Value {
    serde_json::json!([{
        "type": "text",
        "text": { "content": truncate_chars(content, NOTION_TEXT_LIMIT) }
    }])
}

fn notion_property(kind: FieldKind, value: &FieldValue) -> serde_json::Value {
    use serde_json::json;

    match (kind, value) {
        (FieldKind::Number, FieldValue::Number(n)) => json!({ "number": n }),
        (FieldKind::Number, FieldValue::Text(s)) => json!({ "rich_text": notion_text(s) }),
        (kind, FieldValue::Number(n)) => notion_property(kind, &FieldValue::Text(n.to_string())),
        (FieldKind::Title, FieldValue::Text(s)) => json!({ "title": notion_text(s) }),
        (FieldKind::Email, FieldValue::Text(s)) => json!({ "email": s }),
        (FieldKind::Url, FieldValue::Text(s)) => json!({ "url": s }),
        (FieldKind::Select, FieldValue::Text(s)) => json!({ "select": { "name": s } }),
        (FieldKind::RichText, FieldValue::Text(s)) => json!({ "rich_text": notion_text(s) }),
        (FieldKind::Date, FieldValue::Text(s)) => json!({ "date": { "start": s } }),
    }
}

/// Page properties for the Notion sink.
pub fn to_notion_properties(
    outcome: &LedgerOutcome,
) -> Result<serde_json::Map<String, serde_json::Value>, LedgerError> {
    let mut properties = serde_json::Map::new();
    for (descriptor, value) in map_fields(outcome)? {
        properties.insert(
            descriptor.property.to_string(),
            notion_property(descriptor.kind, &value),
        );
    }
    Ok(properties)
}
