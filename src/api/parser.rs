// src/api/parser.rs
//! Decoding of Notion API JSON into domain values.
//!
//! Decoding is lenient about things the service may add later (unknown
//! property and block kinds are kept as raw JSON) and strict about the few
//! fields every object must carry (`id`, timestamps).

use super::types::{Batch, PaginatedResponse};
use crate::error::AppError;
use crate::model::{Block, BlockKind, Page, Parent, Person, PropertyMap, PropertyValue};
use crate::types::{
    Annotations, BlockId, DateValue, Id, PageId, PropertyName, RichTextItem, SelectOption, UserId,
};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Decodes a paginated listing, converting each result with `parse_item`.
pub fn parse_list<T>(
    value: Value,
    parse_item: impl Fn(&Value) -> Result<T, AppError>,
) -> Result<Batch<T>, AppError> {
    let response: PaginatedResponse<Value> = serde_json::from_value(value)
        .map_err(|e| AppError::MalformedResponse(format!("paginated listing: {}", e)))?;
    let next_cursor = response.continuation();
    let items = response
        .results
        .iter()
        .map(parse_item)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Batch { items, next_cursor })
}

/// Parse a page object.
pub fn parse_page(value: &Value) -> Result<Page, AppError> {
    let id: PageId = parse_id(value, "id")?;

    let mut properties = PropertyMap::new();
    if let Some(raw) = value.get("properties").and_then(Value::as_object) {
        for (name, property) in raw {
            properties.insert(PropertyName::new(name.clone()), parse_property_value(property));
        }
    }

    Ok(Page {
        id,
        parent: value
            .get("parent")
            .and_then(|parent| serde_json::from_value::<Parent>(parent.clone()).ok()),
        properties,
        created_time: value
            .get("created_time")
            .and_then(Value::as_str)
            .and_then(parse_timestamp),
        last_edited_time: required_timestamp(value, "last_edited_time")?,
        url: string_field(value, "url"),
        archived: is_archived(value),
    })
}

/// Parse a block object. Children are not attached here.
pub fn parse_block(value: &Value) -> Result<Block, AppError> {
    let id: BlockId = parse_id(value, "id")?;
    let type_name = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::MalformedResponse(format!("block {} has no type", id)))?;
    let kind = BlockKind::from_type_name(type_name);

    let mut attributes = value
        .get(type_name)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let rich_text = attributes
        .remove("rich_text")
        .map(|spans| parse_rich_text(&spans))
        .unwrap_or_default();
    attributes.remove("children");

    Ok(Block {
        id,
        kind,
        rich_text,
        has_children: value
            .get("has_children")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        archived: is_archived(value),
        attributes,
        children: Vec::new(),
    })
}

/// Parse a user object. Bots and partial users decode with whatever they carry.
pub fn parse_person(value: &Value) -> Result<Person, AppError> {
    let id: UserId = parse_id(value, "id")?;
    let email = value
        .get("person")
        .and_then(|person| person.get("email"))
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(Person {
        id,
        name: string_field(value, "name"),
        email,
    })
}

/// Parse an array of rich text spans, skipping entries without text.
pub fn parse_rich_text(value: &Value) -> Vec<RichTextItem> {
    value
        .as_array()
        .map(|spans| {
            spans
                .iter()
                .filter_map(|span| {
                    let plain_text = span.get("plain_text").and_then(Value::as_str)?;
                    Some(RichTextItem {
                        plain_text: plain_text.to_string(),
                        href: string_field(span, "href"),
                        annotations: span
                            .get("annotations")
                            .and_then(|a| serde_json::from_value::<Annotations>(a.clone()).ok())
                            .unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse one entry of a page's `properties` object.
///
/// Never fails: a value whose payload doesn't have the expected shape is
/// kept as [`PropertyValue::Other`] so the rest of the page stays usable.
pub fn parse_property_value(value: &Value) -> PropertyValue {
    let kind = value.get("type").and_then(Value::as_str).unwrap_or("unknown");
    let payload = value.get(kind).unwrap_or(&Value::Null);
    let other = || PropertyValue::Other {
        kind: kind.to_string(),
        raw: payload.clone(),
    };

    match kind {
        "title" => PropertyValue::Title(parse_rich_text(payload)),
        "rich_text" => PropertyValue::RichText(parse_rich_text(payload)),
        "number" => PropertyValue::Number(payload.as_f64()),
        "select" => match parse_option(payload) {
            Some(option) => PropertyValue::Select(option),
            None => other(),
        },
        "status" => match parse_option(payload) {
            Some(option) => PropertyValue::Status(option),
            None => other(),
        },
        "multi_select" => match serde_json::from_value::<Vec<SelectOption>>(payload.clone()) {
            Ok(options) => PropertyValue::MultiSelect(options),
            Err(_) => other(),
        },
        "date" => {
            if payload.is_null() {
                PropertyValue::Date(None)
            } else {
                match serde_json::from_value::<DateValue>(payload.clone()) {
                    Ok(date) => PropertyValue::Date(Some(date)),
                    Err(_) => other(),
                }
            }
        }
        "relation" => {
            let ids = payload.as_array().map(|refs| {
                refs.iter()
                    .map(|r| r.get("id").and_then(Value::as_str).map(PageId::parse))
                    .collect::<Option<Result<Vec<_>, _>>>()
            });
            match ids {
                Some(Some(Ok(ids))) => PropertyValue::Relation(ids),
                _ => other(),
            }
        }
        "people" => {
            let people = payload
                .as_array()
                .map(|users| users.iter().map(parse_person).collect::<Result<Vec<_>, _>>());
            match people {
                Some(Ok(people)) => PropertyValue::People(people),
                _ => other(),
            }
        }
        "checkbox" => match payload.as_bool() {
            Some(checked) => PropertyValue::Checkbox(checked),
            None => other(),
        },
        "url" => PropertyValue::Url(payload.as_str().map(str::to_string)),
        "email" => PropertyValue::Email(payload.as_str().map(str::to_string)),
        "created_time" => match payload.as_str().and_then(parse_timestamp) {
            Some(t) => PropertyValue::CreatedTime(t),
            None => other(),
        },
        "last_edited_time" => match payload.as_str().and_then(parse_timestamp) {
            Some(t) => PropertyValue::LastEditedTime(t),
            None => other(),
        },
        _ => other(),
    }
}

// --- Helpers ---

/// `Some(None)` for an explicit null, `None` when the payload isn't an option.
fn parse_option(payload: &Value) -> Option<Option<SelectOption>> {
    if payload.is_null() {
        return Some(None);
    }
    serde_json::from_value::<SelectOption>(payload.clone())
        .ok()
        .map(Some)
}

fn parse_id<T>(value: &Value, field: &str) -> Result<Id<T>, AppError> {
    let raw = value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::MalformedResponse(format!("object has no '{}'", field)))?;
    Id::parse(raw).map_err(|e| AppError::MalformedResponse(e.to_string()))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn required_timestamp(value: &Value, field: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::MalformedResponse(format!("object has no '{}'", field)))?;
    parse_timestamp(raw)
        .ok_or_else(|| AppError::MalformedResponse(format!("bad {} '{}'", field, raw)))
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

fn is_archived(value: &Value) -> bool {
    ["archived", "in_trash"]
        .iter()
        .any(|field| value.get(*field).and_then(Value::as_bool).unwrap_or(false))
}

/// Object type of a search result (`"page"`, `"database"`, ...).
pub fn object_type(value: &Value) -> Option<&str> {
    value.get("object").and_then(Value::as_str)
}
