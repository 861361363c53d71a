// src/tasks/decode.rs
//! Page to task decoding.
//!
//! Property schemas are data on the remote side, so every field is checked
//! explicitly. A missing optional property is fine; a property of the wrong
//! kind, or a missing status, is a schema mismatch.

use super::schema::{AssigneeKind, TaskSchema};
use crate::error::AppError;
use crate::model::{Page, Person, PropertyValue, Task};
use crate::types::{plain_text_of, DateValue, PropertyName, UserId};

fn mismatch(page: &Page, property: &PropertyName, expected: &'static str, found: &str) -> AppError {
    AppError::SchemaMismatch {
        record_id: page.id.to_dashed(),
        property: property.to_string(),
        expected,
        found: found.to_string(),
    }
}

/// Decodes `page` as a task of `schema`.
pub fn decode_task(schema: &TaskSchema, page: Page) -> Result<Task, AppError> {
    let status_name = match page.property(schema.status.as_str()) {
        Some(PropertyValue::Status(Some(option))) | Some(PropertyValue::Select(Some(option))) => {
            option.name.clone()
        }
        Some(PropertyValue::Status(None)) | Some(PropertyValue::Select(None)) => {
            return Err(mismatch(&page, &schema.status, "a workflow state", "empty"))
        }
        Some(other) => {
            return Err(mismatch(&page, &schema.status, "status", other.kind_name()))
        }
        None => return Err(mismatch(&page, &schema.status, "status", "missing property")),
    };
    let status = schema
        .state(&status_name)
        .map_err(|_| mismatch(&page, &schema.status, "a workflow state", &status_name))?;

    let title = match page.property(schema.title.as_str()) {
        Some(PropertyValue::Title(items)) | Some(PropertyValue::RichText(items)) => {
            plain_text_of(items)
        }
        _ => page.title(),
    };

    let assignee = match (page.property(schema.assignee.as_str()), schema.assignee_kind) {
        (None, _) => None,
        (Some(PropertyValue::People(people)), _) => people.first().cloned(),
        (Some(PropertyValue::Relation(ids)), AssigneeKind::Relation) => ids
            .first()
            .map(|id| -> Result<Person, AppError> {
                let id = UserId::parse(id.as_str())
                    .map_err(|e| AppError::MalformedResponse(e.to_string()))?;
                Ok(Person {
                    id,
                    name: None,
                    email: None,
                })
            })
            .transpose()?,
        (Some(other), AssigneeKind::People) => {
            return Err(mismatch(&page, &schema.assignee, "people", other.kind_name()))
        }
        (Some(other), AssigneeKind::Relation) => {
            return Err(mismatch(&page, &schema.assignee, "relation", other.kind_name()))
        }
    };

    let team = match page.property(schema.team.as_str()) {
        None => Vec::new(),
        Some(PropertyValue::People(people)) => people.clone(),
        Some(other) => return Err(mismatch(&page, &schema.team, "people", other.kind_name())),
    };

    let due: Option<DateValue> = match page.property(schema.due.as_str()) {
        None => None,
        Some(PropertyValue::Date(date)) => date.clone(),
        Some(other) => return Err(mismatch(&page, &schema.due, "date", other.kind_name())),
    };

    let system = match page.property(schema.system.as_str()) {
        None => None,
        Some(PropertyValue::Select(option)) | Some(PropertyValue::Status(option)) => {
            option.as_ref().map(|o| o.name.clone())
        }
        Some(other) => return Err(mismatch(&page, &schema.system, "select", other.kind_name())),
    };

    let tags = match page.property(schema.tags.as_str()) {
        None => Vec::new(),
        Some(PropertyValue::MultiSelect(options)) => {
            options.iter().map(|o| o.name.clone()).collect()
        }
        Some(other) => {
            return Err(mismatch(&page, &schema.tags, "multi_select", other.kind_name()))
        }
    };

    let description = match page.property(schema.description.as_str()) {
        None => None,
        Some(PropertyValue::RichText(items)) => {
            Some(plain_text_of(items)).filter(|text| !text.is_empty())
        }
        Some(other) => {
            return Err(mismatch(&page, &schema.description, "rich_text", other.kind_name()))
        }
    };

    Ok(Task {
        id: page.id.clone(),
        title,
        status,
        assignee,
        due,
        team,
        system,
        tags,
        description,
        last_edited_time: page.last_edited_time,
        url: page.url.clone(),
        page,
    })
}

/// Display names in a people property, empty when absent or of another kind.
pub fn people_names(page: &Page, property: &PropertyName) -> Vec<String> {
    match page.property(property.as_str()) {
        Some(PropertyValue::People(people)) => people
            .iter()
            .filter_map(|person| person.name.clone())
            .collect(),
        _ => Vec::new(),
    }
}
