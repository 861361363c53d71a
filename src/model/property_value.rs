use super::Person;
use crate::types::{
    plain_text_of, DateValue, PageId, PropertyName, RichTextItem, SelectOption, ValidationError,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

/// A typed property value with an explicit kind discriminator.
///
/// Property schemas are data on the remote side, so decoding never assumes a
/// shape: unknown kinds land in [`PropertyValue::Other`] with their raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Title(Vec<RichTextItem>),
    RichText(Vec<RichTextItem>),
    Number(Option<f64>),
    Select(Option<SelectOption>),
    MultiSelect(Vec<SelectOption>),
    Status(Option<SelectOption>),
    Date(Option<DateValue>),
    Relation(Vec<PageId>),
    People(Vec<Person>),
    Checkbox(bool),
    Url(Option<String>),
    Email(Option<String>),
    CreatedTime(DateTime<Utc>),
    LastEditedTime(DateTime<Utc>),
    Other { kind: String, raw: Value },
}

impl PropertyValue {
    /// Returns the Notion API type name for this property value.
    pub fn kind_name(&self) -> &str {
        match self {
            PropertyValue::Title(_) => "title",
            PropertyValue::RichText(_) => "rich_text",
            PropertyValue::Number(_) => "number",
            PropertyValue::Select(_) => "select",
            PropertyValue::MultiSelect(_) => "multi_select",
            PropertyValue::Status(_) => "status",
            PropertyValue::Date(_) => "date",
            PropertyValue::Relation(_) => "relation",
            PropertyValue::People(_) => "people",
            PropertyValue::Checkbox(_) => "checkbox",
            PropertyValue::Url(_) => "url",
            PropertyValue::Email(_) => "email",
            PropertyValue::CreatedTime(_) => "created_time",
            PropertyValue::LastEditedTime(_) => "last_edited_time",
            PropertyValue::Other { kind, .. } => kind,
        }
    }

    /// A short human-readable rendering, used for matching and display.
    pub fn as_plain_text(&self) -> String {
        match self {
            PropertyValue::Title(items) | PropertyValue::RichText(items) => plain_text_of(items),
            PropertyValue::Number(n) => n.map(|n| n.to_string()).unwrap_or_default(),
            PropertyValue::Select(option) | PropertyValue::Status(option) => option
                .as_ref()
                .map(|o| o.name.clone())
                .unwrap_or_default(),
            PropertyValue::MultiSelect(options) => options
                .iter()
                .map(|o| o.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            PropertyValue::Date(date) => date
                .as_ref()
                .map(|d| d.start.to_string())
                .unwrap_or_default(),
            PropertyValue::Relation(ids) => ids
                .iter()
                .map(|id| id.to_dashed())
                .collect::<Vec<_>>()
                .join(", "),
            PropertyValue::People(people) => people
                .iter()
                .map(Person::display_name)
                .collect::<Vec<_>>()
                .join(", "),
            PropertyValue::Checkbox(checked) => checked.to_string(),
            PropertyValue::Url(s) | PropertyValue::Email(s) => s.clone().unwrap_or_default(),
            PropertyValue::CreatedTime(t) | PropertyValue::LastEditedTime(t) => t.to_rfc3339(),
            PropertyValue::Other { .. } => String::new(),
        }
    }

    /// Wire form of this value inside a page `properties` write.
    ///
    /// Computed and timestamp kinds are maintained by the service and
    /// cannot be written.
    pub fn to_wire(&self, name: &PropertyName) -> Result<Value, ValidationError> {
        let spans = |items: &[RichTextItem]| -> Vec<Value> {
            items.iter().map(RichTextItem::to_wire).collect()
        };
        let ids = |ids: Vec<String>| -> Vec<Value> {
            ids.into_iter().map(|id| json!({ "id": id })).collect()
        };

        let wire = match self {
            PropertyValue::Title(items) => json!({ "title": spans(items) }),
            PropertyValue::RichText(items) => json!({ "rich_text": spans(items) }),
            PropertyValue::Number(n) => json!({ "number": n }),
            PropertyValue::Select(option) => {
                json!({ "select": option.as_ref().map(SelectOption::to_wire) })
            }
            PropertyValue::MultiSelect(options) => json!({
                "multi_select": options.iter().map(SelectOption::to_wire).collect::<Vec<_>>()
            }),
            PropertyValue::Status(option) => {
                json!({ "status": option.as_ref().map(SelectOption::to_wire) })
            }
            PropertyValue::Date(date) => json!({ "date": date }),
            PropertyValue::Relation(pages) => json!({
                "relation": ids(pages.iter().map(|p| p.to_dashed()).collect())
            }),
            PropertyValue::People(people) => json!({
                "people": ids(people.iter().map(|p| p.id.to_dashed()).collect())
            }),
            PropertyValue::Checkbox(checked) => json!({ "checkbox": checked }),
            PropertyValue::Url(url) => json!({ "url": url }),
            PropertyValue::Email(email) => json!({ "email": email }),
            PropertyValue::CreatedTime(_)
            | PropertyValue::LastEditedTime(_)
            | PropertyValue::Other { .. } => {
                return Err(ValidationError::InvalidField {
                    field: name.to_string(),
                    reason: format!("{} properties are read-only", self.kind_name()),
                })
            }
        };
        Ok(wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use chrono::NaiveDate;

    #[test]
    fn people_are_written_by_id_only() {
        let person = Person {
            id: UserId::parse("11111111222233334444555555555555").unwrap(),
            name: Some("Ana".to_string()),
            email: None,
        };
        let wire = PropertyValue::People(vec![person])
            .to_wire(&"Owner".into())
            .unwrap();
        assert_eq!(
            wire,
            json!({ "people": [{ "id": "11111111-2222-3333-4444-555555555555" }] })
        );
    }

    #[test]
    fn status_and_date_wire_shapes() {
        let status = PropertyValue::Status(Some(SelectOption::named("Done")))
            .to_wire(&"Status".into())
            .unwrap();
        assert_eq!(status, json!({ "status": { "name": "Done" } }));

        let due = PropertyValue::Date(Some(DateValue::on(
            NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
        )))
        .to_wire(&"Due".into())
        .unwrap();
        assert_eq!(due["date"]["start"], "2024-05-17");

        let cleared = PropertyValue::Date(None).to_wire(&"Due".into()).unwrap();
        assert_eq!(cleared, json!({ "date": null }));
    }

    #[test]
    fn computed_kinds_are_read_only() {
        let err = PropertyValue::LastEditedTime(Utc::now())
            .to_wire(&"Last update".into())
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { .. }));
    }
}
