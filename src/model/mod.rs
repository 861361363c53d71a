mod block;
mod person;
mod property_value;
mod task;

pub use block::{Block, BlockDraft, BlockKind};
pub use person::Person;
pub use property_value::PropertyValue;
pub use task::{PersonRole, Task, TaskDetails, TaskDraft, WorkflowState};

use crate::types::{BlockId, DatabaseId, PageId, PropertyName};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Ordered property map of a page, keyed by property name.
pub type PropertyMap = IndexMap<PropertyName, PropertyValue>;

/// A snapshot of a Notion page (a database row or a standalone document).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub id: PageId,
    pub parent: Option<Parent>,
    pub properties: PropertyMap,
    pub created_time: Option<DateTime<Utc>>,
    pub last_edited_time: DateTime<Utc>,
    pub url: Option<String>,
    pub archived: bool,
}

impl Page {
    /// Plain text of the page's title property, empty when it has none.
    pub fn title(&self) -> String {
        self.properties
            .values()
            .find_map(|value| match value {
                PropertyValue::Title(items) => Some(crate::types::plain_text_of(items)),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

/// A page together with its block tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageContent {
    pub page: Page,
    pub blocks: Vec<Block>,
}

/// Parent reference with typed IDs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Parent {
    #[serde(rename = "page_id")]
    Page { page_id: PageId },
    #[serde(rename = "database_id")]
    Database { database_id: DatabaseId },
    #[serde(rename = "block_id")]
    Block { block_id: BlockId },
    #[serde(rename = "workspace")]
    Workspace,
}

impl Parent {
    /// Wire form used when creating a page under this parent.
    pub fn to_wire(&self) -> Value {
        match self {
            Parent::Page { page_id } => json!({ "page_id": page_id.to_dashed() }),
            Parent::Database { database_id } => {
                json!({ "database_id": database_id.to_dashed() })
            }
            Parent::Block { block_id } => json!({ "block_id": block_id.to_dashed() }),
            Parent::Workspace => json!({ "workspace": true }),
        }
    }
}

/// Serializes a property map into the `properties` object of a write.
pub fn properties_to_wire(
    properties: &PropertyMap,
) -> Result<serde_json::Map<String, Value>, crate::types::ValidationError> {
    properties
        .iter()
        .map(|(name, value)| value.to_wire(name).map(|wire| (name.to_string(), wire)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RichTextItem;

    fn page_with(properties: PropertyMap) -> Page {
        Page {
            id: PageId::new_v4(),
            parent: None,
            properties,
            created_time: None,
            last_edited_time: Utc::now(),
            url: None,
            archived: false,
        }
    }

    #[test]
    fn title_comes_from_the_title_kind_property() {
        let mut properties = PropertyMap::new();
        properties.insert(
            "Notes".into(),
            PropertyValue::RichText(vec![RichTextItem::plain_text("not me")]),
        );
        properties.insert(
            "Name".into(),
            PropertyValue::Title(vec![
                RichTextItem::plain_text("Ship "),
                RichTextItem::plain_text("v2"),
            ]),
        );
        assert_eq!(page_with(properties).title(), "Ship v2");
        assert_eq!(page_with(PropertyMap::new()).title(), "");
    }

    #[test]
    fn parent_wire_form_uses_dashed_ids() {
        let database_id = DatabaseId::parse("0123456789abcdef0123456789abcdef").unwrap();
        let parent = Parent::Database { database_id };
        assert_eq!(
            parent.to_wire(),
            json!({ "database_id": "01234567-89ab-cdef-0123-456789abcdef" })
        );
    }
}
