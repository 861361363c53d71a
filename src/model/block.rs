use crate::types::{plain_text_of, BlockId, RichTextItem, ValidationError};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// The block types this layer understands by name.
///
/// Anything else is carried as [`BlockKind::Other`] so reads never fail on
/// block types added to the service later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletedListItem,
    NumberedListItem,
    ToDo,
    Toggle,
    Quote,
    Callout,
    Code,
    Divider,
    ChildPage,
    ChildDatabase,
    Image,
    Bookmark,
    Table,
    TableRow,
    ColumnList,
    Column,
    SyncedBlock,
    Other(String),
}

impl BlockKind {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "paragraph" => Self::Paragraph,
            "heading_1" => Self::Heading1,
            "heading_2" => Self::Heading2,
            "heading_3" => Self::Heading3,
            "bulleted_list_item" => Self::BulletedListItem,
            "numbered_list_item" => Self::NumberedListItem,
            "to_do" => Self::ToDo,
            "toggle" => Self::Toggle,
            "quote" => Self::Quote,
            "callout" => Self::Callout,
            "code" => Self::Code,
            "divider" => Self::Divider,
            "child_page" => Self::ChildPage,
            "child_database" => Self::ChildDatabase,
            "image" => Self::Image,
            "bookmark" => Self::Bookmark,
            "table" => Self::Table,
            "table_row" => Self::TableRow,
            "column_list" => Self::ColumnList,
            "column" => Self::Column,
            "synced_block" => Self::SyncedBlock,
            other => Self::Other(other.to_string()),
        }
    }

    /// The API `type` name.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading1 => "heading_1",
            Self::Heading2 => "heading_2",
            Self::Heading3 => "heading_3",
            Self::BulletedListItem => "bulleted_list_item",
            Self::NumberedListItem => "numbered_list_item",
            Self::ToDo => "to_do",
            Self::Toggle => "toggle",
            Self::Quote => "quote",
            Self::Callout => "callout",
            Self::Code => "code",
            Self::Divider => "divider",
            Self::ChildPage => "child_page",
            Self::ChildDatabase => "child_database",
            Self::Image => "image",
            Self::Bookmark => "bookmark",
            Self::Table => "table",
            Self::TableRow => "table_row",
            Self::ColumnList => "column_list",
            Self::Column => "column",
            Self::SyncedBlock => "synced_block",
            Self::Other(name) => name,
        }
    }

    /// Kinds whose content is a `rich_text` array.
    pub fn carries_text(&self) -> bool {
        matches!(
            self,
            Self::Paragraph
                | Self::Heading1
                | Self::Heading2
                | Self::Heading3
                | Self::BulletedListItem
                | Self::NumberedListItem
                | Self::ToDo
                | Self::Toggle
                | Self::Quote
                | Self::Callout
                | Self::Code
        )
    }

    /// Kinds that can be created or edited through [`BlockDraft`].
    pub fn is_writable(&self) -> bool {
        self.carries_text() || matches!(self, Self::Divider)
    }
}

impl From<BlockKind> for String {
    fn from(kind: BlockKind) -> Self {
        kind.type_name().to_string()
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A fetched content block.
///
/// `children` is filled in by the tree reader for every block whose
/// `has_children` flag is set; a block straight off a children listing has
/// none attached yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub rich_text: Vec<RichTextItem>,
    pub has_children: bool,
    pub archived: bool,
    /// Remaining type-specific fields (`checked`, `language`, `title`, `url`, ...).
    pub attributes: Map<String, Value>,
    pub children: Vec<Block>,
}

impl Block {
    pub fn plain_text(&self) -> String {
        match &self.kind {
            BlockKind::ChildPage | BlockKind::ChildDatabase => self
                .attributes
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            _ => plain_text_of(&self.rich_text),
        }
    }

    /// Number of blocks in this subtree, this one included.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(block) = stack.pop() {
            count += 1;
            stack.extend(block.children.iter());
        }
        count
    }
}

/// A block to be written: appended as new content or used to replace the
/// content of an existing block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDraft {
    pub kind: BlockKind,
    pub rich_text: Vec<RichTextItem>,
    pub checked: Option<bool>,
    pub language: Option<String>,
    pub children: Vec<BlockDraft>,
}

impl BlockDraft {
    pub fn new(kind: BlockKind, text: &str) -> Self {
        Self {
            kind,
            rich_text: RichTextItem::spans_from_str(text),
            checked: None,
            language: None,
            children: Vec::new(),
        }
    }

    pub fn paragraph(text: &str) -> Self {
        Self::new(BlockKind::Paragraph, text)
    }

    /// A heading of `level` 1 to 3.
    pub fn heading(level: u8, text: &str) -> Result<Self, ValidationError> {
        let kind = match level {
            1 => BlockKind::Heading1,
            2 => BlockKind::Heading2,
            3 => BlockKind::Heading3,
            _ => {
                return Err(ValidationError::InvalidField {
                    field: "heading level".to_string(),
                    reason: format!("{} is not between 1 and 3", level),
                })
            }
        };
        Ok(Self::new(kind, text))
    }

    pub fn bulleted(text: &str) -> Self {
        Self::new(BlockKind::BulletedListItem, text)
    }

    pub fn numbered(text: &str) -> Self {
        Self::new(BlockKind::NumberedListItem, text)
    }

    pub fn to_do(text: &str, checked: bool) -> Self {
        Self {
            checked: Some(checked),
            ..Self::new(BlockKind::ToDo, text)
        }
    }

    pub fn code(text: &str, language: &str) -> Self {
        Self {
            language: Some(language.to_string()),
            ..Self::new(BlockKind::Code, text)
        }
    }

    pub fn divider() -> Self {
        Self::new(BlockKind::Divider, "")
    }

    pub fn with_children(mut self, children: Vec<BlockDraft>) -> Self {
        self.children = children;
        self
    }

    pub fn plain_text(&self) -> String {
        plain_text_of(&self.rich_text)
    }

    /// Checks this draft and its descendants can be expressed on the wire.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut stack = vec![self];
        while let Some(draft) = stack.pop() {
            if !draft.kind.is_writable() {
                return Err(ValidationError::UnwritableBlock(
                    draft.kind.type_name().to_string(),
                ));
            }
            if !draft.children.is_empty()
                && matches!(draft.kind, BlockKind::Divider | BlockKind::Code)
            {
                return Err(ValidationError::InvalidField {
                    field: draft.kind.type_name().to_string(),
                    reason: "this block kind cannot have children".to_string(),
                });
            }
            stack.extend(draft.children.iter());
        }
        Ok(())
    }

    /// Type-specific body: `{"rich_text": [...], ...}`.
    pub fn content_to_wire(&self) -> Value {
        if matches!(self.kind, BlockKind::Divider) {
            return json!({});
        }
        let mut content = Map::new();
        content.insert(
            "rich_text".to_string(),
            Value::Array(self.rich_text.iter().map(RichTextItem::to_wire).collect()),
        );
        if let Some(checked) = self.checked {
            content.insert("checked".to_string(), json!(checked));
        }
        if matches!(self.kind, BlockKind::Code) {
            let language = self.language.as_deref().unwrap_or("plain text");
            content.insert("language".to_string(), json!(language));
        }
        if !self.children.is_empty() {
            content.insert(
                "children".to_string(),
                Value::Array(self.children.iter().map(BlockDraft::to_wire).collect()),
            );
        }
        Value::Object(content)
    }

    /// Full block object for an append request.
    pub fn to_wire(&self) -> Value {
        let type_name = self.kind.type_name();
        let mut block = Map::new();
        block.insert("object".to_string(), json!("block"));
        block.insert("type".to_string(), json!(type_name));
        block.insert(type_name.to_string(), self.content_to_wire());
        Value::Object(block)
    }
}
