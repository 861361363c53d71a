use super::ValidationError;
use crate::constants::RICH_TEXT_MAX_CHARS;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Formatting flags carried by a rich text span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: String,
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            strikethrough: false,
            underline: false,
            code: false,
            color: "default".to_string(),
        }
    }
}

/// One inline span of block or property content.
///
/// Mentions and equations are read as their `plain_text` rendering; writes
/// always produce `text` spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextItem {
    pub plain_text: String,
    pub href: Option<String>,
    pub annotations: Annotations,
}

impl RichTextItem {
    /// Create a plain text item.
    pub fn plain_text(text: &str) -> Self {
        Self {
            plain_text: text.to_string(),
            href: None,
            annotations: Annotations::default(),
        }
    }

    /// Splits `text` into spans that each fit the API's per-span limit.
    pub fn spans_from_str(text: &str) -> Vec<Self> {
        if text.is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(RICH_TEXT_MAX_CHARS)
            .map(|chunk| Self::plain_text(&chunk.iter().collect::<String>()))
            .collect()
    }

    /// Wire form of a `text` span.
    pub fn to_wire(&self) -> Value {
        let link = self.href.as_ref().map(|url| json!({ "url": url }));
        json!({
            "type": "text",
            "text": { "content": self.plain_text, "link": link },
            "annotations": self.annotations,
        })
    }
}

/// Concatenates the plain text of a run of spans.
pub fn plain_text_of(items: &[RichTextItem]) -> String {
    items.iter().map(|item| item.plain_text.as_str()).collect()
}

/// Select, multi-select and status option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl SelectOption {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            color: None,
        }
    }

    /// Options are written by name; the service resolves or creates the id.
    pub fn to_wire(&self) -> Value {
        json!({ "name": self.name })
    }
}

/// A date with or without a time component, as the API represents them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInstant {
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
}

impl DateInstant {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Ok(Self::Date(date));
        }
        DateTime::parse_from_rfc3339(value)
            .map(Self::DateTime)
            .map_err(|e| ValidationError::InvalidDate {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    /// The calendar date, ignoring any time component.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(date) => *date,
            Self::DateTime(dt) => dt.date_naive(),
        }
    }
}

impl fmt::Display for DateInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl Serialize for DateInstant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DateInstant {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Date property value with optional end and time zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateValue {
    pub start: DateInstant,
    #[serde(default)]
    pub end: Option<DateInstant>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

impl DateValue {
    pub fn on(date: NaiveDate) -> Self {
        Self {
            start: DateInstant::Date(date),
            end: None,
            time_zone: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_text_is_split_on_char_boundaries() {
        let text = "é".repeat(RICH_TEXT_MAX_CHARS + 5);
        let spans = RichTextItem::spans_from_str(&text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].plain_text.chars().count(), RICH_TEXT_MAX_CHARS);
        assert_eq!(spans[1].plain_text.chars().count(), 5);
        assert_eq!(plain_text_of(&spans), text);
    }

    #[test]
    fn empty_text_has_no_spans() {
        assert!(RichTextItem::spans_from_str("").is_empty());
    }

    #[test]
    fn text_span_wire_shape() {
        let mut item = RichTextItem::plain_text("docs");
        item.href = Some("https://example.com".to_string());
        let wire = item.to_wire();
        assert_eq!(wire["type"], "text");
        assert_eq!(wire["text"]["content"], "docs");
        assert_eq!(wire["text"]["link"]["url"], "https://example.com");
        assert_eq!(wire["annotations"]["color"], "default");
    }

    #[test]
    fn date_instants_parse_both_forms() {
        let date = DateInstant::parse("2024-03-01").unwrap();
        assert_eq!(date.to_string(), "2024-03-01");

        let dt = DateInstant::parse("2024-03-01T09:30:00+02:00").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        assert!(DateInstant::parse("next tuesday").is_err());
    }
}
