// src/query/sort.rs
use crate::types::{PropertyName, ValidationError};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }

    /// Accepts the wire names plus the `asc`/`desc` shorthands.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Some(Self::Ascending),
            "descending" | "desc" => Some(Self::Descending),
            _ => None,
        }
    }
}

/// Page timestamps that can be sorted on without naming a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    CreatedTime,
    LastEditedTime,
}

impl Timestamp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedTime => "created_time",
            Self::LastEditedTime => "last_edited_time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Property(PropertyName),
    Timestamp(Timestamp),
}

/// One sort criterion. Criteria apply in the order they are listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: Direction,
}

impl SortSpec {
    pub fn ascending(property: impl Into<PropertyName>) -> Self {
        Self {
            key: SortKey::Property(property.into()),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(property: impl Into<PropertyName>) -> Self {
        Self {
            key: SortKey::Property(property.into()),
            direction: Direction::Descending,
        }
    }

    pub fn by_timestamp(timestamp: Timestamp, direction: Direction) -> Self {
        Self {
            key: SortKey::Timestamp(timestamp),
            direction,
        }
    }

    /// Most recently edited first.
    pub fn recently_edited() -> Self {
        Self::by_timestamp(Timestamp::LastEditedTime, Direction::Descending)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.key {
            SortKey::Property(name) if name.as_str().trim().is_empty() => {
                Err(ValidationError::EmptyField("sort property"))
            }
            _ => Ok(()),
        }
    }

    pub fn to_wire(&self) -> Value {
        match &self.key {
            SortKey::Property(name) => {
                json!({ "property": name.as_str(), "direction": self.direction.as_str() })
            }
            SortKey::Timestamp(timestamp) => {
                json!({ "timestamp": timestamp.as_str(), "direction": self.direction.as_str() })
            }
        }
    }

    pub fn from_wire(value: &Value) -> Result<Self, ValidationError> {
        let direction = value
            .get("direction")
            .and_then(Value::as_str)
            .map(|name| {
                Direction::from_name(name)
                    .ok_or_else(|| ValidationError::MalformedSort(format!("direction '{}'", name)))
            })
            .transpose()?
            .unwrap_or(Direction::Ascending);

        let key = match (
            value.get("property").and_then(Value::as_str),
            value.get("timestamp").and_then(Value::as_str),
        ) {
            (Some(property), None) => SortKey::Property(PropertyName::new(property)),
            (None, Some("created_time")) => SortKey::Timestamp(Timestamp::CreatedTime),
            (None, Some("last_edited_time")) => SortKey::Timestamp(Timestamp::LastEditedTime),
            _ => {
                return Err(ValidationError::MalformedSort(format!(
                    "expected one of 'property' or a known 'timestamp' in {}",
                    value
                )))
            }
        };

        let sort = Self { key, direction };
        sort.validate()?;
        Ok(sort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_and_timestamp_wire_forms() {
        assert_eq!(
            SortSpec::ascending("Due").to_wire(),
            json!({ "property": "Due", "direction": "ascending" })
        );
        assert_eq!(
            SortSpec::recently_edited().to_wire(),
            json!({ "timestamp": "last_edited_time", "direction": "descending" })
        );
    }

    #[test]
    fn shorthand_directions_are_accepted() {
        let sort = SortSpec::from_wire(&json!({ "property": "due", "direction": "asc" })).unwrap();
        assert_eq!(sort, SortSpec::ascending("due"));
        assert!(SortSpec::from_wire(&json!({ "property": "due", "direction": "up" })).is_err());
        assert!(SortSpec::from_wire(&json!({ "timestamp": "due" })).is_err());
        assert!(SortSpec::from_wire(&json!({ "property": " " })).is_err());
    }
}
