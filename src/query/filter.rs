// src/query/filter.rs
//! Database filter trees.
//!
//! A [`FilterExpression`] is either a leaf condition on one property or an
//! `and`/`or` combinator over child expressions. Every leaf is checked
//! against the operators its property type supports, so an invalid tree is
//! rejected before anything is sent.

use crate::constants::NOTION_MAX_FILTER_NESTING;
use crate::types::{DateInstant, PropertyName, ValidationError};
use serde_json::{json, Map, Value};
use std::fmt;

/// Property types that can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Title,
    RichText,
    Url,
    Email,
    PhoneNumber,
    Number,
    Checkbox,
    Select,
    MultiSelect,
    Status,
    Date,
    People,
    Relation,
}

impl FieldType {
    pub fn from_name(name: &str) -> Option<Self> {
        let field_type = match name {
            "title" => Self::Title,
            "rich_text" => Self::RichText,
            "url" => Self::Url,
            "email" => Self::Email,
            "phone_number" => Self::PhoneNumber,
            "number" => Self::Number,
            "checkbox" => Self::Checkbox,
            "select" => Self::Select,
            "multi_select" => Self::MultiSelect,
            "status" => Self::Status,
            "date" => Self::Date,
            "people" => Self::People,
            "relation" => Self::Relation,
            _ => return None,
        };
        Some(field_type)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::RichText => "rich_text",
            Self::Url => "url",
            Self::Email => "email",
            Self::PhoneNumber => "phone_number",
            Self::Number => "number",
            Self::Checkbox => "checkbox",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::Status => "status",
            Self::Date => "date",
            Self::People => "people",
            Self::Relation => "relation",
        }
    }

    /// The operators this property type accepts.
    pub fn operators(&self) -> &'static [FilterOperator] {
        use FilterOperator::*;
        match self {
            Self::Title | Self::RichText | Self::Url | Self::Email | Self::PhoneNumber => &[
                Equals,
                DoesNotEqual,
                Contains,
                DoesNotContain,
                StartsWith,
                EndsWith,
                IsEmpty,
                IsNotEmpty,
            ],
            Self::Number => &[
                Equals,
                DoesNotEqual,
                GreaterThan,
                LessThan,
                GreaterThanOrEqualTo,
                LessThanOrEqualTo,
                IsEmpty,
                IsNotEmpty,
            ],
            Self::Checkbox => &[Equals, DoesNotEqual],
            Self::Select | Self::Status => &[Equals, DoesNotEqual, IsEmpty, IsNotEmpty],
            Self::MultiSelect | Self::People | Self::Relation => {
                &[Contains, DoesNotContain, IsEmpty, IsNotEmpty]
            }
            Self::Date => &[
                Equals,
                Before,
                After,
                OnOrBefore,
                OnOrAfter,
                IsEmpty,
                IsNotEmpty,
                PastWeek,
                PastMonth,
                PastYear,
                ThisWeek,
                NextWeek,
                NextMonth,
                NextYear,
            ],
        }
    }

    pub fn supports(&self, operator: FilterOperator) -> bool {
        self.operators().contains(&operator)
    }

    /// The value kind a comparison on this type takes.
    fn comparison_value(&self) -> ValueKind {
        match self {
            Self::Number => ValueKind::Number,
            Self::Checkbox => ValueKind::Bool,
            Self::Date => ValueKind::Date,
            _ => ValueKind::Text,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operators across all property types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Equals,
    DoesNotEqual,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    LessThan,
    GreaterThanOrEqualTo,
    LessThanOrEqualTo,
    Before,
    After,
    OnOrBefore,
    OnOrAfter,
    PastWeek,
    PastMonth,
    PastYear,
    ThisWeek,
    NextWeek,
    NextMonth,
    NextYear,
}

impl FilterOperator {
    pub fn from_name(name: &str) -> Option<Self> {
        let operator = match name {
            "equals" => Self::Equals,
            "does_not_equal" => Self::DoesNotEqual,
            "contains" => Self::Contains,
            "does_not_contain" => Self::DoesNotContain,
            "starts_with" => Self::StartsWith,
            "ends_with" => Self::EndsWith,
            "is_empty" => Self::IsEmpty,
            "is_not_empty" => Self::IsNotEmpty,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "greater_than_or_equal_to" => Self::GreaterThanOrEqualTo,
            "less_than_or_equal_to" => Self::LessThanOrEqualTo,
            "before" => Self::Before,
            "after" => Self::After,
            "on_or_before" => Self::OnOrBefore,
            "on_or_after" => Self::OnOrAfter,
            "past_week" => Self::PastWeek,
            "past_month" => Self::PastMonth,
            "past_year" => Self::PastYear,
            "this_week" => Self::ThisWeek,
            "next_week" => Self::NextWeek,
            "next_month" => Self::NextMonth,
            "next_year" => Self::NextYear,
            _ => return None,
        };
        Some(operator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::DoesNotEqual => "does_not_equal",
            Self::Contains => "contains",
            Self::DoesNotContain => "does_not_contain",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::GreaterThanOrEqualTo => "greater_than_or_equal_to",
            Self::LessThanOrEqualTo => "less_than_or_equal_to",
            Self::Before => "before",
            Self::After => "after",
            Self::OnOrBefore => "on_or_before",
            Self::OnOrAfter => "on_or_after",
            Self::PastWeek => "past_week",
            Self::PastMonth => "past_month",
            Self::PastYear => "past_year",
            Self::ThisWeek => "this_week",
            Self::NextWeek => "next_week",
            Self::NextMonth => "next_month",
            Self::NextYear => "next_year",
        }
    }

    /// Operators that take no comparison value.
    fn is_unary(&self) -> bool {
        matches!(
            self,
            Self::IsEmpty
                | Self::IsNotEmpty
                | Self::PastWeek
                | Self::PastMonth
                | Self::PastYear
                | Self::ThisWeek
                | Self::NextWeek
                | Self::NextMonth
                | Self::NextYear
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Text,
    Number,
    Bool,
    Date,
    Empty,
}

impl ValueKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Bool => "boolean",
            Self::Date => "date",
            Self::Empty => "no",
        }
    }
}

/// The right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateInstant),
    /// For operators without a comparison value (`is_empty`, `past_week`, ...).
    Empty,
}

impl FilterValue {
    fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Number(_) => ValueKind::Number,
            Self::Bool(_) => ValueKind::Bool,
            Self::Date(_) => ValueKind::Date,
            Self::Empty => ValueKind::Empty,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Text(s) => format!("text '{}'", s),
            Self::Number(n) => format!("number {}", n),
            Self::Bool(b) => format!("boolean {}", b),
            Self::Date(d) => format!("date {}", d),
            Self::Empty => "no value".to_string(),
        }
    }
}

/// A leaf: `<property> <operator> <value>`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub property: PropertyName,
    pub field_type: FieldType,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl FilterCondition {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.property.as_str().trim().is_empty() {
            return Err(ValidationError::EmptyField("filter property"));
        }
        if !self.field_type.supports(self.operator) {
            return Err(ValidationError::UnsupportedOperator {
                property: self.property.to_string(),
                field_type: self.field_type.to_string(),
                operator: self.operator.to_string(),
            });
        }
        let expected = if self.operator.is_unary() {
            ValueKind::Empty
        } else {
            self.field_type.comparison_value()
        };
        if self.value.kind() != expected {
            return Err(ValidationError::ValueTypeMismatch {
                property: self.property.to_string(),
                expected: expected.name(),
                found: self.value.describe(),
            });
        }
        if let FilterValue::Number(n) = self.value {
            if !n.is_finite() {
                return Err(ValidationError::InvalidField {
                    field: self.property.to_string(),
                    reason: format!("{} is not a finite number", n),
                });
            }
        }
        Ok(())
    }

    fn value_to_wire(&self) -> Value {
        match &self.value {
            FilterValue::Text(s) => json!(s),
            FilterValue::Number(n) => json!(n),
            FilterValue::Bool(b) => json!(b),
            FilterValue::Date(d) => json!(d.to_string()),
            FilterValue::Empty => match self.operator {
                FilterOperator::IsEmpty | FilterOperator::IsNotEmpty => json!(true),
                _ => json!({}),
            },
        }
    }
}

/// A filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    Condition(FilterCondition),
    And(Vec<FilterExpression>),
    Or(Vec<FilterExpression>),
}

impl FilterExpression {
    pub fn condition(
        property: impl Into<PropertyName>,
        field_type: FieldType,
        operator: FilterOperator,
        value: FilterValue,
    ) -> Self {
        Self::Condition(FilterCondition {
            property: property.into(),
            field_type,
            operator,
            value,
        })
    }

    pub fn and(filters: Vec<FilterExpression>) -> Self {
        Self::And(filters)
    }

    pub fn or(filters: Vec<FilterExpression>) -> Self {
        Self::Or(filters)
    }

    pub fn status_equals(property: impl Into<PropertyName>, status: &str) -> Self {
        Self::condition(
            property,
            FieldType::Status,
            FilterOperator::Equals,
            FilterValue::Text(status.to_string()),
        )
    }

    /// Matches rows whose people property contains `person` (a user id or name).
    pub fn people_contains(property: impl Into<PropertyName>, person: &str) -> Self {
        Self::condition(
            property,
            FieldType::People,
            FilterOperator::Contains,
            FilterValue::Text(person.to_string()),
        )
    }

    pub fn text_contains(property: impl Into<PropertyName>, value: &str) -> Self {
        Self::condition(
            property,
            FieldType::RichText,
            FilterOperator::Contains,
            FilterValue::Text(value.to_string()),
        )
    }

    pub fn select_equals(property: impl Into<PropertyName>, value: &str) -> Self {
        Self::condition(
            property,
            FieldType::Select,
            FilterOperator::Equals,
            FilterValue::Text(value.to_string()),
        )
    }

    /// Combinator nesting depth; a bare condition has depth 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((expr, level)) = stack.pop() {
            match expr {
                Self::Condition(_) => deepest = deepest.max(level),
                Self::And(children) | Self::Or(children) => {
                    deepest = deepest.max(level + 1);
                    stack.extend(children.iter().map(|child| (child, level + 1)));
                }
            }
        }
        deepest
    }

    /// Checks every leaf and combinator in the tree.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let depth = self.depth();
        if depth > NOTION_MAX_FILTER_NESTING {
            return Err(ValidationError::FilterTooDeep {
                depth,
                max: NOTION_MAX_FILTER_NESTING,
            });
        }
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Self::Condition(condition) => condition.validate()?,
                Self::And(children) | Self::Or(children) => {
                    if children.is_empty() {
                        return Err(ValidationError::EmptyCombinator(expr.combinator_name()));
                    }
                    stack.extend(children.iter());
                }
            }
        }
        Ok(())
    }

    fn combinator_name(&self) -> &'static str {
        match self {
            Self::And(_) => "and",
            Self::Or(_) => "or",
            Self::Condition(_) => "condition",
        }
    }

    /// Wire form: `{"property": P, "<type>": {"<op>": v}}` or `{"and"|"or": [...]}`.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Condition(c) => {
                let mut comparison = Map::new();
                comparison.insert(c.operator.as_str().to_string(), c.value_to_wire());
                let mut leaf = Map::new();
                leaf.insert("property".to_string(), json!(c.property.as_str()));
                leaf.insert(c.field_type.as_str().to_string(), Value::Object(comparison));
                Value::Object(leaf)
            }
            Self::And(children) => {
                json!({ "and": children.iter().map(Self::to_wire).collect::<Vec<_>>() })
            }
            Self::Or(children) => {
                json!({ "or": children.iter().map(Self::to_wire).collect::<Vec<_>>() })
            }
        }
    }

    /// Parses and validates a filter in wire form.
    pub fn from_wire(value: &Value) -> Result<Self, ValidationError> {
        let expr = parse_node(value, 0)?;
        expr.validate()?;
        Ok(expr)
    }
}

fn parse_node(value: &Value, level: usize) -> Result<FilterExpression, ValidationError> {
    let object = value.as_object().ok_or_else(|| {
        ValidationError::MalformedFilter(format!("expected an object, got {}", value))
    })?;

    let combinator = match (object.get("and"), object.get("or")) {
        (Some(children), None) => Some(("and", children)),
        (None, Some(children)) => Some(("or", children)),
        (Some(_), Some(_)) => {
            return Err(ValidationError::MalformedFilter(
                "'and' and 'or' cannot share an object".to_string(),
            ))
        }
        (None, None) => None,
    };

    if let Some((name, children)) = combinator {
        if object.len() != 1 {
            return Err(ValidationError::MalformedFilter(format!(
                "'{}' must be the only key of its object",
                name
            )));
        }
        if level >= NOTION_MAX_FILTER_NESTING {
            return Err(ValidationError::FilterTooDeep {
                depth: level + 1,
                max: NOTION_MAX_FILTER_NESTING,
            });
        }
        let children = children.as_array().ok_or_else(|| {
            ValidationError::MalformedFilter(format!("'{}' must hold an array", name))
        })?;
        let parsed = children
            .iter()
            .map(|child| parse_node(child, level + 1))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(if name == "and" {
            FilterExpression::And(parsed)
        } else {
            FilterExpression::Or(parsed)
        });
    }

    parse_condition(object).map(FilterExpression::Condition)
}

fn parse_condition(object: &Map<String, Value>) -> Result<FilterCondition, ValidationError> {
    let property = object
        .get("property")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ValidationError::MalformedFilter("condition has no 'property'".to_string())
        })?;

    let mut typed = object.iter().filter(|(key, _)| key.as_str() != "property");
    let (type_name, comparison) = match (typed.next(), typed.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(ValidationError::MalformedFilter(format!(
                "condition on '{}' must name exactly one property type",
                property
            )))
        }
    };
    let field_type = FieldType::from_name(type_name).ok_or_else(|| {
        ValidationError::MalformedFilter(format!("unknown property type '{}'", type_name))
    })?;

    let comparison = comparison.as_object().filter(|c| c.len() == 1).ok_or_else(|| {
        ValidationError::MalformedFilter(format!(
            "condition on '{}' must hold exactly one operator",
            property
        ))
    })?;
    let (operator_name, raw) = comparison
        .iter()
        .next()
        .ok_or_else(|| ValidationError::MalformedFilter("empty comparison".to_string()))?;
    let operator = FilterOperator::from_name(operator_name).ok_or_else(|| {
        ValidationError::UnsupportedOperator {
            property: property.to_string(),
            field_type: field_type.to_string(),
            operator: operator_name.clone(),
        }
    })?;

    let value = if operator.is_unary() {
        FilterValue::Empty
    } else {
        match (field_type.comparison_value(), raw) {
            (ValueKind::Number, Value::Number(n)) => {
                FilterValue::Number(n.as_f64().unwrap_or_default())
            }
            (ValueKind::Bool, Value::Bool(b)) => FilterValue::Bool(*b),
            (ValueKind::Date, Value::String(s)) => FilterValue::Date(DateInstant::parse(s)?),
            (ValueKind::Text, Value::String(s)) => FilterValue::Text(s.clone()),
            (expected, other) => {
                return Err(ValidationError::ValueTypeMismatch {
                    property: property.to_string(),
                    expected: expected.name(),
                    found: other.to_string(),
                })
            }
        }
    };

    Ok(FilterCondition {
        property: PropertyName::new(property),
        field_type,
        operator,
        value,
    })
}
