use thiserror::Error;

mod domain_types;
mod ids;
mod properties;

pub use domain_types::*;
pub use ids::*;
pub use properties::*;

/// Input that was rejected before any request left the process.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid Notion ID format: {0}")]
    InvalidId(String),

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Value out of bounds: {value}, expected {min}..={max}")]
    OutOfBounds { value: u32, min: u32, max: u32 },

    #[error("Invalid API key format: {reason}")]
    InvalidApiKey { reason: String },

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Operator '{operator}' is not supported for {field_type} property '{property}'")]
    UnsupportedOperator {
        property: String,
        field_type: String,
        operator: String,
    },

    #[error("Filter on '{property}' expects a {expected} value, got {found}")]
    ValueTypeMismatch {
        property: String,
        expected: &'static str,
        found: String,
    },

    #[error("'{0}' combinator must contain at least one filter")]
    EmptyCombinator(&'static str),

    #[error("Filter nests combinators {depth} levels deep; at most {max} are allowed")]
    FilterTooDeep { depth: usize, max: usize },

    #[error("Malformed filter: {0}")]
    MalformedFilter(String),

    #[error("Malformed sort: {0}")]
    MalformedSort(String),

    #[error("Status '{status}' is not a workflow state (allowed: {})", allowed.join(", "))]
    UnknownStatus {
        status: String,
        allowed: Vec<String>,
    },

    #[error("Block kind '{0}' cannot be written through this API")]
    UnwritableBlock(String),

    #[error("Too many blocks in one append: {count}, the limit is {max}")]
    TooManyBlocks { count: usize, max: usize },

    #[error("Invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}
