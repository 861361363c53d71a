// src/lib.rs
//! notion-agent library: request orchestration between an agent and a Notion
//! workspace.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ErrorKind`, `ValidationError`
//! - **Transport**: `Transport`, `HttpBackend`, `RetryPolicy`, `NotionHttpClient`
//! - **Queries**: `DatabaseQuery`, `FilterExpression`, `SortSpec`, `Paginator`
//! - **Content**: `BlockTreeBuilder`, `BlockOperation`, `plan_content_changes`
//! - **Tasks**: `TaskResolver`, `TaskSchema`
//! - **Operations**: `NotionWorkspace`

pub mod api;
pub mod blocks;
pub mod config;
pub mod constants;
pub mod error;
pub mod error_recovery;
pub mod model;
pub mod query;
pub mod tasks;
pub mod types;
mod workspace;

#[cfg(test)]
mod testing;

// --- Error Handling ---
pub use crate::error::{AppError, ErrorKind, NotionErrorCode, OperationContext};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, WorkspaceConfig};

// --- Transport ---
pub use crate::api::{
    BackendFailure, Batch, Cursor, HttpBackend, NotionHttpClient, Paginator, Transport,
    WireRequest, WireResponse,
};
pub use crate::error_recovery::{FailureClass, RetryDecision, RetryPolicy};

// --- Domain Model ---
pub use crate::model::{
    Block, BlockDraft, BlockKind, Page, PageContent, Parent, Person, PersonRole, PropertyMap,
    PropertyValue, Task, TaskDetails, TaskDraft, WorkflowState,
};

// --- Domain Types ---
pub use crate::types::{
    ApiKey, BlockId, DatabaseId, DateInstant, DateValue, NotionId, PageId, PageSize,
    PropertyName, RichTextItem, SelectOption, UserId,
};

// --- Queries ---
pub use crate::query::{
    DatabaseQuery, Direction, FieldType, FilterCondition, FilterExpression, FilterOperator,
    FilterValue, QueryTranslator, SortKey, SortSpec, Timestamp,
};

// --- Content ---
pub use crate::blocks::{plan_content_changes, BlockOperation, BlockTreeBuilder, WriteReport};

// --- Tasks ---
pub use crate::tasks::{
    AssigneeKind, PeopleReport, PersonMatch, PersonSummary, StatusKind, TaskResolver,
    TaskSchema, TaskStream,
};

// --- Operations ---
pub use crate::workspace::NotionWorkspace;
