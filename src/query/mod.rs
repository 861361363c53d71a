// src/query/mod.rs
//! Database queries and search.
//!
//! [`QueryTranslator::run`] validates a [`DatabaseQuery`], turns it into the
//! query request body and hands back a lazy [`Paginator`] over the matching
//! pages. Nothing is sent for a query that fails validation.

mod filter;
mod sort;

pub use filter::{FieldType, FilterCondition, FilterExpression, FilterOperator, FilterValue};
pub use sort::{Direction, SortKey, SortSpec, Timestamp};

use crate::api::parser::{object_type, parse_list, parse_page};
use crate::api::{Batch, Cursor, Paginator, Transport};
use crate::error::AppError;
use crate::model::Page;
use crate::types::{DatabaseId, PageSize, ValidationError};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// A query against one database. Built per call and consumed by [`QueryTranslator::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseQuery {
    pub database_id: DatabaseId,
    pub filter: Option<FilterExpression>,
    pub sorts: Vec<SortSpec>,
    pub page_size: PageSize,
}

impl DatabaseQuery {
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            database_id,
            filter: None,
            sorts: Vec::new(),
            page_size: PageSize::default(),
        }
    }

    pub fn filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sorts.push(sort);
        self
    }

    pub fn sorts(mut self, sorts: Vec<SortSpec>) -> Self {
        self.sorts = sorts;
        self
    }

    pub fn page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(filter) = &self.filter {
            filter.validate()?;
        }
        self.sorts.iter().try_for_each(SortSpec::validate)
    }

    /// Request body for the page starting at `cursor`.
    pub fn to_wire(&self, cursor: Option<&Cursor>) -> Value {
        let mut body = Map::new();
        if let Some(filter) = &self.filter {
            body.insert("filter".to_string(), filter.to_wire());
        }
        if !self.sorts.is_empty() {
            body.insert(
                "sorts".to_string(),
                Value::Array(self.sorts.iter().map(SortSpec::to_wire).collect()),
            );
        }
        body.insert("page_size".to_string(), json!(self.page_size.get()));
        if let Some(cursor) = cursor {
            body.insert("start_cursor".to_string(), json!(cursor.token()));
        }
        Value::Object(body)
    }
}

/// Drives database queries and search through the transport.
#[derive(Clone)]
pub struct QueryTranslator {
    transport: Transport,
}

impl QueryTranslator {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Validates `query` and returns the matching pages as a lazy sequence.
    pub fn run(&self, query: DatabaseQuery) -> Result<Paginator<Page>, AppError> {
        query.validate()?;
        log::info!(
            "Querying database {} ({} sorts, filter: {})",
            query.database_id,
            query.sorts.len(),
            query.filter.is_some()
        );

        let path = format!("databases/{}/query", query.database_id.to_dashed());
        let query = Arc::new(query);
        let transport = self.transport.clone();
        Ok(Paginator::new(move |cursor: Option<Cursor>| {
            let transport = transport.clone();
            let body = query.to_wire(cursor.as_ref());
            let path = path.clone();
            async move {
                let response = transport.query(&path, body).await?;
                parse_list(response, parse_page)
            }
        }))
    }

    /// Full-text search over page titles. Databases in the results are skipped.
    pub fn search(&self, text: &str, page_size: PageSize) -> Paginator<Page> {
        log::info!("Searching pages for '{}'", text);
        let text = text.to_string();
        let transport = self.transport.clone();
        Paginator::new(move |cursor: Option<Cursor>| {
            let transport = transport.clone();
            let mut body = json!({
                "query": text.as_str(),
                "filter": { "value": "page", "property": "object" },
                "page_size": page_size.get(),
            });
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor.token());
            }
            async move {
                let response = transport.query("search", body).await?;
                let batch = parse_list(response, |value| Ok(value.clone()))?;
                let items = batch
                    .items
                    .iter()
                    .filter(|value| object_type(value) == Some("page"))
                    .map(parse_page)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok::<_, AppError>(Batch {
                    items,
                    next_cursor: batch.next_cursor,
                })
            }
        })
    }
}
