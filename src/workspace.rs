// src/workspace.rs
//! The operations exposed to callers.
//!
//! [`NotionWorkspace`] wires the transport, query translator, block tree
//! builder and task resolver together. Every operation validates its input
//! before dispatch and tags failures with the operation name and target.

use crate::api::parser::parse_page;
use crate::api::Transport;
use crate::blocks::{plan_content_changes, BlockOperation, BlockTreeBuilder, WriteReport};
use crate::constants::NOTION_MAX_APPEND_BLOCKS;
use crate::error::{AppError, OperationContext, Result};
use crate::model::{
    properties_to_wire, BlockDraft, Page, PageContent, Parent, PersonRole, PropertyMap, Task,
    TaskDetails, TaskDraft,
};
use crate::query::{DatabaseQuery, FilterExpression, QueryTranslator, SortSpec};
use crate::tasks::{PeopleReport, PersonMatch, TaskResolver, TaskSchema};
use crate::types::{DatabaseId, NotionId, PageId, PageSize, UserId, ValidationError};
use reqwest::Method;
use serde_json::{json, Map, Value};

/// Entry point for database, page, block and task operations.
#[derive(Clone)]
pub struct NotionWorkspace {
    transport: Transport,
    translator: QueryTranslator,
    blocks: BlockTreeBuilder,
    tasks: Option<TaskResolver>,
}

impl NotionWorkspace {
    /// A workspace without a task database; task operations fail with a
    /// configuration error.
    pub fn new(transport: Transport) -> Self {
        Self {
            translator: QueryTranslator::new(transport.clone()),
            blocks: BlockTreeBuilder::new(transport.clone()),
            transport,
            tasks: None,
        }
    }

    /// Enables task operations against `database_id`.
    pub fn with_task_database(mut self, database_id: DatabaseId, schema: TaskSchema) -> Self {
        self.tasks = Some(TaskResolver::new(
            self.transport.clone(),
            database_id,
            schema,
        ));
        self
    }

    /// Limits how deep page content is read.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.blocks = self.blocks.with_max_depth(depth);
        self
    }

    pub fn tasks(&self) -> Result<&TaskResolver> {
        self.tasks.as_ref().ok_or_else(|| {
            AppError::MissingConfiguration(
                "no task database configured (set NOTION_DATABASE_ID)".to_string(),
            )
        })
    }

    /// Rows of `database_id` matching `filter`, in `sorts` order, up to `limit`.
    pub async fn query_database(
        &self,
        database_id: &DatabaseId,
        filter: Option<FilterExpression>,
        sorts: Vec<SortSpec>,
        limit: Option<usize>,
    ) -> Result<Vec<Page>> {
        let mut query = DatabaseQuery::new(database_id.clone()).sorts(sorts);
        if let Some(filter) = filter {
            query = query.filter(filter);
        }
        if let Some(limit) = limit {
            query = query.page_size(page_size_for(limit)?);
        }
        let pages = self
            .translator
            .run(query)
            .in_operation("query_database", database_id.to_string())?;
        pages
            .collect_up_to(limit.unwrap_or(usize::MAX))
            .await
            .in_operation("query_database", database_id.to_string())
    }

    /// A page's properties and its block tree, fetched concurrently.
    pub async fn get_page(&self, page_id: &PageId) -> Result<PageContent> {
        log::info!("Fetching page {}", page_id);
        let root = NotionId::from(page_id);
        let (page, blocks) = futures::try_join!(self.fetch_page(page_id), self.blocks.read(&root))
            .in_operation("get_page", page_id.to_string())?;
        Ok(PageContent { page, blocks })
    }

    /// Applies block operations to a page in order.
    pub async fn update_page_content(
        &self,
        page_id: &PageId,
        operations: Vec<BlockOperation>,
    ) -> Result<WriteReport> {
        if operations.is_empty() {
            return Err(AppError::from(ValidationError::EmptyField("operations"))
                .in_operation("update_page_content", page_id.to_string()));
        }
        log::info!(
            "Applying {} block operations to {}",
            operations.len(),
            page_id
        );
        self.blocks
            .write(&NotionId::from(page_id), operations)
            .await
            .in_operation("update_page_content", page_id.to_string())
    }

    /// Makes the page's top-level content match `desired`, touching only
    /// the blocks that differ.
    pub async fn replace_page_content(
        &self,
        page_id: &PageId,
        desired: Vec<BlockDraft>,
    ) -> Result<WriteReport> {
        self.replace_content(page_id, &desired)
            .await
            .in_operation("replace_page_content", page_id.to_string())
    }

    /// Appends blocks at the end of a page, in requests of at most 100.
    pub async fn append_page_content(
        &self,
        page_id: &PageId,
        blocks: Vec<BlockDraft>,
    ) -> Result<WriteReport> {
        if blocks.is_empty() {
            return Err(AppError::from(ValidationError::EmptyField("blocks"))
                .in_operation("append_page_content", page_id.to_string()));
        }
        self.blocks
            .write(&NotionId::from(page_id), append_operations(&blocks))
            .await
            .in_operation("append_page_content", page_id.to_string())
    }

    /// Writes the given properties; properties not named are left as they are.
    pub async fn update_page_properties(
        &self,
        page_id: &PageId,
        properties: PropertyMap,
    ) -> Result<Page> {
        self.patch_page(page_id, &properties)
            .await
            .in_operation("update_page_properties", page_id.to_string())
    }

    /// Creates a page under `parent`. Up to 100 content blocks go with the
    /// create request; the rest are appended afterwards.
    pub async fn create_page(
        &self,
        parent: Parent,
        properties: PropertyMap,
        content: Vec<BlockDraft>,
    ) -> Result<Page> {
        let target = parent_label(&parent);
        self.post_page(&parent, &properties, &content)
            .await
            .in_operation("create_page", target)
    }

    /// Pages whose title matches `text`, up to `limit`.
    pub async fn search(&self, text: &str, limit: Option<usize>) -> Result<Vec<Page>> {
        let page_size = match limit {
            Some(limit) => page_size_for(limit)?,
            None => PageSize::default(),
        };
        self.translator
            .search(text, page_size)
            .collect_up_to(limit.unwrap_or(usize::MAX))
            .await
            .in_operation("search", text.to_string())
    }

    pub async fn create_task(&self, draft: TaskDraft) -> Result<Task> {
        let title = draft.title.clone();
        self.tasks()?
            .create_task(draft)
            .await
            .in_operation("create_task", title)
    }

    pub async fn get_task(&self, task_id: &PageId) -> Result<TaskDetails> {
        self.tasks()?
            .get_task(task_id)
            .await
            .in_operation("get_task", task_id.to_string())
    }

    pub async fn update_task_status(&self, task_id: &PageId, status: &str) -> Result<Task> {
        self.tasks()?
            .update_status(task_id, status)
            .await
            .in_operation("update_task_status", task_id.to_string())
    }

    pub async fn assign_task(&self, task_id: &PageId, person: &UserId) -> Result<Task> {
        self.tasks()?
            .assign_person(task_id, person)
            .await
            .in_operation("assign_task", task_id.to_string())
    }

    /// Tasks in `status` (all tasks when `None`), most recently edited first.
    pub async fn list_tasks(&self, status: Option<&str>, limit: usize) -> Result<Vec<Task>> {
        let tasks = self.tasks()?;
        let stream = match status {
            Some(status) => tasks.tasks_in_state(status),
            None => tasks.query_tasks(None, Vec::new()),
        };
        let target = tasks.database_id().to_string();
        stream
            .in_operation("list_tasks", target.clone())?
            .collect_up_to(limit)
            .await
            .in_operation("list_tasks", target)
    }

    pub async fn find_tasks_by_person(
        &self,
        name: &str,
        role: PersonRole,
        limit: usize,
    ) -> Result<Vec<PersonMatch>> {
        self.tasks()?
            .find_tasks_by_person(name, role, limit)
            .await
            .in_operation("find_tasks_by_person", name.to_string())
    }

    pub async fn list_people(&self, limit: usize) -> Result<PeopleReport> {
        let tasks = self.tasks()?;
        tasks
            .list_people(limit)
            .await
            .in_operation("list_people", tasks.database_id().to_string())
    }

    async fn fetch_page(&self, page_id: &PageId) -> Result<Page> {
        let response = self
            .transport
            .send(Method::GET, &format!("pages/{}", page_id.to_dashed()), None)
            .await?;
        parse_page(&response)
    }

    async fn replace_content(
        &self,
        page_id: &PageId,
        desired: &[BlockDraft],
    ) -> Result<WriteReport> {
        for draft in desired {
            draft.validate()?;
        }
        let root = NotionId::from(page_id);
        let current = self.blocks.read(&root).await?;
        let operations = plan_content_changes(&current, desired);
        log::info!(
            "Replacing content of {}: {} operations planned",
            page_id,
            operations.len()
        );
        if operations.is_empty() {
            return Ok(WriteReport::default());
        }
        self.blocks.write(&root, operations).await
    }

    async fn patch_page(&self, page_id: &PageId, properties: &PropertyMap) -> Result<Page> {
        if properties.is_empty() {
            return Err(ValidationError::EmptyField("properties").into());
        }
        let body = json!({ "properties": Value::Object(properties_to_wire(properties)?) });
        log::info!("Updating {} properties of {}", properties.len(), page_id);
        let response = self
            .transport
            .send(
                Method::PATCH,
                &format!("pages/{}", page_id.to_dashed()),
                Some(body),
            )
            .await?;
        parse_page(&response)
    }

    async fn post_page(
        &self,
        parent: &Parent,
        properties: &PropertyMap,
        content: &[BlockDraft],
    ) -> Result<Page> {
        if matches!(parent, Parent::Workspace) {
            return Err(ValidationError::InvalidField {
                field: "parent".to_string(),
                reason: "integrations cannot create workspace-level pages".to_string(),
            }
            .into());
        }
        for draft in content {
            draft.validate()?;
        }
        let (inline, rest) = content.split_at(content.len().min(NOTION_MAX_APPEND_BLOCKS));

        let mut body = Map::new();
        body.insert("parent".to_string(), parent.to_wire());
        body.insert(
            "properties".to_string(),
            Value::Object(properties_to_wire(properties)?),
        );
        if !inline.is_empty() {
            body.insert(
                "children".to_string(),
                Value::Array(inline.iter().map(BlockDraft::to_wire).collect()),
            );
        }
        log::info!("Creating page under {}", parent_label(parent));
        let response = self
            .transport
            .send(Method::POST, "pages", Some(Value::Object(body)))
            .await?;
        let page = parse_page(&response)?;

        if !rest.is_empty() {
            if let Err(e) = self
                .blocks
                .write(&NotionId::from(&page.id), append_operations(rest))
                .await
            {
                return Err(AppError::IncompletePage {
                    page_id: page.id,
                    source: Box::new(e),
                });
            }
        }
        Ok(page)
    }
}

fn append_operations(blocks: &[BlockDraft]) -> Vec<BlockOperation> {
    blocks
        .chunks(NOTION_MAX_APPEND_BLOCKS)
        .map(|chunk| BlockOperation::append(chunk.to_vec()))
        .collect()
}

fn page_size_for(limit: usize) -> Result<PageSize> {
    Ok(PageSize::new(limit.clamp(1, PageSize::MAX as usize) as u32)?)
}

fn parent_label(parent: &Parent) -> String {
    match parent {
        Parent::Page { page_id } => page_id.to_string(),
        Parent::Database { database_id } => database_id.to_string(),
        Parent::Block { block_id } => block_id.to_string(),
        Parent::Workspace => "workspace".to_string(),
    }
}
