// src/tasks/mod.rs
//! Task records and the people attached to them.
//!
//! A task is a row of the task database whose properties follow a
//! [`TaskSchema`]. The resolver specializes database queries and page
//! updates for that shape.

mod decode;
mod schema;

pub use decode::{decode_task, people_names};
pub use schema::{AssigneeKind, StatusKind, TaskSchema};

use crate::api::parser::parse_page;
use crate::api::{Paginator, Transport};
use crate::blocks::BlockTreeBuilder;
use crate::error::AppError;
use crate::model::{
    properties_to_wire, Page, Person, PersonRole, PropertyMap, PropertyValue, Task, TaskDetails,
    TaskDraft, WorkflowState,
};
use crate::query::{DatabaseQuery, FilterExpression, QueryTranslator, SortSpec};
use crate::types::{
    DatabaseId, NotionId, PageId, PageSize, RichTextItem, SelectOption, UserId,
    ValidationError,
};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lazy sequence of tasks decoded from a database query.
pub struct TaskStream {
    pages: Paginator<Page>,
    schema: Arc<TaskSchema>,
}

impl TaskStream {
    /// The next task. A row that doesn't decode ends the stream with a
    /// schema mismatch, like a failed fetch would.
    pub async fn next(&mut self) -> Option<Result<Task, AppError>> {
        let page = match self.pages.next().await? {
            Ok(page) => page,
            Err(e) => return Some(Err(e)),
        };
        Some(decode_task(&self.schema, page))
    }

    pub async fn collect_up_to(mut self, limit: usize) -> Result<Vec<Task>, AppError> {
        let mut tasks = Vec::new();
        while tasks.len() < limit {
            match self.next().await {
                Some(task) => tasks.push(task?),
                None => break,
            }
        }
        Ok(tasks)
    }

    pub async fn collect_all(self) -> Result<Vec<Task>, AppError> {
        self.collect_up_to(usize::MAX).await
    }
}

/// A task matched by person, with how the person is attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonMatch {
    pub task: Task,
    pub is_owner: bool,
    pub is_team_member: bool,
    pub owners: Vec<String>,
    pub team: Vec<String>,
}

/// A person seen on recent tasks and the roles they hold there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonSummary {
    pub name: String,
    pub roles: Vec<PersonRole>,
}

/// Summary of a people scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeopleReport {
    pub people: Vec<PersonSummary>,
    pub pages_checked: usize,
}

/// Queries and updates task records in one database.
#[derive(Clone)]
pub struct TaskResolver {
    transport: Transport,
    translator: QueryTranslator,
    blocks: BlockTreeBuilder,
    schema: Arc<TaskSchema>,
    database_id: DatabaseId,
}

impl TaskResolver {
    pub fn new(transport: Transport, database_id: DatabaseId, schema: TaskSchema) -> Self {
        Self {
            translator: QueryTranslator::new(transport.clone()),
            blocks: BlockTreeBuilder::new(transport.clone()),
            transport,
            schema: Arc::new(schema),
            database_id,
        }
    }

    pub fn schema(&self) -> &TaskSchema {
        &self.schema
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    /// Tasks matching `filter`, most recently edited first unless `sorts` says otherwise.
    pub fn query_tasks(
        &self,
        filter: Option<FilterExpression>,
        sorts: Vec<SortSpec>,
    ) -> Result<TaskStream, AppError> {
        let mut query = DatabaseQuery::new(self.database_id.clone());
        if let Some(filter) = filter {
            query = query.filter(filter);
        }
        query = if sorts.is_empty() {
            query.sort(SortSpec::recently_edited())
        } else {
            query.sorts(sorts)
        };
        Ok(TaskStream {
            pages: self.translator.run(query)?,
            schema: Arc::clone(&self.schema),
        })
    }

    /// Tasks currently in `status`.
    pub fn tasks_in_state(&self, status: &str) -> Result<TaskStream, AppError> {
        let state = self.schema.state(status)?;
        self.query_tasks(Some(self.schema.status_filter(&state)), Vec::new())
    }

    /// The task and its content, fetched concurrently.
    pub async fn get_task(&self, task_id: &PageId) -> Result<TaskDetails, AppError> {
        let root = NotionId::from(task_id);
        let (page, content) = futures::try_join!(self.fetch_page(task_id), self.blocks.read(&root))?;
        Ok(TaskDetails {
            task: decode_task(&self.schema, page)?,
            content,
        })
    }

    /// Moves a task to another workflow state.
    ///
    /// The state is checked against the schema first; an unknown state
    /// never reaches the network.
    pub async fn update_status(&self, task_id: &PageId, status: &str) -> Result<Task, AppError> {
        let state = self.schema.state(status)?;
        log::info!("Setting status of {} to '{}'", task_id, state);
        let mut properties = PropertyMap::new();
        properties.insert(self.schema.status.clone(), self.status_value(&state));
        self.patch_properties(task_id, &properties).await
    }

    /// Points the assignee property at `person`.
    ///
    /// The person is not looked up first; the service rejects unknown ids
    /// and that surfaces as a validation error.
    pub async fn assign_person(&self, task_id: &PageId, person: &UserId) -> Result<Task, AppError> {
        log::info!("Assigning {} to {}", task_id, person);
        let mut properties = PropertyMap::new();
        properties.insert(self.schema.assignee.clone(), self.assignee_value(person)?);
        self.patch_properties(task_id, &properties).await
    }

    /// Creates a task row in the database.
    pub async fn create_task(&self, draft: TaskDraft) -> Result<Task, AppError> {
        if draft.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title").into());
        }
        let state = self.schema.state(&draft.status)?;

        let mut properties = PropertyMap::new();
        properties.insert(
            self.schema.title.clone(),
            PropertyValue::Title(RichTextItem::spans_from_str(&draft.title)),
        );
        properties.insert(self.schema.status.clone(), self.status_value(&state));
        if let Some(person) = &draft.assignee {
            properties.insert(self.schema.assignee.clone(), self.assignee_value(person)?);
        }
        if let Some(due) = draft.due {
            properties.insert(self.schema.due.clone(), PropertyValue::Date(Some(due)));
        }
        if !draft.tags.is_empty() {
            properties.insert(
                self.schema.tags.clone(),
                PropertyValue::MultiSelect(draft.tags.iter().map(SelectOption::named).collect()),
            );
        }
        if let Some(description) = &draft.description {
            properties.insert(
                self.schema.description.clone(),
                PropertyValue::RichText(RichTextItem::spans_from_str(description)),
            );
        }

        let body = json!({
            "parent": { "database_id": self.database_id.to_dashed() },
            "properties": Value::Object(properties_to_wire(&properties)?),
        });
        log::info!("Creating task '{}' in {}", draft.title, self.database_id);
        let response = self.transport.send(Method::POST, "pages", Some(body)).await?;
        decode_task(&self.schema, parse_page(&response)?)
    }

    /// Tasks where a person whose name contains `name` is owner, team
    /// member, or either, most recently edited first.
    pub async fn find_tasks_by_person(
        &self,
        name: &str,
        role: PersonRole,
        limit: usize,
    ) -> Result<Vec<PersonMatch>, AppError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyField("person name").into());
        }
        let filter = match role {
            PersonRole::Owner => self.schema.owner_filter(name),
            PersonRole::Team => self.schema.team_filter(name),
            PersonRole::Any => FilterExpression::or(vec![
                self.schema.owner_filter(name),
                self.schema.team_filter(name),
            ]),
        };
        let tasks = self
            .query_tasks(Some(filter), vec![SortSpec::recently_edited()])?
            .collect_up_to(limit)
            .await?;

        let needle = name.to_lowercase();
        let matches = |names: &[String]| names.iter().any(|n| n.to_lowercase().contains(&needle));
        Ok(tasks
            .into_iter()
            .map(|task| {
                let owners = people_names(&task.page, &self.schema.assignee);
                let team = people_names(&task.page, &self.schema.team);
                PersonMatch {
                    is_owner: matches(&owners),
                    is_team_member: matches(&team),
                    owners,
                    team,
                    task,
                }
            })
            .collect())
    }

    /// Everyone named as owner or team member on the `limit` most recently
    /// edited tasks, sorted by name.
    pub async fn list_people(&self, limit: usize) -> Result<PeopleReport, AppError> {
        let page_size = PageSize::new(limit.clamp(1, PageSize::MAX as usize) as u32)?;
        let query = DatabaseQuery::new(self.database_id.clone())
            .sort(SortSpec::recently_edited())
            .page_size(page_size);
        let pages = self.translator.run(query)?.collect_up_to(limit).await?;

        let mut people: BTreeMap<String, Vec<PersonRole>> = BTreeMap::new();
        for page in &pages {
            for (property, role) in [
                (&self.schema.assignee, PersonRole::Owner),
                (&self.schema.team, PersonRole::Team),
            ] {
                for name in people_names(page, property) {
                    if name.is_empty() {
                        continue;
                    }
                    let roles = people.entry(name).or_default();
                    if !roles.contains(&role) {
                        roles.push(role);
                    }
                }
            }
        }

        Ok(PeopleReport {
            people: people
                .into_iter()
                .map(|(name, roles)| PersonSummary { name, roles })
                .collect(),
            pages_checked: pages.len(),
        })
    }

    async fn fetch_page(&self, page_id: &PageId) -> Result<Page, AppError> {
        let response = self
            .transport
            .send(Method::GET, &format!("pages/{}", page_id.to_dashed()), None)
            .await?;
        parse_page(&response)
    }

    async fn patch_properties(
        &self,
        page_id: &PageId,
        properties: &PropertyMap,
    ) -> Result<Task, AppError> {
        let body = json!({ "properties": Value::Object(properties_to_wire(properties)?) });
        let response = self
            .transport
            .send(
                Method::PATCH,
                &format!("pages/{}", page_id.to_dashed()),
                Some(body),
            )
            .await?;
        decode_task(&self.schema, parse_page(&response)?)
    }

    fn status_value(&self, state: &WorkflowState) -> PropertyValue {
        let option = Some(SelectOption::named(state.as_str()));
        match self.schema.status_kind {
            StatusKind::Status => PropertyValue::Status(option),
            StatusKind::Select => PropertyValue::Select(option),
        }
    }

    fn assignee_value(&self, person: &UserId) -> Result<PropertyValue, AppError> {
        Ok(match self.schema.assignee_kind {
            AssigneeKind::People => PropertyValue::People(vec![Person {
                id: person.clone(),
                name: None,
                email: None,
            }]),
            AssigneeKind::Relation => PropertyValue::Relation(vec![PageId::parse(person.as_str())?]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{
        error, listing, ok, paragraph, task_page, transport, ScriptedBackend,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const TASK: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f90";
    const ADA: &str = "11111111222233334444555555555555";
    const BOB: &str = "66666666777788889999aaaaaaaaaaaa";

    fn resolver(backend: Arc<ScriptedBackend>) -> TaskResolver {
        TaskResolver::new(
            transport(backend),
            DatabaseId::parse("d9824bdc84454327be8b5b47500af6ce").unwrap(),
            TaskSchema::default(),
        )
    }

    fn task_id() -> PageId {
        PageId::parse(TASK).unwrap()
    }

    #[tokio::test]
    async fn unknown_status_is_rejected_before_any_request() {
        let backend = ScriptedBackend::new(vec![]);
        let err = resolver(backend.clone())
            .update_status(&task_id(), "Blocked")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn update_status_patches_the_status_property() {
        let backend = ScriptedBackend::new(vec![ok(task_page(TASK, "Ship", "Done", &[]))]);
        let task = resolver(backend.clone())
            .update_status(&task_id(), "done")
            .await
            .unwrap();
        assert_eq!(task.status.as_str(), "Done");

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::PATCH);
        assert_eq!(calls[0].path, "pages/a1b2c3d4-e5f6-0718-293a-4b5c6d7e8f90");
        assert!(!calls[0].idempotent);
        assert_eq!(
            calls[0].body,
            Some(json!({ "properties": { "Status": { "status": { "name": "Done" } } } }))
        );
    }

    #[tokio::test]
    async fn select_workflows_are_written_as_select() {
        let backend = ScriptedBackend::new(vec![ok(task_page(TASK, "Ship", "Doing", &[]))]);
        let schema = TaskSchema {
            status_kind: StatusKind::Select,
            ..TaskSchema::default()
        };
        let resolver = TaskResolver::new(
            transport(backend.clone()),
            DatabaseId::parse("d9824bdc84454327be8b5b47500af6ce").unwrap(),
            schema,
        );
        resolver.update_status(&task_id(), "Doing").await.unwrap();
        assert_eq!(
            backend.calls()[0].body,
            Some(json!({ "properties": { "Status": { "select": { "name": "Doing" } } } }))
        );
    }

    #[tokio::test]
    async fn assign_person_writes_a_people_value() {
        let backend = ScriptedBackend::new(vec![ok(task_page(
            TASK,
            "Ship",
            "Doing",
            &[(ADA, "Ada")],
        ))]);
        let task = resolver(backend.clone())
            .assign_person(&task_id(), &UserId::parse(ADA).unwrap())
            .await
            .unwrap();
        assert_eq!(task.assignee.and_then(|p| p.name).as_deref(), Some("Ada"));
        assert_eq!(
            backend.calls()[0].body,
            Some(json!({
                "properties": {
                    "Owner": { "people": [{ "id": "11111111-2222-3333-4444-555555555555" }] }
                }
            }))
        );
    }

    #[tokio::test]
    async fn create_task_posts_under_the_database() {
        let backend = ScriptedBackend::new(vec![ok(task_page(TASK, "Write docs", "To Do", &[]))]);
        let draft = TaskDraft::new("Write docs", "to do");
        let task = resolver(backend.clone()).create_task(draft).await.unwrap();
        assert_eq!(task.title, "Write docs");

        let call = &backend.calls()[0];
        assert_eq!(call.method, Method::POST);
        assert_eq!(call.path, "pages");
        let body = call.body.clone().unwrap();
        assert_eq!(
            body["parent"],
            json!({ "database_id": "d9824bdc-8445-4327-be8b-5b47500af6ce" })
        );
        assert_eq!(body["properties"]["Status"], json!({ "status": { "name": "To Do" } }));
        assert_eq!(body["properties"]["Title"]["title"][0]["text"]["content"], "Write docs");
    }

    #[tokio::test]
    async fn create_task_requires_a_title() {
        let backend = ScriptedBackend::new(vec![]);
        let err = resolver(backend.clone())
            .create_task(TaskDraft::new("  ", "Doing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn get_task_returns_the_page_and_its_content() {
        let backend = ScriptedBackend::new(vec![
            ok(task_page(TASK, "Ship", "Doing", &[])),
            ok(listing(
                vec![paragraph("b0000000000000000000000000000001", "notes", false)],
                None,
            )),
        ]);
        let details = resolver(backend.clone()).get_task(&task_id()).await.unwrap();
        assert_eq!(details.task.title, "Ship");
        assert_eq!(details.content.len(), 1);
        assert_eq!(details.content[0].plain_text(), "notes");
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn missing_task_surfaces_not_found() {
        let backend = ScriptedBackend::new(vec![
            error(404, "object_not_found"),
            ok(listing(vec![], None)),
        ]);
        let err = resolver(backend).get_task(&task_id()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn tasks_in_state_filters_on_status() {
        let backend = ScriptedBackend::new(vec![ok(listing(
            vec![task_page(TASK, "Ship", "Doing", &[])],
            None,
        ))]);
        let tasks = resolver(backend.clone())
            .tasks_in_state("doing")
            .unwrap()
            .collect_all()
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        let body = backend.calls()[0].body.clone().unwrap();
        assert_eq!(
            body["filter"],
            json!({ "property": "Status", "status": { "equals": "Doing" } })
        );
        assert_eq!(
            body["sorts"],
            json!([{ "timestamp": "last_edited_time", "direction": "descending" }])
        );
    }

    #[tokio::test]
    async fn find_tasks_by_person_reports_roles() {
        let backend = ScriptedBackend::new(vec![ok(listing(
            vec![task_page(TASK, "Ship", "Doing", &[(ADA, "Ada Lovelace")])],
            None,
        ))]);
        let matches = resolver(backend.clone())
            .find_tasks_by_person("ada", PersonRole::Any, 10)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].is_owner);
        assert!(!matches[0].is_team_member);
        assert_eq!(matches[0].owners, vec!["Ada Lovelace".to_string()]);

        let body = backend.calls()[0].body.clone().unwrap();
        assert_eq!(
            body["filter"],
            json!({ "or": [
                { "property": "Owner", "people": { "contains": "ada" } },
                { "property": "Team", "people": { "contains": "ada" } }
            ] })
        );
    }

    #[tokio::test]
    async fn list_people_merges_roles_by_name() {
        let backend = ScriptedBackend::new(vec![ok(listing(
            vec![
                task_page(TASK, "Ship", "Doing", &[(BOB, "Bob")]),
                task_page(
                    "a1b2c3d4e5f60718293a4b5c6d7e8f91",
                    "Plan",
                    "To Do",
                    &[(ADA, "Ada"), (BOB, "Bob")],
                ),
            ],
            None,
        ))]);
        let report = resolver(backend).list_people(20).await.unwrap();
        assert_eq!(report.pages_checked, 2);
        assert_eq!(
            report.people,
            vec![
                PersonSummary {
                    name: "Ada".to_string(),
                    roles: vec![PersonRole::Owner],
                },
                PersonSummary {
                    name: "Bob".to_string(),
                    roles: vec![PersonRole::Owner],
                },
            ]
        );
    }
}
