use super::{Block, Page, Person};
use crate::types::{DateValue, PageId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// A status name that has been checked against the configured workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WorkflowState(String);

impl WorkflowState {
    /// Only the task schema hands these out, after checking membership.
    pub(crate) fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A database row decoded as a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: PageId,
    pub title: String,
    pub status: WorkflowState,
    /// First person of the assignee property, if any.
    pub assignee: Option<Person>,
    pub due: Option<DateValue>,
    pub team: Vec<Person>,
    pub system: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub last_edited_time: DateTime<Utc>,
    pub url: Option<String>,
    /// The page the task was decoded from.
    #[serde(skip)]
    pub page: Page,
}

/// A task together with its content blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDetails {
    pub task: Task,
    pub content: Vec<Block>,
}

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub status: String,
    pub assignee: Option<UserId>,
    pub due: Option<DateValue>,
    pub tags: Vec<String>,
    pub description: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: status.into(),
            assignee: None,
            due: None,
            tags: Vec::new(),
            description: None,
        }
    }

    pub fn assigned_to(mut self, person: UserId) -> Self {
        self.assignee = Some(person);
        self
    }

    pub fn due_on(mut self, due: DateValue) -> Self {
        self.due = Some(due);
        self
    }
}

/// Which people properties of a task a person is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    Owner,
    Team,
    Any,
}
