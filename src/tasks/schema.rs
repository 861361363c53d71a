// src/tasks/schema.rs
//! Which database properties make up a task, and the workflow it follows.

use crate::model::WorkflowState;
use crate::query::FilterExpression;
use crate::types::{PropertyName, ValidationError};
use serde::{Deserialize, Serialize};

/// How the assignee property references people.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeKind {
    /// A `people` property holding workspace users.
    #[default]
    People,
    /// A `relation` property pointing at person records in another database.
    Relation,
}

/// Whether the workflow lives in a `status` or a `select` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    #[default]
    Status,
    Select,
}

/// Property names and workflow states of a task database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSchema {
    pub title: PropertyName,
    pub status: PropertyName,
    pub status_kind: StatusKind,
    /// Owner of the task; decoded as [`Task::assignee`](crate::model::Task).
    pub assignee: PropertyName,
    pub assignee_kind: AssigneeKind,
    pub team: PropertyName,
    pub due: PropertyName,
    pub system: PropertyName,
    pub tags: PropertyName,
    pub description: PropertyName,
    /// Allowed workflow states, in workflow order.
    pub states: Vec<String>,
}

impl Default for TaskSchema {
    fn default() -> Self {
        Self {
            title: "Title".into(),
            status: "Status".into(),
            status_kind: StatusKind::Status,
            assignee: "Owner".into(),
            assignee_kind: AssigneeKind::People,
            team: "Team".into(),
            due: "Due".into(),
            system: "System".into(),
            tags: "Tags".into(),
            description: "Description".into(),
            states: vec!["To Do".to_string(), "Doing".to_string(), "Done".to_string()],
        }
    }
}

impl TaskSchema {
    pub fn with_states(mut self, states: Vec<String>) -> Self {
        self.states = states;
        self
    }

    /// Resolves `name` to one of the workflow states.
    ///
    /// Matching ignores case and surrounding whitespace; the state is
    /// returned with the spelling the schema uses.
    pub fn state(&self, name: &str) -> Result<WorkflowState, ValidationError> {
        let wanted = name.trim();
        self.states
            .iter()
            .find(|state| state.eq_ignore_ascii_case(wanted))
            .map(|state| WorkflowState::new_unchecked(state.clone()))
            .ok_or_else(|| ValidationError::UnknownStatus {
                status: name.to_string(),
                allowed: self.states.clone(),
            })
    }

    /// Filter matching tasks in `state`.
    pub fn status_filter(&self, state: &WorkflowState) -> FilterExpression {
        match self.status_kind {
            StatusKind::Status => FilterExpression::status_equals(self.status.clone(), state.as_str()),
            StatusKind::Select => FilterExpression::select_equals(self.status.clone(), state.as_str()),
        }
    }

    /// Filter matching tasks owned by `person` (user id or name).
    pub fn owner_filter(&self, person: &str) -> FilterExpression {
        FilterExpression::people_contains(self.assignee.clone(), person)
    }

    /// Filter matching tasks where `person` is on the team.
    pub fn team_filter(&self, person: &str) -> FilterExpression {
        FilterExpression::people_contains(self.team.clone(), person)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.states.is_empty() {
            return Err(ValidationError::EmptyField("workflow states"));
        }
        if self.states.iter().any(|state| state.trim().is_empty()) {
            return Err(ValidationError::InvalidField {
                field: "workflow states".to_string(),
                reason: "state names cannot be blank".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn states_match_case_insensitively() {
        let schema = TaskSchema::default();
        assert_eq!(schema.state("done").unwrap().as_str(), "Done");
        assert_eq!(schema.state(" to do ").unwrap().as_str(), "To Do");
    }

    #[test]
    fn unknown_state_lists_the_allowed_ones() {
        let err = TaskSchema::default().state("Blocked").unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownStatus {
                status: "Blocked".to_string(),
                allowed: vec!["To Do".into(), "Doing".into(), "Done".into()],
            }
        );
        assert!(err.to_string().contains("To Do, Doing, Done"));
    }

    #[test]
    fn status_filter_follows_the_property_kind() {
        let mut schema = TaskSchema::default();
        let done = schema.state("Done").unwrap();
        assert_eq!(
            schema.status_filter(&done).to_wire(),
            json!({ "property": "Status", "status": { "equals": "Done" } })
        );
        schema.status_kind = StatusKind::Select;
        assert_eq!(
            schema.status_filter(&done).to_wire(),
            json!({ "property": "Status", "select": { "equals": "Done" } })
        );
    }

    #[test]
    fn schema_needs_states() {
        assert!(TaskSchema::default().with_states(vec![]).validate().is_err());
        assert!(TaskSchema::default()
            .with_states(vec!["Open".into(), " ".into()])
            .validate()
            .is_err());
    }
}
