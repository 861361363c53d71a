// src/config.rs
use crate::constants::{DEFAULT_MAX_ATTEMPTS, NOTION_API_BASE_URL};
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::model::PersonRole;
use crate::tasks::{AssigneeKind, StatusKind, TaskSchema};
use crate::types::{ApiKey, DatabaseId, ValidationError};
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

/// Environment variable holding the integration token.
pub const API_KEY_VAR: &str = "NOTION_API_KEY";

/// Environment variable naming the default task database.
pub const DATABASE_ID_VAR: &str = "NOTION_DATABASE_ID";

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout: u64,

    /// Total attempts for a retryable request, first one included
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub attempts: u32,

    /// API root, e.g. a recording proxy
    #[arg(long, global = true, default_value = NOTION_API_BASE_URL)]
    pub base_url: String,

    /// Task database (overrides NOTION_DATABASE_ID)
    #[arg(long, global = true)]
    pub database: Option<String>,

    #[command(flatten)]
    pub schema: SchemaArgs,
}

/// Property names and workflow of the task database.
#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Workflow states, in order (comma separated)
    #[arg(
        long,
        global = true,
        value_delimiter = ',',
        default_values_t = ["To Do".to_string(), "Doing".to_string(), "Done".to_string()]
    )]
    pub states: Vec<String>,

    /// Name of the status property
    #[arg(long, global = true, default_value = "Status")]
    pub status_property: String,

    /// Whether the status property is a status or a select
    #[arg(long, global = true, value_enum, default_value_t = StatusKind::Status)]
    pub status_kind: StatusKind,

    /// Name of the owner property
    #[arg(long, global = true, default_value = "Owner")]
    pub owner_property: String,

    /// Whether the owner property holds people or relations
    #[arg(long, global = true, value_enum, default_value_t = AssigneeKind::People)]
    pub owner_kind: AssigneeKind,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Query a database; filter and sorts are JSON in the API's wire form
    Query {
        /// Database URL or ID (defaults to the task database)
        #[arg(value_name = "DATABASE")]
        database_id: Option<String>,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Fetch a page with its content
    Page {
        /// Page URL or ID
        page: String,
        /// Stop descending below this many block levels
        #[arg(long)]
        depth: Option<usize>,
    },
    /// Search pages by title
    Search {
        text: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List tasks, optionally in one state
    Tasks {
        #[arg(long)]
        status: Option<String>,
        /// Only tasks where this person is involved
        #[arg(long)]
        person: Option<String>,
        #[arg(long, value_enum, default_value_t = PersonRole::Any)]
        role: PersonRole,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Fetch one task with its content
    Task { task: String },
    /// Move a task to another workflow state
    SetStatus { task: String, status: String },
    /// Assign a task to a person
    Assign { task: String, person: String },
    /// Append paragraphs to a page, one per argument
    Append {
        page: String,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// People named on recently edited tasks
    People {
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

/// Settings resolved from the command line and environment, read once at
/// start-up.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub api_key: ApiKey,
    pub database_id: Option<DatabaseId>,
    pub base_url: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub schema: TaskSchema,
}

impl WorkspaceConfig {
    /// Resolves configuration from CLI input and the process environment.
    pub fn resolve(cli: &CommandLineInput) -> Result<Self, AppError> {
        Self::resolve_with(cli, |name| std::env::var(name).ok())
    }

    /// Resolves configuration with `lookup` standing in for the environment.
    pub fn resolve_with(
        cli: &CommandLineInput,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let api_key_str = lookup(API_KEY_VAR).ok_or_else(|| {
            AppError::MissingConfiguration(format!("{} environment variable not set", API_KEY_VAR))
        })?;
        let api_key = ApiKey::new(api_key_str)?;

        let database_id = cli
            .database
            .clone()
            .or_else(|| lookup(DATABASE_ID_VAR))
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| DatabaseId::parse(&raw))
            .transpose()?;

        if cli.attempts == 0 {
            return Err(ValidationError::InvalidField {
                field: "attempts".to_string(),
                reason: "at least one attempt is required".to_string(),
            }
            .into());
        }
        if cli.timeout == 0 {
            return Err(ValidationError::InvalidField {
                field: "timeout".to_string(),
                reason: "timeout must be at least one second".to_string(),
            }
            .into());
        }

        let schema = TaskSchema {
            status: cli.schema.status_property.as_str().into(),
            status_kind: cli.schema.status_kind,
            assignee: cli.schema.owner_property.as_str().into(),
            assignee_kind: cli.schema.owner_kind,
            ..TaskSchema::default()
        }
        .with_states(
            cli.schema
                .states
                .iter()
                .map(|state| state.trim().to_string())
                .collect(),
        );
        schema.validate()?;

        Ok(WorkspaceConfig {
            api_key,
            database_id,
            base_url: cli.base_url.clone(),
            request_timeout: Duration::from_secs(cli.timeout),
            retry: RetryPolicy {
                max_attempts: cli.attempts,
                ..RetryPolicy::default()
            },
            schema,
        })
    }
}
