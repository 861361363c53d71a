// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use notion_agent::config::Command;
use notion_agent::{
    BlockDraft, CommandLineInput, DatabaseId, FilterExpression, NotionHttpClient,
    NotionWorkspace, PageId, SortSpec, Transport, UserId, WorkspaceConfig,
};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::sync::Arc;

/// Sets up logging: stderr for the operator, a debug log file in the temp dir.
/// Stdout carries only JSON results.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("notion_agent.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stderr_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

fn connect(config: &WorkspaceConfig) -> Result<NotionWorkspace> {
    let client = NotionHttpClient::with_base_url(&config.api_key, &config.base_url)
        .context("building the HTTP client")?;
    let transport = Transport::new(Arc::new(client))
        .with_policy(config.retry.clone())
        .with_timeout(config.request_timeout);
    let workspace = NotionWorkspace::new(transport);
    Ok(match &config.database_id {
        Some(database_id) => {
            workspace.with_task_database(database_id.clone(), config.schema.clone())
        }
        None => workspace,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_json(raw: &str, what: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{} is not valid JSON", what))
}

/// Sorts may be given as one sort object or an array of them.
fn parse_sorts(raw: &str) -> Result<Vec<SortSpec>> {
    let value = parse_json(raw, "--sort")?;
    let items = match value {
        Value::Array(items) => items,
        single => vec![single],
    };
    Ok(items
        .iter()
        .map(SortSpec::from_wire)
        .collect::<Result<Vec<_>, _>>()?)
}

async fn run(command: Command, config: &WorkspaceConfig, workspace: &NotionWorkspace) -> Result<()> {
    match command {
        Command::Query {
            database_id,
            filter,
            sort,
            limit,
        } => {
            let database_id = match database_id {
                Some(raw) => DatabaseId::parse(&raw)?,
                None => config
                    .database_id
                    .clone()
                    .context("no database given and NOTION_DATABASE_ID is not set")?,
            };
            let filter = filter
                .map(|raw| -> Result<FilterExpression> {
                    Ok(FilterExpression::from_wire(&parse_json(&raw, "--filter")?)?)
                })
                .transpose()?;
            let sorts = sort.map(|raw| parse_sorts(&raw)).transpose()?.unwrap_or_default();
            let pages = workspace
                .query_database(&database_id, filter, sorts, limit)
                .await?;
            print_json(&pages)
        }
        Command::Page { page, depth } => {
            let page_id = PageId::parse(&page)?;
            let workspace = match depth {
                Some(depth) => workspace.clone().with_max_depth(depth),
                None => workspace.clone(),
            };
            print_json(&workspace.get_page(&page_id).await?)
        }
        Command::Search { text, limit } => print_json(&workspace.search(&text, limit).await?),
        Command::Tasks {
            status,
            person: Some(person),
            role,
            limit,
        } => {
            if status.is_some() {
                log::warn!("--status is ignored when --person is given");
            }
            print_json(&workspace.find_tasks_by_person(&person, role, limit).await?)
        }
        Command::Tasks {
            status,
            person: None,
            limit,
            ..
        } => print_json(&workspace.list_tasks(status.as_deref(), limit).await?),
        Command::Task { task } => {
            print_json(&workspace.get_task(&PageId::parse(&task)?).await?)
        }
        Command::SetStatus { task, status } => print_json(
            &workspace
                .update_task_status(&PageId::parse(&task)?, &status)
                .await?,
        ),
        Command::Assign { task, person } => print_json(
            &workspace
                .assign_task(&PageId::parse(&task)?, &UserId::parse(&person)?)
                .await?,
        ),
        Command::Append { page, text } => {
            let blocks = text.iter().map(|line| BlockDraft::paragraph(line)).collect();
            let report = workspace
                .append_page_content(&PageId::parse(&page)?, blocks)
                .await?;
            print_json(&serde_json::json!({
                "applied": report.applied,
                "created": report.created,
            }))
        }
        Command::People { limit } => print_json(&workspace.list_people(limit).await?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = WorkspaceConfig::resolve(&cli)?;
    let workspace = connect(&config)?;

    if let Err(e) = run(cli.command, &config, &workspace).await {
        let kind = e
            .downcast_ref::<notion_agent::AppError>()
            .map(|app| format!("{:?}", app.kind()));
        log::error!("{:#}", e);
        eprintln!(
            "{}",
            serde_json::json!({ "error": format!("{:#}", e), "kind": kind })
        );
        std::process::exit(1);
    }

    Ok(())
}
