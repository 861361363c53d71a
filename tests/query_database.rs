// tests/query_database.rs
//! Database queries end to end against a scripted two-page service.

mod common;

use common::*;
use notion_agent::{
    DatabaseQuery, ErrorKind, FilterExpression, NotionWorkspace, PageSize, QueryTranslator,
    SortSpec,
};
use pretty_assertions::assert_eq;
use reqwest::Method;
use serde_json::json;

fn two_page_service() -> std::sync::Arc<ScriptedBackend> {
    ScriptedBackend::new(vec![
        ok(fixture("query_page_1.json")),
        ok(fixture("query_page_2.json")),
    ])
}

#[tokio::test]
async fn query_drains_every_page_in_service_order() {
    let backend = two_page_service();
    let workspace = NotionWorkspace::new(transport(backend.clone()));

    let filter = FilterExpression::status_equals("Status", "Done");
    let sorts = vec![SortSpec::ascending("Due")];
    let pages = workspace
        .query_database(&database(), Some(filter.clone()), sorts.clone(), None)
        .await
        .unwrap();

    let titles: Vec<String> = pages.iter().map(|page| page.title()).collect();
    assert_eq!(titles, vec!["Write release notes", "Tag v1.2", "Announce"]);

    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    for call in &calls {
        assert_eq!(call.method, Method::POST);
        assert_eq!(call.path, "databases/d9824bdc-8445-4327-be8b-5b47500af6ce/query");
        assert!(call.idempotent);
    }

    let first = calls[0].body.clone().unwrap();
    assert_eq!(
        first,
        json!({
            "filter": { "property": "Status", "status": { "equals": "Done" } },
            "sorts": [{ "property": "Due", "direction": "ascending" }],
            "page_size": 100
        })
    );
    assert_eq!(FilterExpression::from_wire(&first["filter"]).unwrap(), filter);
    assert_eq!(SortSpec::from_wire(&first["sorts"][0]).unwrap(), sorts[0]);

    let second = calls[1].body.clone().unwrap();
    assert_eq!(second["start_cursor"], "c1");
    assert_eq!(second["filter"], first["filter"]);
    assert_eq!(second["sorts"], first["sorts"]);
}

#[tokio::test]
async fn paginator_stops_when_the_cursor_runs_out() {
    let backend = two_page_service();
    let translator = QueryTranslator::new(transport(backend.clone()));
    let mut pages = translator
        .run(DatabaseQuery::new(database()).page_size(PageSize::new(2).unwrap()))
        .unwrap();

    let mut seen = 0;
    while let Some(page) = pages.next().await {
        page.unwrap();
        seen += 1;
    }
    assert_eq!(seen, 3);
    assert_eq!(pages.pages_fetched(), 2);
    assert!(pages.next().await.is_none());
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn partial_reads_fetch_only_what_is_needed() {
    let backend = two_page_service();
    let translator = QueryTranslator::new(transport(backend.clone()));
    let first_two = translator
        .run(DatabaseQuery::new(database()))
        .unwrap()
        .collect_up_to(2)
        .await
        .unwrap();
    assert_eq!(first_two.len(), 2);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn invalid_filters_never_reach_the_network() {
    let backend = ScriptedBackend::new(vec![]);
    let workspace = NotionWorkspace::new(transport(backend.clone()));

    let deep = FilterExpression::and(vec![FilterExpression::or(vec![FilterExpression::and(
        vec![FilterExpression::status_equals("Status", "Done")],
    )])]);
    let err = workspace
        .query_database(&database(), Some(deep), Vec::new(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let empty = FilterExpression::or(Vec::new());
    let err = workspace
        .query_database(&database(), Some(empty), Vec::new(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(backend.call_count(), 0);
}

#[test]
fn wire_filters_round_trip_through_the_parser() {
    let filters = vec![
        json!({ "property": "Due", "date": { "on_or_before": "2024-06-01" } }),
        json!({ "property": "Estimate", "number": { "greater_than": 3.0 } }),
        json!({ "property": "Blocked", "checkbox": { "equals": true } }),
        json!({ "property": "Owner", "people": { "is_empty": true } }),
        json!({ "property": "Due", "date": { "next_week": {} } }),
        json!({ "or": [
            { "property": "Status", "status": { "equals": "Doing" } },
            { "and": [
                { "property": "Tags", "multi_select": { "contains": "urgent" } },
                { "property": "Title", "title": { "starts_with": "Fix" } }
            ] }
        ] }),
    ];
    for wire in filters {
        let parsed = FilterExpression::from_wire(&wire).unwrap();
        assert_eq!(parsed.to_wire(), wire);
    }
}

#[test]
fn unsupported_wire_filters_are_rejected() {
    let rejected = vec![
        json!({ "property": "Done", "checkbox": { "contains": "x" } }),
        json!({ "property": "Estimate", "number": { "equals": "three" } }),
        json!({ "and": [] }),
        json!({ "property": "Status" }),
        json!({ "and": [{ "or": [{ "and": [
            { "property": "Status", "status": { "equals": "Done" } }
        ] }] }] }),
    ];
    for wire in rejected {
        assert!(FilterExpression::from_wire(&wire).is_err(), "accepted {}", wire);
    }
}
