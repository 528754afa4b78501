//! End-to-end tests of the SQL agent over an in-memory data source.
//!
//! Run with:
//!   cargo test -p tabula-agent --test agent

mod common;

use common::{MockSource, agent_config, cached_agent, scope};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tabula_agent::{
    AgentError, CacheBackend, CacheKey, SAMPLE_ROWS_PLACEHOLDER, SqlAgent, Toolkit,
};
use tabula_core::{AgentConfig, TenantScope};

const ORDERS_INFO: &str = "Table named `orders`\n\n\
/* Sample with first 3 rows from table shop.orders:\n\
id\tstatus\n\
1\ta\n\
2\tb\n\
*/\n\
Column data types: `id` : `integer`,\t`status` : `text`\n";

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// USABLE TABLES
// =============================================================================

#[tokio::test]
async fn test_discovery_filters_system_and_ignored_tables() {
    let source = Arc::new(MockSource::shop());
    let (agent, _cache) = cached_agent(source.clone(), agent_config());

    let tables = agent.usable_tables(&scope()).await.unwrap();
    assert_eq!(
        tables,
        names(&["shop.broken", "shop.customers", "shop.events", "shop.orders"])
    );
    assert_eq!(source.execute_calls(), 2);
    assert!(source.executed_sql()[0].starts_with("SHOW DATABASES"));
}

#[tokio::test]
async fn test_usable_tables_are_cached_per_tenant() {
    let source = Arc::new(MockSource::shop());
    let (agent, _cache) = cached_agent(source.clone(), agent_config());
    let other = TenantScope::new("globex", common::DATABASE);

    agent.usable_tables(&scope()).await.unwrap();
    assert_eq!(source.execute_calls(), 2);

    agent.usable_tables(&scope()).await.unwrap();
    assert_eq!(source.execute_calls(), 2);

    agent.usable_tables(&other).await.unwrap();
    assert_eq!(source.execute_calls(), 4);
}

#[tokio::test]
async fn test_include_list_is_authoritative() {
    let source = Arc::new(MockSource::shop());
    let config = AgentConfig {
        include_tables: names(&["shop.orders", "shop.customers"]),
        ignore_tables: names(&["shop.orders"]),
        ..agent_config()
    };
    let (agent, cache) = cached_agent(source.clone(), config);

    let tables = agent.usable_tables(&scope()).await.unwrap();
    assert_eq!(tables, names(&["shop.orders", "shop.customers"]));
    assert_eq!(source.execute_calls(), 0);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_enumeration_failure_is_skipped() {
    let mut source = MockSource::shop();
    source.failing_databases = names(&["shop"]);
    let source = Arc::new(source);
    let (agent, _cache) = cached_agent(source.clone(), agent_config());

    let tables = agent.usable_tables(&scope()).await.unwrap();
    assert!(tables.is_empty());
    assert_eq!(agent.usable_tables_safe(&scope()).await, "");

    // An empty listing is not served from cache.
    agent.usable_tables(&scope()).await.unwrap();
    assert_eq!(source.execute_calls(), 6);
}

// =============================================================================
// TABLE INFO
// =============================================================================

#[tokio::test]
async fn test_table_info_resolves_llm_quoted_names() {
    let source = Arc::new(MockSource::shop());
    let (agent, _cache) = cached_agent(source.clone(), agent_config());

    let info = agent
        .table_info(&scope(), Some(&names(&["`Orders`\n"])))
        .await
        .unwrap();
    assert_eq!(info, ORDERS_INFO);
    assert!(
        source
            .executed_sql()
            .contains(&"SELECT \"id\", \"status\" FROM \"shop\".\"orders\" LIMIT 3".to_string())
    );
}

#[tokio::test]
async fn test_table_info_in_requested_order() {
    let source = Arc::new(MockSource::shop());
    let (agent, _cache) = cached_agent(source, agent_config());

    let info = agent
        .table_info(&scope(), Some(&names(&["orders", "shop.customers"])))
        .await
        .unwrap();
    let (first, second) = info.split_once("\n\nTable named").unwrap();
    assert_eq!(first, ORDERS_INFO);
    assert!(second.starts_with(" `customers`"));
    assert!(second.contains("1\tAda"));
}

#[tokio::test]
async fn test_table_info_cache_hit_ignores_request_order() {
    let source = Arc::new(MockSource::shop());
    let (agent, _cache) = cached_agent(source.clone(), agent_config());

    agent
        .table_info(&scope(), Some(&names(&["orders", "customers"])))
        .await
        .unwrap();
    let executed = source.execute_calls();
    assert_eq!(source.column_calls(), 2);

    let info = agent
        .table_info(&scope(), Some(&names(&["customers", "`orders`"])))
        .await
        .unwrap();
    assert_eq!(source.execute_calls(), executed);
    assert_eq!(source.column_calls(), 2);
    assert!(info.starts_with("Table named `customers`"));
}

#[tokio::test]
async fn test_partial_cache_entry_triggers_full_refetch() {
    let source = Arc::new(MockSource::shop());
    let (agent, cache) = cached_agent(source.clone(), agent_config());

    let requested = names(&["orders", "customers"]);
    let key = CacheKey::table_info(&scope(), Some(requested.as_slice()));
    cache
        .set(&key, json!({ "orders": "stale description" }))
        .await
        .unwrap();

    let info = agent.table_info(&scope(), Some(&requested)).await.unwrap();
    assert!(!info.contains("stale description"));
    assert!(info.contains("Table named `orders`"));
    assert!(info.contains("Table named `customers`"));
    assert_eq!(source.column_calls(), 2);

    // The refreshed value replaced the partial one.
    let cached = cache.get(&key).await.unwrap().unwrap();
    assert_eq!(cached.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_table_info_for_all_tables() {
    let source = Arc::new(MockSource::shop());
    let (agent, _cache) = cached_agent(source.clone(), agent_config());

    let info = agent.table_info(&scope(), None).await.unwrap();
    for table in ["broken", "customers", "events", "orders"] {
        assert!(info.contains(&format!("Table named `{table}`")), "missing {table}");
    }
    assert!(!info.contains("audit_log"));
    assert_eq!(source.column_calls(), 4);
}

#[tokio::test]
async fn test_unknown_table_is_reported_by_name() {
    let source = Arc::new(MockSource::shop());
    let (agent, _cache) = cached_agent(source.clone(), agent_config());

    let err = agent
        .table_info(&scope(), Some(&names(&["orders", "'refunds'"])))
        .await
        .unwrap_err();
    assert!(matches!(&err, AgentError::NotFound(name) if name == "refunds"));

    let text = agent
        .table_info_safe(&scope(), Some(&names(&["refunds"])))
        .await;
    assert_eq!(text, "Error: Table refunds not found in database");
    assert_eq!(source.column_calls(), 0);
}

#[tokio::test]
async fn test_sampling_failure_yields_placeholder() {
    let source = Arc::new(MockSource::shop());
    let (agent, _cache) = cached_agent(source, agent_config());

    let text = agent
        .table_info_safe(&scope(), Some(&names(&["broken"])))
        .await;
    assert!(!text.starts_with("Error:"));
    assert!(text.contains("Table named `broken`"));
    assert!(text.contains(SAMPLE_ROWS_PLACEHOLDER));
}

#[tokio::test]
async fn test_unqualified_include_entry_needs_database() {
    let source = Arc::new(MockSource::shop());
    let config = AgentConfig {
        include_tables: names(&["orders"]),
        ..agent_config()
    };
    let (agent, _cache) = cached_agent(source, config);

    let text = agent
        .table_info_safe(&scope(), Some(&names(&["orders"])))
        .await;
    assert_eq!(text, "Error: Database is required for table: orders");
}

// =============================================================================
// QUERY
// =============================================================================

#[tokio::test]
async fn test_query_fetch_one() {
    let source = Arc::new(MockSource::shop());
    let agent = SqlAgent::new(agent_config(), source.clone(), source);

    let text = agent
        .query(&scope(), "SELECT id, status FROM orders", "one")
        .await
        .unwrap();
    assert_eq!(text, "1\ta");
}

#[tokio::test]
async fn test_query_fetch_one_on_empty_result() {
    let source = Arc::new(MockSource::shop());
    let agent = SqlAgent::new(agent_config(), source.clone(), source);

    let text = agent
        .query(&scope(), "SELECT * FROM audit_log", "one")
        .await
        .unwrap();
    assert_eq!(text, "");
}

#[tokio::test]
async fn test_query_bad_fetch_mode_runs_nothing() {
    let source = Arc::new(MockSource::shop());
    let agent = SqlAgent::new(agent_config(), source.clone(), source.clone());

    let err = agent
        .query(&scope(), "SELECT * FROM orders", "bogus")
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::InvalidArgument(_)));
    assert_eq!(source.execute_calls(), 0);
}

#[tokio::test]
async fn test_query_all_small_result() {
    let source = Arc::new(MockSource::shop());
    let agent = SqlAgent::new(agent_config(), source.clone(), source);

    let text = agent
        .query(&scope(), "```sql\nSELECT * FROM orders\n```", "all")
        .await
        .unwrap();
    assert_eq!(
        text,
        "Output columns: 'id', 'status'\nResult:\n1\ta\n2\tb"
    );
}

#[tokio::test]
async fn test_query_large_result_is_summarized() {
    let source = Arc::new(MockSource::shop());
    let agent = SqlAgent::new(agent_config(), source.clone(), source);

    let text = agent
        .query(&scope(), "SELECT * FROM events", "all")
        .await
        .unwrap();
    let (head, rows) = text.split_once("First 30 rows:\n").unwrap();
    assert!(head.starts_with("Output columns: 'id', 'kind'\nResult has 40 rows."));
    assert!(head.contains("unique\tNaN\t2"));
    assert!(head.contains("mean\t20.5\tNaN"));
    assert_eq!(rows.lines().count(), 30);
    assert!(rows.lines().all(|line| line.split('\t').count() == 2));
}

#[tokio::test]
async fn test_query_outside_allow_list_is_rejected() {
    let source = Arc::new(MockSource::shop());
    let config = AgentConfig {
        include_tables: names(&["shop.orders", "shop.customers"]),
        ..agent_config()
    };
    let agent = SqlAgent::new(config, source.clone(), source.clone());

    let text = agent
        .query_safe(
            &scope(),
            "SELECT * FROM orders o JOIN shop.events e ON e.id = o.id",
            "all",
        )
        .await;
    assert_eq!(
        text,
        "Error: Table shop.events not found. Available tables: shop.orders, shop.customers"
    );
    assert_eq!(source.execute_calls(), 0);

    let text = agent.query_safe(&scope(), "SELECT * FROM orders", "one").await;
    assert_eq!(text, "1\ta");
}

#[tokio::test]
async fn test_query_safe_reports_execution_errors() {
    let source = Arc::new(MockSource::shop());
    let agent = SqlAgent::new(agent_config(), source.clone(), source);

    let text = agent.query_safe(&scope(), "SELECT * FROM refunds", "all").await;
    assert_eq!(
        text,
        "Error: execution failed: relation \"refunds\" does not exist"
    );

    let text = agent.query_safe(&scope(), "SELEKT nothing", "all").await;
    assert!(text.starts_with("Error: failed to parse SQL"));
}

// =============================================================================
// TOOLS
// =============================================================================

#[tokio::test]
async fn test_toolkit_dispatch() {
    let source = Arc::new(MockSource::shop());
    let (agent, _cache) = cached_agent(source, agent_config());
    let toolkit = Toolkit::new(Arc::new(agent), scope());

    assert_eq!(toolkit.definitions().len(), 3);

    let response = toolkit.call("sql_db_list_tables", json!({})).await;
    assert_eq!(response.is_error, None);
    assert_eq!(
        response.as_text(),
        "shop.broken, shop.customers, shop.events, shop.orders"
    );

    let response = toolkit
        .call("sql_db_schema", json!({ "tables": "`orders`" }))
        .await;
    assert_eq!(response.as_text(), ORDERS_INFO);

    let response = toolkit
        .call("sql_db_query", json!({ "query": "SELECT * FROM orders", "fetch": "one" }))
        .await;
    assert_eq!(response.as_text(), "1\ta");
}

#[tokio::test]
async fn test_toolkit_errors_are_text() {
    let source = Arc::new(MockSource::shop());
    let agent = SqlAgent::new(agent_config(), source.clone(), source);
    let toolkit = Toolkit::new(Arc::new(agent), scope());

    let response = toolkit
        .call("sql_db_query", json!({ "query": "SELECT 1", "fetch": "many" }))
        .await;
    assert_eq!(response.is_error, Some(true));
    assert!(response.as_text().starts_with("Error: invalid argument"));

    let response = toolkit.call("sql_db_drop", json!({})).await;
    assert_eq!(response.is_error, Some(true));
    assert_eq!(response.as_text(), "Error: invalid argument: unknown tool: sql_db_drop");

    let response = toolkit.call("sql_db_query", json!({ "sql": "SELECT 1" })).await;
    assert_eq!(response.is_error, Some(true));
}
