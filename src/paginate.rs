//! Offset pagination over the `events` collection.

use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use serde_json::{json, Value};

use crate::client::{GraphQlClient, GraphQlReply, QueryError};
use crate::event::Event;

/// Query for one page of events of a single type, ordered by the stable
/// ascending ledger key so concatenated pages preserve retrieval order.
const EVENTS_QUERY: &str = r#"
query EventsByType($event_type: String!, $limit: Int!, $offset: Int!) {
  events(
    where: { indexed_type: { _eq: $event_type } },
    limit: $limit,
    offset: $offset,
    order_by: { transaction_version: asc }
  ) {
    data
    indexed_type
    transaction_version
    transaction_block_height
  }
}
"#;

/// Seam between the pagination loop and the wire, so every termination path
/// can be driven by scripted replies instead of a live endpoint.
#[async_trait]
pub trait QueryExecutor {
    /// Run one query cycle and decode the reply envelope.
    async fn execute(&self, query: &str, variables: Value) -> Result<GraphQlReply, QueryError>;
}

#[async_trait]
impl QueryExecutor for GraphQlClient {
    async fn execute(&self, query: &str, variables: Value) -> Result<GraphQlReply, QueryError> {
        GraphQlClient::execute(self, query, variables).await
    }
}

/// Pagination inputs. The indexer caps `limit` at 100 per page.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Full event type signature used as the equality filter.
    pub event_type: String,
    /// Records requested per page.
    pub limit: u32,
    /// Pause between page requests, to stay under upstream rate limits.
    pub delay: Duration,
}

/// Fetch every event of `opts.event_type`, page by page.
///
/// The offset walks 0, limit, 2*limit, ... and the loop stops on the first
/// of: a reply carrying GraphQL errors, a reply without a data object, an
/// empty page, a short page, or a transport/decode failure. Everything
/// accumulated before the stop is returned; a truncated fetch is logged as
/// a warning, never surfaced as an error.
pub async fn fetch_all_events(executor: &impl QueryExecutor, opts: &FetchOptions) -> Vec<Event> {
    let mut all_events: Vec<Event> = Vec::new();
    let mut offset: u64 = 0;
    let mut page: u32 = 1;

    info!(
        "fetching all '{}' events (limit {}, delay {:?})",
        opts.event_type, opts.limit, opts.delay
    );
    loop {
        let variables = json!({
            "event_type": opts.event_type,
            "limit": opts.limit,
            "offset": offset,
        });
        info!("fetching page {page} (offset {offset})");
        let reply = match executor.execute(EVENTS_QUERY, variables).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    "page {page} failed ({e}); keeping the {} events fetched so far",
                    all_events.len()
                );
                break;
            }
        };
        if let Some(errors) = reply.errors {
            warn!(
                "graphql errors on page {page} ({}); keeping the {} events fetched so far",
                Value::Array(errors),
                all_events.len()
            );
            break;
        }
        let Some(data) = reply.data else {
            warn!("reply on page {page} carried no data object; stopping");
            break;
        };
        let records = data.get("events").cloned().unwrap_or(Value::Array(vec![]));
        let events: Vec<Event> = match serde_json::from_value(records) {
            Ok(events) => events,
            Err(e) => {
                warn!(
                    "page {page} did not decode as an event list ({e}); keeping the {} events fetched so far",
                    all_events.len()
                );
                break;
            }
        };
        if events.is_empty() {
            info!("no events on page {page}; end of data");
            break;
        }
        let fetched = events.len();
        all_events.extend(events);
        info!("retrieved {fetched} events (total {})", all_events.len());
        if fetched < opts.limit as usize {
            info!("short page ({fetched} < {}); end of data", opts.limit);
            break;
        }
        offset += u64::from(opts.limit);
        page += 1;
        if !opts.delay.is_zero() {
            tokio::time::sleep(opts.delay).await;
        }
    }
    info!(
        "fetch complete: {} '{}' events",
        all_events.len(),
        opts.event_type
    );
    all_events
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Executor that replays a script of replies and records the offsets
    /// it was asked for.
    struct ScriptedExecutor {
        script: Mutex<Vec<Result<GraphQlReply, QueryError>>>,
        offsets: Mutex<Vec<u64>>,
    }

    impl ScriptedExecutor {
        fn new(script: Vec<Result<GraphQlReply, QueryError>>) -> Self {
            Self {
                script: Mutex::new(script),
                offsets: Mutex::new(Vec::new()),
            }
        }

        fn offsets(&self) -> Vec<u64> {
            self.offsets.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryExecutor for ScriptedExecutor {
        async fn execute(
            &self,
            _query: &str,
            variables: Value,
        ) -> Result<GraphQlReply, QueryError> {
            self.offsets
                .lock()
                .unwrap()
                .push(variables["offset"].as_u64().unwrap());
            let mut script = self.script.lock().unwrap();
            assert!(!script.is_empty(), "executor called more often than scripted");
            script.remove(0)
        }
    }

    fn mint(user: &str, amount: &str) -> Value {
        json!({"data": {"user": user, "amount": amount}})
    }

    fn page(events: Vec<Value>) -> Result<GraphQlReply, QueryError> {
        Ok(GraphQlReply {
            data: Some(json!({ "events": events })),
            errors: None,
        })
    }

    fn decode_failure() -> Result<GraphQlReply, QueryError> {
        Err(QueryError::Decode(
            serde_json::from_str::<Value>("{").unwrap_err(),
        ))
    }

    fn opts(limit: u32) -> FetchOptions {
        FetchOptions {
            event_type: "0x1::m::E".into(),
            limit,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn walks_pages_until_short_page() {
        let full =
            |n: usize| -> Vec<Value> { (0..n).map(|i| mint("0xA", &i.to_string())).collect() };
        let exec = ScriptedExecutor::new(vec![page(full(100)), page(full(100)), page(full(40))]);
        let events = fetch_all_events(&exec, &opts(100)).await;
        assert_eq!(events.len(), 240);
        assert_eq!(exec.offsets(), vec![0, 100, 200]);
    }

    #[tokio::test]
    async fn preserves_retrieval_order() {
        let exec = ScriptedExecutor::new(vec![
            page(vec![mint("0xA", "1"), mint("0xB", "2")]),
            page(vec![mint("0xC", "3")]),
        ]);
        let events = fetch_all_events(&exec, &opts(2)).await;
        let amounts: Vec<String> = events
            .iter()
            .filter_map(|ev| ev.payload().and_then(|p| p.amount))
            .collect();
        assert_eq!(amounts, ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn empty_first_page_returns_empty_set() {
        let exec = ScriptedExecutor::new(vec![page(vec![])]);
        let events = fetch_all_events(&exec, &opts(100)).await;
        assert!(events.is_empty());
        assert_eq!(exec.offsets(), vec![0]);
    }

    #[tokio::test]
    async fn graphql_errors_keep_partial_result() {
        let exec = ScriptedExecutor::new(vec![
            page(vec![mint("0xA", "1"), mint("0xA", "2")]),
            Ok(GraphQlReply {
                data: None,
                errors: Some(vec![json!({"message": "rate limited"})]),
            }),
        ]);
        let events = fetch_all_events(&exec, &opts(2)).await;
        assert_eq!(events.len(), 2);
        assert_eq!(exec.offsets(), vec![0, 2]);
    }

    #[tokio::test]
    async fn executor_failure_keeps_partial_result() {
        let exec = ScriptedExecutor::new(vec![
            page(vec![mint("0xA", "1"), mint("0xA", "2")]),
            decode_failure(),
        ]);
        let events = fetch_all_events(&exec, &opts(2)).await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn missing_data_object_stops_pagination() {
        let exec = ScriptedExecutor::new(vec![Ok(GraphQlReply {
            data: None,
            errors: None,
        })]);
        let events = fetch_all_events(&exec, &opts(100)).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn malformed_event_list_keeps_partial_result() {
        let exec = ScriptedExecutor::new(vec![
            page(vec![mint("0xA", "1"), mint("0xA", "2")]),
            Ok(GraphQlReply {
                data: Some(json!({ "events": [42] })),
                errors: None,
            }),
        ]);
        let events = fetch_all_events(&exec, &opts(2)).await;
        assert_eq!(events.len(), 2);
    }
}
