//! End-to-end facade behavior against an in-process stub provider:
//! batching, retries, circuit breaking, validation short-circuits and the
//! per-operation transport fallback.

use async_trait::async_trait;
use serde_json::Map;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use worklink::provider::{FallbackResolver, Provider, ProviderHandle, ProviderHealth, ProviderKind};
use worklink::resilience::{CircuitBreakerConfig, RetryConfig};
use worklink::types::*;
use worklink::{ClientBuilder, Error, Result, WorkLinkClient};

fn work_item(id: u32) -> WorkItem {
    WorkItem {
        id,
        rev: Some(1),
        fields: Map::new(),
        url: None,
        relations: None,
    }
}

/// Scriptable provider. Operations not exercised by a test return a
/// runtime error so misrouted calls fail loudly.
#[derive(Default)]
struct StubProvider {
    /// Errors handed out by `get_work_item` before it starts succeeding.
    get_errors: Mutex<VecDeque<Error>>,
    get_calls: AtomicU32,
    create_calls: AtomicU32,
    /// Id chunks seen by `get_work_items`, in arrival order.
    batches: Mutex<Vec<Vec<u32>>>,
    /// Whether the wiki surface is covered by this stub.
    wiki_covered: bool,
}

impl StubProvider {
    fn with_get_errors(errors: Vec<Error>) -> Self {
        Self {
            get_errors: Mutex::new(errors.into()),
            ..Self::default()
        }
    }

    fn with_wiki_coverage() -> Self {
        Self {
            wiki_covered: true,
            ..Self::default()
        }
    }

    fn not_stubbed(&self, op: &str) -> Error {
        Error::runtime(format!("operation {op} not scripted for this test"))
    }
}

#[async_trait]
impl Provider for StubProvider {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn health(&self) -> ProviderHealth {
        ProviderHealth {
            healthy: true,
            last_check: std::time::SystemTime::now(),
            last_error: None,
        }
    }

    async fn create_work_item(&self, _payload: CreateWorkItemPayload) -> Result<WorkItem> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(work_item(1))
    }

    async fn get_work_item(&self, id: u32, _fields: Option<Vec<String>>) -> Result<WorkItem> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.get_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(work_item(id))
    }

    async fn update_work_item(&self, id: u32, _payload: UpdateWorkItemPayload) -> Result<WorkItem> {
        Ok(work_item(id))
    }

    async fn delete_work_item(&self, _id: u32) -> Result<()> {
        Ok(())
    }

    async fn get_work_items(
        &self,
        ids: Vec<u32>,
        _fields: Option<Vec<String>>,
    ) -> Result<Vec<WorkItem>> {
        self.batches.lock().unwrap().push(ids.clone());
        Ok(ids.into_iter().map(work_item).collect())
    }

    async fn add_work_item_relation(&self, payload: AddRelationPayload) -> Result<WorkItem> {
        Ok(work_item(payload.work_item_id))
    }

    async fn execute_wiql(&self, _query: WiqlQuery) -> Result<WiqlResult> {
        Ok(WiqlResult {
            query_type: Some("flat".to_string()),
            as_of: None,
            work_items: vec![
                WiqlWorkItemReference { id: 7, url: None },
                WiqlWorkItemReference { id: 3, url: None },
            ],
            columns: None,
        })
    }

    async fn list_boards(&self) -> Result<BoardsList> {
        Err(self.not_stubbed("list_boards"))
    }

    async fn get_board(&self, _board_id: String) -> Result<Board> {
        Err(self.not_stubbed("get_board"))
    }

    async fn update_board_settings(
        &self,
        _board_id: String,
        _settings: BoardSettings,
    ) -> Result<Board> {
        Err(self.not_stubbed("update_board_settings"))
    }

    async fn list_iterations(&self, _team: Option<String>) -> Result<Vec<TeamIteration>> {
        Err(self.not_stubbed("list_iterations"))
    }

    async fn get_iteration(
        &self,
        _iteration_id: String,
        _team: Option<String>,
    ) -> Result<TeamIteration> {
        Err(self.not_stubbed("get_iteration"))
    }

    async fn create_iteration(
        &self,
        _payload: CreateIterationPayload,
        _team: Option<String>,
    ) -> Result<TeamIteration> {
        Err(self.not_stubbed("create_iteration"))
    }

    async fn delete_iteration(&self, _iteration_id: String, _team: Option<String>) -> Result<()> {
        Err(self.not_stubbed("delete_iteration"))
    }

    async fn iteration_work_items(
        &self,
        _iteration_id: String,
        _team: Option<String>,
    ) -> Result<IterationWorkItems> {
        Err(self.not_stubbed("iteration_work_items"))
    }

    async fn iteration_capacities(
        &self,
        _iteration_id: String,
        _team: Option<String>,
    ) -> Result<Vec<IterationCapacity>> {
        Err(self.not_stubbed("iteration_capacities"))
    }

    async fn list_pull_requests(
        &self,
        _repository: String,
        _status: Option<String>,
    ) -> Result<PullRequestList> {
        Err(self.not_stubbed("list_pull_requests"))
    }

    async fn get_pull_request(&self, _repository: String, _id: u32) -> Result<PullRequest> {
        Err(self.not_stubbed("get_pull_request"))
    }

    async fn create_pull_request(
        &self,
        _repository: String,
        _payload: CreatePullRequestPayload,
    ) -> Result<PullRequest> {
        Err(self.not_stubbed("create_pull_request"))
    }

    async fn update_pull_request(
        &self,
        _repository: String,
        _id: u32,
        _payload: UpdatePullRequestPayload,
    ) -> Result<PullRequest> {
        Err(self.not_stubbed("update_pull_request"))
    }

    async fn list_repositories(&self) -> Result<RepositoryList> {
        Err(self.not_stubbed("list_repositories"))
    }

    async fn get_repository(&self, _repository: String) -> Result<GitRepository> {
        Err(self.not_stubbed("get_repository"))
    }

    async fn list_teams(&self) -> Result<TeamsList> {
        Err(self.not_stubbed("list_teams"))
    }

    async fn get_team(&self, _team_id: String) -> Result<Team> {
        Err(self.not_stubbed("get_team"))
    }

    async fn list_team_members(&self, _team_id: String) -> Result<TeamMembers> {
        Err(self.not_stubbed("list_team_members"))
    }

    async fn list_wikis(&self) -> Result<WikiList> {
        if !self.wiki_covered {
            return Err(Error::unsupported("list_wikis", ProviderKind::Sdk));
        }
        Ok(WikiList {
            count: 1,
            value: vec![Wiki {
                id: "w1".to_string(),
                name: "Main".to_string(),
                wiki_type: Some("projectWiki".to_string()),
                project_id: None,
                repository_id: None,
                url: None,
                remote_url: None,
            }],
        })
    }

    async fn get_wiki(&self, _wiki: String) -> Result<Wiki> {
        Err(self.not_stubbed("get_wiki"))
    }

    async fn create_wiki(&self, _payload: CreateWikiPayload) -> Result<Wiki> {
        Err(self.not_stubbed("create_wiki"))
    }

    async fn delete_wiki(&self, _wiki: String) -> Result<()> {
        Err(self.not_stubbed("delete_wiki"))
    }

    async fn list_wiki_pages(&self, _wiki: String, _path: Option<String>) -> Result<Vec<WikiPage>> {
        Err(self.not_stubbed("list_wiki_pages"))
    }

    async fn get_wiki_page(
        &self,
        _wiki: String,
        _path: String,
        _include_content: bool,
    ) -> Result<WikiPage> {
        Err(self.not_stubbed("get_wiki_page"))
    }

    async fn create_wiki_page(
        &self,
        _wiki: String,
        _path: String,
        _payload: WikiPagePayload,
    ) -> Result<WikiPage> {
        Err(self.not_stubbed("create_wiki_page"))
    }

    async fn update_wiki_page(
        &self,
        _wiki: String,
        _path: String,
        _payload: WikiPagePayload,
    ) -> Result<WikiPage> {
        Err(self.not_stubbed("update_wiki_page"))
    }

    async fn delete_wiki_page(&self, _wiki: String, _path: String) -> Result<()> {
        Err(self.not_stubbed("delete_wiki_page"))
    }
}

async fn client_over(stub: Arc<StubProvider>) -> WorkLinkClient {
    ClientBuilder::new()
        .with_provider(ProviderHandle::new(ProviderKind::Sdk, stub))
        .with_retry(RetryConfig::new().with_base_delay(Duration::from_millis(1)))
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn batch_fetch_chunks_sequentially_and_preserves_order() {
    let stub = Arc::new(StubProvider::default());
    let client = client_over(stub.clone()).await;

    let ids: Vec<u32> = (1..=450).collect();
    let items = client.work_items().get_batch(ids.clone(), None).await.unwrap();

    let batches = stub.batches.lock().unwrap().clone();
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].len(), 200);
    assert_eq!(batches[1].len(), 200);
    assert_eq!(batches[2].len(), 50);

    let returned: Vec<u32> = items.iter().map(|i| i.id).collect();
    assert_eq!(returned, ids);

    let metrics = client.telemetry();
    assert_eq!(metrics.by_operation.get("get_work_items"), Some(&3));
}

#[tokio::test]
async fn empty_batch_skips_the_provider() {
    let stub = Arc::new(StubProvider::default());
    let client = client_over(stub.clone()).await;

    let items = client.work_items().get_batch(Vec::new(), None).await.unwrap();
    assert!(items.is_empty());
    assert!(stub.batches.lock().unwrap().is_empty());
    assert_eq!(client.telemetry().total_requests, 0);
}

#[tokio::test]
async fn transient_failures_are_retried_to_success() {
    let stub = Arc::new(StubProvider::with_get_errors(vec![
        Error::from_status(503, "busy"),
        Error::from_status(429, "throttled"),
    ]));
    let client = client_over(stub.clone()).await;

    let item = client.work_items().get(42, None).await.unwrap();
    assert_eq!(item.id, 42);
    assert_eq!(stub.get_calls.load(Ordering::SeqCst), 3);

    let metrics = client.telemetry();
    assert_eq!(metrics.total_requests, 1);
    assert_eq!(metrics.successful_requests, 1);
}

#[tokio::test]
async fn deterministic_failures_are_not_retried() {
    let stub = Arc::new(StubProvider::with_get_errors(vec![Error::from_status(
        404, "gone",
    )]));
    let client = client_over(stub.clone()).await;

    let err = client.work_items().get(42, None).await.unwrap_err();
    assert!(matches!(err, Error::Remote { status: 404, .. }));
    assert_eq!(stub.get_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_payload_never_reaches_the_provider() {
    let stub = Arc::new(StubProvider::default());
    let client = client_over(stub.clone()).await;

    // Missing System.Title.
    let payload = CreateWorkItemPayload::new("Bug", Map::new());
    let err = client.work_items().create(payload).await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    assert_eq!(stub.create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(client.telemetry().total_requests, 0);
}

#[tokio::test]
async fn circuit_opens_after_threshold_and_rejects_fast() {
    let stub = Arc::new(StubProvider::with_get_errors(vec![
        Error::from_status(500, "boom"),
        Error::from_status(500, "boom"),
    ]));
    let client = ClientBuilder::new()
        .with_provider(ProviderHandle::new(ProviderKind::Sdk, stub.clone()))
        .with_retry(RetryConfig::new().with_max_attempts(1))
        .with_circuit_breaker(CircuitBreakerConfig::new().with_failure_threshold(2))
        .build()
        .await
        .unwrap();

    assert!(client.work_items().get(1, None).await.is_err());
    assert!(client.work_items().get(2, None).await.is_err());

    let err = client.work_items().get(3, None).await.unwrap_err();
    assert!(matches!(err, Error::CircuitOpen { .. }));
    // The rejected call never reached the provider.
    assert_eq!(stub.get_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unsupported_operation_falls_back_to_secondary_transport() {
    let primary = Arc::new(StubProvider::default());
    let secondary = Arc::new(StubProvider::with_wiki_coverage());
    let client = ClientBuilder::new()
        .with_provider(ProviderHandle::new(ProviderKind::Sdk, primary))
        .with_fallback(FallbackResolver::fixed(ProviderHandle::new(
            ProviderKind::Http,
            secondary,
        )))
        .build()
        .await
        .unwrap();

    let wikis = client.wiki().list().await.unwrap();
    assert_eq!(wikis.count, 1);
    assert_eq!(wikis.value[0].name, "Main");

    let records = client.telemetry_snapshot();
    assert_eq!(records.len(), 1);
    assert!(records[0].succeeded);
    assert!(records[0].fallback_used);
    assert_eq!(records[0].transport, "http");
    assert_eq!(records[0].operation, "list_wikis");
}

#[tokio::test]
async fn wiql_query_and_get_hydrates_in_result_order() {
    let stub = Arc::new(StubProvider::default());
    let client = client_over(stub.clone()).await;

    let items = client
        .wiql()
        .query_and_get(WiqlQuery::new("SELECT [System.Id] FROM WorkItems"), None)
        .await
        .unwrap();

    let ids: Vec<u32> = items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![7, 3]);
}

#[tokio::test]
async fn blank_wiql_text_is_rejected_locally() {
    let stub = Arc::new(StubProvider::default());
    let client = client_over(stub).await;

    let err = client
        .wiql()
        .query(WiqlQuery::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(client.telemetry().total_requests, 0);
}

#[tokio::test]
async fn shutdown_cancels_waiting_calls() {
    let stub = Arc::new(StubProvider::with_get_errors(vec![
        Error::from_status(503, "busy"),
        Error::from_status(503, "busy"),
    ]));
    let client = ClientBuilder::new()
        .with_provider(ProviderHandle::new(ProviderKind::Sdk, stub))
        .with_retry(RetryConfig::new().with_base_delay(Duration::from_secs(30)))
        .build()
        .await
        .unwrap();

    client.shutdown();
    // Backoff sleeps are cancellation points, so this returns promptly.
    let err = client.work_items().get(1, None).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
