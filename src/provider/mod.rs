//! Provider abstraction: the capability interface both transports implement,
//! plus the startup-fallback factory and the lazy per-operation fallback
//! resolver.

pub mod http;
pub mod sdk;

pub use http::HttpProvider;
pub use sdk::SdkProvider;

use crate::config::ClientConfig;
use crate::types::*;
use crate::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Which transport a provider handle wraps. Set once at construction, never
/// inferred from runtime types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Vendor-SDK style transport: cheap calls, partial capability coverage.
    Sdk,
    /// Direct REST transport: full coverage, heavier per-call overhead.
    Http,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Sdk => "sdk",
            ProviderKind::Http => "http",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health as reported by the provider itself; mutated only by the provider,
/// read through the client's health accessor.
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    pub healthy: bool,
    pub last_check: SystemTime,
    pub last_error: Option<String>,
}

impl Default for ProviderHealth {
    fn default() -> Self {
        Self {
            healthy: false,
            last_check: SystemTime::now(),
            last_error: None,
        }
    }
}

/// The full capability set. Transports that do not implement an operation
/// return [`crate::Error::Unsupported`], which the facades translate into
/// the per-operation fallback protocol.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn initialize(&self) -> Result<()>;
    fn is_healthy(&self) -> bool;
    fn health(&self) -> ProviderHealth;

    // Work items
    async fn create_work_item(&self, payload: CreateWorkItemPayload) -> Result<WorkItem>;
    async fn get_work_item(&self, id: u32, fields: Option<Vec<String>>) -> Result<WorkItem>;
    async fn update_work_item(&self, id: u32, payload: UpdateWorkItemPayload) -> Result<WorkItem>;
    async fn delete_work_item(&self, id: u32) -> Result<()>;
    async fn get_work_items(
        &self,
        ids: Vec<u32>,
        fields: Option<Vec<String>>,
    ) -> Result<Vec<WorkItem>>;
    async fn add_work_item_relation(&self, payload: AddRelationPayload) -> Result<WorkItem>;
    async fn execute_wiql(&self, query: WiqlQuery) -> Result<WiqlResult>;

    // Boards
    async fn list_boards(&self) -> Result<BoardsList>;
    async fn get_board(&self, board_id: String) -> Result<Board>;
    async fn update_board_settings(&self, board_id: String, settings: BoardSettings)
        -> Result<Board>;

    // Iterations
    async fn list_iterations(&self, team: Option<String>) -> Result<Vec<TeamIteration>>;
    async fn get_iteration(&self, iteration_id: String, team: Option<String>)
        -> Result<TeamIteration>;
    async fn create_iteration(
        &self,
        payload: CreateIterationPayload,
        team: Option<String>,
    ) -> Result<TeamIteration>;
    async fn delete_iteration(&self, iteration_id: String, team: Option<String>) -> Result<()>;
    async fn iteration_work_items(
        &self,
        iteration_id: String,
        team: Option<String>,
    ) -> Result<IterationWorkItems>;
    async fn iteration_capacities(
        &self,
        iteration_id: String,
        team: Option<String>,
    ) -> Result<Vec<IterationCapacity>>;

    // Pull requests
    async fn list_pull_requests(
        &self,
        repository: String,
        status: Option<String>,
    ) -> Result<PullRequestList>;
    async fn get_pull_request(&self, repository: String, id: u32) -> Result<PullRequest>;
    async fn create_pull_request(
        &self,
        repository: String,
        payload: CreatePullRequestPayload,
    ) -> Result<PullRequest>;
    async fn update_pull_request(
        &self,
        repository: String,
        id: u32,
        payload: UpdatePullRequestPayload,
    ) -> Result<PullRequest>;

    // Repositories
    async fn list_repositories(&self) -> Result<RepositoryList>;
    async fn get_repository(&self, repository: String) -> Result<GitRepository>;

    // Teams
    async fn list_teams(&self) -> Result<TeamsList>;
    async fn get_team(&self, team_id: String) -> Result<Team>;
    async fn list_team_members(&self, team_id: String) -> Result<TeamMembers>;

    // Wiki
    async fn list_wikis(&self) -> Result<WikiList>;
    async fn get_wiki(&self, wiki: String) -> Result<Wiki>;
    async fn create_wiki(&self, payload: CreateWikiPayload) -> Result<Wiki>;
    async fn delete_wiki(&self, wiki: String) -> Result<()>;
    async fn list_wiki_pages(&self, wiki: String, path: Option<String>) -> Result<Vec<WikiPage>>;
    async fn get_wiki_page(
        &self,
        wiki: String,
        path: String,
        include_content: bool,
    ) -> Result<WikiPage>;
    async fn create_wiki_page(
        &self,
        wiki: String,
        path: String,
        payload: WikiPagePayload,
    ) -> Result<WikiPage>;
    async fn update_wiki_page(
        &self,
        wiki: String,
        path: String,
        payload: WikiPagePayload,
    ) -> Result<WikiPage>;
    async fn delete_wiki_page(&self, wiki: String, path: String) -> Result<()>;
}

/// A provider paired with its transport tag.
#[derive(Clone)]
pub struct ProviderHandle {
    kind: ProviderKind,
    inner: Arc<dyn Provider>,
}

impl ProviderHandle {
    pub fn new(kind: ProviderKind, inner: Arc<dyn Provider>) -> Self {
        Self { kind, inner }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.inner
    }

    pub fn health(&self) -> ProviderHealth {
        self.inner.health()
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Construct and initialize the preferred transport.
///
/// When the SDK-style transport fails to initialize, the HTTP transport
/// becomes the active provider for the remainder of the process; no further
/// switching happens at startup level.
pub async fn create_provider(config: &ClientConfig, preferred: ProviderKind) -> Result<ProviderHandle> {
    if preferred == ProviderKind::Sdk {
        let provider = SdkProvider::new(config.clone())?;
        match provider.initialize().await {
            Ok(()) => {
                info!(transport = %ProviderKind::Sdk, "provider initialized");
                return Ok(ProviderHandle::new(ProviderKind::Sdk, Arc::new(provider)));
            }
            Err(err) => {
                warn!(error = %err, "sdk transport failed to initialize, falling back to http");
            }
        }
    }

    let provider = HttpProvider::new(config.clone())?;
    provider.initialize().await?;
    info!(transport = %ProviderKind::Http, "provider initialized");
    Ok(ProviderHandle::new(ProviderKind::Http, Arc::new(provider)))
}

enum ResolverSource {
    /// Build and initialize an HTTP transport from config on first use.
    Config(ClientConfig),
    /// Hand out a pre-built handle (embedding and tests).
    Fixed(ProviderHandle),
}

/// Lazily creates the secondary (HTTP) transport for per-operation fallback.
///
/// The instance is created at most once per client and cached for the
/// process lifetime; concurrent first callers race on initialization but a
/// single winner is stored.
pub struct FallbackResolver {
    source: ResolverSource,
    cell: OnceCell<ProviderHandle>,
}

impl FallbackResolver {
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            source: ResolverSource::Config(config),
            cell: OnceCell::new(),
        }
    }

    pub fn fixed(handle: ProviderHandle) -> Self {
        Self {
            source: ResolverSource::Fixed(handle),
            cell: OnceCell::new(),
        }
    }

    pub async fn resolve(&self) -> Result<ProviderHandle> {
        let handle = self
            .cell
            .get_or_try_init(|| async {
                match &self.source {
                    ResolverSource::Fixed(handle) => Ok::<ProviderHandle, crate::Error>(handle.clone()),
                    ResolverSource::Config(config) => {
                        let provider = HttpProvider::new(config.clone())?;
                        provider.initialize().await?;
                        info!("fallback http transport initialized");
                        Ok(ProviderHandle::new(ProviderKind::Http, Arc::new(provider)))
                    }
                }
            })
            .await?;
        Ok(handle.clone())
    }
}
