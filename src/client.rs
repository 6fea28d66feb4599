//! The client: one resilience stack, one active provider, and the
//! operation facades that share them.

use crate::api::{
    BoardsApi, IterationsApi, PullRequestsApi, RepositoriesApi, TeamsApi, WikiApi, WiqlApi,
    WorkItemsApi,
};
use crate::config::ClientConfig;
use crate::provider::{
    create_provider, FallbackResolver, ProviderHandle, ProviderHealth, ProviderKind,
};
use crate::resilience::{
    CircuitBreakerConfig, CircuitState, RateLimiterConfig, ResilienceStack, RetryConfig,
};
use crate::telemetry::{RequestOutcome, TelemetryConfig, TelemetryMetrics};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::info;

/// Point-in-time view of client health, assembled from the provider's own
/// report plus resilience state.
#[derive(Debug, Clone)]
pub struct ClientHealth {
    pub provider: ProviderHealth,
    pub transport: ProviderKind,
    pub circuit_state: CircuitState,
    pub available_tokens: u32,
}

pub struct ClientBuilder {
    config: Option<ClientConfig>,
    preferred: ProviderKind,
    retry: RetryConfig,
    circuit: CircuitBreakerConfig,
    rate: RateLimiterConfig,
    telemetry: TelemetryConfig,
    provider: Option<ProviderHandle>,
    fallback: Option<FallbackResolver>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            preferred: ProviderKind::Sdk,
            retry: RetryConfig::default(),
            circuit: CircuitBreakerConfig::default(),
            rate: RateLimiterConfig::default(),
            telemetry: TelemetryConfig::default(),
            provider: None,
            fallback: None,
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load connection settings from the environment.
    pub fn from_env(mut self) -> Result<Self> {
        self.config = Some(ClientConfig::from_env()?);
        Ok(self)
    }

    /// Which transport to initialize first. Defaults to the SDK-style
    /// transport; if its startup handshake fails, HTTP becomes the active
    /// provider for the client's lifetime.
    pub fn with_transport(mut self, preferred: ProviderKind) -> Self {
        self.preferred = preferred;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_circuit_breaker(mut self, circuit: CircuitBreakerConfig) -> Self {
        self.circuit = circuit;
        self
    }

    pub fn with_rate_limiter(mut self, rate: RateLimiterConfig) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Inject a pre-built provider, bypassing transport construction.
    /// Intended for embedding and tests.
    pub fn with_provider(mut self, provider: ProviderHandle) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Inject a pre-built fallback resolver. Intended for embedding and
    /// tests.
    pub fn with_fallback(mut self, fallback: FallbackResolver) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub async fn build(self) -> Result<WorkLinkClient> {
        let stack = Arc::new(ResilienceStack::new(
            self.retry,
            self.circuit,
            self.rate,
            self.telemetry,
        ));

        let provider = match self.provider {
            Some(handle) => handle,
            None => {
                let config = self.config.as_ref().ok_or_else(|| {
                    Error::validation("client configuration is required to build a provider")
                })?;
                create_provider(config, self.preferred).await?
            }
        };

        let fallback = match (self.fallback, self.config) {
            (Some(resolver), _) => Arc::new(resolver),
            (None, Some(config)) => Arc::new(FallbackResolver::from_config(config)),
            // No config and no injected resolver: the active provider is
            // the only transport there is.
            (None, None) => Arc::new(FallbackResolver::fixed(provider.clone())),
        };

        info!(transport = %provider.kind(), "client ready");
        Ok(WorkLinkClient::assemble(stack, provider, fallback))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WorkLinkClient {
    stack: Arc<ResilienceStack>,
    provider: ProviderHandle,
    work_items: Arc<WorkItemsApi>,
    wiql: WiqlApi,
    boards: BoardsApi,
    iterations: IterationsApi,
    pull_requests: PullRequestsApi,
    repositories: RepositoriesApi,
    teams: TeamsApi,
    wiki: WikiApi,
}

impl WorkLinkClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connect with the default resilience settings.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        ClientBuilder::new().with_config(config).build().await
    }

    fn assemble(
        stack: Arc<ResilienceStack>,
        provider: ProviderHandle,
        fallback: Arc<FallbackResolver>,
    ) -> Self {
        let work_items = Arc::new(WorkItemsApi::new(stack.clone(), provider.clone()));
        let wiql = WiqlApi::new(stack.clone(), provider.clone(), work_items.clone());
        let boards = BoardsApi::new(stack.clone(), provider.clone());
        let iterations = IterationsApi::new(stack.clone(), provider.clone(), fallback.clone());
        let pull_requests =
            PullRequestsApi::new(stack.clone(), provider.clone(), fallback.clone());
        let repositories =
            RepositoriesApi::new(stack.clone(), provider.clone(), fallback.clone());
        let teams = TeamsApi::new(stack.clone(), provider.clone(), fallback.clone());
        let wiki = WikiApi::new(stack.clone(), provider.clone(), fallback);

        Self {
            stack,
            provider,
            work_items,
            wiql,
            boards,
            iterations,
            pull_requests,
            repositories,
            teams,
            wiki,
        }
    }

    pub fn work_items(&self) -> &WorkItemsApi {
        &self.work_items
    }

    pub fn wiql(&self) -> &WiqlApi {
        &self.wiql
    }

    pub fn boards(&self) -> &BoardsApi {
        &self.boards
    }

    pub fn iterations(&self) -> &IterationsApi {
        &self.iterations
    }

    pub fn pull_requests(&self) -> &PullRequestsApi {
        &self.pull_requests
    }

    pub fn repositories(&self) -> &RepositoriesApi {
        &self.repositories
    }

    pub fn teams(&self) -> &TeamsApi {
        &self.teams
    }

    pub fn wiki(&self) -> &WikiApi {
        &self.wiki
    }

    /// Which transport is serving as the primary provider.
    pub fn transport(&self) -> ProviderKind {
        self.provider.kind()
    }

    pub async fn health(&self) -> ClientHealth {
        ClientHealth {
            provider: self.provider.health(),
            transport: self.provider.kind(),
            circuit_state: self.stack.circuit_breaker.state(),
            available_tokens: self.stack.rate_limiter.available_tokens().await,
        }
    }

    /// Aggregate statistics over the telemetry buffer.
    pub fn telemetry(&self) -> TelemetryMetrics {
        self.stack.telemetry.metrics()
    }

    /// Raw telemetry records, oldest first.
    pub fn telemetry_snapshot(&self) -> Vec<RequestOutcome> {
        self.stack.telemetry.snapshot()
    }

    pub fn set_telemetry_enabled(&self, enabled: bool) {
        self.stack.telemetry.set_enabled(enabled);
    }

    /// Clear circuit, rate-limiter and telemetry state.
    pub async fn reset(&self) {
        self.stack.reset().await;
    }

    /// Cancel all in-flight and future calls on this client.
    pub fn shutdown(&self) {
        self.stack.shutdown();
    }
}
