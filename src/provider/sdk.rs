//! SDK-style transport: the preferred primary.
//!
//! Speaks the older wire contract (handshake via `connectionData`, pinned
//! api-version) and covers only work items, WIQL and boards. Every other
//! operation returns [`crate::Error::Unsupported`], which the facade layer
//! converts into a fallback to the HTTP transport.

use crate::config::{ClientConfig, SDK_API_VERSION};
use crate::provider::{Provider, ProviderHealth, ProviderKind};
use crate::transport::{with_api_version, RestTransport};
use crate::types::*;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::SystemTime;

pub struct SdkProvider {
    config: ClientConfig,
    transport: RestTransport,
    initialized: AtomicBool,
    health: RwLock<ProviderHealth>,
}

impl SdkProvider {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = RestTransport::new(&config)?;
        Ok(Self {
            config,
            transport,
            initialized: AtomicBool::new(false),
            health: RwLock::new(ProviderHealth::default()),
        })
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    fn update_health(&self, healthy: bool, error: Option<String>) {
        if let Ok(mut health) = self.health.write() {
            *health = ProviderHealth {
                healthy,
                last_check: SystemTime::now(),
                last_error: error,
            };
        }
    }

    fn project_api(&self, path: &str) -> String {
        with_api_version(
            format!("{}/_apis/{}", self.config.project_url(), path),
            SDK_API_VERSION,
        )
    }

    fn team_api(&self, path: &str) -> String {
        with_api_version(
            format!(
                "{}/{}/_apis/{}",
                self.config.project_url(),
                self.config.project,
                path
            ),
            SDK_API_VERSION,
        )
    }

    fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
        Ok(serde_json::from_value(value)?)
    }

    fn unsupported(&self, operation: &str) -> Error {
        Error::unsupported(operation, ProviderKind::Sdk)
    }
}

#[async_trait]
impl Provider for SdkProvider {
    async fn initialize(&self) -> Result<()> {
        let url = with_api_version(
            format!("{}/_apis/connectionData", self.config.organization_url()),
            SDK_API_VERSION,
        );
        match self.transport.get(&url).await {
            Ok(_) => {
                self.initialized.store(true, Ordering::Release);
                self.update_health(true, None);
                Ok(())
            }
            Err(err) => {
                self.update_health(false, Some(err.to_string()));
                Err(err)
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.health.read().map(|h| h.healthy).unwrap_or(false)
    }

    fn health(&self) -> ProviderHealth {
        self.health
            .read()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    async fn create_work_item(&self, payload: CreateWorkItemPayload) -> Result<WorkItem> {
        self.ensure_initialized()?;
        let url = self.project_api(&format!("wit/workitems/${}", payload.work_item_type));
        let document = super::HttpProvider::create_document(&payload);
        let value = self
            .transport
            .send_patch_document(Method::POST, &url, &document)
            .await?;
        Self::decode(value)
    }

    async fn get_work_item(&self, id: u32, fields: Option<Vec<String>>) -> Result<WorkItem> {
        self.ensure_initialized()?;
        let mut path = format!("wit/workitems/{}", id);
        if let Some(fields) = fields.filter(|f| !f.is_empty()) {
            path.push_str(&format!("?fields={}", fields.join(",")));
        }
        Self::decode(self.transport.get(&self.project_api(&path)).await?)
    }

    async fn update_work_item(&self, id: u32, payload: UpdateWorkItemPayload) -> Result<WorkItem> {
        self.ensure_initialized()?;
        let url = self.project_api(&format!("wit/workitems/{}", id));
        let document = super::HttpProvider::update_document(&payload)?;
        let value = self
            .transport
            .send_patch_document(Method::PATCH, &url, &document)
            .await?;
        Self::decode(value)
    }

    async fn delete_work_item(&self, id: u32) -> Result<()> {
        self.ensure_initialized()?;
        let url = self.project_api(&format!("wit/workitems/{}", id));
        self.transport.delete(&url).await?;
        Ok(())
    }

    async fn get_work_items(
        &self,
        ids: Vec<u32>,
        fields: Option<Vec<String>>,
    ) -> Result<Vec<WorkItem>> {
        self.ensure_initialized()?;
        let ids_param = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut path = format!("wit/workitems?ids={}", ids_param);
        if let Some(fields) = fields.filter(|f| !f.is_empty()) {
            path.push_str(&format!("&fields={}", fields.join(",")));
        }
        #[derive(serde::Deserialize)]
        struct Batch {
            #[serde(default)]
            value: Vec<WorkItem>,
        }
        let batch: Batch = Self::decode(self.transport.get(&self.project_api(&path)).await?)?;
        Ok(batch.value)
    }

    async fn add_work_item_relation(&self, payload: AddRelationPayload) -> Result<WorkItem> {
        self.ensure_initialized()?;
        let rel = match payload.relation_type.as_str() {
            "parent" => "System.LinkTypes.Hierarchy-Reverse",
            "predecessor" => "System.LinkTypes.Dependency-Reverse",
            "successor" => "System.LinkTypes.Dependency-Forward",
            _ => "System.LinkTypes.Related",
        };
        let target_url = format!(
            "{}/_apis/wit/workitems/{}",
            self.config.project_url(),
            payload.target_work_item_id
        );
        let attributes = match &payload.comment {
            Some(comment) => json!({ "comment": comment }),
            None => json!({}),
        };
        let document = json!([{
            "op": "add",
            "path": "/relations/-",
            "value": { "rel": rel, "url": target_url, "attributes": attributes },
        }]);
        let url = self.project_api(&format!("wit/workitems/{}", payload.work_item_id));
        let value = self
            .transport
            .send_patch_document(Method::PATCH, &url, &document)
            .await?;
        Self::decode(value)
    }

    async fn execute_wiql(&self, query: WiqlQuery) -> Result<WiqlResult> {
        self.ensure_initialized()?;
        let mut path = "wit/wiql".to_string();
        if let Some(top) = query.top {
            path.push_str(&format!("?$top={}", top));
        }
        let body = json!({ "query": query.query });
        Self::decode(self.transport.post(&self.project_api(&path), &body).await?)
    }

    async fn list_boards(&self) -> Result<BoardsList> {
        self.ensure_initialized()?;
        Self::decode(self.transport.get(&self.team_api("work/boards")).await?)
    }

    async fn get_board(&self, board_id: String) -> Result<Board> {
        self.ensure_initialized()?;
        let url = self.team_api(&format!("work/boards/{}", board_id));
        Self::decode(self.transport.get(&url).await?)
    }

    async fn update_board_settings(
        &self,
        board_id: String,
        settings: BoardSettings,
    ) -> Result<Board> {
        self.ensure_initialized()?;
        let url = self.team_api(&format!("work/boards/{}", board_id));
        let body = serde_json::to_value(&settings)?;
        Self::decode(self.transport.patch(&url, &body).await?)
    }

    async fn list_iterations(&self, _team: Option<String>) -> Result<Vec<TeamIteration>> {
        Err(self.unsupported("list_iterations"))
    }

    async fn get_iteration(
        &self,
        _iteration_id: String,
        _team: Option<String>,
    ) -> Result<TeamIteration> {
        Err(self.unsupported("get_iteration"))
    }

    async fn create_iteration(
        &self,
        _payload: CreateIterationPayload,
        _team: Option<String>,
    ) -> Result<TeamIteration> {
        Err(self.unsupported("create_iteration"))
    }

    async fn delete_iteration(&self, _iteration_id: String, _team: Option<String>) -> Result<()> {
        Err(self.unsupported("delete_iteration"))
    }

    async fn iteration_work_items(
        &self,
        _iteration_id: String,
        _team: Option<String>,
    ) -> Result<IterationWorkItems> {
        Err(self.unsupported("iteration_work_items"))
    }

    async fn iteration_capacities(
        &self,
        _iteration_id: String,
        _team: Option<String>,
    ) -> Result<Vec<IterationCapacity>> {
        Err(self.unsupported("iteration_capacities"))
    }

    async fn list_pull_requests(
        &self,
        _repository: String,
        _status: Option<String>,
    ) -> Result<PullRequestList> {
        Err(self.unsupported("list_pull_requests"))
    }

    async fn get_pull_request(&self, _repository: String, _id: u32) -> Result<PullRequest> {
        Err(self.unsupported("get_pull_request"))
    }

    async fn create_pull_request(
        &self,
        _repository: String,
        _payload: CreatePullRequestPayload,
    ) -> Result<PullRequest> {
        Err(self.unsupported("create_pull_request"))
    }

    async fn update_pull_request(
        &self,
        _repository: String,
        _id: u32,
        _payload: UpdatePullRequestPayload,
    ) -> Result<PullRequest> {
        Err(self.unsupported("update_pull_request"))
    }

    async fn list_repositories(&self) -> Result<RepositoryList> {
        Err(self.unsupported("list_repositories"))
    }

    async fn get_repository(&self, _repository: String) -> Result<GitRepository> {
        Err(self.unsupported("get_repository"))
    }

    async fn list_teams(&self) -> Result<TeamsList> {
        Err(self.unsupported("list_teams"))
    }

    async fn get_team(&self, _team_id: String) -> Result<Team> {
        Err(self.unsupported("get_team"))
    }

    async fn list_team_members(&self, _team_id: String) -> Result<TeamMembers> {
        Err(self.unsupported("list_team_members"))
    }

    async fn list_wikis(&self) -> Result<WikiList> {
        Err(self.unsupported("list_wikis"))
    }

    async fn get_wiki(&self, _wiki: String) -> Result<Wiki> {
        Err(self.unsupported("get_wiki"))
    }

    async fn create_wiki(&self, _payload: CreateWikiPayload) -> Result<Wiki> {
        Err(self.unsupported("create_wiki"))
    }

    async fn delete_wiki(&self, _wiki: String) -> Result<()> {
        Err(self.unsupported("delete_wiki"))
    }

    async fn list_wiki_pages(&self, _wiki: String, _path: Option<String>) -> Result<Vec<WikiPage>> {
        Err(self.unsupported("list_wiki_pages"))
    }

    async fn get_wiki_page(
        &self,
        _wiki: String,
        _path: String,
        _include_content: bool,
    ) -> Result<WikiPage> {
        Err(self.unsupported("get_wiki_page"))
    }

    async fn create_wiki_page(
        &self,
        _wiki: String,
        _path: String,
        _payload: WikiPagePayload,
    ) -> Result<WikiPage> {
        Err(self.unsupported("create_wiki_page"))
    }

    async fn update_wiki_page(
        &self,
        _wiki: String,
        _path: String,
        _payload: WikiPagePayload,
    ) -> Result<WikiPage> {
        Err(self.unsupported("update_wiki_page"))
    }

    async fn delete_wiki_page(&self, _wiki: String, _path: String) -> Result<()> {
        Err(self.unsupported("delete_wiki_page"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ClientConfig {
        ClientConfig::new("org", "project", "pat")
    }

    #[tokio::test]
    async fn calls_before_initialize_are_rejected() {
        let provider = SdkProvider::new(test_config()).unwrap();
        let err = provider.get_work_item(1, None).await.unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
    }

    #[tokio::test]
    async fn uncovered_operations_signal_the_capability_gap() {
        let provider = SdkProvider::new(test_config()).unwrap();
        let err = provider.list_wikis().await.unwrap_err();
        match err {
            Error::Unsupported {
                operation,
                provider,
            } => {
                assert_eq!(operation, "list_wikis");
                assert_eq!(provider, ProviderKind::Sdk);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
