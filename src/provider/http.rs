//! Direct REST transport. Covers the full capability set; this is the
//! secondary provider the fallback protocol resolves to.

use crate::config::{ClientConfig, HTTP_API_VERSION};
use crate::provider::{Provider, ProviderHealth};
use crate::transport::{with_api_version, RestTransport};
use crate::types::*;
use crate::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::RwLock;
use std::time::SystemTime;

/// Fields rendered as markdown when a patch document touches them.
const MULTILINE_FIELDS: [&str; 3] = [
    "System.Description",
    "Microsoft.VSTS.Common.AcceptanceCriteria",
    "Microsoft.VSTS.TCM.ReproSteps",
];

pub struct HttpProvider {
    config: ClientConfig,
    transport: RestTransport,
    health: RwLock<ProviderHealth>,
}

impl HttpProvider {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = RestTransport::new(&config)?;
        Ok(Self {
            config,
            transport,
            health: RwLock::new(ProviderHealth::default()),
        })
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

    fn org_api(&self, path: &str) -> String {
        with_api_version(
            format!("{}/_apis/{}", self.config.organization_url(), path),
            HTTP_API_VERSION,
        )
    }

    fn project_api(&self, path: &str) -> String {
        with_api_version(
            format!("{}/_apis/{}", self.config.project_url(), path),
            HTTP_API_VERSION,
        )
    }

    /// Team-scoped settings path; falls back to the project default team.
    fn team_api(&self, team: Option<&str>, path: &str) -> String {
        let team = team.unwrap_or(&self.config.project);
        with_api_version(
            format!(
                "{}/{}/_apis/{}",
                self.config.project_url(),
                team,
                path
            ),
            HTTP_API_VERSION,
        )
    }

    fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
        Ok(serde_json::from_value(value)?)
    }

    /// Build a work-item patch document from create-payload fields, adding
    /// markdown format markers for multiline fields.
    pub(crate) fn create_document(payload: &CreateWorkItemPayload) -> Value {
        let mut document: Vec<Value> = payload
            .fields
            .iter()
            .map(|(key, value)| {
                json!({ "op": "add", "path": format!("/fields/{}", key), "value": value })
            })
            .collect();
        for field in MULTILINE_FIELDS {
            if payload.fields.contains_key(field) {
                document.push(json!({
                    "op": "add",
                    "path": format!("/multilineFieldsFormat/{}", field),
                    "value": "markdown",
                }));
            }
        }
        Value::Array(document)
    }

    /// Serialize update operations, adding markdown format markers for any
    /// multiline field the document touches.
    pub(crate) fn update_document(payload: &UpdateWorkItemPayload) -> Result<Value> {
        let mut document = serde_json::to_value(&payload.operations)?;
        if let Value::Array(ops) = &mut document {
            let mut markers = Vec::new();
            for field in MULTILINE_FIELDS {
                let touches = payload
                    .operations
                    .iter()
                    .any(|op| op.path == format!("/fields/{}", field) && op.op != "remove");
                if touches {
                    markers.push(json!({
                        "op": "add",
                        "path": format!("/multilineFieldsFormat/{}", field),
                        "value": "markdown",
                    }));
                }
            }
            ops.extend(markers);
        }
        Ok(document)
    }

    fn page_query(path: Option<&str>, extra: &[(&str, &str)]) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if let Some(path) = path {
            serializer.append_pair("path", path);
        }
        for (key, value) in extra {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn initialize(&self) -> Result<()> {
        let url = self.org_api(&format!("projects/{}", self.config.project));
        match self.transport.get(&url).await {
            Ok(_) => {
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
        let url = self.project_api(&format!("wit/workitems/${}", payload.work_item_type));
        let document = Self::create_document(&payload);
        let value = self
            .transport
            .send_patch_document(Method::POST, &url, &document)
            .await?;
        Self::decode(value)
    }

    async fn get_work_item(&self, id: u32, fields: Option<Vec<String>>) -> Result<WorkItem> {
        let mut path = format!("wit/workitems/{}", id);
        if let Some(fields) = fields.filter(|f| !f.is_empty()) {
            path.push_str(&format!("?fields={}", fields.join(",")));
        }
        let value = self.transport.get(&self.project_api(&path)).await?;
        Self::decode(value)
    }

    async fn update_work_item(&self, id: u32, payload: UpdateWorkItemPayload) -> Result<WorkItem> {
        let url = self.project_api(&format!("wit/workitems/{}", id));
        let document = Self::update_document(&payload)?;
        let value = self
            .transport
            .send_patch_document(Method::PATCH, &url, &document)
            .await?;
        Self::decode(value)
    }

    async fn delete_work_item(&self, id: u32) -> Result<()> {
        let url = self.project_api(&format!("wit/workitems/{}", id));
        self.transport.delete(&url).await?;
        Ok(())
    }

    async fn get_work_items(
        &self,
        ids: Vec<u32>,
        fields: Option<Vec<String>>,
    ) -> Result<Vec<WorkItem>> {
        let ids_param = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut path = format!("wit/workitems?ids={}", ids_param);
        if let Some(fields) = fields.filter(|f| !f.is_empty()) {
            path.push_str(&format!("&fields={}", fields.join(",")));
        }
        let value = self.transport.get(&self.project_api(&path)).await?;
        #[derive(serde::Deserialize)]
        struct Batch {
            #[serde(default)]
            value: Vec<WorkItem>,
        }
        let batch: Batch = Self::decode(value)?;
        Ok(batch.value)
    }

    async fn add_work_item_relation(&self, payload: AddRelationPayload) -> Result<WorkItem> {
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
        let mut attributes = json!({});
        if let Some(comment) = &payload.comment {
            attributes = json!({ "comment": comment });
        }
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
        let mut path = "wit/wiql".to_string();
        if let Some(top) = query.top {
            path.push_str(&format!("?$top={}", top));
        }
        let body = json!({ "query": query.query });
        let value = self.transport.post(&self.project_api(&path), &body).await?;
        Self::decode(value)
    }

    async fn list_boards(&self) -> Result<BoardsList> {
        let value = self
            .transport
            .get(&self.team_api(None, "work/boards"))
            .await?;
        Self::decode(value)
    }

    async fn get_board(&self, board_id: String) -> Result<Board> {
        let value = self
            .transport
            .get(&self.team_api(None, &format!("work/boards/{}", board_id)))
            .await?;
        Self::decode(value)
    }

    async fn update_board_settings(
        &self,
        board_id: String,
        settings: BoardSettings,
    ) -> Result<Board> {
        let url = self.team_api(None, &format!("work/boards/{}", board_id));
        let body = serde_json::to_value(&settings)?;
        let value = self.transport.patch(&url, &body).await?;
        Self::decode(value)
    }

    async fn list_iterations(&self, team: Option<String>) -> Result<Vec<TeamIteration>> {
        let url = self.team_api(team.as_deref(), "work/teamsettings/iterations");
        let value = self.transport.get(&url).await?;
        #[derive(serde::Deserialize)]
        struct List {
            #[serde(default)]
            value: Vec<TeamIteration>,
        }
        let list: List = Self::decode(value)?;
        Ok(list.value)
    }

    async fn get_iteration(
        &self,
        iteration_id: String,
        team: Option<String>,
    ) -> Result<TeamIteration> {
        let url = self.team_api(
            team.as_deref(),
            &format!("work/teamsettings/iterations/{}", iteration_id),
        );
        Self::decode(self.transport.get(&url).await?)
    }

    async fn create_iteration(
        &self,
        payload: CreateIterationPayload,
        team: Option<String>,
    ) -> Result<TeamIteration> {
        let url = self.team_api(team.as_deref(), "work/teamsettings/iterations");
        let body = serde_json::to_value(&payload)?;
        Self::decode(self.transport.post(&url, &body).await?)
    }

    async fn delete_iteration(&self, iteration_id: String, team: Option<String>) -> Result<()> {
        let url = self.team_api(
            team.as_deref(),
            &format!("work/teamsettings/iterations/{}", iteration_id),
        );
        self.transport.delete(&url).await?;
        Ok(())
    }

    async fn iteration_work_items(
        &self,
        iteration_id: String,
        team: Option<String>,
    ) -> Result<IterationWorkItems> {
        let url = self.team_api(
            team.as_deref(),
            &format!("work/teamsettings/iterations/{}/workitems", iteration_id),
        );
        Self::decode(self.transport.get(&url).await?)
    }

    async fn iteration_capacities(
        &self,
        iteration_id: String,
        team: Option<String>,
    ) -> Result<Vec<IterationCapacity>> {
        let url = self.team_api(
            team.as_deref(),
            &format!("work/teamsettings/iterations/{}/capacities", iteration_id),
        );
        #[derive(serde::Deserialize)]
        struct List {
            #[serde(default)]
            value: Vec<IterationCapacity>,
        }
        let list: List = Self::decode(self.transport.get(&url).await?)?;
        Ok(list.value)
    }

    async fn list_pull_requests(
        &self,
        repository: String,
        status: Option<String>,
    ) -> Result<PullRequestList> {
        let mut path = format!("git/repositories/{}/pullrequests", repository);
        if let Some(status) = status {
            path.push_str(&format!("?searchCriteria.status={}", status));
        }
        Self::decode(self.transport.get(&self.project_api(&path)).await?)
    }

    async fn get_pull_request(&self, repository: String, id: u32) -> Result<PullRequest> {
        let url = self.project_api(&format!("git/repositories/{}/pullrequests/{}", repository, id));
        Self::decode(self.transport.get(&url).await?)
    }

    async fn create_pull_request(
        &self,
        repository: String,
        payload: CreatePullRequestPayload,
    ) -> Result<PullRequest> {
        let url = self.project_api(&format!("git/repositories/{}/pullrequests", repository));
        let body = serde_json::to_value(&payload)?;
        Self::decode(self.transport.post(&url, &body).await?)
    }

    async fn update_pull_request(
        &self,
        repository: String,
        id: u32,
        payload: UpdatePullRequestPayload,
    ) -> Result<PullRequest> {
        let url = self.project_api(&format!("git/repositories/{}/pullrequests/{}", repository, id));
        let body = serde_json::to_value(&payload)?;
        Self::decode(self.transport.patch(&url, &body).await?)
    }

    async fn list_repositories(&self) -> Result<RepositoryList> {
        Self::decode(self.transport.get(&self.project_api("git/repositories")).await?)
    }

    async fn get_repository(&self, repository: String) -> Result<GitRepository> {
        let url = self.project_api(&format!("git/repositories/{}", repository));
        Self::decode(self.transport.get(&url).await?)
    }

    async fn list_teams(&self) -> Result<TeamsList> {
        let url = self.org_api(&format!("projects/{}/teams", self.config.project));
        Self::decode(self.transport.get(&url).await?)
    }

    async fn get_team(&self, team_id: String) -> Result<Team> {
        let url = self.org_api(&format!("projects/{}/teams/{}", self.config.project, team_id));
        Self::decode(self.transport.get(&url).await?)
    }

    async fn list_team_members(&self, team_id: String) -> Result<TeamMembers> {
        let url = self.org_api(&format!(
            "projects/{}/teams/{}/members",
            self.config.project, team_id
        ));
        Self::decode(self.transport.get(&url).await?)
    }

    async fn list_wikis(&self) -> Result<WikiList> {
        Self::decode(self.transport.get(&self.project_api("wiki/wikis")).await?)
    }

    async fn get_wiki(&self, wiki: String) -> Result<Wiki> {
        let url = self.project_api(&format!("wiki/wikis/{}", wiki));
        Self::decode(self.transport.get(&url).await?)
    }

    async fn create_wiki(&self, payload: CreateWikiPayload) -> Result<Wiki> {
        let body = serde_json::to_value(&payload)?;
        Self::decode(self.transport.post(&self.project_api("wiki/wikis"), &body).await?)
    }

    async fn delete_wiki(&self, wiki: String) -> Result<()> {
        let url = self.project_api(&format!("wiki/wikis/{}", wiki));
        self.transport.delete(&url).await?;
        Ok(())
    }

    async fn list_wiki_pages(&self, wiki: String, path: Option<String>) -> Result<Vec<WikiPage>> {
        let query = Self::page_query(path.as_deref(), &[("recursionLevel", "oneLevel")]);
        let url = self.project_api(&format!("wiki/wikis/{}/pages?{}", wiki, query));
        let value = self.transport.get(&url).await?;
        // A page listing comes back as the parent page with subPages.
        let mut page: WikiPage = Self::decode(value)?;
        match page.sub_pages.take() {
            Some(pages) => Ok(pages),
            None => Ok(vec![page]),
        }
    }

    async fn get_wiki_page(
        &self,
        wiki: String,
        path: String,
        include_content: bool,
    ) -> Result<WikiPage> {
        let query = Self::page_query(
            Some(&path),
            &[("includeContent", if include_content { "true" } else { "false" })],
        );
        let url = self.project_api(&format!("wiki/wikis/{}/pages?{}", wiki, query));
        Self::decode(self.transport.get(&url).await?)
    }

    async fn create_wiki_page(
        &self,
        wiki: String,
        path: String,
        payload: WikiPagePayload,
    ) -> Result<WikiPage> {
        let query = Self::page_query(Some(&path), &[]);
        let url = self.project_api(&format!("wiki/wikis/{}/pages?{}", wiki, query));
        let body = serde_json::to_value(&payload)?;
        Self::decode(self.transport.put(&url, &body).await?)
    }

    async fn update_wiki_page(
        &self,
        wiki: String,
        path: String,
        payload: WikiPagePayload,
    ) -> Result<WikiPage> {
        // Same verb as create; the platform distinguishes by page existence.
        self.create_wiki_page(wiki, path, payload).await
    }

    async fn delete_wiki_page(&self, wiki: String, path: String) -> Result<()> {
        let query = Self::page_query(Some(&path), &[]);
        let url = self.project_api(&format!("wiki/wikis/{}/pages?{}", wiki, query));
        self.transport.delete(&url).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn create_document_adds_markdown_markers() {
        let mut fields = Map::new();
        fields.insert("System.Title".to_string(), json!("t"));
        fields.insert("System.Description".to_string(), json!("body"));
        let payload = CreateWorkItemPayload::new("Bug", fields);

        let document = HttpProvider::create_document(&payload);
        let ops = document.as_array().unwrap();
        assert_eq!(ops.len(), 3);
        assert!(ops.iter().any(|op| {
            op["path"] == "/multilineFieldsFormat/System.Description" && op["value"] == "markdown"
        }));
    }

    #[test]
    fn update_document_marks_touched_multiline_fields() {
        let payload = UpdateWorkItemPayload {
            operations: vec![
                PatchOperation::replace("/fields/System.Title", json!("t")),
                PatchOperation::replace("/fields/System.Description", json!("**body**")),
                PatchOperation::remove("/fields/Microsoft.VSTS.TCM.ReproSteps"),
            ],
        };

        let document = HttpProvider::update_document(&payload).unwrap();
        let ops = document.as_array().unwrap();
        assert_eq!(ops.len(), 4);
        assert!(ops.iter().any(|op| {
            op["path"] == "/multilineFieldsFormat/System.Description" && op["value"] == "markdown"
        }));
        // Removed fields get no format marker.
        assert!(!ops
            .iter()
            .any(|op| op["path"] == "/multilineFieldsFormat/Microsoft.VSTS.TCM.ReproSteps"));
    }

    #[test]
    fn page_query_encodes_paths() {
        let query = HttpProvider::page_query(Some("docs/How To"), &[("includeContent", "true")]);
        assert!(query.contains("path=docs%2FHow+To"));
        assert!(query.contains("includeContent=true"));
    }
}
