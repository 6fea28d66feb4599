use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wiki {
    pub id: String,
    pub name: String,
    /// "projectWiki" or "codeWiki".
    #[serde(default, rename = "type")]
    pub wiki_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub repository_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub remote_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WikiList {
    pub count: u32,
    pub value: Vec<Wiki>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WikiPage {
    #[serde(default)]
    pub id: Option<u32>,
    pub path: String,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub git_item_path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub is_parent_page: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_pages: Option<Vec<WikiPage>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWikiPayload {
    pub name: String,
    /// "projectWiki" or "codeWiki".
    #[serde(rename = "type")]
    pub wiki_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body for wiki page create/update; the page path travels in the URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WikiPagePayload {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
