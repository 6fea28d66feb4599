use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub column_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_mappings: Option<Map<String, Value>>,
}

/// Mutable board settings accepted by `update_board_settings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_reordering: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlog_visibilities: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub columns: Vec<BoardColumn>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardsList {
    pub count: u32,
    pub value: Vec<Board>,
}
