//! Work item entities, patch documents and WIQL query shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A work item as returned by the platform. `fields` is an opaque
/// reference-name keyed map (`System.Title`, `Microsoft.VSTS.*`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: u32,
    #[serde(default)]
    pub rev: Option<u32>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<WorkItemRelation>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemRelation {
    pub rel: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkItemPayload {
    /// Work item type name, e.g. "Bug", "User Story".
    #[serde(rename = "type")]
    pub work_item_type: String,
    pub fields: Map<String, Value>,
}

impl CreateWorkItemPayload {
    pub fn new(work_item_type: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            work_item_type: work_item_type.into(),
            fields,
        }
    }
}

/// One JSON-patch operation against a work item document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: "add".to_string(),
            path: path.into(),
            value: Some(value),
            from: None,
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: "replace".to_string(),
            path: path.into(),
            value: Some(value),
            from: None,
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: "remove".to_string(),
            path: path.into(),
            value: None,
            from: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkItemPayload {
    pub operations: Vec<PatchOperation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRelationPayload {
    pub work_item_id: u32,
    pub target_work_item_id: u32,
    /// Relation kind: "parent", "related", "predecessor" or "successor".
    pub relation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiqlQuery {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_precision: Option<bool>,
}

impl WiqlQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top: None,
            time_precision: None,
        }
    }

    pub fn with_top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiqlWorkItemReference {
    pub id: u32,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiqlResult {
    #[serde(default)]
    pub query_type: Option<String>,
    #[serde(default)]
    pub as_of: Option<String>,
    #[serde(default)]
    pub work_items: Vec<WiqlWorkItemReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Value>,
}

impl WiqlResult {
    /// Ids referenced by the result, in result order.
    pub fn ids(&self) -> Vec<u32> {
        self.work_items.iter().map(|r| r.id).collect()
    }
}
