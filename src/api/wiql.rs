//! WIQL query execution, plus the query-then-hydrate convenience that
//! feeds result ids straight into the batched work item reader.

use crate::api::WorkItemsApi;
use crate::provider::ProviderHandle;
use crate::resilience::ResilienceStack;
use crate::types::{WiqlQuery, WiqlResult, WorkItem};
use crate::{Error, Result};
use std::sync::Arc;

pub struct WiqlApi {
    stack: Arc<ResilienceStack>,
    provider: ProviderHandle,
    work_items: Arc<WorkItemsApi>,
}

impl WiqlApi {
    pub(crate) fn new(
        stack: Arc<ResilienceStack>,
        provider: ProviderHandle,
        work_items: Arc<WorkItemsApi>,
    ) -> Self {
        Self {
            stack,
            provider,
            work_items,
        }
    }

    pub async fn query(&self, query: WiqlQuery) -> Result<WiqlResult> {
        if query.query.trim().is_empty() {
            return Err(Error::validation("wiql query text is required"));
        }
        let target = query.top.map(|t| t.to_string()).unwrap_or_default();
        super::call(
            &self.stack,
            &self.provider,
            None,
            "execute_wiql",
            &target,
            move |p| {
                let query = query.clone();
                async move { p.execute_wiql(query).await }
            },
        )
        .await
    }

    /// Execute a query and hydrate the referenced work items, preserving
    /// result order. Queries with no matches return an empty vec without
    /// a second upstream call.
    pub async fn query_and_get(
        &self,
        query: WiqlQuery,
        fields: Option<Vec<String>>,
    ) -> Result<Vec<WorkItem>> {
        let result = self.query(query).await?;
        self.work_items.get_batch(result.ids(), fields).await
    }
}
