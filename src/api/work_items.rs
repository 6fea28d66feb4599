//! Work item CRUD, relations and order-preserving batched reads.

use crate::provider::ProviderHandle;
use crate::resilience::ResilienceStack;
use crate::types::{
    AddRelationPayload, CreateWorkItemPayload, UpdateWorkItemPayload, WorkItem,
};
use crate::{validation, Result};
use std::sync::Arc;

/// Batched reads are issued in chunks of this many ids.
pub const BATCH_CHUNK_SIZE: usize = 200;

pub struct WorkItemsApi {
    stack: Arc<ResilienceStack>,
    provider: ProviderHandle,
}

impl WorkItemsApi {
    pub(crate) fn new(stack: Arc<ResilienceStack>, provider: ProviderHandle) -> Self {
        Self { stack, provider }
    }

    /// Create a work item. The payload is validated before any token is
    /// consumed or any provider call is made.
    pub async fn create(&self, payload: CreateWorkItemPayload) -> Result<WorkItem> {
        validation::validate_create_payload(&payload)?;
        let target = payload.work_item_type.clone();
        super::call(
            &self.stack,
            &self.provider,
            None,
            "create_work_item",
            &target,
            move |p| {
                let payload = payload.clone();
                async move { p.create_work_item(payload).await }
            },
        )
        .await
    }

    pub async fn get(&self, id: u32, fields: Option<Vec<String>>) -> Result<WorkItem> {
        let target = id.to_string();
        super::call(
            &self.stack,
            &self.provider,
            None,
            "get_work_item",
            &target,
            move |p| {
                let fields = fields.clone();
                async move { p.get_work_item(id, fields).await }
            },
        )
        .await
    }

    pub async fn update(&self, id: u32, payload: UpdateWorkItemPayload) -> Result<WorkItem> {
        validation::validate_update_operations(&payload.operations)?;
        let target = id.to_string();
        super::call(
            &self.stack,
            &self.provider,
            None,
            "update_work_item",
            &target,
            move |p| {
                let payload = payload.clone();
                async move { p.update_work_item(id, payload).await }
            },
        )
        .await
    }

    pub async fn delete(&self, id: u32) -> Result<()> {
        let target = id.to_string();
        super::call(
            &self.stack,
            &self.provider,
            None,
            "delete_work_item",
            &target,
            move |p| async move { p.delete_work_item(id).await },
        )
        .await
    }

    /// Fetch many work items, chunked at [`BATCH_CHUNK_SIZE`] ids per
    /// upstream call. Chunks run sequentially and results concatenate in
    /// input order; an empty id list returns an empty vec without touching
    /// the provider.
    pub async fn get_batch(
        &self,
        ids: Vec<u32>,
        fields: Option<Vec<String>>,
    ) -> Result<Vec<WorkItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut items = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(BATCH_CHUNK_SIZE) {
            let chunk_ids = chunk.to_vec();
            let fields = fields.clone();
            let target = format!("{} ids", chunk_ids.len());
            let batch = super::call(
                &self.stack,
                &self.provider,
                None,
                "get_work_items",
                &target,
                move |p| {
                    let chunk_ids = chunk_ids.clone();
                    let fields = fields.clone();
                    async move { p.get_work_items(chunk_ids, fields).await }
                },
            )
            .await?;
            items.extend(batch);
        }
        Ok(items)
    }

    /// Link two work items. The relation kind names the link from the
    /// source item's point of view ("parent", "related", "predecessor",
    /// "successor").
    pub async fn add_relation(&self, payload: AddRelationPayload) -> Result<WorkItem> {
        let target = format!("{}->{}", payload.work_item_id, payload.target_work_item_id);
        super::call(
            &self.stack,
            &self.provider,
            None,
            "add_work_item_relation",
            &target,
            move |p| {
                let payload = payload.clone();
                async move { p.add_work_item_relation(payload).await }
            },
        )
        .await
    }
}
