//! Team iteration (sprint) management. Not covered by the SDK-style
//! transport, so every operation here carries the fallback resolver.

use crate::provider::{FallbackResolver, ProviderHandle};
use crate::resilience::ResilienceStack;
use crate::types::{
    CreateIterationPayload, IterationCapacity, IterationWorkItems, TeamIteration,
};
use crate::{Error, Result};
use std::sync::Arc;

pub struct IterationsApi {
    stack: Arc<ResilienceStack>,
    provider: ProviderHandle,
    fallback: Arc<FallbackResolver>,
}

impl IterationsApi {
    pub(crate) fn new(
        stack: Arc<ResilienceStack>,
        provider: ProviderHandle,
        fallback: Arc<FallbackResolver>,
    ) -> Self {
        Self {
            stack,
            provider,
            fallback,
        }
    }

    pub async fn list(&self, team: Option<String>) -> Result<Vec<TeamIteration>> {
        let target = team.clone().unwrap_or_default();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "list_iterations",
            &target,
            move |p| {
                let team = team.clone();
                async move { p.list_iterations(team).await }
            },
        )
        .await
    }

    pub async fn get(
        &self,
        iteration_id: impl Into<String>,
        team: Option<String>,
    ) -> Result<TeamIteration> {
        let iteration_id = iteration_id.into();
        let target = iteration_id.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "get_iteration",
            &target,
            move |p| {
                let iteration_id = iteration_id.clone();
                let team = team.clone();
                async move { p.get_iteration(iteration_id, team).await }
            },
        )
        .await
    }

    pub async fn create(
        &self,
        payload: CreateIterationPayload,
        team: Option<String>,
    ) -> Result<TeamIteration> {
        if payload.name.trim().is_empty() {
            return Err(Error::validation("iteration name is required"));
        }
        let target = payload.name.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "create_iteration",
            &target,
            move |p| {
                let payload = payload.clone();
                let team = team.clone();
                async move { p.create_iteration(payload, team).await }
            },
        )
        .await
    }

    pub async fn delete(
        &self,
        iteration_id: impl Into<String>,
        team: Option<String>,
    ) -> Result<()> {
        let iteration_id = iteration_id.into();
        let target = iteration_id.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "delete_iteration",
            &target,
            move |p| {
                let iteration_id = iteration_id.clone();
                let team = team.clone();
                async move { p.delete_iteration(iteration_id, team).await }
            },
        )
        .await
    }

    pub async fn work_items(
        &self,
        iteration_id: impl Into<String>,
        team: Option<String>,
    ) -> Result<IterationWorkItems> {
        let iteration_id = iteration_id.into();
        let target = iteration_id.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "iteration_work_items",
            &target,
            move |p| {
                let iteration_id = iteration_id.clone();
                let team = team.clone();
                async move { p.iteration_work_items(iteration_id, team).await }
            },
        )
        .await
    }

    pub async fn capacities(
        &self,
        iteration_id: impl Into<String>,
        team: Option<String>,
    ) -> Result<Vec<IterationCapacity>> {
        let iteration_id = iteration_id.into();
        let target = iteration_id.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "iteration_capacities",
            &target,
            move |p| {
                let iteration_id = iteration_id.clone();
                let team = team.clone();
                async move { p.iteration_capacities(iteration_id, team).await }
            },
        )
        .await
    }
}
