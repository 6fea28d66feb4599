//! Pull request reads and lifecycle updates. SDK-style transport has no
//! git surface, so the fallback resolver is always wired here.

use crate::provider::{FallbackResolver, ProviderHandle};
use crate::resilience::ResilienceStack;
use crate::types::{
    CreatePullRequestPayload, PullRequest, PullRequestList, UpdatePullRequestPayload,
};
use crate::{Error, Result};
use std::sync::Arc;

pub struct PullRequestsApi {
    stack: Arc<ResilienceStack>,
    provider: ProviderHandle,
    fallback: Arc<FallbackResolver>,
}

impl PullRequestsApi {
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

    /// List pull requests in a repository, optionally filtered by status
    /// ("active", "completed", "abandoned", "all").
    pub async fn list(
        &self,
        repository: impl Into<String>,
        status: Option<String>,
    ) -> Result<PullRequestList> {
        let repository = repository.into();
        let target = repository.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "list_pull_requests",
            &target,
            move |p| {
                let repository = repository.clone();
                let status = status.clone();
                async move { p.list_pull_requests(repository, status).await }
            },
        )
        .await
    }

    pub async fn get(&self, repository: impl Into<String>, id: u32) -> Result<PullRequest> {
        let repository = repository.into();
        let target = format!("{}#{}", repository, id);
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "get_pull_request",
            &target,
            move |p| {
                let repository = repository.clone();
                async move { p.get_pull_request(repository, id).await }
            },
        )
        .await
    }

    pub async fn create(
        &self,
        repository: impl Into<String>,
        payload: CreatePullRequestPayload,
    ) -> Result<PullRequest> {
        if payload.source_ref_name.trim().is_empty() || payload.target_ref_name.trim().is_empty() {
            return Err(Error::validation(
                "source and target branch refs are required",
            ));
        }
        let repository = repository.into();
        let target = repository.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "create_pull_request",
            &target,
            move |p| {
                let repository = repository.clone();
                let payload = payload.clone();
                async move { p.create_pull_request(repository, payload).await }
            },
        )
        .await
    }

    pub async fn update(
        &self,
        repository: impl Into<String>,
        id: u32,
        payload: UpdatePullRequestPayload,
    ) -> Result<PullRequest> {
        let repository = repository.into();
        let target = format!("{}#{}", repository, id);
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "update_pull_request",
            &target,
            move |p| {
                let repository = repository.clone();
                let payload = payload.clone();
                async move { p.update_pull_request(repository, id, payload).await }
            },
        )
        .await
    }
}
