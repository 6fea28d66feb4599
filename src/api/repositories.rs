//! Git repository reads.

use crate::provider::{FallbackResolver, ProviderHandle};
use crate::resilience::ResilienceStack;
use crate::types::{GitRepository, RepositoryList};
use crate::Result;
use std::sync::Arc;

pub struct RepositoriesApi {
    stack: Arc<ResilienceStack>,
    provider: ProviderHandle,
    fallback: Arc<FallbackResolver>,
}

impl RepositoriesApi {
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

    pub async fn list(&self) -> Result<RepositoryList> {
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "list_repositories",
            "",
            move |p| async move { p.list_repositories().await },
        )
        .await
    }

    /// Look up a repository by id or name.
    pub async fn get(&self, repository: impl Into<String>) -> Result<GitRepository> {
        let repository = repository.into();
        let target = repository.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "get_repository",
            &target,
            move |p| {
                let repository = repository.clone();
                async move { p.get_repository(repository).await }
            },
        )
        .await
    }
}
