//! Wiki and wiki page management. Page content is markdown; page paths
//! travel as URL query parameters and are percent-encoded by the provider.

use crate::provider::{FallbackResolver, ProviderHandle};
use crate::resilience::ResilienceStack;
use crate::types::{CreateWikiPayload, Wiki, WikiList, WikiPage, WikiPagePayload};
use crate::{Error, Result};
use std::sync::Arc;

pub struct WikiApi {
    stack: Arc<ResilienceStack>,
    provider: ProviderHandle,
    fallback: Arc<FallbackResolver>,
}

impl WikiApi {
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

    pub async fn list(&self) -> Result<WikiList> {
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "list_wikis",
            "",
            move |p| async move { p.list_wikis().await },
        )
        .await
    }

    pub async fn get(&self, wiki: impl Into<String>) -> Result<Wiki> {
        let wiki = wiki.into();
        let target = wiki.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "get_wiki",
            &target,
            move |p| {
                let wiki = wiki.clone();
                async move { p.get_wiki(wiki).await }
            },
        )
        .await
    }

    pub async fn create(&self, payload: CreateWikiPayload) -> Result<Wiki> {
        if payload.name.trim().is_empty() {
            return Err(Error::validation("wiki name is required"));
        }
        let target = payload.name.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "create_wiki",
            &target,
            move |p| {
                let payload = payload.clone();
                async move { p.create_wiki(payload).await }
            },
        )
        .await
    }

    pub async fn delete(&self, wiki: impl Into<String>) -> Result<()> {
        let wiki = wiki.into();
        let target = wiki.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "delete_wiki",
            &target,
            move |p| {
                let wiki = wiki.clone();
                async move { p.delete_wiki(wiki).await }
            },
        )
        .await
    }

    /// List pages one level below `path` (or below the wiki root).
    pub async fn list_pages(
        &self,
        wiki: impl Into<String>,
        path: Option<String>,
    ) -> Result<Vec<WikiPage>> {
        let wiki = wiki.into();
        let target = wiki.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "list_wiki_pages",
            &target,
            move |p| {
                let wiki = wiki.clone();
                let path = path.clone();
                async move { p.list_wiki_pages(wiki, path).await }
            },
        )
        .await
    }

    pub async fn get_page(
        &self,
        wiki: impl Into<String>,
        path: impl Into<String>,
        include_content: bool,
    ) -> Result<WikiPage> {
        let wiki = wiki.into();
        let path = path.into();
        let target = format!("{}:{}", wiki, path);
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "get_wiki_page",
            &target,
            move |p| {
                let wiki = wiki.clone();
                let path = path.clone();
                async move { p.get_wiki_page(wiki, path, include_content).await }
            },
        )
        .await
    }

    pub async fn create_page(
        &self,
        wiki: impl Into<String>,
        path: impl Into<String>,
        payload: WikiPagePayload,
    ) -> Result<WikiPage> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(Error::validation("wiki page path is required"));
        }
        let wiki = wiki.into();
        let target = format!("{}:{}", wiki, path);
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "create_wiki_page",
            &target,
            move |p| {
                let wiki = wiki.clone();
                let path = path.clone();
                let payload = payload.clone();
                async move { p.create_wiki_page(wiki, path, payload).await }
            },
        )
        .await
    }

    pub async fn update_page(
        &self,
        wiki: impl Into<String>,
        path: impl Into<String>,
        payload: WikiPagePayload,
    ) -> Result<WikiPage> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(Error::validation("wiki page path is required"));
        }
        let wiki = wiki.into();
        let target = format!("{}:{}", wiki, path);
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "update_wiki_page",
            &target,
            move |p| {
                let wiki = wiki.clone();
                let path = path.clone();
                let payload = payload.clone();
                async move { p.update_wiki_page(wiki, path, payload).await }
            },
        )
        .await
    }

    pub async fn delete_page(
        &self,
        wiki: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<()> {
        let wiki = wiki.into();
        let path = path.into();
        let target = format!("{}:{}", wiki, path);
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "delete_wiki_page",
            &target,
            move |p| {
                let wiki = wiki.clone();
                let path = path.clone();
                async move { p.delete_wiki_page(wiki, path).await }
            },
        )
        .await
    }
}
